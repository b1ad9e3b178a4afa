//! GPU device abstraction.
//!
//! The pool manager and [`GpuModel`](crate::GpuModel) talk to the GPU only
//! through two traits:
//!
//! - [`GpuDevice`] creates buffers and textures, optionally with initial
//!   contents. It is shared between threads.
//! - [`DeviceContext`] records uploads, copies and state transitions. It is
//!   used by one thread at a time.
//!
//! [`DummyDevice`] keeps resource contents in host memory and is what the
//! tests run against.

mod dummy;

pub use dummy::{DummyContext, DummyDevice};

use std::sync::Arc;

use crate::error::GraphicsError;
use crate::resources::{Buffer, Texture};
use crate::types::{BufferDescriptor, StateTransition, TextureDescriptor, TextureRegion};

/// Creates GPU resources.
pub trait GpuDevice: Send + Sync {
    /// Create a buffer. `data`, when given, fills the start of the buffer.
    fn create_buffer(
        &self,
        descriptor: &BufferDescriptor,
        data: Option<&[u8]>,
    ) -> Result<Arc<Buffer>, GraphicsError>;

    /// Create a texture. `data`, when given, holds the tightly packed texels
    /// of the first array layers.
    fn create_texture(
        &self,
        descriptor: &TextureDescriptor,
        data: Option<&[u8]>,
    ) -> Result<Arc<Texture>, GraphicsError>;
}

/// Records commands against resources created by a [`GpuDevice`].
pub trait DeviceContext {
    /// Write `data` into `buffer` at byte `offset`.
    fn update_buffer(
        &mut self,
        buffer: &Buffer,
        offset: u64,
        data: &[u8],
    ) -> Result<(), GraphicsError>;

    /// Copy `size` bytes between buffers.
    fn copy_buffer(
        &mut self,
        src: &Buffer,
        src_offset: u64,
        dst: &Buffer,
        dst_offset: u64,
        size: u64,
    ) -> Result<(), GraphicsError>;

    /// Write tightly packed texels into `region` of one array layer.
    fn update_texture(
        &mut self,
        texture: &Texture,
        layer: u32,
        region: TextureRegion,
        data: &[u8],
    ) -> Result<(), GraphicsError>;

    /// Copy one whole array layer between textures of equal size and format.
    fn copy_texture(
        &mut self,
        src: &Texture,
        dst: &Texture,
        layer: u32,
    ) -> Result<(), GraphicsError>;

    /// Move resources into the states they will be used in.
    fn transition_resource_states(&mut self, transitions: &[StateTransition]);
}
