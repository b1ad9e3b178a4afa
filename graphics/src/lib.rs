//! # AssetForge Graphics
//!
//! GPU side of the AssetForge asset pipeline.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`GpuDevice`] / [`DeviceContext`] - The device interface, with an
//!   in-memory [`DummyDevice`] for testing
//! - [`ResourceManager`] - Thread-safe vertex pools, index allocators and
//!   texture atlases shared by many models
//! - [`GpuModel`] - Pooled or dedicated storage for one built model
//!
//! ## Example
//!
//! ```ignore
//! use assetforge_graphics::{DummyDevice, GpuModel, GpuModelCreateInfo, ResourceManager};
//!
//! let device = DummyDevice::new();
//! let manager = ResourceManager::new(Default::default());
//! let info = GpuModelCreateInfo::default();
//! let mut gpu_model = GpuModel::create(&model, &device, Some(&manager), &info)?;
//! gpu_model.prepare_gpu_resources(&device, &mut device.create_context())?;
//! ```

pub mod allocator;
pub mod backend;
pub mod error;
pub mod model;
pub mod pool;
pub mod resources;
pub mod types;

// Re-export main types for convenience
pub use backend::{DeviceContext, DummyContext, DummyDevice, GpuDevice};
pub use error::GraphicsError;
pub use model::{GpuModel, GpuModelCreateInfo};
pub use pool::{
    AtlasDesc, IndexAllocatorDesc, ResourceManager, ResourceManagerCreateInfo, VertexLayoutKey,
    VertexPoolDesc,
};
pub use resources::{Buffer, Texture};
pub use types::{BufferDescriptor, BufferUsage, TextureDescriptor, TextureFormat, TextureUsage};

/// Graphics library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the graphics subsystem.
pub fn init() {
    log::info!("AssetForge Graphics v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_dummy_device() {
        assert_eq!(DummyDevice::new().name(), "Dummy Backend");
    }
}
