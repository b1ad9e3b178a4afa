//! GPU resources.
//!
//! [`Buffer`] and [`Texture`] are handles created by a
//! [`GpuDevice`](crate::backend::GpuDevice). Each carries a process-unique id
//! by which the device locates its storage, and the descriptor it was
//! created with. Handles are shared as [`Arc`](std::sync::Arc)s.

mod buffer;
mod texture;

pub use buffer::Buffer;
pub use texture::Texture;

use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_RESOURCE_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_resource_id() -> u64 {
    NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed)
}
