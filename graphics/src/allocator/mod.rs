//! CPU-side sub-allocators.
//!
//! These track placement only; they own no GPU memory and are not
//! synchronized. The pools in [`crate::pool`] wrap them in a mutex.

mod atlas;
mod variable_size;

pub use atlas::{AtlasRect, DynamicAtlasAllocator};
pub use variable_size::{Allocation, VariableSizeAllocator};
