//! Descriptors, usage flags and resource states.
//!
//! Texture formats are shared with `assetforge-core` so CPU textures and
//! atlases agree on pixel layout.

mod buffer;
mod state;
mod texture;

pub use assetforge_core::texture::TextureFormat;
pub use buffer::{BufferDescriptor, BufferMode, BufferUsage};
pub use state::{ResourceState, StateTransition, TransitionResource};
pub use texture::{TextureDescriptor, TextureRegion, TextureUsage};
