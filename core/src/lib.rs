//! # AssetForge Core
//!
//! CPU side of the AssetForge asset pipeline: vertex layouts, attribute
//! conversion, source model access, model building and per-frame transform
//! evaluation.

pub mod convert;
#[cfg(feature = "gltf")]
pub mod gltf;
pub mod layout;
pub mod material;
pub mod math;
pub mod model;
pub mod source;
pub mod texture;

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the library version.
pub fn init() {
    log::info!("AssetForge Core v{} initialized", VERSION);
}
