//! glTF 2.0 import.
//!
//! [`import_gltf`] parses `.glb` or `.gltf` bytes and copies the scene graph,
//! accessors, skins, animations, materials, images and cameras into a
//! [`SourceAsset`], which [`Model::build`](crate::model::Model::build) then
//! converts into packed buffers. Accessor and node ids keep their glTF
//! indices.
//!
//! Buffers must be embedded, either in the GLB binary chunk or as base64
//! data URIs. Embedded images are decoded to RGBA8; images that reference
//! external files keep their URI and carry no pixels.
//!
//! # Example
//!
//! ```ignore
//! use assetforge_core::gltf::import_gltf;
//! use assetforge_core::model::{Model, ModelCreateInfo};
//!
//! let bytes = std::fs::read("model.glb")?;
//! let source = import_gltf(&bytes, "model.glb")?;
//! let model = Model::build(&source, &ModelCreateInfo::default())?;
//! ```

mod error;
mod import;
#[cfg(test)]
mod tests;

pub use error::GltfError;

use crate::source::SourceAsset;

/// Import a glTF document from `.glb` or `.gltf` bytes.
///
/// `identity` names the asset; it prefixes the cache keys of its textures.
pub fn import_gltf(data: &[u8], identity: &str) -> Result<SourceAsset, GltfError> {
    let gltf = gltf_dep::Gltf::from_slice(data)?;
    let buffers = import::resolve_buffers(&gltf.document, gltf.blob.as_deref())?;

    let mut importer = import::Importer::new(gltf.document, buffers, identity);
    importer.import_accessors()?;
    importer.import_scenes();
    importer.import_nodes();
    importer.import_meshes();
    importer.import_skins();
    importer.import_animations();
    importer.import_materials();
    importer.import_images();
    importer.import_cameras();
    let asset = importer.finish();

    log::debug!(
        "Imported glTF '{}': {} nodes, {} meshes, {} accessors, {} animations",
        identity,
        asset.nodes.len(),
        asset.meshes.len(),
        asset.accessors.len(),
        asset.animations.len()
    );
    Ok(asset)
}
