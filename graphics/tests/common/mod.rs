//! Shared model fixtures for graphics integration tests.

#![allow(dead_code)]

use assetforge_core::layout::{texture_slots, ModelLayout, TextureAttribute};
use assetforge_core::model::{Model, ModelCreateInfo};
use assetforge_core::source::{
    SourceAsset, SourceImage, SourceMaterial, SourceMesh, SourceNode, SourcePrimitive,
    SourceScene, SourceTextureRef,
};
use assetforge_core::texture::CpuTexture;

pub const QUAD_POSITIONS: [f32; 12] = [
    0.0, 0.0, 0.0, //
    1.0, 0.0, 0.0, //
    1.0, 1.0, 0.0, //
    0.0, 1.0, 0.0,
];

pub const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

/// An indexed quad with one base-color texture of `texture_size` texels.
pub fn textured_quad_asset(identity: &str, texture_size: u32) -> SourceAsset {
    let mut asset = SourceAsset::new(identity);
    let positions = asset.push_floats(&QUAD_POSITIONS, 3);
    let normals = asset.push_floats(&[0.0f32, 0.0, 1.0].repeat(4), 3);
    let indices = asset.push_indices_u16(&QUAD_INDICES);

    let pixels = (0..texture_size * texture_size * 4)
        .map(|i| (i % 251) as u8)
        .collect();
    asset.images.push(SourceImage {
        name: Some("albedo".into()),
        uri: None,
        texture: Some(CpuTexture::new(
            texture_size,
            texture_size,
            assetforge_core::texture::TextureFormat::Rgba8Unorm,
            pixels,
        )),
    });
    asset.materials.push(SourceMaterial {
        textures: vec![(
            texture_slots::BASE_COLOR.to_string(),
            SourceTextureRef::new(0),
        )],
        ..Default::default()
    });

    let primitive = SourcePrimitive {
        indices: Some(indices),
        material: Some(0),
        ..Default::default()
    }
    .with_attribute("POSITION", positions)
    .with_attribute("NORMAL", normals);
    asset.meshes.push(SourceMesh {
        name: Some("quad".into()),
        primitives: vec![primitive],
    });
    asset.nodes.push(SourceNode {
        name: Some("quad".into()),
        mesh: Some(0),
        ..Default::default()
    });
    asset.scenes.push(SourceScene {
        name: None,
        nodes: vec![0],
    });
    asset
}

/// Build `asset` with position + normal vertices and a base-color slot.
pub fn build(asset: &SourceAsset) -> Model {
    let layout = ModelLayout::position_normal()
        .with_texture(TextureAttribute::new(texture_slots::BASE_COLOR, 0));
    Model::build(asset, &ModelCreateInfo::new(layout)).expect("model builds")
}

/// Decode little-endian `u32` values.
pub fn u32s(bytes: &[u8]) -> Vec<u32> {
    bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}
