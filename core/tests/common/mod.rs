//! Shared builders for model integration tests.

#![allow(dead_code)]

use assetforge_core::layout::{ModelLayout, ValueType, VertexAttribute};
use assetforge_core::source::{
    AccessorId, SourceAsset, SourceMesh, SourceNode, SourcePrimitive, SourceScene,
};

/// Four corners of a unit quad in the XY plane.
pub const QUAD_POSITIONS: [f32; 12] = [
    0.0, 0.0, 0.0, //
    1.0, 0.0, 0.0, //
    1.0, 1.0, 0.0, //
    0.0, 1.0, 0.0,
];

/// Route `log` output through the test harness; safe to call repeatedly.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

/// Normals pointing along `axis` for four vertices.
pub fn normals(axis: [f32; 3]) -> Vec<f32> {
    axis.iter().copied().cycle().take(12).collect()
}

/// POSITION and NORMAL as `f32x3` in one buffer, stride 24.
pub fn position_normal_layout() -> ModelLayout {
    ModelLayout::position_normal()
}

/// POSITION and NORMAL plus a COLOR_0 `f32x4` defaulting to opaque red.
pub fn colored_layout() -> ModelLayout {
    let color = VertexAttribute::new("COLOR_0", 0, ValueType::Float32, 4)
        .with_default([1.0, 0.0, 0.0, 1.0]);
    ModelLayout::position_normal().with_attribute(color)
}

/// An indexed quad primitive reading `positions` and optionally `normals`.
pub fn quad_primitive(
    positions: AccessorId,
    normals: Option<AccessorId>,
    indices: Option<AccessorId>,
) -> SourcePrimitive {
    let mut primitive = SourcePrimitive {
        indices,
        ..Default::default()
    }
    .with_attribute("POSITION", positions);
    if let Some(normals) = normals {
        primitive = primitive.with_attribute("NORMAL", normals);
    }
    primitive
}

/// Asset with a single scene whose only root is node 0.
pub fn single_node_asset(
    primitives: impl FnOnce(&mut SourceAsset) -> Vec<SourcePrimitive>,
) -> SourceAsset {
    let mut asset = SourceAsset::new("test-asset");
    let primitives = primitives(&mut asset);
    asset.meshes.push(SourceMesh {
        name: Some("mesh".into()),
        primitives,
    });
    asset.nodes.push(SourceNode {
        name: Some("node".into()),
        mesh: Some(0),
        ..Default::default()
    });
    asset.scenes.push(SourceScene {
        name: Some("scene".into()),
        nodes: vec![0],
    });
    asset
}

/// Decode little-endian `f32` values.
pub fn floats(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Decode little-endian `u16` values.
pub fn u16s(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect()
}

/// Decode little-endian `u32` values.
pub fn u32s(bytes: &[u8]) -> Vec<u32> {
    bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}
