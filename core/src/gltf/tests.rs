//! Import tests over a small embedded glTF document.
//!
//! Buffer layout (76 bytes):
//! - 0..36: three `vec3` positions of one triangle
//! - 36..42: `u16` indices 0, 1, 2 (plus two bytes of padding)
//! - 44..52: keyframe times 0.0, 1.0
//! - 52..76: keyframe translations (0, 0, 0) and (2, 0, 0)

use crate::layout::{texture_slots, ModelLayout, ValueType};
use crate::material::{AddressMode, AlphaMode, FilterMode, TextureSampler};
use crate::math::{transform_point, Mat4, Vec3};
use crate::model::{CameraProjection, ChannelPath, Model, ModelCreateInfo, ModelTransforms};
use crate::source::SourceModel;

use super::{import_gltf, GltfError};

const BUFFER_URI: &str = "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAAAAABAAIAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAAEAAAAAAAAAAAA==";

fn document() -> String {
    format!(
        r#"{{
  "asset": {{ "version": "2.0" }},
  "scene": 0,
  "scenes": [{{ "name": "main", "nodes": [0] }}],
  "nodes": [
    {{ "name": "root", "translation": [0.0, 0.0, 5.0], "children": [1] }},
    {{ "name": "tri", "mesh": 0, "camera": 0 }}
  ],
  "meshes": [{{
    "name": "triangle",
    "primitives": [{{ "attributes": {{ "POSITION": 0 }}, "indices": 1, "material": 0 }}]
  }}],
  "materials": [{{
    "name": "cutout",
    "alphaMode": "MASK",
    "alphaCutoff": 0.3,
    "doubleSided": true,
    "pbrMetallicRoughness": {{ "baseColorFactor": [1.0, 0.5, 0.25, 1.0], "metallicFactor": 0.0 }}
  }}],
  "cameras": [{{ "type": "perspective", "perspective": {{ "yfov": 0.8, "znear": 0.1 }} }}],
  "animations": [{{
    "samplers": [{{ "input": 2, "output": 3, "interpolation": "LINEAR" }}],
    "channels": [{{ "sampler": 0, "target": {{ "node": 1, "path": "translation" }} }}]
  }}],
  "buffers": [{{ "byteLength": 76, "uri": "{BUFFER_URI}" }}],
  "bufferViews": [
    {{ "buffer": 0, "byteOffset": 0, "byteLength": 36 }},
    {{ "buffer": 0, "byteOffset": 36, "byteLength": 6 }},
    {{ "buffer": 0, "byteOffset": 44, "byteLength": 32 }}
  ],
  "accessors": [
    {{ "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
       "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] }},
    {{ "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }},
    {{ "bufferView": 2, "componentType": 5126, "count": 2, "type": "SCALAR",
       "min": [0.0], "max": [1.0] }},
    {{ "bufferView": 2, "byteOffset": 8, "componentType": 5126, "count": 2, "type": "VEC3" }}
  ]
}}"#
    )
}

#[test]
fn test_import_scene_graph() {
    let asset = import_gltf(document().as_bytes(), "triangle.gltf").unwrap();

    assert_eq!(asset.identity(), "triangle.gltf");
    assert_eq!(asset.default_scene(), Some(0));
    assert_eq!(asset.scenes()[0].nodes, vec![0]);
    assert_eq!(asset.nodes()[0].children, vec![1]);
    assert_eq!(asset.nodes()[0].transform.translation, Some([0.0, 0.0, 5.0]));
    assert_eq!(asset.nodes()[1].mesh, Some(0));
    assert_eq!(asset.nodes()[1].camera, Some(0));

    let primitive = &asset.meshes()[0].primitives[0];
    assert_eq!(primitive.attribute("POSITION"), Some(0));
    assert_eq!(primitive.indices, Some(1));
    assert_eq!(primitive.material, Some(0));
}

#[test]
fn test_import_accessors() {
    let asset = import_gltf(document().as_bytes(), "triangle.gltf").unwrap();

    let positions = asset.accessor(0).unwrap();
    assert_eq!(positions.component_type, ValueType::Float32);
    assert_eq!(positions.num_components, 3);
    assert_eq!(positions.max, Some(&[1.0, 1.0, 0.0][..]));
    assert_eq!(
        positions.read_floats(3),
        vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]
    );

    let indices = asset.accessor(1).unwrap();
    assert_eq!(indices.component_type, ValueType::Uint16);
    assert_eq!(indices.read_floats(1), vec![0.0, 1.0, 2.0]);

    let translations = asset.accessor(3).unwrap();
    assert_eq!(translations.read_floats(3), vec![0.0, 0.0, 0.0, 2.0, 0.0, 0.0]);
}

#[test]
fn test_import_material_and_camera() {
    let asset = import_gltf(document().as_bytes(), "triangle.gltf").unwrap();

    let material = &asset.materials()[0];
    assert_eq!(material.alpha_mode, AlphaMode::Mask { cutoff: 0.3 });
    assert!(material.double_sided);
    assert_eq!(material.base_color_factor, [1.0, 0.5, 0.25, 1.0]);
    assert_eq!(material.metallic_factor, 0.0);
    assert!(material.texture(texture_slots::BASE_COLOR).is_none());

    match asset.cameras()[0].projection {
        CameraProjection::Perspective { yfov, zfar, .. } => {
            assert!((yfov - 0.8).abs() < 1e-6);
            assert_eq!(zfar, None);
        }
        ref other => panic!("unexpected projection {other:?}"),
    }
}

#[test]
fn test_imported_model_builds_and_animates() {
    let asset = import_gltf(document().as_bytes(), "triangle.gltf").unwrap();
    assert_eq!(asset.animations()[0].channels[0].path, ChannelPath::Translation);

    let info = ModelCreateInfo::new(ModelLayout::position_normal());
    let model = Model::build(&asset, &info).unwrap();
    assert_eq!(model.vertex_count(), 3);
    assert_eq!(model.index_count(), 3);
    assert_eq!(model.meshes()[0].primitives[0].material_id, 0);
    assert_eq!(model.animations().len(), 1);

    let mut transforms = ModelTransforms::new(&model);
    model
        .compute_transforms(0, &mut transforms, &Mat4::identity(), Some((0, 0.5)))
        .unwrap();
    let tri = model.find_node("tri").unwrap();
    let origin = transform_point(&transforms.node_global[tri], &Vec3::zeros());
    assert!((origin - Vec3::new(1.0, 0.0, 5.0)).norm() < 1e-5);
}

#[test]
fn test_external_buffer_is_rejected() {
    let json = r#"{
  "asset": { "version": "2.0" },
  "buffers": [{ "byteLength": 4, "uri": "data.bin" }]
}"#;
    assert!(matches!(
        import_gltf(json.as_bytes(), "external.gltf"),
        Err(GltfError::Buffer(_))
    ));
}

#[test]
fn test_invalid_json_is_parse_error() {
    assert!(matches!(
        import_gltf(b"not a gltf", "broken"),
        Err(GltfError::Parse(_))
    ));
}

#[test]
fn test_import_texture_samplers() {
    let json = r#"{
  "asset": { "version": "2.0" },
  "materials": [{
    "pbrMetallicRoughness": { "baseColorTexture": { "index": 0 } },
    "normalTexture": { "index": 1, "texCoord": 1 }
  }],
  "samplers": [{ "magFilter": 9728, "minFilter": 9986, "wrapS": 33071, "wrapT": 33648 }],
  "textures": [{ "source": 0, "sampler": 0 }, { "source": 0 }],
  "images": [{ "uri": "checker.png" }]
}"#;
    let asset = import_gltf(json.as_bytes(), "sampled.gltf").unwrap();
    let material = &asset.materials()[0];

    let base = material.texture(texture_slots::BASE_COLOR).unwrap();
    assert_eq!(base.sampler.mag_filter, FilterMode::Nearest);
    assert_eq!(base.sampler.min_filter, FilterMode::Nearest);
    assert_eq!(base.sampler.mipmap_filter, FilterMode::Linear);
    assert_eq!(base.sampler.address_mode_u, AddressMode::ClampToEdge);
    assert_eq!(base.sampler.address_mode_v, AddressMode::MirrorRepeat);

    let normal = material.texture(texture_slots::NORMAL).unwrap();
    assert_eq!(normal.tex_coord, 1);
    assert_eq!(normal.sampler, TextureSampler::default());
}
