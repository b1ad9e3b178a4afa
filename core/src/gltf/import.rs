//! Conversion of a parsed glTF document into a [`SourceAsset`].

use crate::layout::{semantics, texture_slots, ValueType};
use crate::material::{AddressMode, AlphaMode, FilterMode, TextureSampler};
use crate::model::{Camera, CameraProjection, ChannelPath, Interpolation};
use crate::source::{
    SourceAccessor, SourceAnimation, SourceAsset, SourceChannel, SourceImage, SourceMaterial,
    SourceMesh, SourceNode, SourcePrimitive, SourceSampler, SourceScene, SourceSkin,
    SourceTextureRef, SourceTransform,
};
use crate::texture::{CpuTexture, TextureFormat};

use super::error::GltfError;

/// Holds the parsed document while its parts are copied into the asset.
pub(crate) struct Importer {
    document: gltf_dep::Document,
    asset: SourceAsset,
}

impl Importer {
    pub fn new(document: gltf_dep::Document, buffers: Vec<Vec<u8>>, identity: &str) -> Self {
        let mut asset = SourceAsset::new(identity);
        asset.buffers = buffers;
        Self { document, asset }
    }

    pub fn finish(self) -> SourceAsset {
        self.asset
    }

    /// Copy every accessor. Ids match glTF accessor indices.
    pub fn import_accessors(&mut self) -> Result<(), GltfError> {
        for accessor in self.document.accessors() {
            let component_type = map_data_type(accessor.data_type());
            let num_components = accessor.dimensions().multiplicity() as u32;
            let count = accessor.count();
            let element_size = component_type.size() * num_components as usize;

            if accessor.sparse().is_some() {
                log::warn!(
                    "Accessor {}: sparse substitution is not supported, using base values",
                    accessor.index()
                );
            }

            let mut source = match accessor.view() {
                Some(view) => {
                    let buffer = view.buffer().index();
                    let available = self.asset.buffers.get(buffer).map_or(0, Vec::len);
                    let view_end = view.offset() + view.length();
                    if view_end > available {
                        return Err(GltfError::Accessor(format!(
                            "accessor {} uses view {} ending at byte {view_end}, buffer {buffer} has {available}",
                            accessor.index(),
                            view.index()
                        )));
                    }
                    let mut source =
                        SourceAccessor::new(buffer, component_type, num_components, count);
                    source.byte_offset = view.offset() + accessor.offset();
                    source.byte_stride = view.stride();
                    source
                }
                // Accessors without a view read as zeros.
                None => {
                    let buffer = self.asset.push_buffer(vec![0; element_size * count]);
                    SourceAccessor::new(buffer, component_type, num_components, count)
                }
            };
            source.normalized = accessor.normalized();
            source.min = accessor.min().as_ref().and_then(json_floats);
            source.max = accessor.max().as_ref().and_then(json_floats);
            self.asset.push_accessor(source);
        }
        Ok(())
    }

    pub fn import_scenes(&mut self) {
        self.asset.scenes = self
            .document
            .scenes()
            .map(|scene| SourceScene {
                name: scene.name().map(String::from),
                nodes: scene.nodes().map(|n| n.index()).collect(),
            })
            .collect();
        self.asset.default_scene = self.document.default_scene().map(|s| s.index());
    }

    pub fn import_nodes(&mut self) {
        self.asset.nodes = self
            .document
            .nodes()
            .map(|node| SourceNode {
                name: node.name().map(String::from),
                transform: map_transform(node.transform()),
                children: node.children().map(|c| c.index()).collect(),
                mesh: node.mesh().map(|m| m.index()),
                camera: node.camera().map(|c| c.index()),
                skin: node.skin().map(|s| s.index()),
            })
            .collect();
    }

    pub fn import_meshes(&mut self) {
        let mut meshes = Vec::new();
        for mesh in self.document.meshes() {
            let mut primitives = Vec::new();
            for (index, primitive) in mesh.primitives().enumerate() {
                if primitive.mode() != gltf_dep::mesh::Mode::Triangles {
                    log::warn!(
                        "Mesh {} primitive {index}: {:?} topology is not supported, skipping",
                        mesh.index(),
                        primitive.mode()
                    );
                    continue;
                }
                primitives.push(SourcePrimitive {
                    attributes: primitive
                        .attributes()
                        .filter_map(|(semantic, accessor)| {
                            Some((semantic_name(&semantic)?, accessor.index()))
                        })
                        .collect(),
                    indices: primitive.indices().map(|a| a.index()),
                    material: primitive.material().index(),
                });
            }
            meshes.push(SourceMesh {
                name: mesh.name().map(String::from),
                primitives,
            });
        }
        self.asset.meshes = meshes;
    }

    pub fn import_skins(&mut self) {
        self.asset.skins = self
            .document
            .skins()
            .map(|skin| SourceSkin {
                name: skin.name().map(String::from),
                joints: skin.joints().map(|j| j.index()).collect(),
                inverse_bind_matrices: skin.inverse_bind_matrices().map(|a| a.index()),
                skeleton: skin.skeleton().map(|n| n.index()),
            })
            .collect();
    }

    pub fn import_animations(&mut self) {
        self.asset.animations = self
            .document
            .animations()
            .map(|animation| SourceAnimation {
                name: animation.name().map(String::from),
                samplers: animation
                    .samplers()
                    .map(|sampler| SourceSampler {
                        input: sampler.input().index(),
                        output: sampler.output().index(),
                        interpolation: match sampler.interpolation() {
                            gltf_dep::animation::Interpolation::Step => Interpolation::Step,
                            gltf_dep::animation::Interpolation::Linear => Interpolation::Linear,
                            gltf_dep::animation::Interpolation::CubicSpline => {
                                Interpolation::CubicSpline
                            }
                        },
                    })
                    .collect(),
                channels: animation
                    .channels()
                    .map(|channel| SourceChannel {
                        sampler: Some(channel.sampler().index()),
                        target_node: Some(channel.target().node().index()),
                        path: match channel.target().property() {
                            gltf_dep::animation::Property::Translation => ChannelPath::Translation,
                            gltf_dep::animation::Property::Rotation => ChannelPath::Rotation,
                            gltf_dep::animation::Property::Scale => ChannelPath::Scale,
                            gltf_dep::animation::Property::MorphTargetWeights => {
                                ChannelPath::Weights
                            }
                        },
                    })
                    .collect(),
            })
            .collect();
    }

    pub fn import_materials(&mut self) {
        self.asset.materials = self.document.materials().map(map_material).collect();
    }

    pub fn import_cameras(&mut self) {
        self.asset.cameras = self
            .document
            .cameras()
            .map(|camera| Camera {
                name: camera.name().map(String::from),
                projection: match camera.projection() {
                    gltf_dep::camera::Projection::Perspective(p) => CameraProjection::Perspective {
                        yfov: p.yfov(),
                        aspect: p.aspect_ratio(),
                        znear: p.znear(),
                        zfar: p.zfar(),
                    },
                    gltf_dep::camera::Projection::Orthographic(o) => {
                        CameraProjection::Orthographic {
                            xmag: o.xmag(),
                            ymag: o.ymag(),
                            znear: o.znear(),
                            zfar: o.zfar(),
                        }
                    }
                },
            })
            .collect();
    }

    /// Decode images to RGBA8. Images that cannot be decoded keep their
    /// name and URI but carry no pixels.
    pub fn import_images(&mut self) {
        let mut images = Vec::new();
        for image in self.document.images() {
            let (bytes, uri) = match image.source() {
                gltf_dep::image::Source::View { view, .. } => {
                    let bytes = self
                        .asset
                        .buffers
                        .get(view.buffer().index())
                        .and_then(|b| b.get(view.offset()..view.offset() + view.length()))
                        .map(<[u8]>::to_vec);
                    (bytes, None)
                }
                gltf_dep::image::Source::Uri { uri, .. } => {
                    (parse_data_uri(uri), Some(uri.to_string()))
                }
            };

            let texture = match bytes {
                Some(bytes) => decode_image(&bytes, image.index()),
                None => {
                    log::warn!(
                        "Image {}: external or unreadable source {:?}",
                        image.index(),
                        uri
                    );
                    None
                }
            };
            let texture = match (texture, image.name()) {
                (Some(texture), Some(name)) => Some(texture.with_name(name)),
                (texture, _) => texture,
            };

            images.push(SourceImage {
                name: image.name().map(String::from),
                uri: uri.filter(|u| !u.starts_with("data:")),
                texture,
            });
        }
        self.asset.images = images;
    }
}

fn map_data_type(data_type: gltf_dep::accessor::DataType) -> ValueType {
    use gltf_dep::accessor::DataType;
    match data_type {
        DataType::I8 => ValueType::Int8,
        DataType::U8 => ValueType::Uint8,
        DataType::I16 => ValueType::Int16,
        DataType::U16 => ValueType::Uint16,
        DataType::U32 => ValueType::Uint32,
        DataType::F32 => ValueType::Float32,
    }
}

/// Attribute name for a glTF semantic.
fn semantic_name(semantic: &gltf_dep::Semantic) -> Option<String> {
    use gltf_dep::Semantic;
    Some(match semantic {
        Semantic::Positions => semantics::POSITION.to_string(),
        Semantic::Normals => semantics::NORMAL.to_string(),
        Semantic::Tangents => semantics::TANGENT.to_string(),
        Semantic::TexCoords(set) => format!("TEXCOORD_{set}"),
        Semantic::Colors(set) => format!("COLOR_{set}"),
        Semantic::Joints(set) => format!("JOINTS_{set}"),
        Semantic::Weights(set) => format!("WEIGHTS_{set}"),
        #[allow(unreachable_patterns)]
        _ => return None,
    })
}

fn map_transform(transform: gltf_dep::scene::Transform) -> SourceTransform {
    match transform {
        gltf_dep::scene::Transform::Matrix { matrix } => {
            let mut columns = [0.0; 16];
            for (column, values) in matrix.iter().enumerate() {
                columns[column * 4..column * 4 + 4].copy_from_slice(values);
            }
            SourceTransform {
                matrix: Some(columns),
                ..Default::default()
            }
        }
        gltf_dep::scene::Transform::Decomposed {
            translation,
            rotation,
            scale,
        } => SourceTransform {
            matrix: None,
            translation: Some(translation),
            rotation: Some(rotation),
            scale: Some(scale),
        },
    }
}

fn map_material(material: gltf_dep::Material<'_>) -> SourceMaterial {
    let pbr = material.pbr_metallic_roughness();
    let texture_ref = |texture: gltf_dep::Texture<'_>, tex_coord: u32| {
        SourceTextureRef::new(texture.source().index())
            .with_tex_coord(tex_coord)
            .with_sampler(map_sampler(texture.sampler()))
    };

    let mut textures = Vec::new();
    if let Some(info) = pbr.base_color_texture() {
        textures.push((
            texture_slots::BASE_COLOR.to_string(),
            texture_ref(info.texture(), info.tex_coord()),
        ));
    }
    if let Some(info) = pbr.metallic_roughness_texture() {
        textures.push((
            texture_slots::METALLIC_ROUGHNESS.to_string(),
            texture_ref(info.texture(), info.tex_coord()),
        ));
    }
    if let Some(normal) = material.normal_texture() {
        textures.push((
            texture_slots::NORMAL.to_string(),
            texture_ref(normal.texture(), normal.tex_coord()),
        ));
    }
    if let Some(occlusion) = material.occlusion_texture() {
        textures.push((
            texture_slots::OCCLUSION.to_string(),
            texture_ref(occlusion.texture(), occlusion.tex_coord()),
        ));
    }
    if let Some(info) = material.emissive_texture() {
        textures.push((
            texture_slots::EMISSIVE.to_string(),
            texture_ref(info.texture(), info.tex_coord()),
        ));
    }

    SourceMaterial {
        name: material.name().map(String::from),
        alpha_mode: match material.alpha_mode() {
            gltf_dep::material::AlphaMode::Opaque => AlphaMode::Opaque,
            gltf_dep::material::AlphaMode::Mask => AlphaMode::Mask {
                cutoff: material.alpha_cutoff().unwrap_or(0.5),
            },
            gltf_dep::material::AlphaMode::Blend => AlphaMode::Blend,
        },
        double_sided: material.double_sided(),
        base_color_factor: pbr.base_color_factor(),
        emissive_factor: material.emissive_factor(),
        metallic_factor: pbr.metallic_factor(),
        roughness_factor: pbr.roughness_factor(),
        textures,
    }
}

fn map_sampler(sampler: gltf_dep::texture::Sampler<'_>) -> TextureSampler {
    use gltf_dep::texture::{MagFilter, MinFilter, WrappingMode};

    let wrap = |mode: WrappingMode| match mode {
        WrappingMode::ClampToEdge => AddressMode::ClampToEdge,
        WrappingMode::MirroredRepeat => AddressMode::MirrorRepeat,
        WrappingMode::Repeat => AddressMode::Repeat,
    };
    let mut result = TextureSampler::default()
        .with_address_mode(wrap(sampler.wrap_s()), wrap(sampler.wrap_t()));
    if let Some(mag) = sampler.mag_filter() {
        result.mag_filter = match mag {
            MagFilter::Nearest => FilterMode::Nearest,
            MagFilter::Linear => FilterMode::Linear,
        };
    }
    if let Some(min) = sampler.min_filter() {
        let (min_filter, mipmap_filter) = match min {
            MinFilter::Nearest | MinFilter::NearestMipmapNearest => {
                (FilterMode::Nearest, FilterMode::Nearest)
            }
            MinFilter::NearestMipmapLinear => (FilterMode::Nearest, FilterMode::Linear),
            MinFilter::Linear | MinFilter::LinearMipmapNearest => {
                (FilterMode::Linear, FilterMode::Nearest)
            }
            MinFilter::LinearMipmapLinear => (FilterMode::Linear, FilterMode::Linear),
        };
        result.min_filter = min_filter;
        result.mipmap_filter = mipmap_filter;
    }
    result
}

fn json_floats(value: &gltf_dep::json::Value) -> Option<Vec<f32>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_f64().map(|f| f as f32))
        .collect()
}

fn decode_image(bytes: &[u8], index: usize) -> Option<CpuTexture> {
    match image::load_from_memory(bytes) {
        Ok(decoded) => {
            let rgba = decoded.to_rgba8();
            let (width, height) = rgba.dimensions();
            Some(CpuTexture::new(
                width,
                height,
                TextureFormat::Rgba8Unorm,
                rgba.into_raw(),
            ))
        }
        Err(e) => {
            log::warn!("Image {index}: decode failed: {e}");
            None
        }
    }
}

/// Resolve every buffer of `document` to bytes.
///
/// The GLB binary chunk and base64 data URIs are supported.
pub(crate) fn resolve_buffers(
    document: &gltf_dep::Document,
    blob: Option<&[u8]>,
) -> Result<Vec<Vec<u8>>, GltfError> {
    document
        .buffers()
        .map(|buffer| {
            let data = match buffer.source() {
                gltf_dep::buffer::Source::Bin => blob
                    .ok_or_else(|| {
                        GltfError::Buffer("binary chunk referenced but not present".into())
                    })?
                    .to_vec(),
                gltf_dep::buffer::Source::Uri(uri) => parse_data_uri(uri).ok_or_else(|| {
                    GltfError::Buffer(format!("unsupported buffer URI: {uri}"))
                })?,
            };
            if data.len() < buffer.length() {
                return Err(GltfError::Buffer(format!(
                    "buffer {} declares {} bytes but holds {}",
                    buffer.index(),
                    buffer.length(),
                    data.len()
                )));
            }
            Ok(data)
        })
        .collect()
}

/// Decode a `data:<mime>;base64,<payload>` URI.
pub(crate) fn parse_data_uri(uri: &str) -> Option<Vec<u8>> {
    let rest = uri.strip_prefix("data:")?;
    let (_, payload) = rest.split_once(";base64,")?;
    decode_base64(payload)
}

fn decode_base64(input: &str) -> Option<Vec<u8>> {
    fn sextet(c: u8) -> Option<u32> {
        Some(match c {
            b'A'..=b'Z' => c - b'A',
            b'a'..=b'z' => c - b'a' + 26,
            b'0'..=b'9' => c - b'0' + 52,
            b'+' => 62,
            b'/' => 63,
            _ => return None,
        } as u32)
    }

    let symbols: Vec<u8> = input
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .take_while(|&b| b != b'=')
        .collect();
    let mut out = Vec::with_capacity(symbols.len() * 3 / 4);
    for chunk in symbols.chunks(4) {
        if chunk.len() == 1 {
            return None;
        }
        let mut bits = 0u32;
        for (i, &c) in chunk.iter().enumerate() {
            bits |= sextet(c)? << (18 - 6 * i);
        }
        let bytes = bits.to_be_bytes();
        out.extend_from_slice(&bytes[1..chunk.len()]);
    }
    Some(out)
}
