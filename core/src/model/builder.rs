//! Build session turning a [`SourceModel`] into a [`Model`].
//!
//! One session runs on one thread and owns all intermediate byte arrays.
//! Steps run in a fixed order: nodes, meshes, cameras, materials and
//! textures, skins, animations.

use std::collections::{HashMap, HashSet};

use crate::convert::{self, pack_indices, ConversionKey, ConversionResult};
use crate::layout::{semantics, texture_slots, LayoutInfo};
use crate::material::{merge_alpha_cutoff, Material, MaterialTexture, ModelTexture};
use crate::math::{mat4_from_slice, quat_from_array, BoundBox, Mat4, Vec3, Vec4};
use crate::source::{AccessorView, SourceModel, SourcePrimitive, SourceTransform};

use super::animation::{Animation, AnimationChannel, AnimationSampler, ChannelPath, Interpolation};
use super::error::BuildError;
use super::types::{IndexData, Mesh, Node, NodeTransform, Primitive, Scene, Skin, VertexData};
use super::{Model, ModelCreateInfo};

pub(crate) struct ModelBuilder<'a, S: SourceModel + ?Sized> {
    source: &'a S,
    info: &'a ModelCreateInfo,
    layout: LayoutInfo,

    // Source index to arena/model index.
    node_ids: HashMap<usize, usize>,
    mesh_ids: HashMap<usize, usize>,
    camera_ids: HashMap<usize, usize>,
    skin_ids: HashMap<usize, Option<usize>>,
    image_ids: HashMap<usize, Option<usize>>,

    conversions: HashMap<ConversionKey, ConversionResult>,
    vertex_buffers: Vec<Vec<u8>>,
    index_bytes: Vec<u8>,

    nodes: Vec<Node>,
    meshes: Vec<Mesh>,
    cameras: Vec<crate::model::Camera>,
    skins: Vec<Skin>,
    textures: Vec<ModelTexture>,
}

impl<'a, S: SourceModel + ?Sized> ModelBuilder<'a, S> {
    pub(crate) fn new(source: &'a S, info: &'a ModelCreateInfo) -> Result<Self, BuildError> {
        let layout = info.layout.resolve()?;
        let vertex_buffers = vec![Vec::new(); layout.buffer_count()];
        Ok(Self {
            source,
            info,
            layout,
            node_ids: HashMap::new(),
            mesh_ids: HashMap::new(),
            camera_ids: HashMap::new(),
            skin_ids: HashMap::new(),
            image_ids: HashMap::new(),
            conversions: HashMap::new(),
            vertex_buffers,
            index_bytes: Vec::new(),
            nodes: Vec::new(),
            meshes: Vec::new(),
            cameras: Vec::new(),
            skins: Vec::new(),
            textures: Vec::new(),
        })
    }

    pub(crate) fn build(mut self) -> Result<Model, BuildError> {
        let (scene_roots, default_scene) = self.select_scenes();
        let mut scenes = Vec::with_capacity(scene_roots.len());
        for (name, roots) in scene_roots {
            let mut root_nodes = Vec::with_capacity(roots.len());
            for root in roots {
                root_nodes.push(self.allocate_node(root, None)?);
            }
            scenes.push(Scene {
                name,
                linear_nodes: self.linearize(&root_nodes),
                root_nodes,
            });
        }

        self.load_node_contents()?;
        let materials = self.load_materials();
        self.load_skins()?;
        let skin_transform_count = self.assign_skin_slots();
        let animations = if self.info.load_animations {
            self.load_animations()?
        } else {
            Vec::new()
        };

        let vertex_data = VertexData {
            strides: self.layout.strides,
            buffers: self.vertex_buffers,
        };
        let index_data = IndexData {
            format: self.info.index_format,
            data: self.index_bytes,
        };
        log::debug!(
            "Built model '{}': {} nodes, {} meshes, {} vertex sets, {} vertices, {} indices",
            self.source.identity(),
            self.nodes.len(),
            self.meshes.len(),
            self.conversions.len(),
            vertex_data.vertex_count(),
            index_data.index_count(),
        );

        Ok(Model {
            layout: self.info.layout.clone(),
            nodes: self.nodes,
            scenes,
            default_scene,
            meshes: self.meshes,
            cameras: self.cameras,
            skins: self.skins,
            animations,
            materials,
            textures: self.textures,
            vertex_data,
            index_data,
            skin_transform_count,
        })
    }

    // ========================================================================
    // Scenes and nodes
    // ========================================================================

    /// Roots of every scene to load, plus the default scene index.
    #[allow(clippy::type_complexity)]
    fn select_scenes(&self) -> (Vec<(Option<String>, Vec<usize>)>, usize) {
        let scenes = self.source.scenes();
        if scenes.is_empty() {
            // Every node that is nobody's child becomes a root.
            let children: HashSet<usize> = self
                .source
                .nodes()
                .iter()
                .flat_map(|n| n.children.iter().copied())
                .collect();
            let roots = (0..self.source.nodes().len())
                .filter(|i| !children.contains(i))
                .collect();
            return (vec![(None, roots)], 0);
        }

        match self.info.scene {
            Some(index) if index < scenes.len() => {
                let scene = &scenes[index];
                (vec![(scene.name.clone(), scene.nodes.clone())], 0)
            }
            requested => {
                if let Some(index) = requested {
                    log::warn!(
                        "Scene index {} is out of range ({} scenes); loading all scenes",
                        index,
                        scenes.len()
                    );
                }
                let default = self
                    .source
                    .default_scene()
                    .filter(|&i| i < scenes.len())
                    .unwrap_or(0);
                let all = scenes
                    .iter()
                    .map(|s| (s.name.clone(), s.nodes.clone()))
                    .collect();
                (all, default)
            }
        }
    }

    /// Allocate `src` and its subtree in the arena. Nodes already allocated
    /// are reused, which also stops cycles.
    fn allocate_node(&mut self, src: usize, parent: Option<usize>) -> Result<usize, BuildError> {
        if let Some(&id) = self.node_ids.get(&src) {
            if parent.is_some() {
                log::warn!(
                    "Node {} is referenced by more than one parent; keeping the first",
                    src
                );
            }
            return Ok(id);
        }

        let source: &'a S = self.source;
        let source_node = source
            .nodes()
            .get(src)
            .ok_or(BuildError::InvalidReference {
                kind: "node",
                index: src,
            })?;

        let id = self.nodes.len();
        let mut node = Node::new(src);
        node.parent = parent;
        self.nodes.push(node);
        self.node_ids.insert(src, id);

        for &child in &source_node.children {
            let already_loaded = self.node_ids.contains_key(&child);
            let child_id = self.allocate_node(child, Some(id))?;
            if !already_loaded {
                self.nodes[id].children.push(child_id);
            }
        }
        Ok(id)
    }

    /// Depth-first list of every node reachable from `roots`.
    fn linearize(&self, roots: &[usize]) -> Vec<usize> {
        let mut linear = Vec::new();
        let mut visited = HashSet::new();
        let mut stack: Vec<usize> = roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            linear.push(id);
            stack.extend(self.nodes[id].children.iter().rev());
        }
        linear
    }

    fn load_node_contents(&mut self) -> Result<(), BuildError> {
        let source: &'a S = self.source;
        for id in 0..self.nodes.len() {
            let src = self.nodes[id].source_index;
            let source_node = &source.nodes()[src];

            let mesh = match source_node.mesh {
                Some(mesh) => Some(self.load_mesh(mesh)?),
                None => None,
            };
            let camera = match source_node.camera {
                Some(camera) => self.load_camera(camera),
                None => None,
            };

            let node = &mut self.nodes[id];
            node.name = source_node.name.clone();
            node.transform = convert_transform(&source_node.transform);
            node.mesh = mesh;
            node.camera = camera;
        }
        Ok(())
    }

    fn load_camera(&mut self, src: usize) -> Option<usize> {
        if let Some(&id) = self.camera_ids.get(&src) {
            return Some(id);
        }
        let Some(camera) = self.source.cameras().get(src).cloned() else {
            log::warn!("Camera {} does not exist; ignoring", src);
            return None;
        };
        let id = self.cameras.len();
        self.cameras.push(camera);
        self.camera_ids.insert(src, id);
        Some(id)
    }

    // ========================================================================
    // Meshes
    // ========================================================================

    fn load_mesh(&mut self, src: usize) -> Result<usize, BuildError> {
        if let Some(&id) = self.mesh_ids.get(&src) {
            return Ok(id);
        }
        let source: &'a S = self.source;
        let source_mesh = source.meshes().get(src).ok_or(BuildError::InvalidReference {
            kind: "mesh",
            index: src,
        })?;

        let mut mesh = Mesh {
            name: source_mesh.name.clone(),
            primitives: Vec::with_capacity(source_mesh.primitives.len()),
            bounds: BoundBox::empty(),
        };
        for (index, primitive) in source_mesh.primitives.iter().enumerate() {
            if let Some(primitive) = self.load_primitive(src, index, primitive)? {
                mesh.bounds = mesh.bounds.union(&primitive.bounds);
                mesh.primitives.push(primitive);
            }
        }

        let id = self.meshes.len();
        self.meshes.push(mesh);
        self.mesh_ids.insert(src, id);
        Ok(id)
    }

    /// Convert one primitive. Returns `None` when the primitive is skipped.
    fn load_primitive(
        &mut self,
        mesh: usize,
        index: usize,
        primitive: &SourcePrimitive,
    ) -> Result<Option<Primitive>, BuildError> {
        let source: &'a S = self.source;
        let position_id =
            primitive
                .attribute(semantics::POSITION)
                .ok_or(BuildError::MissingPosition {
                    mesh,
                    primitive: index,
                })?;
        let position = source.accessor(position_id)?;
        let vertex_count = position.count;

        let key = ConversionKey::new(
            self.info
                .layout
                .attributes
                .iter()
                .map(|a| primitive.attribute(&a.name))
                .collect(),
        );

        let cached = self
            .conversions
            .get(&key)
            .filter(|r| r.vertex_count == vertex_count)
            .cloned();
        let conversion = match cached {
            Some(result) => result,
            None => {
                let result = self.convert_vertices(&key, vertex_count, mesh, index)?;
                self.conversions
                    .entry(key)
                    .or_insert_with(|| result.clone());
                result
            }
        };

        let first_vertex = self
            .layout
            .primary_buffer()
            .map(|b| conversion.offsets[b] / self.layout.strides[b] as usize)
            .unwrap_or(0) as u32;

        let (first_index, index_count) = match primitive.indices {
            Some(indices) => {
                let view = source.accessor(indices)?;
                match self.append_indices(&view, first_vertex) {
                    Some(range) => range,
                    None => {
                        log::warn!(
                            "Skipping mesh {} primitive {}: unsupported index data",
                            mesh,
                            index
                        );
                        return Ok(None);
                    }
                }
            }
            None => (0, 0),
        };

        let material_id = primitive
            .material
            .filter(|&m| m < source.materials().len())
            .unwrap_or(source.materials().len());

        Ok(Some(Primitive {
            first_index,
            index_count,
            first_vertex,
            vertex_count: vertex_count as u32,
            material_id,
            bounds: position_bounds(&position),
        }))
    }

    /// Append `vertex_count` elements to every destination buffer and fill
    /// them from the accessors in `key`.
    fn convert_vertices(
        &mut self,
        key: &ConversionKey,
        vertex_count: usize,
        mesh: usize,
        primitive: usize,
    ) -> Result<ConversionResult, BuildError> {
        let source: &'a S = self.source;
        let offsets: Vec<usize> = self.vertex_buffers.iter().map(Vec::len).collect();
        for (buffer, stride) in self.vertex_buffers.iter_mut().zip(&self.layout.strides) {
            buffer.resize(buffer.len() + vertex_count * *stride as usize, 0);
        }

        for (i, attribute) in self.info.layout.attributes.iter().enumerate() {
            let stride = self.layout.strides[attribute.buffer_id] as usize;
            let start = offsets[attribute.buffer_id] + self.layout.offsets[i] as usize;
            let dst = &mut self.vertex_buffers[attribute.buffer_id][start..];
            let components = attribute.num_components as usize;

            match key.accessor_ids()[i] {
                Some(id) => {
                    let view = source.accessor(id)?;
                    if view.count != vertex_count {
                        return Err(BuildError::VertexCountMismatch {
                            mesh,
                            primitive,
                            attribute: attribute.name.clone(),
                            expected: vertex_count,
                            actual: view.count,
                        });
                    }
                    if !view.component_type.is_convertible() {
                        return Err(BuildError::UnsupportedComponentType {
                            accessor: id,
                            component_type: view.component_type,
                        });
                    }
                    convert::write_components(
                        view.data,
                        view.component_type,
                        view.num_components as usize,
                        view.stride,
                        dst,
                        attribute.value_type,
                        components,
                        stride,
                        vertex_count,
                        attribute.normalized || view.normalized,
                    );
                }
                None => {
                    if let Some(value) = attribute.default_value {
                        convert::fill_default(
                            dst,
                            attribute.value_type,
                            components,
                            stride,
                            vertex_count,
                            value,
                            attribute.normalized,
                        );
                    }
                }
            }
        }

        Ok(ConversionResult {
            offsets,
            vertex_count,
        })
    }

    /// Pack indices offset by `base_vertex`. Returns `(first_index, count)`,
    /// or `None` if the index type is unsupported.
    fn append_indices(&mut self, view: &AccessorView<'_>, base_vertex: u32) -> Option<(u32, u32)> {
        let format = self.info.index_format;
        let size = format.size();
        let start = self.index_bytes.len();
        self.index_bytes.resize(start + view.count * size, 0);

        let written = pack_indices(
            view.data,
            view.component_type,
            view.stride,
            view.count,
            &mut self.index_bytes[start..],
            format,
            base_vertex,
        );
        if written == 0 && view.count > 0 {
            self.index_bytes.truncate(start);
            return None;
        }
        Some(((start / size) as u32, written))
    }

    // ========================================================================
    // Materials and textures
    // ========================================================================

    /// Source materials followed by the default material.
    fn load_materials(&mut self) -> Vec<Material> {
        let source: &'a S = self.source;
        let info: &'a ModelCreateInfo = self.info;
        let slot_count = info.layout.texture_slot_count();
        let mut cutoff_hints: HashMap<usize, f32> = HashMap::new();

        let mut materials = Vec::with_capacity(source.materials().len() + 1);
        for src in source.materials() {
            let mut material = Material::new(slot_count);
            material.name = src.name.clone();
            material.alpha_mode = src.alpha_mode;
            material.double_sided = src.double_sided;
            material.base_color_factor = src.base_color_factor;
            material.emissive_factor = src.emissive_factor;
            material.metallic_factor = src.metallic_factor;
            material.roughness_factor = src.roughness_factor;

            for slot in &info.layout.textures {
                let Some(tex_ref) = src.texture(&slot.name) else {
                    continue;
                };
                let Some(texture) = self.load_image(tex_ref.image) else {
                    continue;
                };
                material.textures[slot.index] = Some(MaterialTexture {
                    texture,
                    uv_set: tex_ref.tex_coord,
                    sampler: tex_ref.sampler,
                });
                if slot.name == texture_slots::BASE_COLOR {
                    let hint = merge_alpha_cutoff(
                        cutoff_hints.get(&texture).copied(),
                        &material.alpha_mode,
                    );
                    cutoff_hints.insert(texture, hint);
                }
            }
            materials.push(material);
        }

        for (texture, hint) in cutoff_hints {
            self.textures[texture].alpha_cutoff = hint;
        }

        materials.push(Material::new(slot_count));
        materials
    }

    fn load_image(&mut self, src: usize) -> Option<usize> {
        if let Some(&id) = self.image_ids.get(&src) {
            return id;
        }
        let source: &'a S = self.source;
        let image = source.images().get(src);
        let id = match image.and_then(|i| i.texture.as_ref().map(|t| (i, t))) {
            Some((image, texture)) => {
                let name = image.uri.clone().unwrap_or_else(|| src.to_string());
                self.textures.push(ModelTexture {
                    cache_key: format!("{}#{}", source.identity(), name),
                    image: texture.clone(),
                    alpha_cutoff: 0.0,
                });
                Some(self.textures.len() - 1)
            }
            None => {
                log::warn!("Image {} is missing or was not decoded; slot left empty", src);
                None
            }
        };
        self.image_ids.insert(src, id);
        id
    }

    // ========================================================================
    // Skins
    // ========================================================================

    fn load_skins(&mut self) -> Result<(), BuildError> {
        for id in 0..self.nodes.len() {
            let src = self.nodes[id].source_index;
            if let Some(skin) = self.source.nodes()[src].skin {
                self.nodes[id].skin = self.load_skin(skin)?;
            }
        }
        Ok(())
    }

    fn load_skin(&mut self, src: usize) -> Result<Option<usize>, BuildError> {
        if let Some(&id) = self.skin_ids.get(&src) {
            return Ok(id);
        }
        let source: &'a S = self.source;
        let skin = source.skins().get(src).ok_or(BuildError::InvalidReference {
            kind: "skin",
            index: src,
        })?;

        let joints: Option<Vec<usize>> = skin
            .joints
            .iter()
            .map(|j| self.node_ids.get(j).copied())
            .collect();
        let Some(joints) = joints else {
            log::warn!(
                "Skin {} references joints outside the loaded scenes; skipping it",
                src
            );
            self.skin_ids.insert(src, None);
            return Ok(None);
        };

        let mut inverse_bind_matrices: Vec<Mat4> = match skin.inverse_bind_matrices {
            Some(accessor) => source
                .accessor(accessor)?
                .read_floats(16)
                .chunks_exact(16)
                .map(mat4_from_slice)
                .collect(),
            None => Vec::new(),
        };
        if !inverse_bind_matrices.is_empty() && inverse_bind_matrices.len() < joints.len() {
            log::warn!(
                "Skin {} has {} inverse bind matrices for {} joints; padding with identity",
                src,
                inverse_bind_matrices.len(),
                joints.len()
            );
        }
        inverse_bind_matrices.resize(joints.len(), Mat4::identity());

        let id = self.skins.len();
        self.skins.push(Skin {
            name: skin.name.clone(),
            joints,
            inverse_bind_matrices,
            skeleton: skin.skeleton.and_then(|s| self.node_ids.get(&s).copied()),
        });
        self.skin_ids.insert(src, Some(id));
        Ok(Some(id))
    }

    /// Give every node with both a mesh and a skin its joint storage slot.
    fn assign_skin_slots(&mut self) -> usize {
        let mut count = 0;
        for node in &mut self.nodes {
            if node.mesh.is_some() && node.skin.is_some() {
                node.skin_transform_index = Some(count);
                count += 1;
            }
        }
        count
    }

    // ========================================================================
    // Animations
    // ========================================================================

    fn load_animations(&self) -> Result<Vec<Animation>, BuildError> {
        let source: &'a S = self.source;
        let mut animations = Vec::with_capacity(source.animations().len());

        for (index, src) in source.animations().iter().enumerate() {
            let name = src.name.clone().unwrap_or_else(|| index.to_string());

            let mut samplers = Vec::with_capacity(src.samplers.len());
            for sampler in &src.samplers {
                let inputs = source.accessor(sampler.input)?.read_floats(1);
                let output = source.accessor(sampler.output)?;
                let outputs = match output.num_components {
                    3 | 4 => output
                        .read_floats(4)
                        .chunks_exact(4)
                        .map(Vec4::from_column_slice)
                        .collect(),
                    n => {
                        log::warn!(
                            "Animation '{}': unsupported output component count {}",
                            name,
                            n
                        );
                        Vec::new()
                    }
                };
                samplers.push(AnimationSampler::new(sampler.interpolation, inputs, outputs));
            }

            let mut channels = Vec::with_capacity(src.channels.len());
            for channel in &src.channels {
                if channel.path == ChannelPath::Weights {
                    log::warn!(
                        "Animation '{}': morph target weight channels are not supported",
                        name
                    );
                    continue;
                }
                let Some(sampler_index) = channel.sampler.filter(|&s| s < samplers.len()) else {
                    log::warn!("Animation '{}': channel without a valid sampler", name);
                    continue;
                };
                let sampler = &samplers[sampler_index];
                if sampler.interpolation == Interpolation::CubicSpline {
                    log::warn!(
                        "Animation '{}': cubic spline interpolation is not supported",
                        name
                    );
                    continue;
                }
                if sampler.keyframe_count() == 0 {
                    log::warn!("Animation '{}': sampler {} has no keyframes", name, sampler_index);
                    continue;
                }
                let Some(node) = channel
                    .target_node
                    .and_then(|n| self.node_ids.get(&n).copied())
                else {
                    log::debug!("Animation '{}': channel target is not loaded", name);
                    continue;
                };
                channels.push(AnimationChannel {
                    path: channel.path,
                    node,
                    sampler: sampler_index,
                });
            }

            let (start, end) = samplers
                .iter()
                .filter(|s| s.keyframe_count() > 0)
                .fold(None, |range: Option<(f32, f32)>, s| {
                    let first = s.inputs[0];
                    let last = s.inputs[s.keyframe_count() - 1];
                    Some(match range {
                        Some((start, end)) => (start.min(first), end.max(last)),
                        None => (first, last),
                    })
                })
                .unwrap_or((0.0, 0.0));

            animations.push(Animation {
                name,
                samplers,
                channels,
                start,
                end,
            });
        }
        Ok(animations)
    }
}

fn convert_transform(src: &SourceTransform) -> NodeTransform {
    let mut transform = NodeTransform::identity();
    if let Some(matrix) = &src.matrix {
        transform.matrix = mat4_from_slice(matrix);
    }
    if let Some(t) = src.translation {
        transform.translation = Vec3::from(t);
    }
    if let Some(r) = src.rotation {
        transform.rotation = quat_from_array(r);
    }
    if let Some(s) = src.scale {
        transform.scale = Vec3::from(s);
    }
    transform
}

/// Bounds from accessor min/max, or from the data when the source has none.
fn position_bounds(view: &AccessorView<'_>) -> BoundBox {
    if let (Some(min), Some(max)) = (view.min, view.max) {
        if min.len() >= 3 && max.len() >= 3 {
            return BoundBox::new(
                Vec3::new(min[0], min[1], min[2]),
                Vec3::new(max[0], max[1], max[2]),
            );
        }
    }
    let mut bounds = BoundBox::empty();
    for p in view.read_floats(3).chunks_exact(3) {
        bounds.include_point(&Vec3::new(p[0], p[1], p[2]));
    }
    bounds
}
