//! Built models.
//!
//! [`Model::build`] reads a [`SourceModel`] and produces:
//!
//! - packed vertex buffers in the layout of [`ModelCreateInfo::layout`],
//!   where primitives that read identical accessors share one range
//! - one packed index buffer whose indices already include each
//!   primitive's first vertex
//! - the node arena with scenes, meshes, skins, animations, materials,
//!   textures and cameras
//!
//! The model owns no GPU resources; see `assetforge-graphics` for uploading
//! the packed bytes into pooled or dedicated storage.
//!
//! # Example
//!
//! ```ignore
//! let model = Model::build(&source, &ModelCreateInfo::default())?;
//! let mut transforms = ModelTransforms::new(&model);
//! model.compute_transforms(0, &mut transforms, &Mat4::identity(), Some((0, t)))?;
//! ```

mod animation;
mod builder;
mod error;
mod transform;
mod types;

pub use animation::{Animation, AnimationChannel, AnimationSampler, ChannelPath, Interpolation};
pub use error::{BuildError, TransformError};
pub use transform::{ModelTransforms, SkinTransforms};
pub use types::{
    Camera, CameraProjection, IndexData, Mesh, Node, NodeTransform, Primitive, Scene, Skin,
    VertexData,
};

use crate::layout::{IndexFormat, ModelLayout};
use crate::material::{Material, ModelTexture};
use crate::source::SourceModel;

/// Options for [`Model::build`].
#[derive(Debug, Clone)]
pub struct ModelCreateInfo {
    /// Destination vertex layout and texture slots.
    pub layout: ModelLayout,
    /// Width of packed indices.
    pub index_format: IndexFormat,
    /// Load one scene only. An out-of-range index loads every scene.
    pub scene: Option<usize>,
    pub load_animations: bool,
}

impl Default for ModelCreateInfo {
    fn default() -> Self {
        Self {
            layout: ModelLayout::standard(),
            index_format: IndexFormat::Uint32,
            scene: None,
            load_animations: true,
        }
    }
}

impl ModelCreateInfo {
    pub fn new(layout: ModelLayout) -> Self {
        Self {
            layout,
            ..Default::default()
        }
    }

    pub fn with_index_format(mut self, format: IndexFormat) -> Self {
        self.index_format = format;
        self
    }

    pub fn with_scene(mut self, scene: usize) -> Self {
        self.scene = Some(scene);
        self
    }

    pub fn without_animations(mut self) -> Self {
        self.load_animations = false;
        self
    }
}

/// A model built from a source asset.
#[derive(Debug, Clone)]
pub struct Model {
    pub(crate) layout: ModelLayout,
    pub(crate) nodes: Vec<Node>,
    pub(crate) scenes: Vec<Scene>,
    pub(crate) default_scene: usize,
    pub(crate) meshes: Vec<Mesh>,
    pub(crate) cameras: Vec<Camera>,
    pub(crate) skins: Vec<Skin>,
    pub(crate) animations: Vec<Animation>,
    pub(crate) materials: Vec<Material>,
    pub(crate) textures: Vec<ModelTexture>,
    pub(crate) vertex_data: VertexData,
    pub(crate) index_data: IndexData,
    pub(crate) skin_transform_count: usize,
}

impl Model {
    /// Build a model from `source`.
    ///
    /// Configuration problems (invalid layout, missing POSITION, broken
    /// accessors) abort the build. Per-primitive and per-channel data
    /// problems are logged and the offending item is skipped.
    pub fn build<S: SourceModel + ?Sized>(
        source: &S,
        info: &ModelCreateInfo,
    ) -> Result<Self, BuildError> {
        builder::ModelBuilder::new(source, info)?.build()
    }

    pub fn layout(&self) -> &ModelLayout {
        &self.layout
    }

    /// All nodes, indexed by arena index.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    /// Index of the scene to show by default.
    pub fn default_scene(&self) -> usize {
        self.default_scene
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn cameras(&self) -> &[Camera] {
        &self.cameras
    }

    pub fn skins(&self) -> &[Skin] {
        &self.skins
    }

    pub fn animations(&self) -> &[Animation] {
        &self.animations
    }

    /// Materials; the last one is the default material.
    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    /// Index of the default material.
    pub fn default_material(&self) -> usize {
        self.materials.len().saturating_sub(1)
    }

    pub fn textures(&self) -> &[ModelTexture] {
        &self.textures
    }

    pub fn vertex_data(&self) -> &VertexData {
        &self.vertex_data
    }

    pub fn index_data(&self) -> &IndexData {
        &self.index_data
    }

    /// Number of packed vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertex_data.vertex_count()
    }

    /// Number of packed indices.
    pub fn index_count(&self) -> usize {
        self.index_data.index_count()
    }

    /// Number of skin transform slots, i.e. nodes with both a mesh and a
    /// skin.
    pub fn skin_transform_count(&self) -> usize {
        self.skin_transform_count
    }

    /// Find a node by name.
    pub fn find_node(&self, name: &str) -> Option<usize> {
        self.nodes
            .iter()
            .position(|n| n.name.as_deref() == Some(name))
    }
}
