//! Source model interface.
//!
//! A [`SourceModel`] exposes an already parsed scene graph: nodes, meshes with
//! named attribute accessors, skins, animations, materials, images and
//! cameras. Accessors resolve to typed, strided views over raw bytes, which is
//! all the model builder needs to convert attribute data.
//!
//! [`SourceAsset`] is the in-memory implementation used by the glTF importer
//! and by tests.

mod memory;

pub use memory::{SourceAccessor, SourceAsset};

use std::fmt;

use crate::convert;
use crate::layout::ValueType;
use crate::material::{AlphaMode, TextureSampler};
use crate::model::{Camera, ChannelPath, Interpolation};
use crate::texture::CpuTexture;

/// Identifies an accessor within one source model.
pub type AccessorId = usize;

/// A typed, strided view over accessor data.
#[derive(Debug, Clone, Copy)]
pub struct AccessorView<'a> {
    /// Bytes starting at the first element.
    pub data: &'a [u8],
    pub component_type: ValueType,
    pub num_components: u32,
    /// Byte distance between consecutive elements.
    pub stride: usize,
    /// Number of elements.
    pub count: usize,
    /// Integer components hold normalized fixed-point values.
    pub normalized: bool,
    pub min: Option<&'a [f32]>,
    pub max: Option<&'a [f32]>,
}

impl AccessorView<'_> {
    /// Size of one element in bytes.
    pub fn element_size(&self) -> usize {
        self.component_type.size() * self.num_components as usize
    }

    /// Read all elements as floats with `components` lanes each.
    pub fn read_floats(&self, components: usize) -> Vec<f32> {
        convert::read_floats(
            self.data,
            self.component_type,
            self.num_components as usize,
            self.stride,
            self.count,
            components,
            self.normalized,
        )
    }
}

/// Errors resolving an accessor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessorError {
    /// No accessor with this id.
    NotFound(AccessorId),
    /// The accessor references a missing buffer.
    MissingBuffer { accessor: AccessorId, buffer: usize },
    /// The accessor's elements extend past the end of its buffer.
    OutOfBounds {
        accessor: AccessorId,
        required: usize,
        available: usize,
    },
}

impl fmt::Display for AccessorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "accessor {id} does not exist"),
            Self::MissingBuffer { accessor, buffer } => {
                write!(f, "accessor {accessor} references missing buffer {buffer}")
            }
            Self::OutOfBounds {
                accessor,
                required,
                available,
            } => write!(
                f,
                "accessor {accessor} needs {required} bytes but its buffer has {available}"
            ),
        }
    }
}

impl std::error::Error for AccessorError {}

// ============================================================================
// Scene graph description
// ============================================================================

/// Node transform as stored in the source. Unset channels are identity.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SourceTransform {
    /// Column-major 4x4 matrix.
    pub matrix: Option<[f32; 16]>,
    pub translation: Option<[f32; 3]>,
    /// Quaternion `[x, y, z, w]`.
    pub rotation: Option<[f32; 4]>,
    pub scale: Option<[f32; 3]>,
}

#[derive(Debug, Clone, Default)]
pub struct SourceNode {
    pub name: Option<String>,
    pub transform: SourceTransform,
    pub children: Vec<usize>,
    pub mesh: Option<usize>,
    pub camera: Option<usize>,
    pub skin: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct SourceScene {
    pub name: Option<String>,
    /// Root node indices.
    pub nodes: Vec<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct SourceMesh {
    pub name: Option<String>,
    pub primitives: Vec<SourcePrimitive>,
}

#[derive(Debug, Clone, Default)]
pub struct SourcePrimitive {
    /// Attribute name to accessor, e.g. `("POSITION", 0)`.
    pub attributes: Vec<(String, AccessorId)>,
    pub indices: Option<AccessorId>,
    pub material: Option<usize>,
}

impl SourcePrimitive {
    /// Accessor feeding the named attribute.
    pub fn attribute(&self, name: &str) -> Option<AccessorId> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, id)| *id)
    }

    /// Add an attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, accessor: AccessorId) -> Self {
        self.attributes.push((name.into(), accessor));
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct SourceSkin {
    pub name: Option<String>,
    pub joints: Vec<usize>,
    /// Accessor of column-major 4x4 float matrices, one per joint.
    pub inverse_bind_matrices: Option<AccessorId>,
    pub skeleton: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct SourceSampler {
    /// Keyframe times.
    pub input: AccessorId,
    /// Keyframe values.
    pub output: AccessorId,
    pub interpolation: Interpolation,
}

#[derive(Debug, Clone)]
pub struct SourceChannel {
    pub sampler: Option<usize>,
    pub target_node: Option<usize>,
    pub path: ChannelPath,
}

#[derive(Debug, Clone, Default)]
pub struct SourceAnimation {
    pub name: Option<String>,
    pub samplers: Vec<SourceSampler>,
    pub channels: Vec<SourceChannel>,
}

/// Reference from a material slot to an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceTextureRef {
    pub image: usize,
    /// UV set used to sample the texture.
    pub tex_coord: u32,
    pub sampler: TextureSampler,
}

impl SourceTextureRef {
    /// Reference to `image` through UV set 0 with the default sampler.
    pub fn new(image: usize) -> Self {
        Self {
            image,
            tex_coord: 0,
            sampler: TextureSampler::default(),
        }
    }

    pub fn with_tex_coord(mut self, tex_coord: u32) -> Self {
        self.tex_coord = tex_coord;
        self
    }

    pub fn with_sampler(mut self, sampler: TextureSampler) -> Self {
        self.sampler = sampler;
        self
    }
}

#[derive(Debug, Clone)]
pub struct SourceMaterial {
    pub name: Option<String>,
    pub alpha_mode: AlphaMode,
    pub double_sided: bool,
    pub base_color_factor: [f32; 4],
    pub emissive_factor: [f32; 3],
    pub metallic_factor: f32,
    pub roughness_factor: f32,
    /// Slot name (see [`crate::layout::texture_slots`]) to image.
    pub textures: Vec<(String, SourceTextureRef)>,
}

impl Default for SourceMaterial {
    fn default() -> Self {
        Self {
            name: None,
            alpha_mode: AlphaMode::Opaque,
            double_sided: false,
            base_color_factor: [1.0; 4],
            emissive_factor: [0.0; 3],
            metallic_factor: 1.0,
            roughness_factor: 1.0,
            textures: Vec::new(),
        }
    }
}

impl SourceMaterial {
    /// Image bound to the named slot.
    pub fn texture(&self, slot: &str) -> Option<SourceTextureRef> {
        self.textures
            .iter()
            .find(|(name, _)| name == slot)
            .map(|(_, r)| *r)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SourceImage {
    pub name: Option<String>,
    pub uri: Option<String>,
    /// Decoded pixels, `None` when the image could not be decoded.
    pub texture: Option<CpuTexture>,
}

// ============================================================================
// Provider trait
// ============================================================================

/// A parsed scene-graph asset the model builder reads from.
pub trait SourceModel {
    /// A string identifying the asset's content, used to build texture
    /// identity keys.
    fn identity(&self) -> &str;

    fn scenes(&self) -> &[SourceScene];

    /// Scene to display by default, if the source names one.
    fn default_scene(&self) -> Option<usize>;

    fn nodes(&self) -> &[SourceNode];

    fn meshes(&self) -> &[SourceMesh];

    /// Resolve an accessor to a view over its bytes.
    fn accessor(&self, id: AccessorId) -> Result<AccessorView<'_>, AccessorError>;

    fn skins(&self) -> &[SourceSkin] {
        &[]
    }

    fn animations(&self) -> &[SourceAnimation] {
        &[]
    }

    fn materials(&self) -> &[SourceMaterial] {
        &[]
    }

    fn images(&self) -> &[SourceImage] {
        &[]
    }

    fn cameras(&self) -> &[Camera] {
        &[]
    }
}
