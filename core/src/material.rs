//! Material data referenced by model primitives.

use crate::texture::CpuTexture;

/// Alpha rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum AlphaMode {
    /// Fully opaque (alpha ignored).
    #[default]
    Opaque,
    /// Alpha masking with cutoff threshold.
    Mask {
        /// Fragments with alpha below this are discarded.
        cutoff: f32,
    },
    /// Full alpha blending.
    Blend,
}

impl AlphaMode {
    /// Alpha masking with the conventional 0.5 cutoff.
    pub const fn mask() -> Self {
        Self::Mask { cutoff: 0.5 }
    }

    /// Cutoff for masked materials, 0 otherwise.
    pub fn cutoff(&self) -> f32 {
        match self {
            Self::Mask { cutoff } => *cutoff,
            _ => 0.0,
        }
    }
}

/// Texture filtering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    Nearest,
    #[default]
    Linear,
}

/// Texture coordinate wrapping outside `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressMode {
    ClampToEdge,
    #[default]
    Repeat,
    MirrorRepeat,
}

/// How a material samples one texture.
///
/// Defaults to linear filtering with repeat wrapping, which is what glTF
/// prescribes for textures without an explicit sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextureSampler {
    pub mag_filter: FilterMode,
    pub min_filter: FilterMode,
    pub mipmap_filter: FilterMode,
    pub address_mode_u: AddressMode,
    pub address_mode_v: AddressMode,
}

impl TextureSampler {
    pub fn with_filter(mut self, filter: FilterMode) -> Self {
        self.mag_filter = filter;
        self.min_filter = filter;
        self.mipmap_filter = filter;
        self
    }

    pub fn with_address_mode(mut self, u: AddressMode, v: AddressMode) -> Self {
        self.address_mode_u = u;
        self.address_mode_v = v;
        self
    }
}

/// A material's reference to one model texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterialTexture {
    /// Index into [`crate::model::Model::textures`].
    pub texture: usize,
    /// UV set used to sample the texture.
    pub uv_set: u32,
    pub sampler: TextureSampler,
}

/// A material as seen by the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: Option<String>,
    pub alpha_mode: AlphaMode,
    pub double_sided: bool,
    pub base_color_factor: [f32; 4],
    pub emissive_factor: [f32; 3],
    pub metallic_factor: f32,
    pub roughness_factor: f32,
    /// One entry per layout texture slot.
    pub textures: Vec<Option<MaterialTexture>>,
}

impl Material {
    /// White, opaque, untextured material with `slot_count` empty slots.
    pub fn new(slot_count: usize) -> Self {
        Self {
            name: None,
            alpha_mode: AlphaMode::Opaque,
            double_sided: false,
            base_color_factor: [1.0; 4],
            emissive_factor: [0.0; 3],
            metallic_factor: 1.0,
            roughness_factor: 1.0,
            textures: vec![None; slot_count],
        }
    }

    /// Texture bound to a layout slot.
    pub fn texture(&self, slot: usize) -> Option<MaterialTexture> {
        self.textures.get(slot).copied().flatten()
    }
}

/// A texture owned by a model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelTexture {
    /// Content identity used to share GPU storage between models.
    pub cache_key: String,
    pub image: CpuTexture,
    /// Alpha-test threshold to preserve when generating mips; 0 disables
    /// alpha remapping.
    pub alpha_cutoff: f32,
}

/// Fold one more base-color user into a texture's alpha cutoff hint.
///
/// Masked users keep the smallest cutoff; any user that is not masked
/// disables remapping for the texture.
pub(crate) fn merge_alpha_cutoff(current: Option<f32>, mode: &AlphaMode) -> f32 {
    let cutoff = mode.cutoff();
    match current {
        None => cutoff,
        Some(prev) if prev == 0.0 || cutoff == 0.0 => 0.0,
        Some(prev) => prev.min(cutoff),
    }
}
