//! Destination layout descriptors for packed model data.
//!
//! A [`ModelLayout`] describes where every converted vertex attribute lands:
//! which destination buffer, which component type and count, and at which
//! byte offset inside the buffer's element. It also lists the texture slots a
//! material exposes to the renderer.
//!
//! # Buffer Slots
//!
//! Attributes reference a destination buffer by `buffer_id`. Each buffer has
//! a fixed element stride derived from its attributes, so skinning data can
//! live in a buffer of its own while static attributes share another.
//!
//! # Example
//!
//! ```ignore
//! let layout = ModelLayout::new()
//!     .with_attribute(VertexAttribute::new(semantics::POSITION, 0, ValueType::Float32, 3))
//!     .with_attribute(VertexAttribute::new(semantics::NORMAL, 0, ValueType::Float32, 3))
//!     .with_attribute(
//!         VertexAttribute::new(semantics::COLOR_0, 1, ValueType::Uint8, 4)
//!             .normalized()
//!             .with_default([1.0, 1.0, 1.0, 1.0]),
//!     );
//!
//! let info = layout.resolve()?;
//! assert_eq!(info.strides, vec![24, 4]);
//! ```

use std::collections::HashSet;
use std::fmt;

/// Well-known vertex attribute names.
pub mod semantics {
    pub const POSITION: &str = "POSITION";
    pub const NORMAL: &str = "NORMAL";
    pub const TANGENT: &str = "TANGENT";
    pub const TEXCOORD_0: &str = "TEXCOORD_0";
    pub const TEXCOORD_1: &str = "TEXCOORD_1";
    pub const COLOR_0: &str = "COLOR_0";
    pub const JOINTS_0: &str = "JOINTS_0";
    pub const WEIGHTS_0: &str = "WEIGHTS_0";
}

/// Well-known material texture slot names.
pub mod texture_slots {
    pub const BASE_COLOR: &str = "baseColorTexture";
    pub const METALLIC_ROUGHNESS: &str = "metallicRoughnessTexture";
    pub const NORMAL: &str = "normalTexture";
    pub const OCCLUSION: &str = "occlusionTexture";
    pub const EMISSIVE: &str = "emissiveTexture";
}

/// Numeric type of a single attribute component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    /// Half float. Valid in GPU layouts, but the conversion engine cannot
    /// produce or consume it.
    Float16,
    Float32,
}

impl ValueType {
    /// Size of one component in bytes.
    pub const fn size(self) -> usize {
        match self {
            Self::Int8 | Self::Uint8 => 1,
            Self::Int16 | Self::Uint16 | Self::Float16 => 2,
            Self::Int32 | Self::Uint32 | Self::Float32 => 4,
        }
    }

    /// Whether the conversion engine can read and write this type.
    pub const fn is_convertible(self) -> bool {
        !matches!(self, Self::Float16)
    }

    /// Whether this is an integer type.
    pub const fn is_integer(self) -> bool {
        !matches!(self, Self::Float16 | Self::Float32)
    }
}

/// Width of packed destination indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndexFormat {
    /// 16-bit unsigned integers.
    Uint16,
    /// 32-bit unsigned integers.
    #[default]
    Uint32,
}

impl IndexFormat {
    /// Get the size of one index in bytes.
    pub const fn size(self) -> usize {
        match self {
            Self::Uint16 => 2,
            Self::Uint32 => 4,
        }
    }

    /// The component type used to write indices of this width.
    pub const fn value_type(self) -> ValueType {
        match self {
            Self::Uint16 => ValueType::Uint16,
            Self::Uint32 => ValueType::Uint32,
        }
    }
}

/// A destination vertex attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexAttribute {
    /// Source attribute name this attribute is filled from.
    pub name: String,
    /// Destination buffer index.
    pub buffer_id: usize,
    /// Destination component type.
    pub value_type: ValueType,
    /// Destination component count (1..=4).
    pub num_components: u32,
    /// Byte offset within the element. `None` packs the attribute right
    /// after the previous attribute of the same buffer.
    pub relative_offset: Option<u32>,
    /// Integer components on either side of the conversion hold normalized
    /// fixed-point values.
    pub normalized: bool,
    /// Value stamped across the range when a primitive lacks this attribute.
    pub default_value: Option<[f32; 4]>,
}

impl VertexAttribute {
    /// Create an attribute with an automatically computed offset.
    pub fn new(
        name: impl Into<String>,
        buffer_id: usize,
        value_type: ValueType,
        num_components: u32,
    ) -> Self {
        Self {
            name: name.into(),
            buffer_id,
            value_type,
            num_components,
            relative_offset: None,
            normalized: false,
            default_value: None,
        }
    }

    /// Place the attribute at an explicit byte offset.
    pub fn with_offset(mut self, offset: u32) -> Self {
        self.relative_offset = Some(offset);
        self
    }

    /// Mark integer data as normalized.
    pub fn normalized(mut self) -> Self {
        self.normalized = true;
        self
    }

    /// Set the value written when a primitive lacks this attribute.
    pub fn with_default(mut self, value: [f32; 4]) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Size of the attribute in bytes.
    pub fn size(&self) -> u32 {
        self.value_type.size() as u32 * self.num_components
    }
}

/// A material texture slot exposed by the layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureAttribute {
    /// Source material texture name (see [`texture_slots`]).
    pub name: String,
    /// Index of the slot in [`crate::model::Material::textures`].
    pub index: usize,
}

impl TextureAttribute {
    pub fn new(name: impl Into<String>, index: usize) -> Self {
        Self {
            name: name.into(),
            index,
        }
    }
}

/// Errors detected while resolving a layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    /// The layout has no vertex attributes.
    Empty,
    /// An attribute starts inside the previous attribute of its buffer.
    OverlappingAttribute {
        name: String,
        offset: u32,
        previous_end: u32,
    },
    /// Component count outside 1..=4.
    InvalidComponentCount { name: String, count: u32 },
    /// The destination type cannot be written by the conversion engine.
    UnsupportedValueType { name: String, value_type: ValueType },
    /// Two attributes share the same name.
    DuplicateAttribute(String),
    /// Two texture attributes claim the same slot index.
    DuplicateTextureSlot(usize),
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "layout has no vertex attributes"),
            Self::OverlappingAttribute {
                name,
                offset,
                previous_end,
            } => write!(
                f,
                "attribute '{name}' at offset {offset} overlaps the previous attribute ending at {previous_end}"
            ),
            Self::InvalidComponentCount { name, count } => {
                write!(f, "attribute '{name}' has {count} components (expected 1-4)")
            }
            Self::UnsupportedValueType { name, value_type } => {
                write!(f, "attribute '{name}' uses unsupported type {value_type:?}")
            }
            Self::DuplicateAttribute(name) => write!(f, "attribute '{name}' is declared twice"),
            Self::DuplicateTextureSlot(index) => {
                write!(f, "texture slot {index} is declared twice")
            }
        }
    }
}

impl std::error::Error for LayoutError {}

/// Offsets and strides computed from a [`ModelLayout`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutInfo {
    /// Byte offset of each attribute, in declaration order.
    pub offsets: Vec<u32>,
    /// Element stride of each destination buffer. Buffers without
    /// attributes have stride 0.
    pub strides: Vec<u32>,
}

impl LayoutInfo {
    /// Number of destination buffers.
    pub fn buffer_count(&self) -> usize {
        self.strides.len()
    }

    /// First buffer with a non-zero stride.
    pub fn primary_buffer(&self) -> Option<usize> {
        self.strides.iter().position(|&s| s > 0)
    }
}

/// Destination layout for a built model.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModelLayout {
    pub attributes: Vec<VertexAttribute>,
    pub textures: Vec<TextureAttribute>,
}

impl ModelLayout {
    /// Create an empty layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a vertex attribute.
    pub fn with_attribute(mut self, attribute: VertexAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Add a texture slot.
    pub fn with_texture(mut self, texture: TextureAttribute) -> Self {
        self.textures.push(texture);
        self
    }

    /// Position, normal and two UV sets in buffer 0; joints and weights in
    /// buffer 1.
    pub fn standard() -> Self {
        use semantics::*;
        Self::new()
            .with_attribute(VertexAttribute::new(POSITION, 0, ValueType::Float32, 3))
            .with_attribute(VertexAttribute::new(NORMAL, 0, ValueType::Float32, 3))
            .with_attribute(VertexAttribute::new(TEXCOORD_0, 0, ValueType::Float32, 2))
            .with_attribute(VertexAttribute::new(TEXCOORD_1, 0, ValueType::Float32, 2))
            .with_attribute(VertexAttribute::new(JOINTS_0, 1, ValueType::Float32, 4))
            .with_attribute(VertexAttribute::new(WEIGHTS_0, 1, ValueType::Float32, 4))
            .with_standard_textures()
    }

    /// Position and normal only, in a single buffer.
    pub fn position_normal() -> Self {
        Self::new()
            .with_attribute(VertexAttribute::new(
                semantics::POSITION,
                0,
                ValueType::Float32,
                3,
            ))
            .with_attribute(VertexAttribute::new(
                semantics::NORMAL,
                0,
                ValueType::Float32,
                3,
            ))
    }

    /// Add the five PBR texture slots in their conventional order.
    pub fn with_standard_textures(self) -> Self {
        use texture_slots::*;
        self.with_texture(TextureAttribute::new(BASE_COLOR, 0))
            .with_texture(TextureAttribute::new(METALLIC_ROUGHNESS, 1))
            .with_texture(TextureAttribute::new(NORMAL, 2))
            .with_texture(TextureAttribute::new(OCCLUSION, 3))
            .with_texture(TextureAttribute::new(EMISSIVE, 4))
    }

    /// Find an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&VertexAttribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Number of texture slots a material carries for this layout.
    pub fn texture_slot_count(&self) -> usize {
        self.textures.iter().map(|t| t.index + 1).max().unwrap_or(0)
    }

    /// Compute attribute offsets and buffer strides.
    ///
    /// Attributes without an explicit offset are packed contiguously after
    /// the previous attribute of the same buffer, in declaration order. An
    /// explicit offset must not start before the end of that attribute.
    pub fn resolve(&self) -> Result<LayoutInfo, LayoutError> {
        if self.attributes.is_empty() {
            return Err(LayoutError::Empty);
        }

        let buffer_count = self
            .attributes
            .iter()
            .map(|a| a.buffer_id + 1)
            .max()
            .unwrap_or(0);

        let mut names = HashSet::new();
        let mut strides = vec![0u32; buffer_count];
        let mut offsets = Vec::with_capacity(self.attributes.len());

        for attribute in &self.attributes {
            if !names.insert(attribute.name.as_str()) {
                return Err(LayoutError::DuplicateAttribute(attribute.name.clone()));
            }
            if !(1..=4).contains(&attribute.num_components) {
                return Err(LayoutError::InvalidComponentCount {
                    name: attribute.name.clone(),
                    count: attribute.num_components,
                });
            }
            if !attribute.value_type.is_convertible() {
                return Err(LayoutError::UnsupportedValueType {
                    name: attribute.name.clone(),
                    value_type: attribute.value_type,
                });
            }

            let stride = &mut strides[attribute.buffer_id];
            let offset = match attribute.relative_offset {
                None => *stride,
                Some(offset) if offset < *stride => {
                    return Err(LayoutError::OverlappingAttribute {
                        name: attribute.name.clone(),
                        offset,
                        previous_end: *stride,
                    });
                }
                Some(offset) => offset,
            };
            *stride = offset + attribute.size();
            offsets.push(offset);
        }

        let mut slots = HashSet::new();
        for texture in &self.textures {
            if !slots.insert(texture.index) {
                return Err(LayoutError::DuplicateTextureSlot(texture.index));
            }
        }

        Ok(LayoutInfo { offsets, strides })
    }
}
