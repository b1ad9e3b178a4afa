//! In-memory source model.

use super::{
    AccessorError, AccessorId, AccessorView, SourceAnimation, SourceImage, SourceMaterial,
    SourceMesh, SourceModel, SourceNode, SourceScene, SourceSkin,
};
use crate::layout::ValueType;
use crate::model::Camera;

/// Accessor description over one of the asset's buffers.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceAccessor {
    pub buffer: usize,
    /// Offset of the first element.
    pub byte_offset: usize,
    /// Element stride; `None` for tightly packed elements.
    pub byte_stride: Option<usize>,
    pub component_type: ValueType,
    pub num_components: u32,
    pub count: usize,
    pub normalized: bool,
    pub min: Option<Vec<f32>>,
    pub max: Option<Vec<f32>>,
}

impl SourceAccessor {
    /// Tightly packed accessor starting at the beginning of `buffer`.
    pub fn new(
        buffer: usize,
        component_type: ValueType,
        num_components: u32,
        count: usize,
    ) -> Self {
        Self {
            buffer,
            byte_offset: 0,
            byte_stride: None,
            component_type,
            num_components,
            count,
            normalized: false,
            min: None,
            max: None,
        }
    }

    fn element_size(&self) -> usize {
        self.component_type.size() * self.num_components as usize
    }
}

/// A fully in-memory scene-graph asset.
#[derive(Debug, Clone, Default)]
pub struct SourceAsset {
    pub identity: String,
    pub buffers: Vec<Vec<u8>>,
    pub accessors: Vec<SourceAccessor>,
    pub scenes: Vec<SourceScene>,
    pub default_scene: Option<usize>,
    pub nodes: Vec<SourceNode>,
    pub meshes: Vec<SourceMesh>,
    pub skins: Vec<SourceSkin>,
    pub animations: Vec<SourceAnimation>,
    pub materials: Vec<SourceMaterial>,
    pub images: Vec<SourceImage>,
    pub cameras: Vec<Camera>,
}

impl SourceAsset {
    /// Create an empty asset.
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            ..Default::default()
        }
    }

    /// Append a raw buffer and return its index.
    pub fn push_buffer(&mut self, bytes: Vec<u8>) -> usize {
        self.buffers.push(bytes);
        self.buffers.len() - 1
    }

    /// Append an accessor and return its id.
    pub fn push_accessor(&mut self, accessor: SourceAccessor) -> AccessorId {
        self.accessors.push(accessor);
        self.accessors.len() - 1
    }

    /// Store tightly packed floats in a new buffer and return an accessor
    /// over them.
    pub fn push_floats(&mut self, values: &[f32], num_components: u32) -> AccessorId {
        let bytes = bytemuck::cast_slice(values).to_vec();
        let buffer = self.push_buffer(bytes);
        let count = values.len() / num_components as usize;
        self.push_accessor(SourceAccessor::new(
            buffer,
            ValueType::Float32,
            num_components,
            count,
        ))
    }

    /// Store `u8` indices in a new buffer.
    pub fn push_indices_u8(&mut self, indices: &[u8]) -> AccessorId {
        let buffer = self.push_buffer(indices.to_vec());
        self.push_accessor(SourceAccessor::new(buffer, ValueType::Uint8, 1, indices.len()))
    }

    /// Store `u16` indices in a new buffer.
    pub fn push_indices_u16(&mut self, indices: &[u16]) -> AccessorId {
        let buffer = self.push_buffer(bytemuck::cast_slice(indices).to_vec());
        self.push_accessor(SourceAccessor::new(buffer, ValueType::Uint16, 1, indices.len()))
    }

    /// Store `u32` indices in a new buffer.
    pub fn push_indices_u32(&mut self, indices: &[u32]) -> AccessorId {
        let buffer = self.push_buffer(bytemuck::cast_slice(indices).to_vec());
        self.push_accessor(SourceAccessor::new(buffer, ValueType::Uint32, 1, indices.len()))
    }
}

impl SourceModel for SourceAsset {
    fn identity(&self) -> &str {
        &self.identity
    }

    fn scenes(&self) -> &[SourceScene] {
        &self.scenes
    }

    fn default_scene(&self) -> Option<usize> {
        self.default_scene
    }

    fn nodes(&self) -> &[SourceNode] {
        &self.nodes
    }

    fn meshes(&self) -> &[SourceMesh] {
        &self.meshes
    }

    fn accessor(&self, id: AccessorId) -> Result<AccessorView<'_>, AccessorError> {
        let accessor = self.accessors.get(id).ok_or(AccessorError::NotFound(id))?;
        let buffer = self
            .buffers
            .get(accessor.buffer)
            .ok_or(AccessorError::MissingBuffer {
                accessor: id,
                buffer: accessor.buffer,
            })?;

        let element_size = accessor.element_size();
        let stride = accessor.byte_stride.unwrap_or(element_size).max(1);
        let required = if accessor.count == 0 {
            accessor.byte_offset
        } else {
            accessor.byte_offset + (accessor.count - 1) * stride + element_size
        };
        if required > buffer.len() {
            return Err(AccessorError::OutOfBounds {
                accessor: id,
                required,
                available: buffer.len(),
            });
        }

        Ok(AccessorView {
            data: &buffer[accessor.byte_offset..],
            component_type: accessor.component_type,
            num_components: accessor.num_components,
            stride,
            count: accessor.count,
            normalized: accessor.normalized,
            min: accessor.min.as_deref(),
            max: accessor.max.as_deref(),
        })
    }

    fn skins(&self) -> &[SourceSkin] {
        &self.skins
    }

    fn animations(&self) -> &[SourceAnimation] {
        &self.animations
    }

    fn materials(&self) -> &[SourceMaterial] {
        &self.materials
    }

    fn images(&self) -> &[SourceImage] {
        &self.images
    }

    fn cameras(&self) -> &[Camera] {
        &self.cameras
    }
}
