//! GPU realization of built models.
//!
//! [`GpuModel::create`] places a [`Model`]'s packed vertex, index and texture
//! bytes either in pooled storage of a [`ResourceManager`] or in dedicated
//! resources. Dedicated resources receive their bytes at creation. Pooled
//! bytes are kept as pending uploads until [`GpuModel::prepare_gpu_resources`]
//! writes them, which also moves every resource into its usage state.

use std::collections::HashSet;
use std::sync::Arc;

use assetforge_core::layout::IndexFormat;
use assetforge_core::model::Model;

use crate::backend::{DeviceContext, GpuDevice};
use crate::error::GraphicsError;
use crate::pool::{
    BufferSuballocation, ResourceManager, TextureAtlasAllocation, VertexLayoutKey,
    VertexPoolAllocation,
};
use crate::resources::{Buffer, Texture};
use crate::types::{
    BufferDescriptor, BufferUsage, ResourceState, StateTransition, TextureDescriptor,
    TextureUsage,
};

/// Alignment of pooled index ranges in bytes.
const INDEX_ALIGNMENT: u64 = 4;

/// Usage flags of the resources a [`GpuModel`] creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuModelCreateInfo {
    pub vertex_usage: BufferUsage,
    pub index_usage: BufferUsage,
    pub texture_usage: TextureUsage,
}

impl Default for GpuModelCreateInfo {
    fn default() -> Self {
        Self {
            vertex_usage: BufferUsage::VERTEX | BufferUsage::COPY_DST,
            index_usage: BufferUsage::INDEX | BufferUsage::COPY_DST,
            texture_usage: TextureUsage::TEXTURE_BINDING | TextureUsage::COPY_DST,
        }
    }
}

enum VertexStorage {
    Empty,
    Pooled(Arc<VertexPoolAllocation>),
    Dedicated(Vec<Option<Arc<Buffer>>>),
}

enum IndexStorage {
    Empty,
    Pooled(Arc<BufferSuballocation>),
    Dedicated(Arc<Buffer>),
}

enum TextureStorage {
    Atlas(Arc<TextureAtlasAllocation>),
    Dedicated(Arc<Texture>),
}

#[derive(Default)]
struct PendingUploads {
    vertex: Vec<Vec<u8>>,
    index: Vec<u8>,
    /// `(texture index, pixels)`
    textures: Vec<(usize, Vec<u8>)>,
}

impl PendingUploads {
    fn is_empty(&self) -> bool {
        self.vertex.is_empty() && self.index.is_empty() && self.textures.is_empty()
    }
}

/// GPU storage of one built model.
pub struct GpuModel {
    strides: Vec<u32>,
    vertex: VertexStorage,
    index: IndexStorage,
    index_format: IndexFormat,
    textures: Vec<TextureStorage>,
    pending: PendingUploads,
    transitions_pending: bool,
}

impl GpuModel {
    /// Allocate storage for `model`.
    ///
    /// With a `manager`, vertices, indices and textures go to its pools;
    /// anything the pools cannot hold falls back to a dedicated resource.
    /// Without one, every resource is dedicated.
    pub fn create(
        model: &Model,
        device: &dyn GpuDevice,
        manager: Option<&ResourceManager>,
        info: &GpuModelCreateInfo,
    ) -> Result<Self, GraphicsError> {
        let mut pending = PendingUploads::default();
        let vertex_data = model.vertex_data();
        let index_data = model.index_data();

        let vertex_count = model.vertex_count() as u32;
        let vertex = if vertex_count == 0 {
            VertexStorage::Empty
        } else {
            let key = VertexLayoutKey::from_strides(&vertex_data.strides, info.vertex_usage);
            match manager.and_then(|m| m.allocate_vertices(&key, vertex_count)) {
                Some(allocation) => {
                    pending.vertex = vertex_data.buffers.clone();
                    VertexStorage::Pooled(allocation)
                }
                None => {
                    if manager.is_some() {
                        log::warn!(
                            "No vertex pool space for {} vertices; using dedicated buffers",
                            vertex_count
                        );
                    }
                    let buffers = vertex_data
                        .strides
                        .iter()
                        .zip(&vertex_data.buffers)
                        .map(|(&stride, bytes)| {
                            if stride == 0 || bytes.is_empty() {
                                return Ok(None);
                            }
                            let descriptor =
                                BufferDescriptor::new(bytes.len() as u64, info.vertex_usage)
                                    .with_mode_for_usage(stride)
                                    .with_label("model vertices");
                            device.create_buffer(&descriptor, Some(bytes.as_slice())).map(Some)
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    VertexStorage::Dedicated(buffers)
                }
            }
        };

        let index_size = index_data.data.len() as u64;
        let index = if index_size == 0 {
            IndexStorage::Empty
        } else {
            match manager.and_then(|m| m.allocate_indices(index_size, INDEX_ALIGNMENT)) {
                Some(allocation) => {
                    pending.index = index_data.data.clone();
                    IndexStorage::Pooled(allocation)
                }
                None => {
                    if manager.is_some() {
                        log::warn!(
                            "No index pool space for {} bytes; using a dedicated buffer",
                            index_size
                        );
                    }
                    let descriptor = BufferDescriptor::new(index_size, info.index_usage)
                        .with_label("model indices");
                    IndexStorage::Dedicated(
                        device.create_buffer(&descriptor, Some(index_data.data.as_slice()))?,
                    )
                }
            }
        };

        let mut textures = Vec::with_capacity(model.textures().len());
        for (i, texture) in model.textures().iter().enumerate() {
            let image = &texture.image;
            let pooled = manager.and_then(|m| {
                if let Some(cached) = m.find_texture_allocation(&texture.cache_key) {
                    log::trace!("Reusing atlas region for '{}'", texture.cache_key);
                    return Some(cached);
                }
                let allocation = m.allocate_texture_space(
                    image.format,
                    image.width,
                    image.height,
                    Some(&texture.cache_key),
                    None,
                )?;
                pending.textures.push((i, image.data.clone()));
                Some(allocation)
            });
            let storage = match pooled {
                Some(allocation) => TextureStorage::Atlas(allocation),
                None => {
                    if manager.is_some() {
                        log::warn!(
                            "No atlas space for texture '{}'; using a dedicated texture",
                            texture.cache_key
                        );
                    }
                    let descriptor = TextureDescriptor::new_2d(
                        image.width,
                        image.height,
                        image.format,
                        info.texture_usage,
                    )
                    .with_label(texture.cache_key.clone());
                    let texture =
                        device.create_texture(&descriptor, Some(image.data.as_slice()))?;
                    TextureStorage::Dedicated(texture)
                }
            };
            textures.push(storage);
        }

        log::debug!(
            "Created GPU model: {} vertices, {} index bytes, {} textures",
            vertex_count,
            index_size,
            textures.len()
        );

        Ok(Self {
            strides: vertex_data.strides.clone(),
            vertex,
            index,
            index_format: index_data.format,
            textures,
            pending,
            transitions_pending: true,
        })
    }

    /// Create pooled GPU objects, upload pending bytes and transition all
    /// resources to their usage states in one batch.
    ///
    /// Does nothing once everything has been uploaded.
    pub fn prepare_gpu_resources(
        &mut self,
        device: &dyn GpuDevice,
        ctx: &mut dyn DeviceContext,
    ) -> Result<(), GraphicsError> {
        if !self.transitions_pending && self.pending.is_empty() {
            return Ok(());
        }

        if let VertexStorage::Pooled(allocation) = &self.vertex {
            allocation.pool().update_buffers(device)?;
        }
        if let IndexStorage::Pooled(allocation) = &self.index {
            allocation.allocator().update_buffer(device)?;
        }
        for storage in &self.textures {
            if let TextureStorage::Atlas(allocation) = storage {
                allocation.atlas().update(device, ctx)?;
            }
        }

        let pending = std::mem::take(&mut self.pending);
        if let VertexStorage::Pooled(allocation) = &self.vertex {
            for (i, bytes) in pending.vertex.iter().enumerate() {
                if bytes.is_empty() {
                    continue;
                }
                let buffer = allocation.pool().buffer(i).ok_or_else(|| {
                    GraphicsError::ResourceCreationFailed(format!("vertex pool buffer {i}"))
                })?;
                let offset = allocation.start_vertex() as u64 * self.strides[i] as u64;
                ctx.update_buffer(&buffer, offset, bytes)?;
            }
        }
        if let IndexStorage::Pooled(allocation) = &self.index {
            if !pending.index.is_empty() {
                let buffer = allocation.allocator().buffer().ok_or_else(|| {
                    GraphicsError::ResourceCreationFailed("index pool buffer".into())
                })?;
                ctx.update_buffer(&buffer, allocation.offset(), &pending.index)?;
            }
        }
        for (i, pixels) in &pending.textures {
            if let Some(TextureStorage::Atlas(allocation)) = self.textures.get(*i) {
                let texture = allocation.atlas().texture().ok_or_else(|| {
                    GraphicsError::ResourceCreationFailed("atlas texture".into())
                })?;
                ctx.update_texture(
                    &texture,
                    allocation.slice(),
                    allocation.upload_region(),
                    pixels,
                )?;
            }
        }

        ctx.transition_resource_states(&self.transitions());
        self.transitions_pending = false;
        Ok(())
    }

    fn transitions(&self) -> Vec<StateTransition> {
        let mut seen = HashSet::new();
        let mut transitions = Vec::new();
        for buffer in (0..self.strides.len()).filter_map(|i| self.vertex_buffer(i)) {
            if seen.insert(buffer.id()) {
                transitions.push(StateTransition::buffer(buffer, ResourceState::VERTEX_BUFFER));
            }
        }
        if let Some(buffer) = self.index_buffer() {
            if seen.insert(buffer.id()) {
                transitions.push(StateTransition::buffer(buffer, ResourceState::INDEX_BUFFER));
            }
        }
        for texture in (0..self.textures.len()).filter_map(|i| self.texture(i)) {
            if seen.insert(texture.id()) {
                transitions.push(StateTransition::texture(
                    texture,
                    ResourceState::SHADER_RESOURCE,
                ));
            }
        }
        transitions
    }

    /// True while pooled bytes are waiting for
    /// [`prepare_gpu_resources`](Self::prepare_gpu_resources).
    pub fn has_pending_uploads(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn is_vertex_pooled(&self) -> bool {
        matches!(self.vertex, VertexStorage::Pooled(_))
    }

    pub fn is_index_pooled(&self) -> bool {
        matches!(self.index, IndexStorage::Pooled(_))
    }

    /// Buffer holding destination vertex buffer `index`.
    pub fn vertex_buffer(&self, index: usize) -> Option<Arc<Buffer>> {
        match &self.vertex {
            VertexStorage::Empty => None,
            VertexStorage::Pooled(allocation) => allocation.pool().buffer(index),
            VertexStorage::Dedicated(buffers) => buffers.get(index).cloned().flatten(),
        }
    }

    pub fn index_buffer(&self) -> Option<Arc<Buffer>> {
        match &self.index {
            IndexStorage::Empty => None,
            IndexStorage::Pooled(allocation) => allocation.allocator().buffer(),
            IndexStorage::Dedicated(buffer) => Some(Arc::clone(buffer)),
        }
    }

    pub fn index_format(&self) -> IndexFormat {
        self.index_format
    }

    /// Added to every index at draw time.
    pub fn base_vertex(&self) -> u32 {
        match &self.vertex {
            VertexStorage::Pooled(allocation) => allocation.start_vertex(),
            _ => 0,
        }
    }

    /// Added to every primitive's first index at draw time.
    pub fn first_index(&self) -> u32 {
        match &self.index {
            IndexStorage::Pooled(allocation) => {
                (allocation.offset() / self.index_format.size() as u64) as u32
            }
            _ => 0,
        }
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Texture holding model texture `index`.
    pub fn texture(&self, index: usize) -> Option<Arc<Texture>> {
        match self.textures.get(index)? {
            TextureStorage::Atlas(allocation) => allocation.atlas().texture(),
            TextureStorage::Dedicated(texture) => Some(Arc::clone(texture)),
        }
    }

    /// Atlas allocation of model texture `index`, if it is pooled.
    pub fn texture_allocation(&self, index: usize) -> Option<&Arc<TextureAtlasAllocation>> {
        match self.textures.get(index)? {
            TextureStorage::Atlas(allocation) => Some(allocation),
            TextureStorage::Dedicated(_) => None,
        }
    }

    /// Array layer of model texture `index`.
    pub fn texture_slice(&self, index: usize) -> u32 {
        self.texture_allocation(index).map_or(0, |a| a.slice())
    }

    /// UV transform of model texture `index`; identity for dedicated
    /// textures.
    pub fn uv_scale_bias(&self, index: usize) -> [f32; 4] {
        self.texture_allocation(index)
            .map_or([1.0, 1.0, 0.0, 0.0], |a| a.uv_scale_bias())
    }
}

impl std::fmt::Debug for GpuModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuModel")
            .field("vertex_pooled", &self.is_vertex_pooled())
            .field("index_pooled", &self.is_index_pooled())
            .field("base_vertex", &self.base_vertex())
            .field("first_index", &self.first_index())
            .field("textures", &self.textures.len())
            .field("pending_uploads", &self.has_pending_uploads())
            .finish()
    }
}

static_assertions::assert_impl_all!(GpuModel: Send, Sync);
