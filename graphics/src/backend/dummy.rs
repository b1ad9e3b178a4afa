//! Dummy GPU backend for testing and development.
//!
//! This backend doesn't touch the GPU. Buffer and texture contents live in
//! host memory so tests can read back what was uploaded.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::GraphicsError;
use crate::resources::{Buffer, Texture};
use crate::types::{
    BufferDescriptor, ResourceState, StateTransition, TextureDescriptor, TextureRegion,
};

use super::{DeviceContext, GpuDevice};

#[derive(Debug, Default)]
struct Storage {
    memory: HashMap<u64, Vec<u8>>,
    allocated: u64,
}

/// Host-memory device.
#[derive(Debug, Clone, Default)]
pub struct DummyDevice {
    storage: Arc<Mutex<Storage>>,
    memory_limit: Option<u64>,
}

impl DummyDevice {
    /// Create a new dummy device without a memory limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail creation with [`GraphicsError::OutOfMemory`] once more than
    /// `limit` bytes would be allocated.
    pub fn with_memory_limit(mut self, limit: u64) -> Self {
        self.memory_limit = Some(limit);
        self
    }

    /// Get the backend name.
    pub fn name(&self) -> &'static str {
        "Dummy Backend"
    }

    /// Create a context writing into this device's memory.
    pub fn create_context(&self) -> DummyContext {
        DummyContext {
            storage: self.storage.clone(),
            states: HashMap::new(),
            transition_batches: 0,
            copy_count: 0,
        }
    }

    /// Bytes currently allocated by live and dropped resources.
    pub fn allocated_bytes(&self) -> u64 {
        self.storage.lock().allocated
    }

    /// Contents of a buffer.
    pub fn read_buffer(&self, buffer: &Buffer) -> Option<Vec<u8>> {
        self.storage.lock().memory.get(&buffer.id()).cloned()
    }

    /// Contents of one array layer of a texture.
    pub fn read_texture(&self, texture: &Texture, layer: u32) -> Option<Vec<u8>> {
        let layer_size = texture.descriptor().layer_size() as usize;
        let start = layer as usize * layer_size;
        let storage = self.storage.lock();
        let memory = storage.memory.get(&texture.id())?;
        memory.get(start..start + layer_size).map(<[u8]>::to_vec)
    }

    fn allocate(&self, id: u64, size: u64, data: Option<&[u8]>) -> Result<(), GraphicsError> {
        let mut storage = self.storage.lock();
        if let Some(limit) = self.memory_limit {
            if storage.allocated + size > limit {
                log::warn!(
                    "DummyDevice: allocation of {} bytes exceeds limit {} ({} in use)",
                    size,
                    limit,
                    storage.allocated
                );
                return Err(GraphicsError::OutOfMemory);
            }
        }
        let mut memory = vec![0u8; size as usize];
        if let Some(data) = data {
            if data.len() > memory.len() {
                return Err(GraphicsError::InvalidParameter(format!(
                    "initial data of {} bytes exceeds resource size {}",
                    data.len(),
                    size
                )));
            }
            memory[..data.len()].copy_from_slice(data);
        }
        storage.allocated += size;
        storage.memory.insert(id, memory);
        Ok(())
    }
}

impl GpuDevice for DummyDevice {
    fn create_buffer(
        &self,
        descriptor: &BufferDescriptor,
        data: Option<&[u8]>,
    ) -> Result<Arc<Buffer>, GraphicsError> {
        log::trace!(
            "DummyDevice: creating buffer {:?} (size: {})",
            descriptor.label,
            descriptor.size
        );
        if descriptor.size == 0 {
            return Err(GraphicsError::InvalidParameter(
                "buffer size must be non-zero".into(),
            ));
        }
        let buffer = Buffer::new(descriptor.clone());
        self.allocate(buffer.id(), descriptor.size, data)?;
        Ok(Arc::new(buffer))
    }

    fn create_texture(
        &self,
        descriptor: &TextureDescriptor,
        data: Option<&[u8]>,
    ) -> Result<Arc<Texture>, GraphicsError> {
        log::trace!(
            "DummyDevice: creating texture {:?} ({}x{}x{})",
            descriptor.label,
            descriptor.width,
            descriptor.height,
            descriptor.array_layers
        );
        if descriptor.width == 0 || descriptor.height == 0 || descriptor.array_layers == 0 {
            return Err(GraphicsError::InvalidParameter(
                "texture dimensions must be non-zero".into(),
            ));
        }
        let texture = Texture::new(descriptor.clone());
        let size = descriptor.layer_size() * descriptor.array_layers as u64;
        self.allocate(texture.id(), size, data)?;
        Ok(Arc::new(texture))
    }
}

/// Command context of a [`DummyDevice`].
#[derive(Debug)]
pub struct DummyContext {
    storage: Arc<Mutex<Storage>>,
    states: HashMap<u64, ResourceState>,
    transition_batches: usize,
    copy_count: usize,
}

impl DummyContext {
    /// Last state a resource was transitioned to.
    pub fn resource_state(&self, id: u64) -> Option<ResourceState> {
        self.states.get(&id).copied()
    }

    /// Number of `transition_resource_states` calls with a non-empty batch.
    pub fn transition_batches(&self) -> usize {
        self.transition_batches
    }

    /// Number of buffer and texture copies recorded.
    pub fn copy_count(&self) -> usize {
        self.copy_count
    }
}

fn out_of_range(operation: &'static str, resource: u64) -> GraphicsError {
    GraphicsError::OutOfBounds {
        resource,
        operation,
    }
}

impl DeviceContext for DummyContext {
    fn update_buffer(
        &mut self,
        buffer: &Buffer,
        offset: u64,
        data: &[u8],
    ) -> Result<(), GraphicsError> {
        let mut storage = self.storage.lock();
        let memory = storage
            .memory
            .get_mut(&buffer.id())
            .ok_or(GraphicsError::UnknownResource(buffer.id()))?;
        let start = offset as usize;
        let dst = memory
            .get_mut(start..start + data.len())
            .ok_or_else(|| out_of_range("buffer update", buffer.id()))?;
        dst.copy_from_slice(data);
        Ok(())
    }

    fn copy_buffer(
        &mut self,
        src: &Buffer,
        src_offset: u64,
        dst: &Buffer,
        dst_offset: u64,
        size: u64,
    ) -> Result<(), GraphicsError> {
        let mut storage = self.storage.lock();
        let (src_start, dst_start, size) =
            (src_offset as usize, dst_offset as usize, size as usize);
        let bytes = storage
            .memory
            .get(&src.id())
            .ok_or(GraphicsError::UnknownResource(src.id()))?
            .get(src_start..src_start + size)
            .ok_or_else(|| out_of_range("copy source", src.id()))?
            .to_vec();
        storage
            .memory
            .get_mut(&dst.id())
            .ok_or(GraphicsError::UnknownResource(dst.id()))?
            .get_mut(dst_start..dst_start + size)
            .ok_or_else(|| out_of_range("copy destination", dst.id()))?
            .copy_from_slice(&bytes);
        self.copy_count += 1;
        Ok(())
    }

    fn update_texture(
        &mut self,
        texture: &Texture,
        layer: u32,
        region: TextureRegion,
        data: &[u8],
    ) -> Result<(), GraphicsError> {
        if layer >= texture.array_layers() || !region.fits(texture.width(), texture.height()) {
            return Err(out_of_range("texture update", texture.id()));
        }
        let texel = texture.format().block_size() as usize;
        let row = region.width as usize * texel;
        if data.len() < row * region.height as usize {
            return Err(GraphicsError::InvalidParameter(format!(
                "texture update needs {} bytes, got {}",
                row * region.height as usize,
                data.len()
            )));
        }

        let pitch = texture.width() as usize * texel;
        let layer_start = layer as usize * texture.descriptor().layer_size() as usize;
        let mut storage = self.storage.lock();
        let memory = storage
            .memory
            .get_mut(&texture.id())
            .ok_or(GraphicsError::UnknownResource(texture.id()))?;
        for y in 0..region.height as usize {
            let dst = layer_start + (region.y as usize + y) * pitch + region.x as usize * texel;
            memory[dst..dst + row].copy_from_slice(&data[y * row..(y + 1) * row]);
        }
        Ok(())
    }

    fn copy_texture(
        &mut self,
        src: &Texture,
        dst: &Texture,
        layer: u32,
    ) -> Result<(), GraphicsError> {
        if src.width() != dst.width()
            || src.height() != dst.height()
            || src.format() != dst.format()
        {
            return Err(GraphicsError::InvalidParameter(
                "texture copy between mismatched textures".into(),
            ));
        }
        if layer >= src.array_layers() || layer >= dst.array_layers() {
            return Err(out_of_range("texture copy", dst.id()));
        }
        let layer_size = src.descriptor().layer_size() as usize;
        let start = layer as usize * layer_size;
        let mut storage = self.storage.lock();
        let bytes = storage
            .memory
            .get(&src.id())
            .ok_or(GraphicsError::UnknownResource(src.id()))?[start..start + layer_size]
            .to_vec();
        storage
            .memory
            .get_mut(&dst.id())
            .ok_or(GraphicsError::UnknownResource(dst.id()))?[start..start + layer_size]
            .copy_from_slice(&bytes);
        self.copy_count += 1;
        Ok(())
    }

    fn transition_resource_states(&mut self, transitions: &[StateTransition]) {
        if transitions.is_empty() {
            return;
        }
        log::trace!("DummyContext: {} resource transitions", transitions.len());
        for transition in transitions {
            self.states
                .insert(transition.resource.id(), transition.new_state);
        }
        self.transition_batches += 1;
    }
}
