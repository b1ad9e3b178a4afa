//! Shared vertex storage for one vertex layout.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::allocator::{Allocation, VariableSizeAllocator};
use crate::backend::GpuDevice;
use crate::error::GraphicsError;
use crate::resources::Buffer;
use crate::types::{BufferDescriptor, BufferMode, BufferUsage};

use super::VertexLayoutKey;

/// Template for creating a [`VertexPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexPoolDesc {
    /// Capacity in vertices.
    pub capacity: u32,
    /// Extra usage added to every element's usage.
    pub usage: BufferUsage,
    pub mode: BufferMode,
}

impl Default for VertexPoolDesc {
    fn default() -> Self {
        Self {
            capacity: 64 * 1024,
            usage: BufferUsage::COPY_DST,
            mode: BufferMode::Undefined,
        }
    }
}

impl VertexPoolDesc {
    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity;
        self
    }
}

/// One buffer per layout element, sub-allocated in vertex units.
///
/// Allocation is thread-safe. Buffers are created by
/// [`VertexPool::update_buffers`], after which the pool's version changes.
pub struct VertexPool {
    key: VertexLayoutKey,
    desc: VertexPoolDesc,
    allocator: Mutex<VariableSizeAllocator>,
    buffers: Mutex<Vec<Option<Arc<Buffer>>>>,
    version: AtomicU32,
}

impl VertexPool {
    pub fn new(key: VertexLayoutKey, desc: VertexPoolDesc) -> Self {
        log::debug!(
            "Creating vertex pool for {:?} with {} vertices",
            key,
            desc.capacity
        );
        let buffers = vec![None; key.elements.len()];
        Self {
            key,
            desc,
            allocator: Mutex::new(VariableSizeAllocator::new(desc.capacity as u64)),
            buffers: Mutex::new(buffers),
            version: AtomicU32::new(0),
        }
    }

    pub fn key(&self) -> &VertexLayoutKey {
        &self.key
    }

    pub fn desc(&self) -> &VertexPoolDesc {
        &self.desc
    }

    /// Reserve `count` consecutive vertices.
    pub fn allocate(self: &Arc<Self>, count: u32) -> Option<Arc<VertexPoolAllocation>> {
        let range = self.allocator.lock().allocate(count as u64, 1)?;
        log::trace!(
            "Vertex pool allocation [{}, {})",
            range.offset,
            range.end()
        );
        Some(Arc::new(VertexPoolAllocation {
            pool: Arc::clone(self),
            range,
        }))
    }

    /// Vertices currently allocated.
    pub fn used_vertices(&self) -> u64 {
        self.allocator.lock().used_size()
    }

    /// GPU buffer of layout element `index`, once created.
    pub fn buffer(&self, index: usize) -> Option<Arc<Buffer>> {
        self.buffers.lock().get(index).cloned().flatten()
    }

    /// Create any missing GPU buffers.
    pub fn update_buffers(&self, device: &dyn GpuDevice) -> Result<(), GraphicsError> {
        let mut buffers = self.buffers.lock();
        let mut created = false;
        for (slot, element) in buffers.iter_mut().zip(&self.key.elements) {
            if slot.is_some() || element.size == 0 {
                continue;
            }
            let mut descriptor = BufferDescriptor::new(
                self.desc.capacity as u64 * element.size as u64,
                element.usage | self.desc.usage,
            )
            .with_label("vertex pool");
            descriptor.mode = self.desc.mode;
            descriptor.element_stride = element.size;
            *slot = Some(device.create_buffer(&descriptor, None)?);
            created = true;
        }
        if created {
            self.version.fetch_add(1, Ordering::AcqRel);
        }
        Ok(())
    }

    pub fn version(&self) -> u32 {
        self.version.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for VertexPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VertexPool")
            .field("key", &self.key)
            .field("capacity", &self.desc.capacity)
            .field("version", &self.version())
            .finish()
    }
}

/// A vertex range inside a [`VertexPool`]; freed on drop.
pub struct VertexPoolAllocation {
    pool: Arc<VertexPool>,
    range: Allocation,
}

impl VertexPoolAllocation {
    pub fn pool(&self) -> &Arc<VertexPool> {
        &self.pool
    }

    pub fn start_vertex(&self) -> u32 {
        self.range.offset as u32
    }

    pub fn vertex_count(&self) -> u32 {
        self.range.size as u32
    }
}

impl Drop for VertexPoolAllocation {
    fn drop(&mut self) {
        self.pool.allocator.lock().free(self.range);
    }
}

impl std::fmt::Debug for VertexPoolAllocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VertexPoolAllocation")
            .field("start_vertex", &self.start_vertex())
            .field("vertex_count", &self.vertex_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyDevice;

    fn key() -> VertexLayoutKey {
        VertexLayoutKey::from_strides(&[12, 8], BufferUsage::VERTEX)
    }

    #[test]
    fn test_allocation_frees_on_drop() {
        let pool = Arc::new(VertexPool::new(key(), VertexPoolDesc::default().with_capacity(10)));
        let a = pool.allocate(6).unwrap();
        assert!(pool.allocate(6).is_none());
        drop(a);
        assert_eq!(pool.allocate(10).unwrap().start_vertex(), 0);
        assert_eq!(pool.used_vertices(), 0);
    }

    #[test]
    fn test_update_buffers_creates_one_buffer_per_element() {
        let device = DummyDevice::new();
        let pool = VertexPool::new(key(), VertexPoolDesc::default().with_capacity(10));
        assert!(pool.buffer(0).is_none());
        pool.update_buffers(&device).unwrap();
        assert_eq!(pool.version(), 1);
        assert_eq!(pool.buffer(0).unwrap().size(), 120);
        assert_eq!(pool.buffer(1).unwrap().size(), 80);
        pool.update_buffers(&device).unwrap();
        assert_eq!(pool.version(), 1);
    }
}
