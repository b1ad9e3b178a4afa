//! Sub-allocated index storage.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::allocator::{Allocation, VariableSizeAllocator};
use crate::backend::GpuDevice;
use crate::error::GraphicsError;
use crate::resources::Buffer;
use crate::types::{BufferDescriptor, BufferUsage};

/// Template for creating a [`BufferSuballocator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexAllocatorDesc {
    /// Size in bytes.
    pub size: u64,
    pub usage: BufferUsage,
}

impl Default for IndexAllocatorDesc {
    fn default() -> Self {
        Self {
            size: 4 << 20,
            usage: BufferUsage::INDEX | BufferUsage::COPY_DST,
        }
    }
}

/// A single buffer carved into byte ranges.
pub struct BufferSuballocator {
    desc: IndexAllocatorDesc,
    allocator: Mutex<VariableSizeAllocator>,
    buffer: Mutex<Option<Arc<Buffer>>>,
    version: AtomicU32,
}

impl BufferSuballocator {
    pub fn new(desc: IndexAllocatorDesc) -> Self {
        log::debug!("Creating index allocator of {} bytes", desc.size);
        Self {
            desc,
            allocator: Mutex::new(VariableSizeAllocator::new(desc.size)),
            buffer: Mutex::new(None),
            version: AtomicU32::new(0),
        }
    }

    pub fn desc(&self) -> &IndexAllocatorDesc {
        &self.desc
    }

    pub fn allocate(
        self: &Arc<Self>,
        size: u64,
        alignment: u64,
    ) -> Option<Arc<BufferSuballocation>> {
        let range = self.allocator.lock().allocate(size, alignment)?;
        Some(Arc::new(BufferSuballocation {
            allocator: Arc::clone(self),
            range,
        }))
    }

    pub fn used_size(&self) -> u64 {
        self.allocator.lock().used_size()
    }

    pub fn buffer(&self) -> Option<Arc<Buffer>> {
        self.buffer.lock().clone()
    }

    /// Create the GPU buffer if it does not exist yet.
    pub fn update_buffer(&self, device: &dyn GpuDevice) -> Result<(), GraphicsError> {
        let mut buffer = self.buffer.lock();
        if buffer.is_none() {
            let descriptor =
                BufferDescriptor::new(self.desc.size, self.desc.usage).with_label("index pool");
            *buffer = Some(device.create_buffer(&descriptor, None)?);
            self.version.fetch_add(1, Ordering::AcqRel);
        }
        Ok(())
    }

    pub fn version(&self) -> u32 {
        self.version.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for BufferSuballocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferSuballocator")
            .field("size", &self.desc.size)
            .field("version", &self.version())
            .finish()
    }
}

/// A byte range inside a [`BufferSuballocator`]; freed on drop.
pub struct BufferSuballocation {
    allocator: Arc<BufferSuballocator>,
    range: Allocation,
}

impl BufferSuballocation {
    pub fn allocator(&self) -> &Arc<BufferSuballocator> {
        &self.allocator
    }

    pub fn offset(&self) -> u64 {
        self.range.offset
    }

    pub fn size(&self) -> u64 {
        self.range.size
    }
}

impl Drop for BufferSuballocation {
    fn drop(&mut self) {
        self.allocator.allocator.lock().free(self.range);
    }
}

impl std::fmt::Debug for BufferSuballocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferSuballocation")
            .field("offset", &self.range.offset)
            .field("size", &self.range.size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aligned_suballocations() {
        let allocator = Arc::new(BufferSuballocator::new(IndexAllocatorDesc {
            size: 64,
            ..Default::default()
        }));
        let a = allocator.allocate(6, 4).unwrap();
        let b = allocator.allocate(8, 4).unwrap();
        assert_eq!(a.offset(), 0);
        assert_eq!(b.offset(), 8);
        drop(a);
        drop(b);
        assert_eq!(allocator.used_size(), 0);
    }
}
