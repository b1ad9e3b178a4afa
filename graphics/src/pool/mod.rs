//! Shared GPU storage for many models.
//!
//! [`ResourceManager`] serves three kinds of sub-allocations to any number
//! of threads:
//!
//! - vertex ranges from [`VertexPool`]s, keyed by [`VertexLayoutKey`]; a key
//!   may own several pools
//! - index byte ranges from [`BufferSuballocator`]s
//! - texture regions from one [`TextureAtlas`] per format, with an identity
//!   cache that deduplicates textures by content key
//!
//! Lookups take the read side of the manager's locks. The write side is
//! taken only to publish a new pool, atlas or cache entry. Sub-allocation
//! itself happens outside the manager's locks; every pool is independently
//! thread-safe.
//!
//! Allocations free their range when the last `Arc` is dropped. The identity
//! cache holds [`Weak`] references, so a released texture disappears from
//! the cache on the next lookup.

mod atlas;
mod index;
mod vertex_pool;

pub use atlas::{AtlasDesc, TextureAtlas, TextureAtlasAllocation};
pub use index::{BufferSuballocation, BufferSuballocator, IndexAllocatorDesc};
pub use vertex_pool::{VertexPool, VertexPoolAllocation, VertexPoolDesc};

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::backend::{DeviceContext, GpuDevice};
use crate::error::GraphicsError;
use crate::types::{BufferUsage, TextureFormat};

/// Element size and usage of one vertex buffer in a layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexLayoutElement {
    /// Bytes per vertex.
    pub size: u32,
    pub usage: BufferUsage,
}

/// Identifies compatible vertex pools.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct VertexLayoutKey {
    pub elements: Vec<VertexLayoutElement>,
}

impl VertexLayoutKey {
    pub fn new(elements: Vec<VertexLayoutElement>) -> Self {
        Self { elements }
    }

    /// One element per stride, all with the same usage.
    pub fn from_strides(strides: &[u32], usage: BufferUsage) -> Self {
        Self {
            elements: strides
                .iter()
                .map(|&size| VertexLayoutElement { size, usage })
                .collect(),
        }
    }
}

/// Pool templates of a [`ResourceManager`].
#[derive(Debug, Clone)]
pub struct ResourceManagerCreateInfo {
    /// Templates for specific layouts.
    pub vertex_pools: Vec<(VertexLayoutKey, VertexPoolDesc)>,
    /// Template for layouts without their own; `None` disables pools for
    /// unknown layouts.
    pub default_vertex_pool: Option<VertexPoolDesc>,
    /// Template for index allocators; `None` disables index pooling.
    pub index_allocator: Option<IndexAllocatorDesc>,
    /// Templates for specific formats.
    pub atlases: Vec<(TextureFormat, AtlasDesc)>,
    /// Template for formats without their own; `None` disables atlases for
    /// other formats.
    pub default_atlas: Option<AtlasDesc>,
    /// Replaces a zero `extra_slice_count` in any atlas template.
    pub default_extra_slice_count: u32,
}

impl Default for ResourceManagerCreateInfo {
    fn default() -> Self {
        Self {
            vertex_pools: Vec::new(),
            default_vertex_pool: Some(VertexPoolDesc::default()),
            index_allocator: Some(IndexAllocatorDesc::default()),
            atlases: Vec::new(),
            default_atlas: Some(AtlasDesc::default()),
            default_extra_slice_count: 1,
        }
    }
}

impl ResourceManagerCreateInfo {
    pub fn with_vertex_pool(mut self, key: VertexLayoutKey, desc: VertexPoolDesc) -> Self {
        self.vertex_pools.push((key, desc));
        self
    }

    pub fn with_default_vertex_pool(mut self, desc: Option<VertexPoolDesc>) -> Self {
        self.default_vertex_pool = desc;
        self
    }

    pub fn with_index_allocator(mut self, desc: Option<IndexAllocatorDesc>) -> Self {
        self.index_allocator = desc;
        self
    }

    pub fn with_atlas(mut self, format: TextureFormat, desc: AtlasDesc) -> Self {
        self.atlases.push((format, desc));
        self
    }

    pub fn with_default_atlas(mut self, desc: Option<AtlasDesc>) -> Self {
        self.default_atlas = desc;
        self
    }
}

/// Thread-safe owner of shared vertex, index and texture storage.
pub struct ResourceManager {
    vertex_templates: HashMap<VertexLayoutKey, VertexPoolDesc>,
    default_vertex_pool: Option<VertexPoolDesc>,
    index_template: Option<IndexAllocatorDesc>,
    atlas_templates: HashMap<TextureFormat, AtlasDesc>,
    default_atlas: Option<AtlasDesc>,
    default_extra_slice_count: u32,

    vertex_pools: RwLock<HashMap<VertexLayoutKey, Vec<Arc<VertexPool>>>>,
    index_allocators: RwLock<Vec<Arc<BufferSuballocator>>>,
    atlases: RwLock<HashMap<TextureFormat, Arc<TextureAtlas>>>,
    texture_cache: RwLock<HashMap<String, Weak<TextureAtlasAllocation>>>,
}

impl ResourceManager {
    pub fn new(info: ResourceManagerCreateInfo) -> Self {
        log::info!(
            "Creating resource manager ({} vertex pool templates, {} atlas templates)",
            info.vertex_pools.len(),
            info.atlases.len()
        );
        Self {
            vertex_templates: info.vertex_pools.into_iter().collect(),
            default_vertex_pool: info.default_vertex_pool,
            index_template: info.index_allocator,
            atlas_templates: info.atlases.into_iter().collect(),
            default_atlas: info.default_atlas,
            default_extra_slice_count: info.default_extra_slice_count,
            vertex_pools: RwLock::new(HashMap::new()),
            index_allocators: RwLock::new(Vec::new()),
            atlases: RwLock::new(HashMap::new()),
            texture_cache: RwLock::new(HashMap::new()),
        }
    }

    // ========================================================================
    // Vertices
    // ========================================================================

    /// Reserve `count` vertices in a pool compatible with `key`.
    ///
    /// Existing pools are tried in creation order; when all are full a new
    /// pool is created from the key's template. Returns `None` if no template
    /// applies or the request exceeds a new pool's capacity.
    pub fn allocate_vertices(
        &self,
        key: &VertexLayoutKey,
        count: u32,
    ) -> Option<Arc<VertexPoolAllocation>> {
        let mut index = 0;
        loop {
            let pool = self
                .vertex_pools
                .read()
                .get(key)
                .and_then(|pools| pools.get(index).cloned());
            let Some(pool) = pool else {
                break;
            };
            if let Some(allocation) = pool.allocate(count) {
                return Some(allocation);
            }
            index += 1;
        }

        let desc = self
            .vertex_templates
            .get(key)
            .copied()
            .or(self.default_vertex_pool)?;
        if count > desc.capacity {
            log::warn!(
                "{} vertices exceed vertex pool capacity {}",
                count,
                desc.capacity
            );
            return None;
        }

        let pool = Arc::new(VertexPool::new(key.clone(), desc));
        let allocation = pool.allocate(count);
        if allocation.is_some() {
            self.vertex_pools
                .write()
                .entry(key.clone())
                .or_default()
                .push(pool);
        }
        allocation
    }

    /// Pools created for `key`.
    pub fn vertex_pools(&self, key: &VertexLayoutKey) -> Vec<Arc<VertexPool>> {
        self.vertex_pools.read().get(key).cloned().unwrap_or_default()
    }

    // ========================================================================
    // Indices
    // ========================================================================

    /// Reserve `size` bytes of index storage at an `alignment`-byte offset.
    pub fn allocate_indices(&self, size: u64, alignment: u64) -> Option<Arc<BufferSuballocation>> {
        let mut index = 0;
        loop {
            let allocator = self.index_allocators.read().get(index).cloned();
            let Some(allocator) = allocator else {
                break;
            };
            if let Some(allocation) = allocator.allocate(size, alignment) {
                return Some(allocation);
            }
            index += 1;
        }

        let desc = self.index_template?;
        if size > desc.size {
            log::warn!(
                "{} index bytes exceed index allocator size {}",
                size,
                desc.size
            );
            return None;
        }
        let allocator = Arc::new(BufferSuballocator::new(desc));
        let allocation = allocator.allocate(size, alignment);
        if allocation.is_some() {
            self.index_allocators.write().push(allocator);
        }
        allocation
    }

    pub fn index_allocators(&self) -> Vec<Arc<BufferSuballocator>> {
        self.index_allocators.read().clone()
    }

    // ========================================================================
    // Textures
    // ========================================================================

    /// The atlas for `format`, created on first use.
    pub fn atlas(&self, format: TextureFormat) -> Option<Arc<TextureAtlas>> {
        if let Some(atlas) = self.atlases.read().get(&format) {
            return Some(Arc::clone(atlas));
        }
        let mut desc = self
            .atlas_templates
            .get(&format)
            .copied()
            .or(self.default_atlas)?;
        if desc.extra_slice_count == 0 {
            desc.extra_slice_count = self.default_extra_slice_count;
        }
        let mut atlases = self.atlases.write();
        let atlas = atlases
            .entry(format)
            .or_insert_with(|| Arc::new(TextureAtlas::new(format, desc)));
        Some(Arc::clone(atlas))
    }

    /// Reserve a `width` x `height` region in the atlas for `format`.
    ///
    /// With a non-empty `cache_id` an existing live allocation for that id is
    /// returned instead. If another thread publishes the same id first, its
    /// allocation is returned and this call's allocation is released.
    pub fn allocate_texture_space(
        &self,
        format: TextureFormat,
        width: u32,
        height: u32,
        cache_id: Option<&str>,
        payload: Option<Arc<dyn Any + Send + Sync>>,
    ) -> Option<Arc<TextureAtlasAllocation>> {
        let cache_id = cache_id.filter(|id| !id.is_empty());
        if let Some(id) = cache_id {
            if let Some(existing) = self.find_texture_allocation(id) {
                return Some(existing);
            }
        }

        let allocation = self.atlas(format)?.allocate(width, height, payload)?;

        if let Some(id) = cache_id {
            let mut cache = self.texture_cache.write();
            let existing = cache.get(id).and_then(Weak::upgrade);
            if let Some(existing) = existing {
                drop(cache);
                log::trace!("Texture '{}' was published concurrently; adopting it", id);
                return Some(existing);
            }
            cache.insert(id.to_owned(), Arc::downgrade(&allocation));
        }
        Some(allocation)
    }

    /// Live allocation published under `cache_id`, if any.
    ///
    /// An expired entry is removed.
    pub fn find_texture_allocation(&self, cache_id: &str) -> Option<Arc<TextureAtlasAllocation>> {
        {
            let cache = self.texture_cache.read();
            let entry = cache.get(cache_id)?;
            if let Some(allocation) = entry.upgrade() {
                return Some(allocation);
            }
        }

        let mut cache = self.texture_cache.write();
        if let Some(allocation) = cache.get(cache_id).and_then(Weak::upgrade) {
            return Some(allocation);
        }
        cache.remove(cache_id);
        None
    }

    /// Number of identity cache entries, expired ones included.
    pub fn texture_cache_len(&self) -> usize {
        self.texture_cache.read().len()
    }

    // ========================================================================
    // GPU objects
    // ========================================================================

    /// Create missing vertex pool buffers.
    pub fn update_vertex_buffers(&self, device: &dyn GpuDevice) -> Result<(), GraphicsError> {
        let pools: Vec<_> = self.vertex_pools.read().values().flatten().cloned().collect();
        for pool in pools {
            pool.update_buffers(device)?;
        }
        Ok(())
    }

    /// Create missing index buffers.
    pub fn update_index_buffers(&self, device: &dyn GpuDevice) -> Result<(), GraphicsError> {
        for allocator in self.index_allocators() {
            allocator.update_buffer(device)?;
        }
        Ok(())
    }

    /// Create or grow atlas textures to match their slice counts.
    pub fn update_textures(
        &self,
        device: &dyn GpuDevice,
        ctx: &mut dyn DeviceContext,
    ) -> Result<(), GraphicsError> {
        let atlases: Vec<_> = self.atlases.read().values().cloned().collect();
        for atlas in atlases {
            atlas.update(device, ctx)?;
        }
        Ok(())
    }

    /// Bring every GPU object up to date.
    pub fn update_all(
        &self,
        device: &dyn GpuDevice,
        ctx: &mut dyn DeviceContext,
    ) -> Result<(), GraphicsError> {
        self.update_vertex_buffers(device)?;
        self.update_index_buffers(device)?;
        self.update_textures(device, ctx)
    }

    /// Sum of all pool, allocator and atlas versions.
    ///
    /// Changes whenever any GPU object is created or recreated.
    pub fn resource_version(&self) -> u64 {
        let vertex: u64 = self
            .vertex_pools
            .read()
            .values()
            .flatten()
            .map(|p| p.version() as u64)
            .sum();
        let index: u64 = self
            .index_allocators
            .read()
            .iter()
            .map(|a| a.version() as u64)
            .sum();
        let texture: u64 = self
            .atlases
            .read()
            .values()
            .map(|a| a.version() as u64)
            .sum();
        vertex + index + texture
    }
}

impl std::fmt::Debug for ResourceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceManager")
            .field(
                "vertex_pools",
                &self.vertex_pools.read().values().map(Vec::len).sum::<usize>(),
            )
            .field("index_allocators", &self.index_allocators.read().len())
            .field("atlases", &self.atlases.read().len())
            .field("texture_cache", &self.texture_cache.read().len())
            .finish()
    }
}

static_assertions::assert_impl_all!(ResourceManager: Send, Sync);
static_assertions::assert_impl_all!(VertexPoolAllocation: Send, Sync);
static_assertions::assert_impl_all!(BufferSuballocation: Send, Sync);
static_assertions::assert_impl_all!(TextureAtlasAllocation: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> VertexLayoutKey {
        VertexLayoutKey::from_strides(&[24], BufferUsage::VERTEX)
    }

    #[test]
    fn test_new_pool_when_existing_is_full() {
        let manager = ResourceManager::new(
            ResourceManagerCreateInfo::default()
                .with_vertex_pool(key(), VertexPoolDesc::default().with_capacity(100)),
        );
        let a = manager.allocate_vertices(&key(), 80).unwrap();
        let b = manager.allocate_vertices(&key(), 80).unwrap();
        assert!(!Arc::ptr_eq(a.pool(), b.pool()));
        assert_eq!(manager.vertex_pools(&key()).len(), 2);
        assert!(manager.allocate_vertices(&key(), 101).is_none());
    }

    #[test]
    fn test_no_template_means_no_pool() {
        let manager = ResourceManager::new(
            ResourceManagerCreateInfo::default()
                .with_default_vertex_pool(None)
                .with_index_allocator(None)
                .with_default_atlas(None),
        );
        assert!(manager.allocate_vertices(&key(), 1).is_none());
        assert!(manager.allocate_indices(4, 4).is_none());
        assert!(manager
            .allocate_texture_space(TextureFormat::Rgba8Unorm, 4, 4, None, None)
            .is_none());
    }

    #[test]
    fn test_stale_cache_entry_is_purged() {
        let manager = ResourceManager::new(ResourceManagerCreateInfo::default());
        let a = manager
            .allocate_texture_space(TextureFormat::Rgba8Unorm, 8, 8, Some("tex"), None)
            .unwrap();
        assert_eq!(manager.texture_cache_len(), 1);
        drop(a);
        assert!(manager.find_texture_allocation("tex").is_none());
        assert_eq!(manager.texture_cache_len(), 0);
    }
}
