//! Concurrency and lifetime tests for the resource manager.

use std::sync::{Arc, Barrier};
use std::thread;

use assetforge_graphics::backend::DummyDevice;
use assetforge_graphics::pool::{
    AtlasDesc, IndexAllocatorDesc, ResourceManager, ResourceManagerCreateInfo, VertexLayoutKey,
    VertexPoolDesc,
};
use assetforge_graphics::types::{BufferUsage, TextureFormat};
use rstest::rstest;

fn layout_key() -> VertexLayoutKey {
    VertexLayoutKey::from_strides(&[24, 16], BufferUsage::VERTEX)
}

fn manager_with_capacity(capacity: u32) -> ResourceManager {
    ResourceManager::new(
        ResourceManagerCreateInfo::default()
            .with_vertex_pool(layout_key(), VertexPoolDesc::default().with_capacity(capacity)),
    )
}

#[test]
fn test_concurrent_vertex_allocations_do_not_overlap() {
    let _ = env_logger::builder().is_test(true).try_init();
    let manager = Arc::new(manager_with_capacity(1000));
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let manager = Arc::clone(&manager);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                (0..20)
                    .map(|_| manager.allocate_vertices(&layout_key(), 30).unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();
    let allocations: Vec<_> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();

    // 8 * 20 * 30 vertices need at least five pools of 1000.
    assert!(manager.vertex_pools(&layout_key()).len() >= 5);
    for (i, a) in allocations.iter().enumerate() {
        for b in &allocations[i + 1..] {
            if Arc::ptr_eq(a.pool(), b.pool()) {
                let a_end = a.start_vertex() + a.vertex_count();
                let b_end = b.start_vertex() + b.vertex_count();
                assert!(a_end <= b.start_vertex() || b_end <= a.start_vertex());
            }
        }
    }
}

#[test]
fn test_released_vertices_are_reused() {
    let manager = manager_with_capacity(100);
    let a = manager.allocate_vertices(&layout_key(), 100).unwrap();
    let pool = Arc::clone(a.pool());
    drop(a);
    let b = manager.allocate_vertices(&layout_key(), 100).unwrap();
    assert!(Arc::ptr_eq(&pool, b.pool()));
    assert_eq!(manager.vertex_pools(&layout_key()).len(), 1);
}

#[rstest]
#[case::same_usage(BufferUsage::VERTEX, true)]
#[case::different_usage(BufferUsage::VERTEX | BufferUsage::STORAGE, false)]
fn test_layout_keys_select_pools(#[case] usage: BufferUsage, #[case] shared: bool) {
    let manager = ResourceManager::new(ResourceManagerCreateInfo::default());
    let first = VertexLayoutKey::from_strides(&[24], BufferUsage::VERTEX);
    let second = VertexLayoutKey::from_strides(&[24], usage);
    let a = manager.allocate_vertices(&first, 4).unwrap();
    let b = manager.allocate_vertices(&second, 4).unwrap();
    assert_eq!(Arc::ptr_eq(a.pool(), b.pool()), shared);
    assert_eq!(manager.vertex_pools(&first).len(), 1);
    assert_eq!(manager.vertex_pools(&second).len(), 1);
}

#[rstest]
#[case::u16_pair(6, 4, 8)]
#[case::u32_pair(12, 4, 12)]
#[case::unaligned(3, 16, 16)]
fn test_index_allocations_are_aligned(
    #[case] size: u64,
    #[case] alignment: u64,
    #[case] second: u64,
) {
    let manager = ResourceManager::new(ResourceManagerCreateInfo::default());
    let a = manager.allocate_indices(size, alignment).unwrap();
    let b = manager.allocate_indices(size, alignment).unwrap();
    assert_eq!(a.offset(), 0);
    assert_eq!(b.offset(), second);
}

#[test]
fn test_index_allocators_grow() {
    let manager = ResourceManager::new(
        ResourceManagerCreateInfo::default().with_index_allocator(Some(IndexAllocatorDesc {
            size: 64,
            ..Default::default()
        })),
    );
    let _a = manager.allocate_indices(48, 4).unwrap();
    let b = manager.allocate_indices(48, 4).unwrap();
    assert_eq!(b.offset(), 0);
    assert_eq!(manager.index_allocators().len(), 2);
    assert!(manager.allocate_indices(65, 4).is_none());
}

#[test]
fn test_cached_texture_is_shared_while_alive() {
    let manager = ResourceManager::new(ResourceManagerCreateInfo::default());
    let a = manager
        .allocate_texture_space(TextureFormat::Rgba8Unorm, 64, 64, Some("asset#0"), None)
        .unwrap();
    let b = manager
        .allocate_texture_space(TextureFormat::Rgba8Unorm, 64, 64, Some("asset#0"), None)
        .unwrap();
    assert!(Arc::ptr_eq(&a, &b));

    drop(a);
    assert!(manager.find_texture_allocation("asset#0").is_some());
    drop(b);
    assert!(manager.find_texture_allocation("asset#0").is_none());
}

#[test]
fn test_empty_cache_id_is_not_cached() {
    let manager = ResourceManager::new(ResourceManagerCreateInfo::default());
    let a = manager
        .allocate_texture_space(TextureFormat::Rgba8Unorm, 8, 8, Some(""), None)
        .unwrap();
    let b = manager
        .allocate_texture_space(TextureFormat::Rgba8Unorm, 8, 8, Some(""), None)
        .unwrap();
    assert!(!Arc::ptr_eq(&a, &b));
    assert_eq!(manager.texture_cache_len(), 0);
}

#[test]
fn test_racing_texture_requests_converge() {
    let manager = Arc::new(ResourceManager::new(ResourceManagerCreateInfo::default()));
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let manager = Arc::clone(&manager);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                manager
                    .allocate_texture_space(
                        TextureFormat::Rgba8Unorm,
                        128,
                        128,
                        Some("shared"),
                        None,
                    )
                    .unwrap()
            })
        })
        .collect();
    let allocations: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let cached = manager.find_texture_allocation("shared").unwrap();
    assert!(allocations.iter().all(|a| Arc::ptr_eq(a, &cached)));
    assert_eq!(manager.texture_cache_len(), 1);
}

#[test]
fn test_payload_is_kept_with_allocation() {
    let manager = ResourceManager::new(ResourceManagerCreateInfo::default());
    let payload: Arc<dyn std::any::Any + Send + Sync> = Arc::new(42u32);
    let allocation = manager
        .allocate_texture_space(TextureFormat::R8Unorm, 16, 16, None, Some(payload))
        .unwrap();
    let value = allocation.payload().unwrap().downcast_ref::<u32>();
    assert_eq!(value, Some(&42));
}

#[test]
fn test_atlases_are_per_format_and_grow_by_slices() {
    let manager = ResourceManager::new(
        ResourceManagerCreateInfo::default().with_atlas(
            TextureFormat::Rgba8Unorm,
            AtlasDesc::new(256, 256)
                .with_slices(1, 3)
                .with_extra_slice_count(2),
        ),
    );
    let a = manager
        .allocate_texture_space(TextureFormat::Rgba8Unorm, 256, 256, None, None)
        .unwrap();
    let b = manager
        .allocate_texture_space(TextureFormat::Rgba8Unorm, 256, 256, None, None)
        .unwrap();
    assert_eq!((a.slice(), b.slice()), (0, 1));
    let atlas = manager.atlas(TextureFormat::Rgba8Unorm).unwrap();
    assert_eq!(atlas.slice_count(), 3);

    let other = manager
        .allocate_texture_space(TextureFormat::R8Unorm, 256, 256, None, None)
        .unwrap();
    assert!(!Arc::ptr_eq(other.atlas(), &atlas));
    assert!(manager
        .allocate_texture_space(TextureFormat::Rgba8Unorm, 257, 1, None, None)
        .is_none());
}

#[test]
fn test_resource_version_tracks_gpu_objects() {
    let device = DummyDevice::new();
    let mut ctx = device.create_context();
    let manager = manager_with_capacity(64);
    assert_eq!(manager.resource_version(), 0);

    let _vertices = manager.allocate_vertices(&layout_key(), 10).unwrap();
    let _texture = manager
        .allocate_texture_space(TextureFormat::Rgba8Unorm, 8, 8, None, None)
        .unwrap();
    manager.update_all(&device, &mut ctx).unwrap();
    let version = manager.resource_version();
    assert_eq!(version, 2);

    manager.update_all(&device, &mut ctx).unwrap();
    assert_eq!(manager.resource_version(), version);

    let _indices = manager.allocate_indices(16, 4).unwrap();
    manager.update_all(&device, &mut ctx).unwrap();
    assert!(manager.resource_version() > version);
}
