//! Texture atlases.
//!
//! A [`TextureAtlas`] is a 2D array texture of one format. Each array slice
//! has its own [`DynamicAtlasAllocator`] working in `granularity`-sized
//! cells. When every slice is full the atlas adds `extra_slice_count` new
//! slices, up to `max_slices`. The GPU texture is recreated with the new
//! layer count on the next [`TextureAtlas::update`].

use std::any::Any;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::allocator::{AtlasRect, DynamicAtlasAllocator};
use crate::backend::{DeviceContext, GpuDevice};
use crate::error::GraphicsError;
use crate::resources::Texture;
use crate::types::{TextureDescriptor, TextureFormat, TextureRegion, TextureUsage};

/// Template for creating a [`TextureAtlas`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtlasDesc {
    pub width: u32,
    pub height: u32,
    /// Cell size in texels; regions are rounded up to whole cells.
    pub granularity: u32,
    pub initial_slices: u32,
    pub max_slices: u32,
    /// Slices added when all existing slices are full.
    pub extra_slice_count: u32,
    pub usage: TextureUsage,
}

impl Default for AtlasDesc {
    fn default() -> Self {
        Self {
            width: 2048,
            height: 2048,
            granularity: 128,
            initial_slices: 1,
            max_slices: 16,
            extra_slice_count: 1,
            usage: TextureUsage::TEXTURE_BINDING | TextureUsage::COPY_DST | TextureUsage::COPY_SRC,
        }
    }
}

impl AtlasDesc {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    pub fn with_granularity(mut self, granularity: u32) -> Self {
        self.granularity = granularity;
        self
    }

    pub fn with_slices(mut self, initial: u32, max: u32) -> Self {
        self.initial_slices = initial;
        self.max_slices = max;
        self
    }

    pub fn with_extra_slice_count(mut self, count: u32) -> Self {
        self.extra_slice_count = count;
        self
    }
}

type Slice = Arc<Mutex<DynamicAtlasAllocator>>;

/// A sliced texture atlas of one format.
pub struct TextureAtlas {
    format: TextureFormat,
    desc: AtlasDesc,
    slices: Mutex<Vec<Slice>>,
    texture: Mutex<Option<Arc<Texture>>>,
    version: AtomicU32,
}

impl TextureAtlas {
    pub fn new(format: TextureFormat, desc: AtlasDesc) -> Self {
        let granularity = desc.granularity.max(1);
        let desc = AtlasDesc {
            granularity,
            max_slices: desc.max_slices.max(desc.initial_slices).max(1),
            ..desc
        };
        log::debug!(
            "Creating {:?} atlas {}x{} ({} slices, max {})",
            format,
            desc.width,
            desc.height,
            desc.initial_slices,
            desc.max_slices
        );
        let slices = (0..desc.initial_slices.max(1))
            .map(|_| Self::new_slice(&desc))
            .collect();
        Self {
            format,
            desc,
            slices: Mutex::new(slices),
            texture: Mutex::new(None),
            version: AtomicU32::new(0),
        }
    }

    fn new_slice(desc: &AtlasDesc) -> Slice {
        Arc::new(Mutex::new(DynamicAtlasAllocator::new(
            desc.width / desc.granularity,
            desc.height / desc.granularity,
        )))
    }

    pub fn format(&self) -> TextureFormat {
        self.format
    }

    pub fn desc(&self) -> &AtlasDesc {
        &self.desc
    }

    pub fn slice_count(&self) -> u32 {
        self.slices.lock().len() as u32
    }

    /// Slice `index`, growing the atlas when `index` is one past the end.
    fn slice(&self, index: usize) -> Option<Slice> {
        let mut slices = self.slices.lock();
        if index == slices.len() {
            let target = (slices.len() as u32 + self.desc.extra_slice_count.max(1))
                .min(self.desc.max_slices) as usize;
            if target <= slices.len() {
                return None;
            }
            log::debug!(
                "Growing {:?} atlas from {} to {} slices",
                self.format,
                slices.len(),
                target
            );
            slices.resize_with(target, || Self::new_slice(&self.desc));
        }
        slices.get(index).cloned()
    }

    /// Reserve a `width` x `height` region.
    ///
    /// Returns `None` when the region is larger than one slice or the atlas
    /// is full at `max_slices`.
    pub fn allocate(
        self: &Arc<Self>,
        width: u32,
        height: u32,
        payload: Option<Arc<dyn Any + Send + Sync>>,
    ) -> Option<Arc<TextureAtlasAllocation>> {
        let granularity = self.desc.granularity;
        let cells_w = width.div_ceil(granularity);
        let cells_h = height.div_ceil(granularity);
        // Slices hold whole cells only, so the usable extent rounds down.
        if width == 0
            || height == 0
            || cells_w > self.desc.width / granularity
            || cells_h > self.desc.height / granularity
        {
            log::warn!(
                "{}x{} region does not fit a {}x{} atlas with {} texel cells",
                width,
                height,
                self.desc.width,
                self.desc.height,
                granularity
            );
            return None;
        }

        let mut index = 0;
        while let Some(slice) = self.slice(index) {
            if let Some(cells) = slice.lock().allocate(cells_w, cells_h) {
                return Some(Arc::new(TextureAtlasAllocation {
                    atlas: Arc::clone(self),
                    slice: index as u32,
                    cells,
                    width,
                    height,
                    payload,
                }));
            }
            index += 1;
        }
        None
    }

    pub fn texture(&self) -> Option<Arc<Texture>> {
        self.texture.lock().clone()
    }

    /// Recreate the GPU texture if it has fewer layers than there are
    /// slices, copying existing layers into the new texture.
    pub fn update(
        &self,
        device: &dyn GpuDevice,
        ctx: &mut dyn DeviceContext,
    ) -> Result<(), GraphicsError> {
        let slice_count = self.slice_count();
        let mut texture = self.texture.lock();
        if texture
            .as_ref()
            .is_some_and(|t| t.array_layers() >= slice_count)
        {
            return Ok(());
        }

        let descriptor = TextureDescriptor::new_2d(
            self.desc.width,
            self.desc.height,
            self.format,
            self.desc.usage,
        )
        .with_array_layers(slice_count)
        .with_label("texture atlas");
        let new_texture = device.create_texture(&descriptor, None)?;
        if let Some(old) = texture.as_ref() {
            for layer in 0..old.array_layers() {
                ctx.copy_texture(old, &new_texture, layer)?;
            }
        }
        *texture = Some(new_texture);
        self.version.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    pub fn version(&self) -> u32 {
        self.version.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for TextureAtlas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureAtlas")
            .field("format", &self.format)
            .field("width", &self.desc.width)
            .field("height", &self.desc.height)
            .field("slices", &self.slice_count())
            .finish()
    }
}

/// A region of one atlas slice; freed on drop.
pub struct TextureAtlasAllocation {
    atlas: Arc<TextureAtlas>,
    slice: u32,
    cells: AtlasRect,
    width: u32,
    height: u32,
    payload: Option<Arc<dyn Any + Send + Sync>>,
}

impl TextureAtlasAllocation {
    pub fn atlas(&self) -> &Arc<TextureAtlas> {
        &self.atlas
    }

    /// Array slice holding the region.
    pub fn slice(&self) -> u32 {
        self.slice
    }

    /// Requested size in texels.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Reserved region in texels, rounded up to whole cells.
    pub fn region(&self) -> TextureRegion {
        let g = self.atlas.desc.granularity;
        TextureRegion::new(
            self.cells.x * g,
            self.cells.y * g,
            self.cells.width * g,
            self.cells.height * g,
        )
    }

    /// The requested-size region at the reserved origin.
    pub fn upload_region(&self) -> TextureRegion {
        let region = self.region();
        TextureRegion::new(region.x, region.y, self.width, self.height)
    }

    /// `[scale_u, scale_v, bias_u, bias_v]` mapping unit UVs into the atlas.
    pub fn uv_scale_bias(&self) -> [f32; 4] {
        let region = self.region();
        let (w, h) = (self.atlas.desc.width as f32, self.atlas.desc.height as f32);
        [
            self.width as f32 / w,
            self.height as f32 / h,
            region.x as f32 / w,
            region.y as f32 / h,
        ]
    }

    /// Caller data attached at allocation time.
    pub fn payload(&self) -> Option<&Arc<dyn Any + Send + Sync>> {
        self.payload.as_ref()
    }
}

impl Drop for TextureAtlasAllocation {
    fn drop(&mut self) {
        let slice = self.atlas.slices.lock().get(self.slice as usize).cloned();
        if let Some(slice) = slice {
            slice.lock().free(self.cells);
        }
    }
}

impl std::fmt::Debug for TextureAtlasAllocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureAtlasAllocation")
            .field("slice", &self.slice)
            .field("region", &self.region())
            .field("size", &(self.width, self.height))
            .finish()
    }
}
