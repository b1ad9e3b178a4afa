//! Texture types and descriptors.

use bitflags::bitflags;

use super::TextureFormat;

bitflags! {
    /// Usage flags for textures.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        /// Texture can be copied from.
        const COPY_SRC = 1 << 0;
        /// Texture can be copied to.
        const COPY_DST = 1 << 1;
        /// Texture can be sampled in a shader.
        const TEXTURE_BINDING = 1 << 2;
    }
}

impl Default for TextureUsage {
    fn default() -> Self {
        Self::empty()
    }
}

/// Descriptor for creating a 2D or 2D-array texture.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextureDescriptor {
    /// Debug label for the texture.
    pub label: Option<String>,
    pub width: u32,
    pub height: u32,
    /// Number of array layers; 1 for a plain 2D texture.
    pub array_layers: u32,
    /// Texture format.
    pub format: TextureFormat,
    /// Usage flags.
    pub usage: TextureUsage,
}

impl TextureDescriptor {
    /// Create a new 2D texture descriptor.
    pub fn new_2d(width: u32, height: u32, format: TextureFormat, usage: TextureUsage) -> Self {
        Self {
            label: None,
            width,
            height,
            array_layers: 1,
            format,
            usage,
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the array layer count.
    pub fn with_array_layers(mut self, layers: u32) -> Self {
        self.array_layers = layers;
        self
    }

    /// Bytes of one array layer.
    pub fn layer_size(&self) -> u64 {
        self.width as u64 * self.height as u64 * self.format.block_size() as u64
    }
}

impl Default for TextureDescriptor {
    fn default() -> Self {
        Self::new_2d(1, 1, TextureFormat::default(), TextureUsage::empty())
    }
}

/// A rectangle of texels within one array layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextureRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl TextureRegion {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Whether the region lies within a `width` x `height` layer.
    pub fn fits(&self, width: u32, height: u32) -> bool {
        self.x.checked_add(self.width).is_some_and(|r| r <= width)
            && self.y.checked_add(self.height).is_some_and(|b| b <= height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_size() {
        let desc =
            TextureDescriptor::new_2d(64, 32, TextureFormat::Rgba8Unorm, TextureUsage::COPY_DST)
                .with_array_layers(3);
        assert_eq!(desc.layer_size(), 64 * 32 * 4);
        assert_eq!(desc.array_layers, 3);
    }

    #[test]
    fn test_region_fits() {
        assert!(TextureRegion::new(0, 0, 64, 32).fits(64, 32));
        assert!(!TextureRegion::new(1, 0, 64, 32).fits(64, 32));
        assert!(!TextureRegion::new(u32::MAX, 0, 2, 1).fits(64, 32));
    }
}
