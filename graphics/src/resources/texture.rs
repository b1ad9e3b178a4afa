//! GPU texture resource.

use crate::types::{TextureDescriptor, TextureFormat};

/// A GPU texture handle, possibly with several array layers.
pub struct Texture {
    id: u64,
    descriptor: TextureDescriptor,
}

impl Texture {
    /// Create a new texture handle (called by devices).
    pub fn new(descriptor: TextureDescriptor) -> Self {
        Self {
            id: super::next_resource_id(),
            descriptor,
        }
    }

    /// Process-unique id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Get the texture descriptor.
    pub fn descriptor(&self) -> &TextureDescriptor {
        &self.descriptor
    }

    pub fn width(&self) -> u32 {
        self.descriptor.width
    }

    pub fn height(&self) -> u32 {
        self.descriptor.height
    }

    pub fn array_layers(&self) -> u32 {
        self.descriptor.array_layers
    }

    pub fn format(&self) -> TextureFormat {
        self.descriptor.format
    }

    /// Get the texture label, if set.
    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("id", &self.id)
            .field("width", &self.descriptor.width)
            .field("height", &self.descriptor.height)
            .field("layers", &self.descriptor.array_layers)
            .field("format", &self.descriptor.format)
            .field("label", &self.descriptor.label)
            .finish()
    }
}

static_assertions::assert_impl_all!(Texture: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TextureUsage;

    #[test]
    fn test_texture_accessors() {
        let desc =
            TextureDescriptor::new_2d(256, 128, TextureFormat::Rgba8Unorm, TextureUsage::COPY_DST)
                .with_array_layers(2)
            .with_label("atlas");
        let texture = Texture::new(desc);
        assert_eq!(texture.width(), 256);
        assert_eq!(texture.height(), 128);
        assert_eq!(texture.array_layers(), 2);
        assert_eq!(texture.label(), Some("atlas"));
        assert!(format!("{:?}", texture).contains("Texture"));
    }
}
