//! CPU-side texture types.
//!
//! Provides [`CpuTexture`] for holding decoded pixel data, along with the
//! [`TextureFormat`] enum shared between CPU and GPU code.

/// Texture format enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum TextureFormat {
    /// 8-bit red channel, unsigned normalized.
    R8Unorm,
    /// 8-bit RG channels, unsigned normalized.
    Rg8Unorm,
    /// 8-bit RGBA channels, unsigned normalized.
    #[default]
    Rgba8Unorm,
    /// 8-bit RGBA channels, sRGB.
    Rgba8UnormSrgb,
    /// 8-bit BGRA channels, unsigned normalized.
    Bgra8Unorm,
    /// 16-bit red channel, float.
    R16Float,
    /// 16-bit RGBA channels, float.
    Rgba16Float,
    /// 32-bit red channel, float.
    R32Float,
    /// 32-bit RGBA channels, float.
    Rgba32Float,
}

impl TextureFormat {
    /// Size of one texel in bytes.
    pub fn block_size(&self) -> u32 {
        match self {
            Self::R8Unorm => 1,
            Self::Rg8Unorm | Self::R16Float => 2,
            Self::Rgba8Unorm | Self::Rgba8UnormSrgb | Self::Bgra8Unorm | Self::R32Float => 4,
            Self::Rgba16Float => 8,
            Self::Rgba32Float => 16,
        }
    }

    /// Returns true if this format is sRGB-encoded.
    pub fn is_srgb(&self) -> bool {
        matches!(self, Self::Rgba8UnormSrgb)
    }
}

/// Decoded pixel data for a single 2D image.
#[derive(Debug, Clone, PartialEq)]
pub struct CpuTexture {
    /// Optional debug name.
    pub name: Option<String>,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    /// Tightly packed rows, `width * height * block_size` bytes.
    pub data: Vec<u8>,
}

impl CpuTexture {
    /// Create a texture from tightly packed pixel data.
    pub fn new(width: u32, height: u32, format: TextureFormat, data: Vec<u8>) -> Self {
        debug_assert_eq!(
            data.len(),
            (width * height * format.block_size()) as usize,
            "pixel data does not match texture size"
        );
        Self {
            name: None,
            width,
            height,
            format,
            data,
        }
    }

    /// Set the debug name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// A single-texel texture.
    pub fn solid_rgba8(rgba: [u8; 4]) -> Self {
        Self::new(1, 1, TextureFormat::Rgba8Unorm, rgba.to_vec())
    }

    /// Bytes per row.
    pub fn row_pitch(&self) -> u32 {
        self.width * self.format.block_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_sizes() {
        assert_eq!(TextureFormat::R8Unorm.block_size(), 1);
        assert_eq!(TextureFormat::Rgba8Unorm.block_size(), 4);
        assert_eq!(TextureFormat::Rgba32Float.block_size(), 16);
    }

    #[test]
    fn test_solid_texture() {
        let tex = CpuTexture::solid_rgba8([255, 0, 0, 255]).with_name("red");
        assert_eq!(tex.width, 1);
        assert_eq!(tex.row_pitch(), 4);
        assert_eq!(tex.data, vec![255, 0, 0, 255]);
        assert_eq!(tex.name.as_deref(), Some("red"));
    }
}
