//! Buffer types and descriptors.

use bitflags::bitflags;

bitflags! {
    /// Usage flags for buffers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// Buffer can be used as a vertex buffer.
        const VERTEX = 1 << 0;
        /// Buffer can be used as an index buffer.
        const INDEX = 1 << 1;
        /// Buffer can be used as a uniform buffer.
        const UNIFORM = 1 << 2;
        /// Buffer can be used as a storage buffer.
        const STORAGE = 1 << 3;
        /// Buffer can be copied from.
        const COPY_SRC = 1 << 5;
        /// Buffer can be copied to.
        const COPY_DST = 1 << 6;
    }
}

impl Default for BufferUsage {
    fn default() -> Self {
        Self::empty()
    }
}

/// How shaders view the contents of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BufferMode {
    /// Plain vertex/index data.
    #[default]
    Undefined,
    /// Array of elements of [`BufferDescriptor::element_stride`] bytes.
    Structured,
    /// Raw byte-addressed storage.
    Raw,
}

/// Descriptor for creating a buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BufferDescriptor {
    /// Debug label for the buffer.
    pub label: Option<String>,
    /// Size in bytes.
    pub size: u64,
    /// Usage flags.
    pub usage: BufferUsage,
    pub mode: BufferMode,
    /// Element size for structured buffers, 0 otherwise.
    pub element_stride: u32,
}

impl BufferDescriptor {
    /// Create a new buffer descriptor.
    pub fn new(size: u64, usage: BufferUsage) -> Self {
        Self {
            label: None,
            size,
            usage,
            mode: BufferMode::Undefined,
            element_stride: 0,
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// View the buffer as an array of `stride`-byte elements.
    pub fn structured(mut self, stride: u32) -> Self {
        self.mode = BufferMode::Structured;
        self.element_stride = stride;
        self
    }

    /// Pick [`BufferMode::Structured`] for storage buffers, the way shaders
    /// read pooled vertex data.
    pub fn with_mode_for_usage(self, stride: u32) -> Self {
        if self.usage.contains(BufferUsage::STORAGE) {
            self.structured(stride)
        } else {
            self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_descriptor() {
        let desc = BufferDescriptor::new(1024, BufferUsage::VERTEX | BufferUsage::COPY_DST)
            .with_label("vertices");
        assert_eq!(desc.size, 1024);
        assert_eq!(desc.mode, BufferMode::Undefined);
        assert_eq!(desc.label.as_deref(), Some("vertices"));
    }

    #[test]
    fn test_storage_buffers_are_structured() {
        let desc = BufferDescriptor::new(480, BufferUsage::STORAGE).with_mode_for_usage(48);
        assert_eq!(desc.mode, BufferMode::Structured);
        assert_eq!(desc.element_stride, 48);

        let desc = BufferDescriptor::new(480, BufferUsage::VERTEX).with_mode_for_usage(48);
        assert_eq!(desc.mode, BufferMode::Undefined);
        assert_eq!(desc.element_stride, 0);
    }
}
