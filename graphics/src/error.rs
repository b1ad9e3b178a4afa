//! Graphics error types.

use std::fmt;

/// Errors reported by devices and by GPU model creation.
///
/// Pool exhaustion is not an error; pool allocation calls return `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphicsError {
    /// The device could not create a resource.
    ResourceCreationFailed(String),
    /// The device has no memory left for a resource.
    OutOfMemory,
    /// A descriptor or argument is invalid.
    InvalidParameter(String),
    /// The resource id is not known to the device it was used with.
    UnknownResource(u64),
    /// A write or copy reaches past the end of a resource.
    OutOfBounds {
        resource: u64,
        operation: &'static str,
    },
}

impl fmt::Display for GraphicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResourceCreationFailed(msg) => write!(f, "resource creation failed: {msg}"),
            Self::OutOfMemory => write!(f, "out of GPU memory"),
            Self::InvalidParameter(msg) => write!(f, "invalid parameter: {msg}"),
            Self::UnknownResource(id) => write!(f, "unknown resource #{id}"),
            Self::OutOfBounds {
                resource,
                operation,
            } => write!(f, "{operation} out of bounds of resource #{resource}"),
        }
    }
}

impl std::error::Error for GraphicsError {}
