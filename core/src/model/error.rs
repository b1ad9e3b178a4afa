//! Error types for model building and transform evaluation.

use std::fmt;

use crate::layout::{LayoutError, ValueType};
use crate::source::{AccessorError, AccessorId};

/// Errors that abort a model build.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildError {
    /// The destination layout is invalid.
    Layout(LayoutError),
    /// An accessor could not be resolved.
    Accessor(AccessorError),
    /// A primitive has no POSITION attribute.
    MissingPosition {
        /// Mesh index in the source.
        mesh: usize,
        /// Primitive index within the mesh.
        primitive: usize,
    },
    /// An attribute has a different element count than POSITION.
    VertexCountMismatch {
        mesh: usize,
        primitive: usize,
        attribute: String,
        expected: usize,
        actual: usize,
    },
    /// An accessor uses a component type the converter cannot read.
    UnsupportedComponentType {
        accessor: AccessorId,
        component_type: ValueType,
    },
    /// A source index points outside its collection.
    InvalidReference { kind: &'static str, index: usize },
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Layout(e) => write!(f, "invalid layout: {e}"),
            Self::Accessor(e) => write!(f, "accessor error: {e}"),
            Self::MissingPosition { mesh, primitive } => {
                write!(f, "mesh {mesh} primitive {primitive} has no POSITION attribute")
            }
            Self::VertexCountMismatch {
                mesh,
                primitive,
                attribute,
                expected,
                actual,
            } => write!(
                f,
                "mesh {mesh} primitive {primitive}: attribute '{attribute}' has {actual} elements, expected {expected}"
            ),
            Self::UnsupportedComponentType {
                accessor,
                component_type,
            } => write!(
                f,
                "accessor {accessor} uses unsupported component type {component_type:?}"
            ),
            Self::InvalidReference { kind, index } => write!(f, "{kind} {index} does not exist"),
        }
    }
}

impl std::error::Error for BuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Layout(e) => Some(e),
            Self::Accessor(e) => Some(e),
            _ => None,
        }
    }
}

impl From<LayoutError> for BuildError {
    fn from(e: LayoutError) -> Self {
        Self::Layout(e)
    }
}

impl From<AccessorError> for BuildError {
    fn from(e: AccessorError) -> Self {
        Self::Accessor(e)
    }
}

/// Precondition violations reported by transform evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    /// The scene index is out of range.
    InvalidScene(usize),
    /// An output buffer is not sized for this model.
    SizeMismatch {
        buffer: &'static str,
        expected: usize,
        actual: usize,
    },
}

impl fmt::Display for TransformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidScene(index) => write!(f, "scene {index} does not exist"),
            Self::SizeMismatch {
                buffer,
                expected,
                actual,
            } => write!(f, "{buffer} holds {actual} entries, expected {expected}"),
        }
    }
}

impl std::error::Error for TransformError {}
