//! Resource states and transitions.

use std::sync::Arc;

use bitflags::bitflags;

use crate::resources::{Buffer, Texture};

bitflags! {
    /// How the GPU is going to access a resource.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ResourceState: u32 {
        const VERTEX_BUFFER = 1 << 0;
        const INDEX_BUFFER = 1 << 1;
        const SHADER_RESOURCE = 1 << 2;
        const COPY_SOURCE = 1 << 3;
        const COPY_DEST = 1 << 4;
    }
}

/// A resource named in a transition.
#[derive(Debug, Clone)]
pub enum TransitionResource {
    Buffer(Arc<Buffer>),
    Texture(Arc<Texture>),
}

impl TransitionResource {
    /// Id of the underlying resource.
    pub fn id(&self) -> u64 {
        match self {
            Self::Buffer(buffer) => buffer.id(),
            Self::Texture(texture) => texture.id(),
        }
    }
}

/// Move `resource` from `old_state` (unknown when `None`) to `new_state`.
#[derive(Debug, Clone)]
pub struct StateTransition {
    pub resource: TransitionResource,
    pub old_state: Option<ResourceState>,
    pub new_state: ResourceState,
}

impl StateTransition {
    pub fn buffer(buffer: Arc<Buffer>, new_state: ResourceState) -> Self {
        Self {
            resource: TransitionResource::Buffer(buffer),
            old_state: None,
            new_state,
        }
    }

    pub fn texture(texture: Arc<Texture>, new_state: ResourceState) -> Self {
        Self {
            resource: TransitionResource::Texture(texture),
            old_state: None,
            new_state,
        }
    }
}
