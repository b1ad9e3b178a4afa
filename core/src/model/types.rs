//! Model scene-graph data types.
//!
//! Nodes live in one arena per model and reference each other by index,
//! so a node never moves once the model is built.

use crate::layout::IndexFormat;
use crate::math::{mat4_from_scale_rotation_translation, BoundBox, Mat4, Quat, Vec3};

/// Node transform: an explicit matrix combined with translation, rotation
/// and scale. Channels the source did not set are identity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeTransform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    pub matrix: Mat4,
}

impl NodeTransform {
    /// Identity transform.
    pub fn identity() -> Self {
        Self {
            translation: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::repeat(1.0),
            matrix: Mat4::identity(),
        }
    }

    /// Returns this transform with a different translation.
    #[must_use]
    pub fn with_translation(mut self, translation: Vec3) -> Self {
        self.translation = translation;
        self
    }

    /// Returns this transform with a different rotation.
    #[must_use]
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Returns this transform with a different scale.
    #[must_use]
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Returns this transform with a different matrix.
    #[must_use]
    pub fn with_matrix(mut self, matrix: Mat4) -> Self {
        self.matrix = matrix;
        self
    }

    /// Local matrix: `matrix * T * R * S`.
    pub fn local_matrix(&self) -> Mat4 {
        self.matrix
            * mat4_from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

impl Default for NodeTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// A node in the model's arena.
#[derive(Debug, Clone)]
pub struct Node {
    pub name: Option<String>,
    /// Index of the node in the source model.
    pub source_index: usize,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub transform: NodeTransform,
    pub mesh: Option<usize>,
    pub camera: Option<usize>,
    pub skin: Option<usize>,
    /// Slot in the per-frame joint matrix storage. Set for nodes with both a
    /// mesh and a skin.
    pub skin_transform_index: Option<usize>,
}

impl Node {
    pub(crate) fn new(source_index: usize) -> Self {
        Self {
            name: None,
            source_index,
            parent: None,
            children: Vec::new(),
            transform: NodeTransform::identity(),
            mesh: None,
            camera: None,
            skin: None,
            skin_transform_index: None,
        }
    }
}

/// A scene: root nodes plus every reachable node in depth-first order.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub name: Option<String>,
    pub root_nodes: Vec<usize>,
    pub linear_nodes: Vec<usize>,
}

/// One drawable range of the packed buffers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Primitive {
    /// First index in the packed index buffer.
    pub first_index: u32,
    /// Number of indices; 0 for non-indexed primitives.
    pub index_count: u32,
    /// First vertex in the packed vertex buffers. Indices already include it.
    pub first_vertex: u32,
    pub vertex_count: u32,
    pub material_id: usize,
    pub bounds: BoundBox,
}

impl Primitive {
    pub fn has_indices(&self) -> bool {
        self.index_count > 0
    }
}

#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub name: Option<String>,
    pub primitives: Vec<Primitive>,
    /// Union of the primitive bounds.
    pub bounds: BoundBox,
}

/// A skin for skeletal animation.
#[derive(Debug, Clone)]
pub struct Skin {
    pub name: Option<String>,
    /// Joint nodes (arena indices).
    pub joints: Vec<usize>,
    /// One matrix per joint.
    pub inverse_bind_matrices: Vec<Mat4>,
    /// Root skeleton node, if specified.
    pub skeleton: Option<usize>,
}

/// A camera definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub name: Option<String>,
    pub projection: CameraProjection,
}

/// Camera projection parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum CameraProjection {
    Perspective {
        /// Vertical field of view in radians.
        yfov: f32,
        aspect: Option<f32>,
        znear: f32,
        zfar: Option<f32>,
    },
    Orthographic {
        xmag: f32,
        ymag: f32,
        znear: f32,
        zfar: f32,
    },
}

/// Packed vertex bytes, one array per destination buffer.
#[derive(Debug, Clone, Default)]
pub struct VertexData {
    pub strides: Vec<u32>,
    pub buffers: Vec<Vec<u8>>,
}

impl VertexData {
    /// Number of vertices stored.
    pub fn vertex_count(&self) -> usize {
        self.strides
            .iter()
            .zip(&self.buffers)
            .find(|(stride, _)| **stride > 0)
            .map(|(stride, bytes)| bytes.len() / *stride as usize)
            .unwrap_or(0)
    }
}

/// Packed index bytes.
#[derive(Debug, Clone, Default)]
pub struct IndexData {
    pub format: IndexFormat,
    pub data: Vec<u8>,
}

impl IndexData {
    pub fn index_count(&self) -> usize {
        self.data.len() / self.format.size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{quat_from_array, transform_point};

    #[test]
    fn node_transform_default_is_identity() {
        let t = NodeTransform::default();
        assert_eq!(t.local_matrix(), Mat4::identity());
    }

    #[test]
    fn node_transform_applies_matrix_last() {
        let t = NodeTransform::identity()
            .with_translation(Vec3::new(1.0, 0.0, 0.0))
            .with_matrix(Mat4::new_nonuniform_scaling(&Vec3::new(2.0, 2.0, 2.0)));
        let p = transform_point(&t.local_matrix(), &Vec3::zeros());
        assert!((p.x - 2.0).abs() < 1e-6);
    }

    #[test]
    fn node_transform_rotation() {
        let half = std::f32::consts::FRAC_PI_4;
        let t = NodeTransform::identity()
            .with_rotation(quat_from_array([0.0, 0.0, half.sin(), half.cos()]));
        let p = transform_point(&t.local_matrix(), &Vec3::new(1.0, 0.0, 0.0));
        assert!(p.x.abs() < 1e-5);
        assert!((p.y - 1.0).abs() < 1e-5);
    }

    #[test]
    fn vertex_data_counts_from_first_used_buffer() {
        let data = VertexData {
            strides: vec![0, 12],
            buffers: vec![Vec::new(), vec![0; 36]],
        };
        assert_eq!(data.vertex_count(), 3);
    }

    #[test]
    fn index_data_count() {
        let data = IndexData {
            format: IndexFormat::Uint16,
            data: vec![0; 12],
        };
        assert_eq!(data.index_count(), 6);
    }
}
