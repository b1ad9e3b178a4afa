//! Per-frame node, joint and bounding box evaluation.
//!
//! [`ModelTransforms`] holds the mutable per-frame output for one model:
//! local and global matrices per node and joint matrices per skin slot. The
//! model itself stays immutable, so several transform sets (one per
//! instance) can be evaluated against one model.

use crate::math::{BoundBox, Mat4};

use super::error::TransformError;
use super::types::NodeTransform;
use super::Model;

/// Joint matrices of one skinned node.
#[derive(Debug, Clone, Default)]
pub struct SkinTransforms {
    pub joint_matrices: Vec<Mat4>,
}

/// Per-frame transforms of one model instance.
#[derive(Debug, Clone, Default)]
pub struct ModelTransforms {
    /// Local matrix per node (arena index).
    pub node_local: Vec<Mat4>,
    /// Global matrix per node (arena index).
    pub node_global: Vec<Mat4>,
    /// Joint matrices per skin transform slot.
    pub skins: Vec<SkinTransforms>,
    poses: Vec<NodeTransform>,
}

impl ModelTransforms {
    /// Transforms sized for `model`, initialised to identity.
    pub fn new(model: &Model) -> Self {
        let mut skins = vec![SkinTransforms::default(); model.skin_transform_count()];
        for node in model.nodes() {
            if let (Some(slot), Some(skin)) = (node.skin_transform_index, node.skin) {
                skins[slot].joint_matrices =
                    vec![Mat4::identity(); model.skins()[skin].joints.len()];
            }
        }
        Self {
            node_local: vec![Mat4::identity(); model.nodes().len()],
            node_global: vec![Mat4::identity(); model.nodes().len()],
            skins,
            poses: Vec::new(),
        }
    }
}

impl Model {
    /// Evaluate local, global and joint matrices for one scene.
    ///
    /// With `animation = Some((index, time))` the animated channels replace
    /// the static translation, rotation and scale of their nodes; `time` is
    /// clamped to the animation's range. An out-of-range animation index is
    /// logged and leaves `transforms` untouched.
    pub fn compute_transforms(
        &self,
        scene: usize,
        transforms: &mut ModelTransforms,
        root: &Mat4,
        animation: Option<(usize, f32)>,
    ) -> Result<(), TransformError> {
        self.check_transforms(transforms)?;
        let scene = self
            .scenes
            .get(scene)
            .ok_or(TransformError::InvalidScene(scene))?;

        let animation = match animation {
            Some((index, time)) => match self.animations.get(index) {
                Some(animation) => Some((animation, time)),
                None => {
                    log::warn!(
                        "Animation index {} is out of range ({} animations)",
                        index,
                        self.animations.len()
                    );
                    return Ok(());
                }
            },
            None => None,
        };

        transforms.poses.clear();
        transforms
            .poses
            .extend(self.nodes.iter().map(|n| n.transform));
        if let Some((animation, time)) = animation {
            animation.apply(time, &mut transforms.poses);
        }

        for &id in &scene.linear_nodes {
            transforms.node_local[id] = transforms.poses[id].local_matrix();
        }

        // Linear order is depth-first, so every parent precedes its children.
        for &id in &scene.linear_nodes {
            let parent = match self.nodes[id].parent {
                Some(parent) if !scene.root_nodes.contains(&id) => transforms.node_global[parent],
                _ => *root,
            };
            transforms.node_global[id] = parent * transforms.node_local[id];
        }

        for &id in &scene.linear_nodes {
            let node = &self.nodes[id];
            let (Some(slot), Some(skin), Some(_)) =
                (node.skin_transform_index, node.skin, node.mesh)
            else {
                continue;
            };
            let skin = &self.skins[skin];
            let inverse_global = transforms.node_global[id]
                .try_inverse()
                .unwrap_or_else(Mat4::identity);
            let joints = &mut transforms.skins[slot].joint_matrices;
            for (i, (&joint, inverse_bind)) in skin
                .joints
                .iter()
                .zip(&skin.inverse_bind_matrices)
                .enumerate()
            {
                joints[i] = inverse_global * transforms.node_global[joint] * inverse_bind;
            }
        }

        Ok(())
    }

    /// Union of the world-space bounds of every mesh node in `scene`, or
    /// `None` if the scene has no geometry.
    pub fn compute_bounding_box(
        &self,
        scene: usize,
        transforms: &ModelTransforms,
    ) -> Result<Option<BoundBox>, TransformError> {
        self.check_transforms(transforms)?;
        let scene = self
            .scenes
            .get(scene)
            .ok_or(TransformError::InvalidScene(scene))?;

        let bounds = scene
            .linear_nodes
            .iter()
            .filter_map(|&id| {
                let mesh = self.nodes[id].mesh?;
                let bounds = self.meshes[mesh].bounds;
                (!bounds.is_empty()).then(|| bounds.transform(&transforms.node_global[id]))
            })
            .reduce(|a, b| a.union(&b));
        Ok(bounds)
    }

    fn check_transforms(&self, transforms: &ModelTransforms) -> Result<(), TransformError> {
        let check = |buffer: &'static str, expected: usize, actual: usize| {
            if expected == actual {
                Ok(())
            } else {
                Err(TransformError::SizeMismatch {
                    buffer,
                    expected,
                    actual,
                })
            }
        };
        check("node_local", self.nodes.len(), transforms.node_local.len())?;
        check("node_global", self.nodes.len(), transforms.node_global.len())?;
        check("skins", self.skin_transform_count, transforms.skins.len())?;
        for node in &self.nodes {
            if let (Some(slot), Some(skin)) = (node.skin_transform_index, node.skin) {
                check(
                    "joint_matrices",
                    self.skins[skin].joints.len(),
                    transforms.skins[slot].joint_matrices.len(),
                )?;
            }
        }
        Ok(())
    }
}
