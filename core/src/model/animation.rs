//! Keyframe animation data and sampling.

use crate::math::{lerp_vec4, quat_from_array, slerp, Quat, Vec3, Vec4};

use super::types::NodeTransform;

/// Keyframe interpolation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    /// Hold the earlier keyframe value.
    Step,
    /// Linear for vectors, spherical for rotations.
    #[default]
    Linear,
    /// Cubic spline with tangents. Channels using it are skipped at build.
    CubicSpline,
}

/// Node property targeted by a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelPath {
    Translation,
    Rotation,
    Scale,
    /// Morph target weights. Channels using it are skipped at build.
    Weights,
}

/// Keyframe times and values.
#[derive(Debug, Clone, Default)]
pub struct AnimationSampler {
    pub interpolation: Interpolation,
    /// Sorted keyframe times.
    pub inputs: Vec<f32>,
    /// One value per keyframe. Three-component outputs are padded with 0.
    pub outputs: Vec<Vec4>,
}

/// Binds a sampler to a node property.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationChannel {
    pub path: ChannelPath,
    /// Target node (arena index).
    pub node: usize,
    /// Index into [`Animation::samplers`].
    pub sampler: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Animation {
    pub name: String,
    pub samplers: Vec<AnimationSampler>,
    pub channels: Vec<AnimationChannel>,
    /// Earliest keyframe time over all samplers.
    pub start: f32,
    /// Latest keyframe time over all samplers.
    pub end: f32,
}

enum Keyframe {
    Single(usize),
    Between { from: usize, to: usize, u: f32 },
}

impl AnimationSampler {
    pub fn new(interpolation: Interpolation, inputs: Vec<f32>, outputs: Vec<Vec4>) -> Self {
        Self {
            interpolation,
            inputs,
            outputs,
        }
    }

    /// Number of usable keyframes.
    pub fn keyframe_count(&self) -> usize {
        self.inputs.len().min(self.outputs.len())
    }

    fn locate(&self, time: f32) -> Option<Keyframe> {
        let count = self.keyframe_count();
        match count {
            0 => return None,
            1 => return Some(Keyframe::Single(0)),
            _ => {}
        }

        let inputs = &self.inputs[..count];
        let time = time.clamp(inputs[0], inputs[count - 1]);
        let next = inputs.partition_point(|&t| t <= time);
        if next >= count {
            return Some(Keyframe::Single(count - 1));
        }
        let from = next.saturating_sub(1);
        if self.interpolation == Interpolation::Step {
            return Some(Keyframe::Single(from));
        }

        let span = inputs[next] - inputs[from];
        let u = if span > 0.0 {
            ((time - inputs[from]) / span).clamp(0.0, 1.0)
        } else {
            0.0
        };
        Some(Keyframe::Between { from, to: next, u })
    }

    /// Sample a vector value at `time`, clamped to the keyframe range.
    pub fn sample(&self, time: f32) -> Option<Vec4> {
        Some(match self.locate(time)? {
            Keyframe::Single(i) => self.outputs[i],
            Keyframe::Between { from, to, u } => {
                lerp_vec4(&self.outputs[from], &self.outputs[to], u)
            }
        })
    }

    /// Sample a rotation at `time`. Values are `[x, y, z, w]` quaternions.
    pub fn sample_rotation(&self, time: f32) -> Option<Quat> {
        let quat = |v: &Vec4| quat_from_array([v.x, v.y, v.z, v.w]);
        Some(match self.locate(time)? {
            Keyframe::Single(i) => quat(&self.outputs[i]).normalize(),
            Keyframe::Between { from, to, u } => {
                slerp(&quat(&self.outputs[from]), &quat(&self.outputs[to]), u)
            }
        })
    }
}

impl Animation {
    /// Clamp a time into `[start, end]`.
    pub fn clamp_time(&self, time: f32) -> f32 {
        time.clamp(self.start, self.end.max(self.start))
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f32 {
        (self.end - self.start).max(0.0)
    }

    /// Overwrite the animated channels of `poses` with values at `time`.
    pub(crate) fn apply(&self, time: f32, poses: &mut [NodeTransform]) {
        let time = self.clamp_time(time);
        for channel in &self.channels {
            let (Some(sampler), Some(pose)) =
                (self.samplers.get(channel.sampler), poses.get_mut(channel.node))
            else {
                continue;
            };
            match channel.path {
                ChannelPath::Translation => {
                    if let Some(v) = sampler.sample(time) {
                        pose.translation = Vec3::new(v.x, v.y, v.z);
                    }
                }
                ChannelPath::Rotation => {
                    if let Some(q) = sampler.sample_rotation(time) {
                        pose.rotation = q;
                    }
                }
                ChannelPath::Scale => {
                    if let Some(v) = sampler.sample(time) {
                        pose.scale = Vec3::new(v.x, v.y, v.z);
                    }
                }
                ChannelPath::Weights => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::quat_to_array;

    fn linear(inputs: &[f32], outputs: &[[f32; 3]]) -> AnimationSampler {
        AnimationSampler::new(
            Interpolation::Linear,
            inputs.to_vec(),
            outputs.iter().map(|v| Vec4::new(v[0], v[1], v[2], 0.0)).collect(),
        )
    }

    #[test]
    fn test_linear_quarter() {
        let s = linear(&[0.0, 1.0], &[[0.0, 0.0, 0.0], [10.0, 0.0, 0.0]]);
        let v = s.sample(0.25).unwrap();
        assert!((v.x - 2.5).abs() < 1e-6);
        assert_eq!(v.y, 0.0);
    }

    #[test]
    fn test_step_holds_earlier_value() {
        let mut s = linear(&[0.0, 1.0, 2.0], &[[1.0; 3], [2.0; 3], [3.0; 3]]);
        s.interpolation = Interpolation::Step;
        assert_eq!(s.sample(0.99).unwrap().x, 1.0);
        assert_eq!(s.sample(1.0).unwrap().x, 2.0);
        assert_eq!(s.sample(1.5).unwrap().x, 2.0);
    }

    #[test]
    fn test_sampling_clamps_to_range() {
        let s = linear(&[1.0, 2.0], &[[5.0; 3], [7.0; 3]]);
        assert_eq!(s.sample(-3.0), s.sample(1.0));
        assert_eq!(s.sample(10.0), s.sample(2.0));
        assert_eq!(s.sample(10.0).unwrap().x, 7.0);
    }

    #[test]
    fn test_degenerate_samplers() {
        let empty = AnimationSampler::default();
        assert!(empty.sample(0.0).is_none());

        let single = linear(&[0.5], &[[4.0; 3]]);
        assert_eq!(single.sample(0.0).unwrap().x, 4.0);
        assert_eq!(single.sample(9.0).unwrap().x, 4.0);
    }

    #[test]
    fn test_rotation_is_normalized_slerp() {
        let half = std::f32::consts::FRAC_PI_4;
        let s = AnimationSampler::new(
            Interpolation::Linear,
            vec![0.0, 1.0],
            vec![
                Vec4::new(0.0, 0.0, 0.0, 1.0),
                Vec4::new(0.0, half.sin(), 0.0, half.cos()),
            ],
        );
        let q = s.sample_rotation(0.5).unwrap();
        let [x, y, z, w] = quat_to_array(q);
        assert!(x.abs() < 1e-6 && z.abs() < 1e-6);
        assert!((y - (std::f32::consts::PI / 8.0).sin()).abs() < 1e-5);
        assert!(((x * x + y * y + z * z + w * w).sqrt() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_apply_overrides_only_animated_channels() {
        let animation = Animation {
            name: "move".into(),
            samplers: vec![linear(&[0.0, 1.0], &[[0.0; 3], [2.0, 0.0, 0.0]])],
            channels: vec![AnimationChannel {
                path: ChannelPath::Translation,
                node: 1,
                sampler: 0,
            }],
            start: 0.0,
            end: 1.0,
        };
        let base = NodeTransform::identity().with_scale(Vec3::repeat(3.0));
        let mut poses = vec![base; 2];
        animation.apply(0.5, &mut poses);
        assert_eq!(poses[0], base);
        assert!((poses[1].translation.x - 1.0).abs() < 1e-6);
        assert_eq!(poses[1].scale, Vec3::repeat(3.0));
    }
}
