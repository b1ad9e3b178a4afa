//! Math type aliases and helper functions.
//!
//! All matrices follow the column-vector convention used by nalgebra:
//! a point is transformed as `m * p`, and `a * b` applies `b` first.

pub use nalgebra;

// ===== Type aliases =====

/// 3D vector (f32).
pub type Vec3 = nalgebra::Vector3<f32>;

/// 4D vector (f32).
pub type Vec4 = nalgebra::Vector4<f32>;

/// 4x4 matrix (f32).
pub type Mat4 = nalgebra::Matrix4<f32>;

/// Quaternion (f32). Stored as `[x, y, z, w]` in memory.
/// Use [`quat_from_array`] or `Quaternion::new(w, x, y, z)` to construct.
pub type Quat = nalgebra::Quaternion<f32>;

// ===== Helper functions =====

/// Build a 4x4 TRS matrix from scale, rotation (quaternion), and translation.
///
/// The result applies scale first, then rotation, then translation.
pub fn mat4_from_scale_rotation_translation(
    scale: Vec3,
    rotation: Quat,
    translation: Vec3,
) -> Mat4 {
    let r = nalgebra::UnitQuaternion::new_normalize(rotation);
    let m = r.to_rotation_matrix();
    let rm = m.matrix();
    #[rustfmt::skip]
    let result = Mat4::new(
        rm[(0, 0)] * scale.x, rm[(0, 1)] * scale.y, rm[(0, 2)] * scale.z, translation.x,
        rm[(1, 0)] * scale.x, rm[(1, 1)] * scale.y, rm[(1, 2)] * scale.z, translation.y,
        rm[(2, 0)] * scale.x, rm[(2, 1)] * scale.y, rm[(2, 2)] * scale.z, translation.z,
        0.0,                  0.0,                  0.0,                  1.0,
    );
    result
}

/// Build a matrix from a column-major `[[f32; 4]; 4]` array (glTF layout).
pub fn mat4_from_cols_array(cols: &[[f32; 4]; 4]) -> Mat4 {
    Mat4::from_fn(|row, col| cols[col][row])
}

/// Build a matrix from 16 column-major floats.
pub fn mat4_from_slice(values: &[f32]) -> Mat4 {
    Mat4::from_fn(|row, col| values.get(col * 4 + row).copied().unwrap_or(0.0))
}

/// Create a quaternion from a `[x, y, z, w]` array.
pub fn quat_from_array(a: [f32; 4]) -> Quat {
    nalgebra::Quaternion::new(a[3], a[0], a[1], a[2])
}

/// Convert a quaternion to a `[x, y, z, w]` array.
pub fn quat_to_array(q: Quat) -> [f32; 4] {
    [q.coords.x, q.coords.y, q.coords.z, q.coords.w]
}

/// Component-wise linear interpolation.
pub fn lerp_vec4(a: &Vec4, b: &Vec4, t: f32) -> Vec4 {
    a + (b - a) * t
}

/// Spherical interpolation along the shortest arc, normalized.
///
/// Falls back to normalized linear interpolation when the inputs are nearly
/// parallel, where the slerp weights become numerically unstable.
pub fn slerp(a: &Quat, b: &Quat, t: f32) -> Quat {
    let mut b = *b;
    let mut cos_theta = a.coords.dot(&b.coords);
    if cos_theta < 0.0 {
        b = -b;
        cos_theta = -cos_theta;
    }

    let coords = if cos_theta > 0.9995 {
        a.coords + (b.coords - a.coords) * t
    } else {
        let theta = cos_theta.clamp(-1.0, 1.0).acos();
        let sin_theta = theta.sin();
        let wa = ((1.0 - t) * theta).sin() / sin_theta;
        let wb = (t * theta).sin() / sin_theta;
        a.coords * wa + b.coords * wb
    };

    let norm = coords.norm();
    if norm > f32::EPSILON {
        Quat::from(coords / norm)
    } else {
        *a
    }
}

/// Transform a point by a 4x4 matrix (w = 1, no perspective divide).
pub fn transform_point(m: &Mat4, p: &Vec3) -> Vec3 {
    let v = m * Vec4::new(p.x, p.y, p.z, 1.0);
    Vec3::new(v.x, v.y, v.z)
}

// ===== Bounding boxes =====

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundBox {
    /// Create a bounding box from its corners.
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// An inverted box that acts as the identity for [`BoundBox::union`].
    pub fn empty() -> Self {
        Self {
            min: Vec3::repeat(f32::MAX),
            max: Vec3::repeat(f32::MIN),
        }
    }

    /// Whether the box encloses no point.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Grow the box to include a point.
    pub fn include_point(&mut self, p: &Vec3) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    /// The smallest box containing both boxes.
    #[must_use]
    pub fn union(&self, other: &BoundBox) -> BoundBox {
        BoundBox {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// Axis-aligned box enclosing this box after transformation by `m`.
    #[must_use]
    pub fn transform(&self, m: &Mat4) -> BoundBox {
        if self.is_empty() {
            return *self;
        }
        let mut result = BoundBox::empty();
        for i in 0..8 {
            let corner = Vec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            );
            result.include_point(&transform_point(m, &corner));
        }
        result
    }
}

impl Default for BoundBox {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn test_trs_applies_scale_then_translation() {
        let m = mat4_from_scale_rotation_translation(
            Vec3::new(2.0, 2.0, 2.0),
            Quat::identity(),
            Vec3::new(1.0, 0.0, 0.0),
        );
        let p = transform_point(&m, &Vec3::new(1.0, 1.0, 1.0));
        assert!(approx(p.x, 3.0));
        assert!(approx(p.y, 2.0));
        assert!(approx(p.z, 2.0));
    }

    #[test]
    fn test_cols_array_is_column_major() {
        let mut cols = [[0.0; 4]; 4];
        cols[0][0] = 1.0;
        cols[1][1] = 1.0;
        cols[2][2] = 1.0;
        cols[3] = [5.0, 6.0, 7.0, 1.0];
        let m = mat4_from_cols_array(&cols);
        assert_eq!(m[(0, 3)], 5.0);
        assert_eq!(m[(1, 3)], 6.0);
        assert_eq!(m[(2, 3)], 7.0);
    }

    #[test]
    fn test_slerp_endpoints_and_midpoint() {
        let a = Quat::identity();
        let half = std::f32::consts::FRAC_PI_4;
        let b = quat_from_array([0.0, (half).sin(), 0.0, (half).cos()]);

        let start = slerp(&a, &b, 0.0);
        let end = slerp(&a, &b, 1.0);
        assert!(approx(start.w, 1.0));
        assert!(approx(end.j, b.j));

        let mid = slerp(&a, &b, 0.5);
        let expected = (std::f32::consts::PI / 8.0).sin();
        assert!(approx(mid.j, expected));
        assert!(approx(mid.norm(), 1.0));
    }

    #[test]
    fn test_slerp_takes_shortest_arc() {
        let a = Quat::identity();
        let b = -Quat::identity();
        let q = slerp(&a, &b, 0.5);
        assert!(approx(q.w.abs(), 1.0));
    }

    #[test]
    fn test_bound_box_transform() {
        let b = BoundBox::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0));
        let m = Mat4::new_translation(&Vec3::new(10.0, 0.0, 0.0));
        let t = b.transform(&m);
        assert!(approx(t.min.x, 9.0));
        assert!(approx(t.max.x, 11.0));
    }

    #[test]
    fn test_bound_box_union_with_empty() {
        let b = BoundBox::new(Vec3::zeros(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(BoundBox::empty().union(&b), b);
        assert!(BoundBox::empty().is_empty());
    }
}
