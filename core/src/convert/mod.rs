//! Attribute stream conversion.
//!
//! Source attributes come in any of seven component types, any component
//! count and any byte stride. [`write_components`] converts `count` elements
//! into a destination byte range with its own type, count and stride, copying
//! `min(src_components, dst_components)` components per element and leaving
//! the rest untouched. The (source type, destination type) pair is resolved
//! once per call through a static dispatch table.
//!
//! # Example
//!
//! ```ignore
//! // Pack float RGBA colors into normalized u8x4.
//! write_components(
//!     &src, ValueType::Float32, 4, 16,
//!     &mut dst, ValueType::Uint8, 4, 4,
//!     vertex_count, true,
//! );
//! ```

mod element;
mod index;
mod key;

pub use element::{Component, ConvertElement};
pub use index::pack_indices;
pub use key::{ConversionKey, ConversionResult};

use crate::layout::ValueType;

/// Bind `$t` to the Rust type of a convertible [`ValueType`] and evaluate
/// `$body`. Panics on a type the engine cannot handle.
macro_rules! with_component_type {
    ($value_type:expr, $role:literal, |$t:ident| $body:expr) => {
        match $value_type {
            ValueType::Int8 => {
                type $t = i8;
                $body
            }
            ValueType::Uint8 => {
                type $t = u8;
                $body
            }
            ValueType::Int16 => {
                type $t = i16;
                $body
            }
            ValueType::Uint16 => {
                type $t = u16;
                $body
            }
            ValueType::Int32 => {
                type $t = i32;
                $body
            }
            ValueType::Uint32 => {
                type $t = u32;
                $body
            }
            ValueType::Float32 => {
                type $t = f32;
                $body
            }
            unsupported => unreachable!(
                "unsupported {} component type {:?}",
                $role, unsupported
            ),
        }
    };
}

/// Convert `count` elements from `src` into `dst`.
///
/// A `src_stride` of 0 repeats the first source element, which is how
/// default values are stamped. Both slices must cover `count` elements at
/// their stride; the destination range is written in place.
///
/// # Panics
///
/// Panics if either type is not convertible (see
/// [`ValueType::is_convertible`]) or a slice is too short.
#[allow(clippy::too_many_arguments)]
pub fn write_components(
    src: &[u8],
    src_type: ValueType,
    src_components: usize,
    src_stride: usize,
    dst: &mut [u8],
    dst_type: ValueType,
    dst_components: usize,
    dst_stride: usize,
    count: usize,
    normalized: bool,
) {
    let components = src_components.min(dst_components);
    if count == 0 || components == 0 {
        return;
    }

    let streams = Streams {
        src,
        src_stride,
        dst,
        dst_stride,
        components,
        count,
        normalized,
    };

    with_component_type!(dst_type, "destination", |D| {
        with_component_type!(src_type, "source", |S| streams.convert::<S, D>())
    })
}

/// Stamp `value` across `count` destination elements.
pub fn fill_default(
    dst: &mut [u8],
    dst_type: ValueType,
    dst_components: usize,
    dst_stride: usize,
    count: usize,
    value: [f32; 4],
    normalized: bool,
) {
    let src: &[u8] = bytemuck::cast_slice(&value);
    write_components(
        src,
        ValueType::Float32,
        4,
        0,
        dst,
        dst_type,
        dst_components,
        dst_stride,
        count,
        normalized,
    );
}

/// Read `count` elements as floats with `components` lanes each.
///
/// Missing source components read as zero.
pub fn read_floats(
    src: &[u8],
    src_type: ValueType,
    src_components: usize,
    src_stride: usize,
    count: usize,
    components: usize,
    normalized: bool,
) -> Vec<f32> {
    let mut out = vec![0.0f32; count * components];
    write_components(
        src,
        src_type,
        src_components,
        src_stride,
        bytemuck::cast_slice_mut(out.as_mut_slice()),
        ValueType::Float32,
        components,
        components * 4,
        count,
        normalized,
    );
    out
}

struct Streams<'a, 'b> {
    src: &'a [u8],
    src_stride: usize,
    dst: &'b mut [u8],
    dst_stride: usize,
    components: usize,
    count: usize,
    normalized: bool,
}

impl Streams<'_, '_> {
    fn convert<S: Component, D: ConvertElement<S>>(mut self) {
        for i in 0..self.count {
            let src = &self.src[i * self.src_stride..];
            let dst = &mut self.dst[i * self.dst_stride..];
            for c in 0..self.components {
                let value = S::read(&src[c * S::SIZE..]);
                D::convert(value, self.normalized).write(&mut dst[c * D::SIZE..]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floats_to_bytes(values: &[f32]) -> Vec<u8> {
        bytemuck::cast_slice(values).to_vec()
    }

    fn bytes_to_floats(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    #[test]
    fn test_float3_to_float3_with_padding_stride() {
        let src = floats_to_bytes(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let mut dst = vec![0xAAu8; 2 * 16];
        write_components(
            &src,
            ValueType::Float32,
            3,
            12,
            &mut dst,
            ValueType::Float32,
            3,
            16,
            2,
            false,
        );
        assert_eq!(bytes_to_floats(&dst[..12]), vec![1.0, 2.0, 3.0]);
        assert_eq!(bytes_to_floats(&dst[16..28]), vec![4.0, 5.0, 6.0]);
        // Padding between elements is left untouched.
        assert_eq!(&dst[12..16], &[0xAA; 4]);
    }

    #[test]
    fn test_fewer_source_components_leave_rest_untouched() {
        let src = floats_to_bytes(&[0.5, 0.25]);
        let mut dst = vec![7u8; 16];
        write_components(
            &src,
            ValueType::Float32,
            2,
            8,
            &mut dst,
            ValueType::Float32,
            4,
            16,
            1,
            false,
        );
        assert_eq!(bytes_to_floats(&dst[..8]), vec![0.5, 0.25]);
        assert_eq!(&dst[8..], &[7u8; 8]);
    }

    #[test]
    fn test_float_colors_to_unorm8() {
        let src = floats_to_bytes(&[1.0, 0.0, 0.5, 1.0]);
        let mut dst = vec![0u8; 4];
        write_components(
            &src,
            ValueType::Float32,
            4,
            16,
            &mut dst,
            ValueType::Uint8,
            4,
            4,
            1,
            true,
        );
        assert_eq!(dst, vec![255, 0, 128, 255]);
    }

    #[test]
    fn test_u16_joints_to_float() {
        let src: Vec<u8> = [1u16, 2, 3, 4]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        let out = read_floats(&src, ValueType::Uint16, 4, 8, 1, 4, false);
        assert_eq!(out, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_fill_default_repeats_value() {
        let mut dst = vec![0u8; 3 * 4];
        fill_default(&mut dst, ValueType::Uint8, 4, 4, 3, [1.0, 0.0, 1.0, 1.0], true);
        assert_eq!(dst, vec![255, 0, 255, 255, 255, 0, 255, 255, 255, 0, 255, 255]);
    }

    #[test]
    fn test_read_floats_pads_missing_components() {
        let src = floats_to_bytes(&[1.0, 2.0]);
        let out = read_floats(&src, ValueType::Float32, 2, 8, 1, 4, false);
        assert_eq!(out, vec![1.0, 2.0, 0.0, 0.0]);
    }

    #[test]
    #[should_panic(expected = "unsupported destination component type")]
    fn test_unsupported_destination_panics() {
        let src = floats_to_bytes(&[1.0]);
        let mut dst = vec![0u8; 2];
        write_components(
            &src,
            ValueType::Float32,
            1,
            4,
            &mut dst,
            ValueType::Float16,
            1,
            2,
            1,
            false,
        );
    }
}
