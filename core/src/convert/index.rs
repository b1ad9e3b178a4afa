//! Index stream packing.

use super::element::Component;
use crate::layout::{IndexFormat, ValueType};

/// Pack `count` source indices into `dst` as `dst_format`, adding
/// `base_vertex` to each one.
///
/// Narrowing to 16 bits truncates, so the caller must pick a destination
/// width that holds the largest offset index. Returns the number of indices
/// written, or 0 when the source type is not an unsigned 8/16/32-bit integer.
///
/// # Panics
///
/// Panics if `dst` holds fewer than `count` indices or `src` fewer than
/// `count` elements at `src_stride`.
pub fn pack_indices(
    src: &[u8],
    src_type: ValueType,
    src_stride: usize,
    count: usize,
    dst: &mut [u8],
    dst_format: IndexFormat,
    base_vertex: u32,
) -> u32 {
    let stride = if src_stride == 0 {
        src_type.size()
    } else {
        src_stride
    };

    match src_type {
        ValueType::Uint8 => pack::<u8>(src, stride, count, dst, dst_format, base_vertex),
        ValueType::Uint16 => pack::<u16>(src, stride, count, dst, dst_format, base_vertex),
        ValueType::Uint32 => pack::<u32>(src, stride, count, dst, dst_format, base_vertex),
        other => {
            log::warn!("Unsupported index component type {:?}", other);
            return 0;
        }
    }

    count as u32
}

fn pack<S: Component + Into<u32>>(
    src: &[u8],
    stride: usize,
    count: usize,
    dst: &mut [u8],
    dst_format: IndexFormat,
    base_vertex: u32,
) {
    let dst_size = dst_format.size();
    for i in 0..count {
        let index: u32 = S::read(&src[i * stride..]).into();
        let index = index.wrapping_add(base_vertex);
        let out = &mut dst[i * dst_size..];
        match dst_format {
            IndexFormat::Uint16 => (index as u16).write(out),
            IndexFormat::Uint32 => index.write(out),
        }
    }
}
