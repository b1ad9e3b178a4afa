//! Per-component numeric conversion.
//!
//! [`Component`] reads and writes one little-endian component and knows its
//! normalized fixed-point encoding. [`ConvertElement`] is implemented for every
//! (source, destination) pair of the seven convertible component types.

/// A scalar type that can appear as an attribute component.
pub trait Component: Copy + 'static {
    /// Size in bytes.
    const SIZE: usize;

    /// Read from the first `SIZE` bytes of `bytes`.
    fn read(bytes: &[u8]) -> Self;

    /// Write into the first `SIZE` bytes of `bytes`.
    fn write(self, bytes: &mut [u8]);

    /// Decode a normalized value. Unsigned integers map to `[0, 1]`, signed
    /// integers to `[-1, 1]`, floats pass through.
    fn to_unit(self) -> f32;

    /// Encode a normalized value with round-to-nearest and saturation.
    fn from_unit(value: f32) -> Self;
}

macro_rules! impl_unsigned {
    ($($t:ty),+) => {
        $(
            impl Component for $t {
                const SIZE: usize = std::mem::size_of::<$t>();

                #[inline]
                fn read(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$t>()];
                    raw.copy_from_slice(&bytes[..Self::SIZE]);
                    <$t>::from_le_bytes(raw)
                }

                #[inline]
                fn write(self, bytes: &mut [u8]) {
                    bytes[..Self::SIZE].copy_from_slice(&self.to_le_bytes());
                }

                #[inline]
                fn to_unit(self) -> f32 {
                    (self as f64 / <$t>::MAX as f64) as f32
                }

                #[inline]
                fn from_unit(value: f32) -> Self {
                    let max = <$t>::MAX as f64;
                    (value as f64 * max).round().clamp(0.0, max) as $t
                }
            }
        )+
    };
}

macro_rules! impl_signed {
    ($($t:ty),+) => {
        $(
            impl Component for $t {
                const SIZE: usize = std::mem::size_of::<$t>();

                #[inline]
                fn read(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$t>()];
                    raw.copy_from_slice(&bytes[..Self::SIZE]);
                    <$t>::from_le_bytes(raw)
                }

                #[inline]
                fn write(self, bytes: &mut [u8]) {
                    bytes[..Self::SIZE].copy_from_slice(&self.to_le_bytes());
                }

                #[inline]
                fn to_unit(self) -> f32 {
                    (self as f64 / <$t>::MAX as f64).max(-1.0) as f32
                }

                // The most negative value is never produced, so the encoding
                // stays symmetric around zero.
                #[inline]
                fn from_unit(value: f32) -> Self {
                    let max = <$t>::MAX as f64;
                    (value as f64 * max).round().clamp(-max, max) as $t
                }
            }
        )+
    };
}

impl_unsigned!(u8, u16, u32);
impl_signed!(i8, i16, i32);

impl Component for f32 {
    const SIZE: usize = 4;

    #[inline]
    fn read(bytes: &[u8]) -> Self {
        bytemuck::pod_read_unaligned(&bytes[..4])
    }

    #[inline]
    fn write(self, bytes: &mut [u8]) {
        bytes[..4].copy_from_slice(&self.to_le_bytes());
    }

    #[inline]
    fn to_unit(self) -> f32 {
        self
    }

    #[inline]
    fn from_unit(value: f32) -> Self {
        value
    }
}

/// Conversion of one component from `S`.
pub trait ConvertElement<S: Component>: Component {
    /// Convert `src`. With `normalized` set, integers on either side are
    /// treated as fixed-point fractions; otherwise this is a plain numeric
    /// cast (integer narrowing truncates, widening extends by source
    /// signedness, float to integer saturates).
    fn convert(src: S, normalized: bool) -> Self;
}

macro_rules! impl_convert_from {
    ($src:ty => $($dst:ty),+) => {
        $(
            impl ConvertElement<$src> for $dst {
                #[inline]
                fn convert(src: $src, normalized: bool) -> Self {
                    if normalized {
                        <$dst as Component>::from_unit(src.to_unit())
                    } else {
                        src as $dst
                    }
                }
            }
        )+
    };
}

impl_convert_from!(i8 => i8, u8, i16, u16, i32, u32, f32);
impl_convert_from!(u8 => i8, u8, i16, u16, i32, u32, f32);
impl_convert_from!(i16 => i8, u8, i16, u16, i32, u32, f32);
impl_convert_from!(u16 => i8, u8, i16, u16, i32, u32, f32);
impl_convert_from!(i32 => i8, u8, i16, u16, i32, u32, f32);
impl_convert_from!(u32 => i8, u8, i16, u16, i32, u32, f32);
impl_convert_from!(f32 => i8, u8, i16, u16, i32, u32, f32);
