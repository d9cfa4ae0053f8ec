//! Voxel element types.
//!
//! Stacks are stored with a fixed element type chosen by the caller. Values
//! decoded from the source images are converted with Rust `as` casts: integer
//! narrowing wraps, float-to-integer saturates. No range check is performed.

use std::fmt::Debug;

use clap::ValueEnum;

/// Element type of a stored stack.
pub trait Voxel: Copy + Default + PartialOrd + Debug + Send + Sync + 'static {
    /// N5 `dataType` attribute value
    const DATA_TYPE: &'static str;

    /// Size of one element in bytes
    const BYTES: usize;

    /// Whether averaged values must be rounded before conversion
    const INTEGER: bool;

    fn from_u8(value: u8) -> Self;
    fn from_u16(value: u16) -> Self;
    fn from_f32(value: f32) -> Self;
    fn from_f64(value: f64) -> Self;
    fn to_f64(self) -> f64;

    /// Append the big-endian encoding of `self` to `out`.
    fn write_be(self, out: &mut Vec<u8>);
}

macro_rules! impl_voxel {
    ($($t:ty => $name:literal, $integer:literal);* $(;)?) => {
        $(
            impl Voxel for $t {
                const DATA_TYPE: &'static str = $name;
                const BYTES: usize = std::mem::size_of::<$t>();
                const INTEGER: bool = $integer;

                fn from_u8(value: u8) -> Self {
                    value as $t
                }

                fn from_u16(value: u16) -> Self {
                    value as $t
                }

                fn from_f32(value: f32) -> Self {
                    value as $t
                }

                fn from_f64(value: f64) -> Self {
                    value as $t
                }

                fn to_f64(self) -> f64 {
                    self as f64
                }

                fn write_be(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_be_bytes());
                }
            }
        )*
    };
}

impl_voxel! {
    u8 => "uint8", true;
    u16 => "uint16", true;
    i16 => "int16", true;
    f32 => "float32", false;
}

/// Runtime selection of the stored element type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum PixelType {
    #[value(name = "uint8")]
    U8,
    #[default]
    #[value(name = "uint16")]
    U16,
    #[value(name = "int16")]
    I16,
    #[value(name = "float32")]
    F32,
}

impl PixelType {
    /// N5 `dataType` name of this element type.
    pub fn data_type(self) -> &'static str {
        match self {
            PixelType::U8 => u8::DATA_TYPE,
            PixelType::U16 => u16::DATA_TYPE,
            PixelType::I16 => i16::DATA_TYPE,
            PixelType::F32 => f32::DATA_TYPE,
        }
    }
}
