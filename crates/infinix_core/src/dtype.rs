#![allow(non_upper_case_globals)]

use crate::error::{Error, Result};
use ::half::{bf16, f16};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;

pub const bfloat16: DType = DType::BF16;
pub const float16: DType = DType::F16;
pub const half: DType = DType::F16;
pub const float32: DType = DType::F32;
pub const float64: DType = DType::F64;
pub const bool: DType = DType::BOOL;
pub const uint8: DType = DType::U8;
pub const uint32: DType = DType::U32;
pub const int8: DType = DType::I8;
pub const int32: DType = DType::I32;
pub const int64: DType = DType::I64;

/// Element type catalog. The discriminant is the raw type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u32)]
pub enum DType {
    BYTE = 1,
    BOOL = 2,
    I8 = 3,
    I16 = 4,
    I32 = 5,
    I64 = 6,
    U8 = 7,
    U16 = 8,
    U32 = 9,
    U64 = 10,
    F8 = 11,
    F16 = 12,
    F32 = 13,
    F64 = 14,
    C16 = 15,
    C32 = 16,
    C64 = 17,
    C128 = 18,
    BF16 = 19,
}

impl DType {
    pub const ALL: [DType; 19] = [
        DType::BYTE,
        DType::BOOL,
        DType::I8,
        DType::I16,
        DType::I32,
        DType::I64,
        DType::U8,
        DType::U16,
        DType::U32,
        DType::U64,
        DType::F8,
        DType::F16,
        DType::F32,
        DType::F64,
        DType::C16,
        DType::C32,
        DType::C64,
        DType::C128,
        DType::BF16,
    ];

    pub fn tag(&self) -> u32 {
        *self as u32
    }

    pub fn from_tag(tag: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|d| d.tag() == tag)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BYTE => "BYTE",
            Self::BOOL => "BOOL",
            Self::I8 => "I8",
            Self::I16 => "I16",
            Self::I32 => "I32",
            Self::I64 => "I64",
            Self::U8 => "U8",
            Self::U16 => "U16",
            Self::U32 => "U32",
            Self::U64 => "U64",
            Self::F8 => "F8",
            Self::F16 => "F16",
            Self::F32 => "F32",
            Self::F64 => "F64",
            Self::C16 => "C16",
            Self::C32 => "C32",
            Self::C64 => "C64",
            Self::C128 => "C128",
            Self::BF16 => "BF16",
        }
    }

    pub fn size_in_bytes(&self) -> usize {
        match self {
            Self::BYTE | Self::BOOL | Self::I8 | Self::U8 | Self::F8 => 1,
            Self::I16 | Self::U16 | Self::F16 | Self::BF16 | Self::C16 => 2,
            Self::I32 | Self::U32 | Self::F32 | Self::C32 => 4,
            Self::I64 | Self::U64 | Self::F64 | Self::C64 => 8,
            Self::C128 => 16,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Self::F8 | Self::F16 | Self::BF16 | Self::F32 | Self::F64)
    }

    pub fn is_int(&self) -> bool {
        matches!(
            self,
            Self::I8 | Self::I16 | Self::I32 | Self::I64 | Self::U8 | Self::U16 | Self::U32 | Self::U64
        )
    }

    pub fn is_complex(&self) -> bool {
        matches!(self, Self::C16 | Self::C32 | Self::C64 | Self::C128)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Byte width of a raw type tag. Unknown tags are an error.
pub fn dtype_size(tag: u32) -> Result<usize> {
    DType::from_tag(tag)
        .map(|d| d.size_in_bytes())
        .ok_or(Error::InvalidDType(tag))
}

/// Display name of a raw type tag. Unknown tags render as `"INVALID"`.
pub fn dtype_name(tag: u32) -> &'static str {
    DType::from_tag(tag).map_or("INVALID", |d| d.as_str())
}

/// Host element types that can be copied into and out of tensor storage.
pub trait HostElement: bytemuck::Pod + Send + Sync {
    const DTYPE: DType;
}

macro_rules! host_element {
    ($($t:ty => $dtype:ident),* $(,)?) => {
        $(
            impl HostElement for $t {
                const DTYPE: DType = DType::$dtype;
            }
        )*
    };
}

host_element!(
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f16 => F16,
    bf16 => BF16,
    f32 => F32,
    f64 => F64,
);
