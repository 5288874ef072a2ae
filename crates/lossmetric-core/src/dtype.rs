//! Scalar element types.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Element type of a [`Dataset`](crate::Dataset).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    /// 32-bit IEEE float.
    Float,
    /// 64-bit IEEE float.
    Double,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    /// Untyped bytes.
    Byte,
}

impl DType {
    /// All element types, in declaration order.
    pub const ALL: [DType; 11] = [
        DType::Float,
        DType::Double,
        DType::Int8,
        DType::Int16,
        DType::Int32,
        DType::Int64,
        DType::Uint8,
        DType::Uint16,
        DType::Uint32,
        DType::Uint64,
        DType::Byte,
    ];

    /// Returns the stable type name used on external command lines.
    pub fn name(&self) -> &'static str {
        match self {
            DType::Float => "float",
            DType::Double => "double",
            DType::Int8 => "int8",
            DType::Int16 => "int16",
            DType::Int32 => "int32",
            DType::Int64 => "int64",
            DType::Uint8 => "uint8",
            DType::Uint16 => "uint16",
            DType::Uint32 => "uint32",
            DType::Uint64 => "uint64",
            DType::Byte => "byte",
        }
    }

    /// Width of a single element in bytes.
    pub fn size(&self) -> usize {
        match self {
            DType::Int8 | DType::Uint8 | DType::Byte => 1,
            DType::Int16 | DType::Uint16 => 2,
            DType::Float | DType::Int32 | DType::Uint32 => 4,
            DType::Double | DType::Int64 | DType::Uint64 => 8,
        }
    }

    /// Returns true for `float` and `double`.
    pub fn is_floating(&self) -> bool {
        matches!(self, DType::Float | DType::Double)
    }
}

impl std::fmt::Display for DType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown type name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown element type '{0}'")]
pub struct UnknownDType(pub String);

impl FromStr for DType {
    type Err = UnknownDType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DType::ALL
            .iter()
            .copied()
            .find(|dtype| dtype.name() == s)
            .ok_or_else(|| UnknownDType(s.to_string()))
    }
}
