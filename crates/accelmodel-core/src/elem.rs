use core::str::FromStr;
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Element type of a matrix operand or output.
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum ElemType {
    /// 8-bit float.
    #[display("f8")]
    #[serde(rename = "f8")]
    F8,
    /// 16-bit brain float.
    #[display("bf16")]
    #[serde(rename = "bf16")]
    BF16,
    /// 32-bit float.
    #[display("f32")]
    #[serde(rename = "f32")]
    F32,
    /// 8-bit integer.
    #[display("int8")]
    #[serde(rename = "int8")]
    I8,
    /// 4-bit integer, two values per byte.
    #[display("int4")]
    #[serde(rename = "int4")]
    I4,
}

impl ElemType {
    /// Every supported element type.
    pub const ALL: [ElemType; 5] = [
        ElemType::F8,
        ElemType::BF16,
        ElemType::F32,
        ElemType::I8,
        ElemType::I4,
    ];

    /// Number of bits used to store one element.
    pub fn size_bits(&self) -> usize {
        match self {
            ElemType::F8 => 8,
            ElemType::BF16 => 16,
            ElemType::F32 => 32,
            ElemType::I8 => 8,
            ElemType::I4 => 4,
        }
    }

    /// Number of bytes used to store one element. Fractional for sub-byte types.
    pub fn size_bytes(&self) -> f64 {
        self.size_bits() as f64 / 8.0
    }

    /// Whether the type is stored in fewer than 16 bits.
    pub fn is_narrow(&self) -> bool {
        self.size_bits() < 16
    }
}

/// Error returned when an element type name can't be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown element type `{name}`, expected one of f8, bf16, f32, int8, int4")]
pub struct ElemParseError {
    /// The rejected name.
    pub name: String,
}

impl FromStr for ElemType {
    type Err = ElemParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "f8" | "fp8" | "float8" => Ok(ElemType::F8),
            "bf16" | "bfloat16" => Ok(ElemType::BF16),
            "f32" | "fp32" | "float32" => Ok(ElemType::F32),
            "int8" | "i8" => Ok(ElemType::I8),
            "int4" | "i4" => Ok(ElemType::I4),
            _ => Err(ElemParseError {
                name: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_widths_follow_bit_sizes() {
        assert_eq!(ElemType::F8.size_bytes(), 1.0);
        assert_eq!(ElemType::BF16.size_bytes(), 2.0);
        assert_eq!(ElemType::F32.size_bytes(), 4.0);
        assert_eq!(ElemType::I8.size_bytes(), 1.0);
        assert_eq!(ElemType::I4.size_bytes(), 0.5);
    }

    #[test]
    fn parses_display_names_and_aliases() {
        for elem in ElemType::ALL {
            assert_eq!(elem.to_string().parse::<ElemType>(), Ok(elem));
        }
        assert_eq!("FP8".parse::<ElemType>(), Ok(ElemType::F8));
        assert_eq!(" i4 ".parse::<ElemType>(), Ok(ElemType::I4));
        assert!("f64".parse::<ElemType>().is_err());
    }
}
