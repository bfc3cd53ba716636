use std::fmt;

use half::{bf16, f16};

/// Element types supported by strata tensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    /// 16-bit IEEE 754 half-precision float
    F16,
    /// 16-bit Brain Float (same exponent range as F32, reduced mantissa)
    BF16,
    /// 32-bit IEEE 754 single-precision float
    F32,
    /// 64-bit IEEE 754 double-precision float
    F64,
    /// 8-bit signed integer
    I8,
    /// 8-bit unsigned integer
    U8,
    /// 32-bit signed integer
    I32,
    /// 64-bit signed integer
    I64,
    /// Boolean stored as one byte per element. Not a number.
    Bool,
}

/// Coarse family of a [`DType`].
///
/// Operand compatibility is decided on the kind, not on the exact width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DTypeKind {
    Float,
    Int,
    UInt,
    Bool,
}

impl DType {
    /// Size in bytes of a single element.
    pub fn size(&self) -> usize {
        match self {
            DType::F16 | DType::BF16 => 2,
            DType::F32 | DType::I32 => 4,
            DType::F64 | DType::I64 => 8,
            DType::I8 | DType::U8 | DType::Bool => 1,
        }
    }

    /// Number of bytes needed to store `n` elements of this dtype.
    pub fn storage_bytes(&self, n: usize) -> usize {
        self.size() * n
    }

    /// The family this dtype belongs to.
    pub fn kind(&self) -> DTypeKind {
        match self {
            DType::F16 | DType::BF16 | DType::F32 | DType::F64 => DTypeKind::Float,
            DType::I8 | DType::I32 | DType::I64 => DTypeKind::Int,
            DType::U8 => DTypeKind::UInt,
            DType::Bool => DTypeKind::Bool,
        }
    }

    /// Whether arithmetic is defined on this dtype.
    pub fn is_number(&self) -> bool {
        !matches!(self, DType::Bool)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DType::F16 => write!(f, "f16"),
            DType::BF16 => write!(f, "bf16"),
            DType::F32 => write!(f, "f32"),
            DType::F64 => write!(f, "f64"),
            DType::I8 => write!(f, "i8"),
            DType::U8 => write!(f, "u8"),
            DType::I32 => write!(f, "i32"),
            DType::I64 => write!(f, "i64"),
            DType::Bool => write!(f, "bool"),
        }
    }
}

/// Rust scalar types that can back a tensor buffer.
pub trait Element: bytemuck::Pod + Send + Sync + 'static {
    const DTYPE: DType;
}

macro_rules! impl_element {
    ($($t:ty => $d:ident),* $(,)?) => {
        $(
            impl Element for $t {
                const DTYPE: DType = DType::$d;
            }
        )*
    };
}

impl_element!(
    f16 => F16,
    bf16 => BF16,
    f32 => F32,
    f64 => F64,
    i8 => I8,
    u8 => U8,
    i32 => I32,
    i64 => I64,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_sizes() {
        assert_eq!(DType::F32.size(), 4);
        assert_eq!(DType::F64.size(), 8);
        assert_eq!(DType::F16.size(), 2);
        assert_eq!(DType::I8.size(), 1);
        assert_eq!(DType::Bool.size(), 1);
        assert_eq!(DType::I64.storage_bytes(3), 24);
    }

    #[test]
    fn test_kinds() {
        assert_eq!(DType::F32.kind(), DType::F64.kind());
        assert_eq!(DType::BF16.kind(), DTypeKind::Float);
        assert_ne!(DType::F32.kind(), DType::I32.kind());
        assert_ne!(DType::I8.kind(), DType::U8.kind());
        assert_eq!(DType::I64.kind(), DTypeKind::Int);
        assert!(!DType::Bool.is_number());
        assert!(DType::U8.is_number());
    }

    #[test]
    fn test_element_dtypes() {
        assert_eq!(<f32 as Element>::DTYPE, DType::F32);
        assert_eq!(<bf16 as Element>::DTYPE, DType::BF16);
        assert_eq!(<u8 as Element>::DTYPE, DType::U8);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", DType::F32), "f32");
        assert_eq!(format!("{}", DType::Bool), "bool");
    }
}
