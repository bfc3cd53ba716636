//! The compute capability the dispatcher drives.
//!
//! A [`ComputeEngine`] performs typed arithmetic on raw [`Header`]s, walking
//! [`FlatIter`]s when the layout is not a plain contiguous buffer. Each
//! operator family has four entrypoints (flat, flat-increment, iterator,
//! iterator-increment); the dispatcher picks exactly one per call.

use std::fmt;

use thiserror::Error;

use crate::header::{Header, HeaderMut};
use crate::iter::FlatIter;
use crate::DType;

/// Errors raised by a compute engine. The dispatcher passes them through
/// unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KernelError {
    #[error("Element type mismatch: expected {expected}, got {got}")]
    ElementMismatch { expected: DType, got: DType },

    #[error("{op} is not supported for dtype {dtype}")]
    UnsupportedOp { op: &'static str, dtype: DType },

    #[error("Length mismatch: destination has {dst} elements, source has {src}")]
    LengthMismatch { dst: usize, src: usize },

    #[error("Iterators produced different numbers of elements")]
    IteratorLength,

    #[error("Offset {index} out of bounds for buffer of {len} elements")]
    OutOfBounds { index: usize, len: usize },

    #[error("Integer division by zero at element {index}")]
    DivideByZero { index: usize },

    #[error("Destination iterator produced an implicit-zero slot")]
    HoleInDestination,

    #[error("Buffer of {0} elements is not aligned for its element type")]
    Misaligned(DType),
}

/// Elementwise binary operators.
///
/// `RevSub` and `RevDiv` compute `rhs - lhs` and `rhs / lhs`; the dispatcher
/// uses them when it swaps operands to keep the dense one on the left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    RevSub,
    RevDiv,
}

impl BinOp {
    /// Operator name used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            BinOp::Add => "Add",
            BinOp::Sub => "Sub",
            BinOp::Mul => "Mul",
            BinOp::Div => "Div",
            BinOp::RevSub => "RevSub",
            BinOp::RevDiv => "RevDiv",
        }
    }

    /// The operator that gives the same result with operands exchanged.
    pub fn swapped(&self) -> BinOp {
        match self {
            BinOp::Add => BinOp::Add,
            BinOp::Mul => BinOp::Mul,
            BinOp::Sub => BinOp::RevSub,
            BinOp::RevSub => BinOp::Sub,
            BinOp::Div => BinOp::RevDiv,
            BinOp::RevDiv => BinOp::Div,
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Elementwise unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Abs,
    Square,
    Sqrt,
}

impl UnaryOp {
    pub fn name(&self) -> &'static str {
        match self {
            UnaryOp::Neg => "Neg",
            UnaryOp::Abs => "Abs",
            UnaryOp::Square => "Square",
            UnaryOp::Sqrt => "Sqrt",
        }
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Typed elementwise arithmetic over raw headers.
///
/// `elem` is the element type the caller expects every header to carry.
/// Iterator entrypoints walk all iterators in lockstep; an iterator slot of
/// `None` reads as zero and never appears on a destination iterator.
pub trait ComputeEngine: Send + Sync {
    /// `dst[i] = dst[i] ⊕ src[i]`
    fn binary(
        &self,
        op: BinOp,
        elem: DType,
        dst: HeaderMut<'_>,
        src: Header<'_>,
    ) -> Result<(), KernelError>;

    /// `dst[i] += a[i] ⊕ b[i]`
    fn binary_incr(
        &self,
        op: BinOp,
        elem: DType,
        a: Header<'_>,
        b: Header<'_>,
        dst: HeaderMut<'_>,
    ) -> Result<(), KernelError>;

    /// `dst[d] = dst[d] ⊕ src[s]` for `(d, s)` drawn from the two iterators.
    fn binary_iter(
        &self,
        op: BinOp,
        elem: DType,
        dst: HeaderMut<'_>,
        src: Header<'_>,
        dst_it: &mut FlatIter,
        src_it: &mut FlatIter,
    ) -> Result<(), KernelError>;

    /// `dst[k] += a[i] ⊕ b[j]` for `(i, j, k)` drawn from the three iterators.
    #[allow(clippy::too_many_arguments)]
    fn binary_iter_incr(
        &self,
        op: BinOp,
        elem: DType,
        a: Header<'_>,
        b: Header<'_>,
        dst: HeaderMut<'_>,
        a_it: &mut FlatIter,
        b_it: &mut FlatIter,
        dst_it: &mut FlatIter,
    ) -> Result<(), KernelError>;

    /// `dst[i] = op(dst[i])`
    fn unary(&self, op: UnaryOp, elem: DType, dst: HeaderMut<'_>) -> Result<(), KernelError>;

    /// `dst[i] += op(src[i])`
    fn unary_incr(
        &self,
        op: UnaryOp,
        elem: DType,
        src: Header<'_>,
        dst: HeaderMut<'_>,
    ) -> Result<(), KernelError>;

    /// `dst[d] = op(dst[d])` for each `d` of the iterator.
    fn unary_iter(
        &self,
        op: UnaryOp,
        elem: DType,
        dst: HeaderMut<'_>,
        dst_it: &mut FlatIter,
    ) -> Result<(), KernelError>;

    /// `dst[d] += op(src[s])` for `(s, d)` drawn from the two iterators.
    fn unary_iter_incr(
        &self,
        op: UnaryOp,
        elem: DType,
        src: Header<'_>,
        dst: HeaderMut<'_>,
        src_it: &mut FlatIter,
        dst_it: &mut FlatIter,
    ) -> Result<(), KernelError>;
}
