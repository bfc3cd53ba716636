use crate::dense::DenseTensor;
use crate::engine::{BinOp, UnaryOp};
use crate::error::ArithError;
use crate::header::Header;
use crate::iter::FlatIter;
use crate::sparse::CsTensor;
use crate::tensor::Repr;
use crate::Result;

/// The operand that is read but never seeds the destination.
#[derive(Debug, Clone, Copy)]
pub enum Side<'a> {
    Dense(&'a DenseTensor),
    Sparse(&'a CsTensor),
}

impl<'a> Side<'a> {
    pub fn requires_iterator(&self) -> bool {
        match self {
            Side::Dense(d) => d.requires_iterator(),
            Side::Sparse(_) => true,
        }
    }

    pub fn header(&self) -> Result<Header<'a>> {
        match *self {
            Side::Dense(d) => d.header(),
            Side::Sparse(s) => s.header(),
        }
    }

    pub fn iter(&self) -> FlatIter {
        match self {
            Side::Dense(d) => d.iter(),
            Side::Sparse(s) => s.flat_iter(),
        }
    }
}

/// Binary operands rearranged so a dense operand comes first.
#[derive(Debug, Clone, Copy)]
pub struct Normalized<'a> {
    /// Operator to apply as `template ⊕ other`.
    pub op: BinOp,
    /// Dense operand whose values seed or are cloned into the destination.
    pub template: &'a DenseTensor,
    pub other: Side<'a>,
}

/// How the engine walks the buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Traversal {
    Flat,
    Iter,
}

impl Traversal {
    pub fn pick(needs_iter: bool) -> Self {
        if needs_iter {
            Traversal::Iter
        } else {
            Traversal::Flat
        }
    }
}

fn type_not_implemented(op: &str, operand: &str) -> ArithError {
    ArithError::TypeNotImplemented {
        op: op.to_string(),
        operand: operand.to_string(),
    }
}

/// Classify the right operand of a call whose left operand is dense.
pub fn against_dense<'b>(op: BinOp, b: Repr<'b>) -> Result<Side<'b>> {
    match b {
        Repr::Dense(d) => Ok(Side::Dense(d)),
        Repr::Sparse(s) => Ok(Side::Sparse(s)),
        Repr::Other(name) => Err(type_not_implemented(op.name(), name)),
    }
}

/// Classify both operands. `a` is examined before `b`; a sparse `a` paired
/// with a dense `b` swaps them and the operator.
pub fn classify<'a>(op: BinOp, a: Repr<'a>, b: Repr<'a>) -> Result<Normalized<'a>> {
    match a {
        Repr::Dense(a) => Ok(Normalized {
            op,
            template: a,
            other: against_dense(op, b)?,
        }),
        Repr::Sparse(a) => match b {
            Repr::Dense(b) => Ok(Normalized {
                op: op.swapped(),
                template: b,
                other: Side::Sparse(a),
            }),
            Repr::Sparse(_) => Err(ArithError::MethodNotImplemented {
                op: op.name().to_string(),
                combination: "CS-CS".to_string(),
            }),
            Repr::Other(name) => Err(type_not_implemented(op.name(), name)),
        },
        Repr::Other(name) => Err(type_not_implemented(op.name(), name)),
    }
}

/// The dense operand of a unary call.
pub fn classify_unary(op: UnaryOp, a: Repr<'_>) -> Result<&DenseTensor> {
    match a {
        Repr::Dense(d) => Ok(d),
        Repr::Sparse(_) => Err(ArithError::MethodNotImplemented {
            op: op.name().to_string(),
            combination: "CS".to_string(),
        }),
        Repr::Other(name) => Err(type_not_implemented(op.name(), name)),
    }
}
