use crate::error::ArithError;
use crate::outcome::Outcome;
use crate::shape::Shape;
use crate::tensor::TensorLike;
use crate::{DType, Result};

/// Shape and dtype of the result of a valid call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expected {
    pub shape: Shape,
    pub dtype: DType,
}

fn check_accessible(t: &dyn TensorLike) -> Result<()> {
    if !t.is_natively_accessible() {
        return Err(ArithError::InaccessibleData(format!("{t:?}")));
    }
    Ok(())
}

/// Checks, in order: accessibility of both operands, that at least one holds
/// numbers, equal dtype kinds, equal shapes.
pub fn check_binary(a: &dyn TensorLike, b: &dyn TensorLike) -> Result<Outcome<Expected>> {
    check_accessible(a)?;
    check_accessible(b)?;

    let (at, bt) = (a.dtype(), b.dtype());
    if !at.is_number() && !bt.is_number() {
        return Ok(Outcome::NoOp);
    }
    if at.kind() != bt.kind() {
        return Err(ArithError::type_mismatch(at, bt));
    }
    if a.shape() != b.shape() {
        return Err(ArithError::ShapeMismatch {
            expected: a.shape().dims().to_vec(),
            got: b.shape().dims().to_vec(),
        });
    }
    Ok(Outcome::Done(Expected {
        shape: a.shape().clone(),
        dtype: at,
    }))
}

pub fn check_unary(a: &dyn TensorLike) -> Result<Outcome<Expected>> {
    check_accessible(a)?;
    if !a.dtype().is_number() {
        return Ok(Outcome::NoOp);
    }
    Ok(Outcome::Done(Expected {
        shape: a.shape().clone(),
        dtype: a.dtype(),
    }))
}
