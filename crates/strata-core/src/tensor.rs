use std::fmt;

use crate::dense::DenseTensor;
use crate::shape::Shape;
use crate::sparse::CsTensor;
use crate::DType;

/// Representation of a tensor as seen by the dispatcher.
#[derive(Debug, Clone, Copy)]
pub enum Repr<'a> {
    Dense(&'a DenseTensor),
    Sparse(&'a CsTensor),
    /// A representation this crate has no kernels for, with a short name
    /// used in error messages.
    Other(&'static str),
}

/// Anything that can be handed to the arithmetic dispatcher.
pub trait TensorLike: fmt::Debug {
    fn dtype(&self) -> DType;
    fn shape(&self) -> &Shape;
    /// Whether the host can read the tensor's memory directly.
    fn is_natively_accessible(&self) -> bool;
    fn repr(&self) -> Repr<'_>;
}

impl TensorLike for DenseTensor {
    fn dtype(&self) -> DType {
        DenseTensor::dtype(self)
    }

    fn shape(&self) -> &Shape {
        DenseTensor::shape(self)
    }

    fn is_natively_accessible(&self) -> bool {
        DenseTensor::is_natively_accessible(self)
    }

    fn repr(&self) -> Repr<'_> {
        Repr::Dense(self)
    }
}

impl TensorLike for CsTensor {
    fn dtype(&self) -> DType {
        CsTensor::dtype(self)
    }

    fn shape(&self) -> &Shape {
        CsTensor::shape(self)
    }

    fn is_natively_accessible(&self) -> bool {
        CsTensor::is_natively_accessible(self)
    }

    fn repr(&self) -> Repr<'_> {
        Repr::Sparse(self)
    }
}

/// A tensor in one of the representations this crate computes on.
#[derive(Debug, Clone)]
pub enum Tensor {
    Dense(DenseTensor),
    Sparse(CsTensor),
}

impl Tensor {
    pub fn as_dense(&self) -> Option<&DenseTensor> {
        match self {
            Tensor::Dense(d) => Some(d),
            Tensor::Sparse(_) => None,
        }
    }

    pub fn into_dense(self) -> Option<DenseTensor> {
        match self {
            Tensor::Dense(d) => Some(d),
            Tensor::Sparse(_) => None,
        }
    }

    pub fn is_sparse(&self) -> bool {
        matches!(self, Tensor::Sparse(_))
    }

    /// Short name of the representation, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Tensor::Dense(_) => "Dense",
            Tensor::Sparse(_) => "CS",
        }
    }
}

impl TensorLike for Tensor {
    fn dtype(&self) -> DType {
        match self {
            Tensor::Dense(d) => d.dtype(),
            Tensor::Sparse(s) => s.dtype(),
        }
    }

    fn shape(&self) -> &Shape {
        match self {
            Tensor::Dense(d) => d.shape(),
            Tensor::Sparse(s) => s.shape(),
        }
    }

    fn is_natively_accessible(&self) -> bool {
        match self {
            Tensor::Dense(d) => d.is_natively_accessible(),
            Tensor::Sparse(s) => s.is_natively_accessible(),
        }
    }

    fn repr(&self) -> Repr<'_> {
        match self {
            Tensor::Dense(d) => Repr::Dense(d),
            Tensor::Sparse(s) => Repr::Sparse(s),
        }
    }
}

impl From<DenseTensor> for Tensor {
    fn from(t: DenseTensor) -> Self {
        Tensor::Dense(t)
    }
}

impl From<CsTensor> for Tensor {
    fn from(t: CsTensor) -> Self {
        Tensor::Sparse(t)
    }
}
