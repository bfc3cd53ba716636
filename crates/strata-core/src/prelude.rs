//! Convenience re-exports for common strata-core types.
//!
//! ```rust
//! use strata_core::prelude::*;
//! ```

pub use crate::ArithEngine;
pub use crate::ArithError;
pub use crate::BinOp;
pub use crate::CsTensor;
pub use crate::DType;
pub use crate::DenseTensor;
pub use crate::FuncOpt;
pub use crate::FuncOpts;
pub use crate::Lhs;
pub use crate::Outcome;
pub use crate::Result;
pub use crate::Shape;
pub use crate::Tensor;
pub use crate::TensorLike;
pub use crate::UnaryOp;
