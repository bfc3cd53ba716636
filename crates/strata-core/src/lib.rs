//! # strata-core
//!
//! Elementwise arithmetic dispatch for dense and sparse tensors.
//!
//! Provides:
//! - Dense strided tensors over shared copy-on-write storage
//! - Compressed sparse (CSR / CSC) 2-D tensors
//! - Raw headers and flat iterators handed to compute engines
//! - The [`ComputeEngine`] capability and the [`ArithEngine`] dispatcher,
//!   which resolves operand kinds, layouts and memory modes into a single
//!   engine call

pub mod dense;
pub mod device;
pub mod dtype;
pub mod engine;
pub mod error;
pub mod header;
pub mod iter;
pub mod ops;
pub mod outcome;
pub mod prelude;
pub mod shape;
pub mod sparse;
pub mod storage;
pub mod tensor;

pub use dense::DenseTensor;
pub use device::Device;
pub use dtype::{DType, DTypeKind, Element};
pub use engine::{BinOp, ComputeEngine, KernelError, UnaryOp};
pub use error::ArithError;
pub use header::{Header, HeaderMut};
pub use iter::{FlatIter, Slot};
pub use ops::{ArithEngine, FuncOpt, FuncOpts, Lhs, Output};
pub use outcome::Outcome;
pub use shape::Shape;
pub use sparse::{CompressedAxis, CsTensor};
pub use storage::Storage;
pub use tensor::{Repr, Tensor, TensorLike};

pub type Result<T> = std::result::Result<T, ArithError>;
