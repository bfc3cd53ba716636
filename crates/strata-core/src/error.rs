use thiserror::Error;

use crate::engine::KernelError;

/// Errors produced while validating, planning or dispatching an operation.
///
/// "Nothing to compute" is not an error; see [`crate::Outcome::NoOp`].
#[derive(Error, Debug)]
pub enum ArithError {
    #[error("Inaccessible data: {0} is not addressable from the host")]
    InaccessibleData(String),

    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("{op} is not implemented for {combination}")]
    MethodNotImplemented { op: String, combination: String },

    #[error("{op} is not implemented for operand {operand}")]
    TypeNotImplemented { op: String, operand: String },

    #[error("Both a reuse and an increment destination were configured")]
    ConflictingDestinations,

    #[error("Unsafe in-place mode needs a writable operand: pass the left operand as Lhs::InPlace, or overwrite a dense right operand with apply_in_place_rhs")]
    SharedInPlace,

    #[error("Destination of shape {shape:?} has overlapping elements (stride 0)")]
    OverlappingDestination { shape: Vec<usize> },

    #[error("Invalid sparse tensor: {0}")]
    InvalidSparse(String),

    #[error("Cannot reshape tensor of {numel} elements into shape {shape:?}")]
    InvalidReshape { numel: usize, shape: Vec<isize> },

    #[error("Invalid axis {axis} for tensor with {ndim} dimensions")]
    InvalidAxis { axis: usize, ndim: usize },

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("{context}: {source}")]
    Context {
        context: &'static str,
        #[source]
        source: Box<ArithError>,
    },

    #[error(transparent)]
    Engine(#[from] KernelError),
}

impl ArithError {
    /// Wrap this error with a short description of what was being attempted.
    pub fn context(self, context: &'static str) -> Self {
        ArithError::Context {
            context,
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping any context wrappers.
    pub fn root(&self) -> &ArithError {
        match self {
            ArithError::Context { source, .. } => source.root(),
            other => other,
        }
    }

    pub(crate) fn type_mismatch(expected: impl ToString, got: impl ToString) -> Self {
        ArithError::TypeMismatch {
            expected: expected.to_string(),
            got: got.to_string(),
        }
    }
}
