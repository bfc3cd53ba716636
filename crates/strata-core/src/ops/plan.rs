//! Per-call memory options and their resolution into a plan.

use tracing::debug;

use crate::dense::DenseTensor;
use crate::error::ArithError;
use crate::shape::Shape;
use crate::tensor::Tensor;
use crate::{DType, Result};

/// One per-call memory option.
#[derive(Debug)]
pub enum FuncOpt<'t> {
    /// Allocate a fresh result (the default).
    Safe,
    /// Overwrite the left operand. Only honoured when the operand is passed
    /// as [`Lhs::InPlace`](crate::Lhs::InPlace).
    UnsafeInPlace,
    /// Write the result into this tensor, discarding its contents.
    WithReuse(&'t mut Tensor),
    /// Add the result onto this tensor's contents.
    WithIncr(&'t mut Tensor),
}

#[derive(Debug)]
enum Target<'t> {
    Reuse(&'t mut Tensor),
    Incr(&'t mut Tensor),
}

/// A validated set of [`FuncOpt`]s. At most one destination is allowed.
#[derive(Debug)]
pub struct FuncOpts<'t> {
    safe: bool,
    target: Option<Target<'t>>,
}

impl Default for FuncOpts<'_> {
    fn default() -> Self {
        Self {
            safe: true,
            target: None,
        }
    }
}

impl<'t> FuncOpts<'t> {
    /// Combine options. Later `Safe`/`UnsafeInPlace` entries override earlier
    /// ones; a second destination is rejected.
    pub fn new(opts: impl IntoIterator<Item = FuncOpt<'t>>) -> Result<Self> {
        let mut out = FuncOpts::default();
        for opt in opts {
            match opt {
                FuncOpt::Safe => out.safe = true,
                FuncOpt::UnsafeInPlace => out.safe = false,
                FuncOpt::WithReuse(t) => out.set_target(Target::Reuse(t))?,
                FuncOpt::WithIncr(t) => out.set_target(Target::Incr(t))?,
            }
        }
        Ok(out)
    }

    pub fn safe() -> Self {
        Self::default()
    }

    pub fn unsafe_in_place() -> Self {
        Self {
            safe: false,
            target: None,
        }
    }

    pub fn with_reuse(target: &'t mut Tensor) -> Self {
        Self {
            safe: true,
            target: Some(Target::Reuse(target)),
        }
    }

    pub fn with_incr(target: &'t mut Tensor) -> Self {
        Self {
            safe: true,
            target: Some(Target::Incr(target)),
        }
    }

    pub fn is_safe(&self) -> bool {
        self.safe
    }

    pub fn has_destination(&self) -> bool {
        self.target.is_some()
    }

    fn set_target(&mut self, target: Target<'t>) -> Result<()> {
        if self.target.is_some() {
            debug!("rejecting second destination option");
            return Err(ArithError::ConflictingDestinations);
        }
        self.target = Some(target);
        Ok(())
    }
}

/// Resolved memory policy for one call.
///
/// `to_reuse` is set whenever `reuse` is present, including in increment mode.
#[derive(Debug)]
pub struct MemoryPlan<'t> {
    pub reuse: Option<&'t mut DenseTensor>,
    pub safe: bool,
    pub to_reuse: bool,
    pub incr: bool,
}

/// Where the result of a call is written.
#[derive(Debug)]
pub enum Destination<'t> {
    /// `dest += a ⊕ b`
    Incr(&'t mut DenseTensor),
    /// `dest = a ⊕ b`
    Reuse(&'t mut DenseTensor),
    /// `a = a ⊕ b`
    InPlace,
    /// fresh tensor
    Safe,
}

impl Destination<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Destination::Incr(_) => "incr",
            Destination::Reuse(_) => "reuse",
            Destination::InPlace => "in-place",
            Destination::Safe => "safe",
        }
    }
}

impl<'t> MemoryPlan<'t> {
    /// Pick the memory mode. Precedence: increment, reuse, unsafe, safe.
    pub fn destination(self) -> Destination<'t> {
        match self.reuse {
            Some(dest) if self.incr => Destination::Incr(dest),
            Some(dest) => Destination::Reuse(dest),
            None if !self.safe => Destination::InPlace,
            None => Destination::Safe,
        }
    }
}

/// Check a configured destination against the expected result.
pub fn resolve<'t>(exp_shape: &Shape, exp_dtype: DType, opts: FuncOpts<'t>) -> Result<MemoryPlan<'t>> {
    let FuncOpts { safe, target } = opts;
    let (target, incr) = match target {
        None => {
            return Ok(MemoryPlan {
                reuse: None,
                safe,
                to_reuse: false,
                incr: false,
            })
        }
        Some(Target::Reuse(t)) => (t, false),
        Some(Target::Incr(t)) => (t, true),
    };

    let reuse = match target {
        Tensor::Dense(d) => d,
        other => {
            return Err(ArithError::type_mismatch("Dense", other.kind_name())
                .context("cannot reuse a different type of tensor"))
        }
    };

    if reuse.dtype().kind() != exp_dtype.kind() {
        return Err(ArithError::type_mismatch(exp_dtype, reuse.dtype()).context("cannot use reuse"));
    }

    if reuse.numel() != exp_shape.numel() {
        return Err(ArithError::ShapeMismatch {
            expected: exp_shape.dims().to_vec(),
            got: reuse.shape().dims().to_vec(),
        }
        .context("cannot use reuse: shape mismatch"));
    }

    if !reuse.is_natively_accessible() {
        return Err(ArithError::InaccessibleData(format!("{reuse:?}")));
    }

    if reuse.has_overlap() {
        return Err(ArithError::OverlappingDestination {
            shape: reuse.shape().dims().to_vec(),
        });
    }

    Ok(MemoryPlan {
        reuse: Some(reuse),
        safe,
        to_reuse: true,
        incr,
    })
}
