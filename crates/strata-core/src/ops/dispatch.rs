use std::ops::Deref;

use tracing::{debug, trace};

use crate::dense::DenseTensor;
use crate::engine::{BinOp, ComputeEngine, UnaryOp};
use crate::error::ArithError;
use crate::header::{copy_header, copy_iter};
use crate::iter::FlatIter;
use crate::outcome::Outcome;
use crate::sparse::CsTensor;
use crate::tensor::{Tensor, TensorLike};
use crate::{DType, Result};

use super::classify::{against_dense, classify, classify_unary, Normalized, Side, Traversal};
use super::plan::{resolve, Destination, FuncOpts, MemoryPlan};
use super::validate::{check_binary, check_unary, Expected};

/// Left operand of a call.
///
/// Only `InPlace` may be overwritten; asking for unsafe in-place mode with a
/// `Shared` operand fails with [`ArithError::SharedInPlace`]. A dense right
/// operand is overwritten through [`ArithEngine::apply_in_place_rhs`].
#[derive(Debug)]
pub enum Lhs<'t> {
    Shared(&'t dyn TensorLike),
    InPlace(&'t mut DenseTensor),
}

impl<'t> From<&'t DenseTensor> for Lhs<'t> {
    fn from(t: &'t DenseTensor) -> Self {
        Lhs::Shared(t)
    }
}

impl<'t> From<&'t CsTensor> for Lhs<'t> {
    fn from(t: &'t CsTensor) -> Self {
        Lhs::Shared(t)
    }
}

impl<'t> From<&'t Tensor> for Lhs<'t> {
    fn from(t: &'t Tensor) -> Self {
        Lhs::Shared(t)
    }
}

impl<'t> From<&'t mut DenseTensor> for Lhs<'t> {
    fn from(t: &'t mut DenseTensor) -> Self {
        Lhs::InPlace(t)
    }
}

/// Result of a call: a new tensor, or the caller's tensor that was written.
#[derive(Debug)]
pub enum Output<'t> {
    Fresh(DenseTensor),
    /// The in-place operand, or the reuse / increment destination.
    Aliased(&'t mut DenseTensor),
}

impl Output<'_> {
    pub fn is_aliased(&self) -> bool {
        matches!(self, Output::Aliased(_))
    }

    /// Take the result by value. An aliased result is cloned (sharing storage).
    pub fn into_dense(self) -> DenseTensor {
        match self {
            Output::Fresh(t) => t,
            Output::Aliased(t) => t.clone(),
        }
    }
}

impl Deref for Output<'_> {
    type Target = DenseTensor;

    fn deref(&self) -> &DenseTensor {
        match self {
            Output::Fresh(t) => t,
            Output::Aliased(t) => t,
        }
    }
}

macro_rules! try_outcome {
    ($e:expr) => {
        match $e? {
            Outcome::Done(v) => v,
            Outcome::NoOp => return Ok(Outcome::NoOp),
        }
    };
}

/// Elementwise arithmetic front end.
///
/// Validates operands, resolves the memory mode, and invokes exactly one
/// entrypoint of the wrapped [`ComputeEngine`] per call.
///
/// ```ignore
/// let engine = ArithEngine::new(CpuEngine::default());
/// let a = DenseTensor::from_f32(&[1.0, 2.0], &[2]);
/// let b = DenseTensor::from_f32(&[10.0, 20.0], &[2]);
/// let c = engine.add(&a, &b)?.done().unwrap();
/// assert_eq!(c.to_vec::<f32>()?, vec![11.0, 22.0]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ArithEngine<E> {
    kernels: E,
}

impl<E: ComputeEngine> ArithEngine<E> {
    pub fn new(kernels: E) -> Self {
        Self { kernels }
    }

    pub fn kernels(&self) -> &E {
        &self.kernels
    }

    // =========================================================================
    // Binary conveniences
    // =========================================================================

    /// `a + b` into a fresh tensor.
    pub fn add(&self, a: &dyn TensorLike, b: &dyn TensorLike) -> Result<Outcome<DenseTensor>> {
        self.apply(BinOp::Add, a, b)
    }

    /// `a - b` into a fresh tensor.
    pub fn sub(&self, a: &dyn TensorLike, b: &dyn TensorLike) -> Result<Outcome<DenseTensor>> {
        self.apply(BinOp::Sub, a, b)
    }

    /// `a * b` into a fresh tensor.
    pub fn mul(&self, a: &dyn TensorLike, b: &dyn TensorLike) -> Result<Outcome<DenseTensor>> {
        self.apply(BinOp::Mul, a, b)
    }

    /// `a / b` into a fresh tensor.
    pub fn div(&self, a: &dyn TensorLike, b: &dyn TensorLike) -> Result<Outcome<DenseTensor>> {
        self.apply(BinOp::Div, a, b)
    }

    pub fn apply(&self, op: BinOp, a: &dyn TensorLike, b: &dyn TensorLike) -> Result<Outcome<DenseTensor>> {
        Ok(self
            .shared_binary(op, a, b, FuncOpts::safe())?
            .map(Output::into_dense))
    }

    /// Overwrite `a` with `a ⊕ b`.
    pub fn apply_in_place<'t>(
        &self,
        op: BinOp,
        a: &'t mut DenseTensor,
        b: &dyn TensorLike,
    ) -> Result<Outcome<Output<'t>>> {
        self.binary(op, Lhs::InPlace(a), b, FuncOpts::unsafe_in_place())
    }

    /// Write `a ⊕ b` into `dest`, discarding its contents.
    pub fn apply_into<'t>(
        &self,
        op: BinOp,
        a: &dyn TensorLike,
        b: &dyn TensorLike,
        dest: &'t mut Tensor,
    ) -> Result<Outcome<Output<'t>>> {
        self.shared_binary(op, a, b, FuncOpts::with_reuse(dest))
    }

    /// Add `a ⊕ b` onto `dest`.
    pub fn apply_incr<'t>(
        &self,
        op: BinOp,
        a: &dyn TensorLike,
        b: &dyn TensorLike,
        dest: &'t mut Tensor,
    ) -> Result<Outcome<Output<'t>>> {
        self.shared_binary(op, a, b, FuncOpts::with_incr(dest))
    }

    /// Overwrite `b` with `a ⊕ b`.
    ///
    /// This is the in-place form for a sparse `a`, whose dense partner is the
    /// only operand that can be written.
    pub fn apply_in_place_rhs<'t>(
        &self,
        op: BinOp,
        a: &dyn TensorLike,
        b: &'t mut DenseTensor,
    ) -> Result<Outcome<Output<'t>>> {
        let (exp, _) = try_outcome!(self.prepare_binary(op, a, &*b, FuncOpts::unsafe_in_place()));
        self.binary_in_place(op.swapped(), exp.dtype, b, a)
            .map(|t| Outcome::Done(Output::Aliased(t)))
    }

    // =========================================================================
    // Unary conveniences
    // =========================================================================

    pub fn map(&self, op: UnaryOp, a: &dyn TensorLike) -> Result<Outcome<DenseTensor>> {
        Ok(self
            .shared_unary(op, a, FuncOpts::safe())?
            .map(Output::into_dense))
    }

    pub fn map_in_place<'t>(&self, op: UnaryOp, a: &'t mut DenseTensor) -> Result<Outcome<Output<'t>>> {
        self.unary(op, Lhs::InPlace(a), FuncOpts::unsafe_in_place())
    }

    // =========================================================================
    // General entry points
    // =========================================================================

    /// Compute `lhs ⊕ rhs` under the memory policy in `opts`.
    pub fn binary<'t>(
        &self,
        op: BinOp,
        lhs: Lhs<'t>,
        rhs: &dyn TensorLike,
        opts: FuncOpts<'t>,
    ) -> Result<Outcome<Output<'t>>> {
        match lhs {
            Lhs::Shared(a) => self.shared_binary(op, a, rhs, opts),
            Lhs::InPlace(a) => {
                let (exp, plan) = try_outcome!(self.prepare_binary(op, &*a, rhs, opts));
                if plan.reuse.is_none() && !plan.safe {
                    self.binary_in_place(op, exp.dtype, a, rhs)
                        .map(|t| Outcome::Done(Output::Aliased(t)))
                } else {
                    self.run_binary(op, exp.dtype, &*a, rhs, plan).map(Outcome::Done)
                }
            }
        }
    }

    /// Compute `op(lhs)` under the memory policy in `opts`.
    pub fn unary<'t>(&self, op: UnaryOp, lhs: Lhs<'t>, opts: FuncOpts<'t>) -> Result<Outcome<Output<'t>>> {
        match lhs {
            Lhs::Shared(a) => self.shared_unary(op, a, opts),
            Lhs::InPlace(a) => {
                let (exp, plan) = try_outcome!(self.prepare_unary(op, &*a, opts));
                if plan.reuse.is_none() && !plan.safe {
                    self.unary_in_place(op, exp.dtype, a)
                        .map(|t| Outcome::Done(Output::Aliased(t)))
                } else {
                    self.run_unary(op, exp.dtype, &*a, plan).map(Outcome::Done)
                }
            }
        }
    }

    fn shared_binary<'t>(
        &self,
        op: BinOp,
        a: &dyn TensorLike,
        b: &dyn TensorLike,
        opts: FuncOpts<'t>,
    ) -> Result<Outcome<Output<'t>>> {
        let (exp, plan) = try_outcome!(self.prepare_binary(op, a, b, opts));
        self.run_binary(op, exp.dtype, a, b, plan).map(Outcome::Done)
    }

    fn shared_unary<'t>(&self, op: UnaryOp, a: &dyn TensorLike, opts: FuncOpts<'t>) -> Result<Outcome<Output<'t>>> {
        let (exp, plan) = try_outcome!(self.prepare_unary(op, a, opts));
        self.run_unary(op, exp.dtype, a, plan).map(Outcome::Done)
    }

    // =========================================================================
    // Validation and planning
    // =========================================================================

    fn prepare_binary<'t>(
        &self,
        op: BinOp,
        a: &dyn TensorLike,
        b: &dyn TensorLike,
        opts: FuncOpts<'t>,
    ) -> Result<Outcome<(Expected, MemoryPlan<'t>)>> {
        let exp = match check_binary(a, b).map_err(|e| rejected(op.name(), e))? {
            Outcome::Done(exp) => exp,
            Outcome::NoOp => {
                debug!(op = %op, a = %a.dtype(), b = %b.dtype(), "no numeric operand, nothing to do");
                return Ok(Outcome::NoOp);
            }
        };
        let plan = resolve(&exp.shape, exp.dtype, opts).map_err(|e| rejected(op.name(), e))?;
        Ok(Outcome::Done((exp, plan)))
    }

    fn prepare_unary<'t>(
        &self,
        op: UnaryOp,
        a: &dyn TensorLike,
        opts: FuncOpts<'t>,
    ) -> Result<Outcome<(Expected, MemoryPlan<'t>)>> {
        let exp = match check_unary(a).map_err(|e| rejected(op.name(), e))? {
            Outcome::Done(exp) => exp,
            Outcome::NoOp => {
                debug!(op = %op, a = %a.dtype(), "non-numeric operand, nothing to do");
                return Ok(Outcome::NoOp);
            }
        };
        let plan = resolve(&exp.shape, exp.dtype, opts).map_err(|e| rejected(op.name(), e))?;
        Ok(Outcome::Done((exp, plan)))
    }

    // =========================================================================
    // Execution
    // =========================================================================

    fn run_binary<'t>(
        &self,
        op: BinOp,
        elem: DType,
        a: &dyn TensorLike,
        b: &dyn TensorLike,
        plan: MemoryPlan<'t>,
    ) -> Result<Output<'t>> {
        let Normalized { op, template, other } =
            classify(op, a.repr(), b.repr()).map_err(|e| rejected(op.name(), e))?;
        let dest = plan.destination();
        let needs_iter = template.requires_iterator()
            || other.requires_iterator()
            || match &dest {
                Destination::Incr(d) | Destination::Reuse(d) => d.requires_iterator(),
                _ => false,
            };
        let traversal = Traversal::pick(needs_iter);
        trace!(op = %op, mode = dest.name(), ?traversal, %elem, "dispatching binary op");

        let t_hdr = template.header()?;
        let o_hdr = other.header()?;
        let k = &self.kernels;
        match dest {
            Destination::Incr(d) => {
                let mut d_it = d.iter();
                let dst = d.header_mut()?;
                match traversal {
                    Traversal::Flat => k.binary_incr(op, elem, t_hdr, o_hdr, dst)?,
                    Traversal::Iter => k.binary_iter_incr(
                        op,
                        elem,
                        t_hdr,
                        o_hdr,
                        dst,
                        &mut template.iter(),
                        &mut other.iter(),
                        &mut d_it,
                    )?,
                }
                Ok(Output::Aliased(d))
            }
            Destination::Reuse(d) => {
                let mut d_it = d.iter();
                let mut dst = d.header_mut()?;
                match traversal {
                    Traversal::Flat => {
                        copy_header(&mut dst, &t_hdr)?;
                        k.binary(op, elem, dst, o_hdr)?;
                    }
                    Traversal::Iter => {
                        copy_iter(&mut dst, &t_hdr, &mut d_it, &mut template.iter())?;
                        d_it.reset();
                        k.binary_iter(op, elem, dst, o_hdr, &mut d_it, &mut other.iter())?;
                    }
                }
                Ok(Output::Aliased(d))
            }
            Destination::InPlace => Err(rejected(op.name(), ArithError::SharedInPlace)),
            Destination::Safe => {
                let mut out = template.detached()?;
                let n = out.numel();
                let dst = out.header_mut()?;
                match traversal {
                    Traversal::Flat => k.binary(op, elem, dst, o_hdr)?,
                    Traversal::Iter => k.binary_iter(
                        op,
                        elem,
                        dst,
                        o_hdr,
                        &mut FlatIter::contiguous(n),
                        &mut other.iter(),
                    )?,
                }
                Ok(Output::Fresh(out))
            }
        }
    }

    fn binary_in_place<'t>(
        &self,
        op: BinOp,
        elem: DType,
        a: &'t mut DenseTensor,
        b: &dyn TensorLike,
    ) -> Result<&'t mut DenseTensor> {
        let other: Side<'_> = against_dense(op, b.repr()).map_err(|e| rejected(op.name(), e))?;
        if a.has_overlap() {
            return Err(rejected(
                op.name(),
                ArithError::OverlappingDestination {
                    shape: a.shape().dims().to_vec(),
                },
            ));
        }
        let traversal = Traversal::pick(a.requires_iterator() || other.requires_iterator());
        trace!(op = %op, mode = "in-place", ?traversal, %elem, "dispatching binary op");

        let o_hdr = other.header()?;
        let mut a_it = a.iter();
        let dst = a.header_mut()?;
        match traversal {
            Traversal::Flat => self.kernels.binary(op, elem, dst, o_hdr)?,
            Traversal::Iter => {
                self.kernels
                    .binary_iter(op, elem, dst, o_hdr, &mut a_it, &mut other.iter())?
            }
        }
        Ok(a)
    }

    fn run_unary<'t>(
        &self,
        op: UnaryOp,
        elem: DType,
        a: &dyn TensorLike,
        plan: MemoryPlan<'t>,
    ) -> Result<Output<'t>> {
        let src = classify_unary(op, a.repr()).map_err(|e| rejected(op.name(), e))?;
        let dest = plan.destination();
        let needs_iter = src.requires_iterator()
            || match &dest {
                Destination::Incr(d) | Destination::Reuse(d) => d.requires_iterator(),
                _ => false,
            };
        let traversal = Traversal::pick(needs_iter);
        trace!(op = %op, mode = dest.name(), ?traversal, %elem, "dispatching unary op");

        let s_hdr = src.header()?;
        let k = &self.kernels;
        match dest {
            Destination::Incr(d) => {
                let mut d_it = d.iter();
                let dst = d.header_mut()?;
                match traversal {
                    Traversal::Flat => k.unary_incr(op, elem, s_hdr, dst)?,
                    Traversal::Iter => {
                        k.unary_iter_incr(op, elem, s_hdr, dst, &mut src.iter(), &mut d_it)?
                    }
                }
                Ok(Output::Aliased(d))
            }
            Destination::Reuse(d) => {
                let mut d_it = d.iter();
                let mut dst = d.header_mut()?;
                match traversal {
                    Traversal::Flat => {
                        copy_header(&mut dst, &s_hdr)?;
                        k.unary(op, elem, dst)?;
                    }
                    Traversal::Iter => {
                        copy_iter(&mut dst, &s_hdr, &mut d_it, &mut src.iter())?;
                        d_it.reset();
                        k.unary_iter(op, elem, dst, &mut d_it)?;
                    }
                }
                Ok(Output::Aliased(d))
            }
            Destination::InPlace => Err(rejected(op.name(), ArithError::SharedInPlace)),
            Destination::Safe => {
                let mut out = src.detached()?;
                let n = out.numel();
                let dst = out.header_mut()?;
                match traversal {
                    Traversal::Flat => k.unary(op, elem, dst)?,
                    Traversal::Iter => k.unary_iter(op, elem, dst, &mut FlatIter::contiguous(n))?,
                }
                Ok(Output::Fresh(out))
            }
        }
    }

    fn unary_in_place<'t>(
        &self,
        op: UnaryOp,
        elem: DType,
        a: &'t mut DenseTensor,
    ) -> Result<&'t mut DenseTensor> {
        if a.has_overlap() {
            return Err(rejected(
                op.name(),
                ArithError::OverlappingDestination {
                    shape: a.shape().dims().to_vec(),
                },
            ));
        }
        let traversal = Traversal::pick(a.requires_iterator());
        trace!(op = %op, mode = "in-place", ?traversal, %elem, "dispatching unary op");

        let mut a_it = a.iter();
        let dst = a.header_mut()?;
        match traversal {
            Traversal::Flat => self.kernels.unary(op, elem, dst)?,
            Traversal::Iter => self.kernels.unary_iter(op, elem, dst, &mut a_it)?,
        }
        Ok(a)
    }
}

fn rejected(op: &str, err: ArithError) -> ArithError {
    debug!(op, error = %err, "rejected");
    err
}

