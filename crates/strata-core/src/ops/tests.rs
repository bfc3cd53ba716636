//! Dispatcher tests against a recording f32-only engine.

use std::sync::Mutex;

use crate::dense::DenseTensor;
use crate::engine::{BinOp, ComputeEngine, KernelError, UnaryOp};
use crate::error::ArithError;
use crate::header::{Header, HeaderMut};
use crate::iter::{FlatIter, Slot};
use crate::outcome::Outcome;
use crate::shape::Shape;
use crate::sparse::{CompressedAxis, CsTensor};
use crate::tensor::{Repr, Tensor, TensorLike};
use crate::{DType, Device};

use super::{ArithEngine, FuncOpt, FuncOpts, Lhs};

#[derive(Default)]
struct Recording {
    calls: Mutex<Vec<&'static str>>,
}

impl Recording {
    fn record(&self, name: &'static str) {
        self.calls.lock().unwrap().push(name);
    }
}

fn bin(op: BinOp, x: f32, y: f32) -> f32 {
    match op {
        BinOp::Add => x + y,
        BinOp::Sub => x - y,
        BinOp::Mul => x * y,
        BinOp::Div => x / y,
        BinOp::RevSub => y - x,
        BinOp::RevDiv => y / x,
    }
}

fn un(op: UnaryOp, x: f32) -> f32 {
    match op {
        UnaryOp::Neg => -x,
        UnaryOp::Abs => x.abs(),
        UnaryOp::Square => x * x,
        UnaryOp::Sqrt => x.sqrt(),
    }
}

fn read(data: &[f32], slot: Slot) -> f32 {
    slot.map_or(0.0, |i| data[i])
}

fn check(elem: DType) -> Result<(), KernelError> {
    if elem != DType::F32 {
        return Err(KernelError::UnsupportedOp { op: "recording", dtype: elem });
    }
    Ok(())
}

impl ComputeEngine for Recording {
    fn binary(&self, op: BinOp, elem: DType, mut dst: HeaderMut<'_>, src: Header<'_>) -> Result<(), KernelError> {
        self.record("binary");
        check(elem)?;
        let src = src.as_slice::<f32>()?;
        for (d, &s) in dst.as_mut_slice::<f32>()?.iter_mut().zip(src) {
            *d = bin(op, *d, s);
        }
        Ok(())
    }

    fn binary_incr(
        &self,
        op: BinOp,
        elem: DType,
        a: Header<'_>,
        b: Header<'_>,
        mut dst: HeaderMut<'_>,
    ) -> Result<(), KernelError> {
        self.record("binary_incr");
        check(elem)?;
        let (a, b) = (a.as_slice::<f32>()?, b.as_slice::<f32>()?);
        for (i, d) in dst.as_mut_slice::<f32>()?.iter_mut().enumerate() {
            *d += bin(op, a[i], b[i]);
        }
        Ok(())
    }

    fn binary_iter(
        &self,
        op: BinOp,
        elem: DType,
        mut dst: HeaderMut<'_>,
        src: Header<'_>,
        dst_it: &mut FlatIter,
        src_it: &mut FlatIter,
    ) -> Result<(), KernelError> {
        self.record("binary_iter");
        check(elem)?;
        let src = src.as_slice::<f32>()?;
        let dst = dst.as_mut_slice::<f32>()?;
        for (d, s) in dst_it.zip(src_it) {
            let d = d.ok_or(KernelError::HoleInDestination)?;
            dst[d] = bin(op, dst[d], read(src, s));
        }
        Ok(())
    }

    fn binary_iter_incr(
        &self,
        op: BinOp,
        elem: DType,
        a: Header<'_>,
        b: Header<'_>,
        mut dst: HeaderMut<'_>,
        a_it: &mut FlatIter,
        b_it: &mut FlatIter,
        dst_it: &mut FlatIter,
    ) -> Result<(), KernelError> {
        self.record("binary_iter_incr");
        check(elem)?;
        let (a, b) = (a.as_slice::<f32>()?, b.as_slice::<f32>()?);
        let dst = dst.as_mut_slice::<f32>()?;
        for ((i, j), k) in a_it.zip(b_it).zip(dst_it) {
            let k = k.ok_or(KernelError::HoleInDestination)?;
            dst[k] += bin(op, read(a, i), read(b, j));
        }
        Ok(())
    }

    fn unary(&self, op: UnaryOp, elem: DType, mut dst: HeaderMut<'_>) -> Result<(), KernelError> {
        self.record("unary");
        check(elem)?;
        for d in dst.as_mut_slice::<f32>()? {
            *d = un(op, *d);
        }
        Ok(())
    }

    fn unary_incr(
        &self,
        op: UnaryOp,
        elem: DType,
        src: Header<'_>,
        mut dst: HeaderMut<'_>,
    ) -> Result<(), KernelError> {
        self.record("unary_incr");
        check(elem)?;
        let src = src.as_slice::<f32>()?;
        for (d, &s) in dst.as_mut_slice::<f32>()?.iter_mut().zip(src) {
            *d += un(op, s);
        }
        Ok(())
    }

    fn unary_iter(
        &self,
        op: UnaryOp,
        elem: DType,
        mut dst: HeaderMut<'_>,
        dst_it: &mut FlatIter,
    ) -> Result<(), KernelError> {
        self.record("unary_iter");
        check(elem)?;
        let dst = dst.as_mut_slice::<f32>()?;
        for d in dst_it {
            let d = d.ok_or(KernelError::HoleInDestination)?;
            dst[d] = un(op, dst[d]);
        }
        Ok(())
    }

    fn unary_iter_incr(
        &self,
        op: UnaryOp,
        elem: DType,
        src: Header<'_>,
        mut dst: HeaderMut<'_>,
        src_it: &mut FlatIter,
        dst_it: &mut FlatIter,
    ) -> Result<(), KernelError> {
        self.record("unary_iter_incr");
        check(elem)?;
        let src = src.as_slice::<f32>()?;
        let dst = dst.as_mut_slice::<f32>()?;
        for (s, d) in src_it.zip(dst_it) {
            let d = d.ok_or(KernelError::HoleInDestination)?;
            dst[d] += un(op, read(src, s));
        }
        Ok(())
    }
}

fn engine() -> ArithEngine<Recording> {
    ArithEngine::new(Recording::default())
}

fn calls(e: &ArithEngine<Recording>) -> Vec<&'static str> {
    e.kernels().calls.lock().unwrap().clone()
}

fn a23() -> DenseTensor {
    DenseTensor::from_f32(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3])
}

fn b23() -> DenseTensor {
    DenseTensor::from_f32(&[10.0, 20.0, 30.0, 40.0, 50.0, 60.0], &[2, 3])
}

fn values(t: &DenseTensor) -> Vec<f32> {
    t.to_vec::<f32>().unwrap()
}

/// [[0, 7, 0], [0, 0, -2]]
fn sparse23() -> CsTensor {
    CsTensor::from_coords(&[2, 3], CompressedAxis::Row, &[(0, 1), (1, 2)], &[7.0f32, -2.0]).unwrap()
}

#[test]
fn test_safe_add_is_fresh() {
    let e = engine();
    let (a, b) = (a23(), b23());
    let c = e.add(&a, &b).unwrap().done().unwrap();
    assert_eq!(values(&c), vec![11.0, 22.0, 33.0, 44.0, 55.0, 66.0]);
    assert_eq!(values(&a), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    assert!(!c.storage().shares_buffer(a.storage()));
    assert_eq!(calls(&e), vec!["binary"]);
}

#[test]
fn test_unsafe_in_place_aliases_lhs() {
    let e = engine();
    let (mut a, b) = (a23(), b23());
    let ptr: *const DenseTensor = &a;
    let out = e.apply_in_place(BinOp::Add, &mut a, &b).unwrap().done().unwrap();
    assert!(out.is_aliased());
    assert!(std::ptr::eq(&*out, ptr));
    drop(out);
    assert_eq!(values(&a), vec![11.0, 22.0, 33.0, 44.0, 55.0, 66.0]);
    assert_eq!(values(&b), vec![10.0, 20.0, 30.0, 40.0, 50.0, 60.0]);
    assert_eq!(calls(&e), vec!["binary"]);
}

#[test]
fn test_unsafe_with_shared_lhs_fails() {
    let e = engine();
    let (a, b) = (a23(), b23());
    let err = e
        .binary(BinOp::Add, Lhs::Shared(&a), &b, FuncOpts::unsafe_in_place())
        .unwrap_err();
    assert!(matches!(err, ArithError::SharedInPlace));
    assert!(calls(&e).is_empty());
}

#[test]
fn test_in_place_lhs_in_safe_mode_is_untouched() {
    let e = engine();
    let (mut a, b) = (a23(), b23());
    let out = e.binary(BinOp::Mul, Lhs::InPlace(&mut a), &b, FuncOpts::safe()).unwrap();
    let out = out.done().unwrap();
    assert!(!out.is_aliased());
    assert_eq!(values(&out), vec![10.0, 40.0, 90.0, 160.0, 250.0, 360.0]);
    drop(out);
    assert_eq!(values(&a), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
}

#[test]
fn test_reuse_overwrites() {
    let e = engine();
    let (a, b) = (a23(), b23());
    let mut c: Tensor = DenseTensor::from_f32(&[9.0; 6], &[6]).into();
    let out = e.apply_into(BinOp::Add, &a, &b, &mut c).unwrap().done().unwrap();
    assert!(out.is_aliased());
    drop(out);
    assert_eq!(values(c.as_dense().unwrap()), vec![11.0, 22.0, 33.0, 44.0, 55.0, 66.0]);
    assert_eq!(calls(&e), vec!["binary"]);
}

#[test]
fn test_incr_accumulates() {
    let e = engine();
    let (a, b) = (a23(), b23());
    let mut c: Tensor = DenseTensor::from_f32(&[1.0; 6], &[2, 3]).into();
    e.apply_incr(BinOp::Add, &a, &b, &mut c).unwrap().done().unwrap();
    assert_eq!(values(c.as_dense().unwrap()), vec![12.0, 23.0, 34.0, 45.0, 56.0, 67.0]);
    assert_eq!(calls(&e), vec!["binary_incr"]);
}

#[test]
fn test_strided_operand_uses_iterators() {
    let e = engine();
    let a = DenseTensor::from_f32(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[3, 2]).transpose().unwrap();
    let b = b23();
    let c = e.add(&a, &b).unwrap().done().unwrap();
    // a^T = [[1, 3, 5], [2, 4, 6]]
    assert_eq!(values(&c), vec![11.0, 23.0, 35.0, 42.0, 54.0, 66.0]);
    assert!(c.is_contiguous());
    assert_eq!(calls(&e), vec!["binary_iter"]);
}

#[test]
fn test_strided_reuse_and_incr_iterators() {
    let e = engine();
    let a = a23().transpose().unwrap();
    let b = b23().transpose().unwrap();

    let mut c: Tensor = DenseTensor::zeros(&[3, 2], DType::F32).into();
    e.apply_into(BinOp::Sub, &b, &a, &mut c).unwrap().done().unwrap();
    assert_eq!(values(c.as_dense().unwrap()), vec![9.0, 36.0, 18.0, 45.0, 27.0, 54.0]);

    let mut d: Tensor = DenseTensor::from_f32(&[1.0; 6], &[3, 2]).into();
    e.apply_incr(BinOp::Add, &a, &b, &mut d).unwrap().done().unwrap();
    assert_eq!(values(d.as_dense().unwrap()), vec![12.0, 45.0, 23.0, 56.0, 34.0, 67.0]);
    assert_eq!(calls(&e), vec!["binary_iter", "binary_iter_incr"]);
}

#[test]
fn test_non_contiguous_reuse_forces_iterator() {
    let e = engine();
    let (a, b) = (a23(), b23());
    let mut c: Tensor = DenseTensor::zeros(&[3, 2], DType::F32).transpose().unwrap().into();
    e.apply_into(BinOp::Add, &a, &b, &mut c).unwrap().done().unwrap();
    assert_eq!(values(c.as_dense().unwrap()), vec![11.0, 22.0, 33.0, 44.0, 55.0, 66.0]);
    assert_eq!(calls(&e), vec!["binary_iter"]);
}

#[test]
fn test_dense_sparse_both_orders() {
    let e = engine();
    let (a, s) = (a23(), sparse23());
    let ds = e.sub(&a, &s).unwrap().done().unwrap();
    assert_eq!(values(&ds), vec![1.0, -5.0, 3.0, 4.0, 5.0, 8.0]);
    let sd = e.sub(&s, &a).unwrap().done().unwrap();
    assert_eq!(values(&sd), vec![-1.0, 5.0, -3.0, -4.0, -5.0, -8.0]);
    assert_eq!(calls(&e), vec!["binary_iter", "binary_iter"]);
}

#[test]
fn test_sparse_lhs_overwrites_dense_rhs() {
    let e = engine();
    let (s, mut b) = (sparse23(), a23());
    let ptr: *const DenseTensor = &b;
    let out = e.apply_in_place_rhs(BinOp::Sub, &s, &mut b).unwrap().done().unwrap();
    assert!(std::ptr::eq(&*out, ptr));
    drop(out);
    assert_eq!(values(&b), vec![-1.0, 5.0, -3.0, -4.0, -5.0, -8.0]);
    assert_eq!(calls(&e), vec!["binary_iter"]);

    let err = e
        .binary(BinOp::Sub, Lhs::Shared(&s), &b, FuncOpts::unsafe_in_place())
        .unwrap_err();
    assert!(matches!(err, ArithError::SharedInPlace));
    assert!(err.to_string().contains("apply_in_place_rhs"));
}

#[test]
fn test_dense_rhs_in_place_keeps_operand_order() {
    let e = engine();
    let (a, mut b) = (a23(), b23());
    let _ = e.apply_in_place_rhs(BinOp::Sub, &a, &mut b).unwrap().done().unwrap();
    assert_eq!(values(&b), vec![-9.0, -18.0, -27.0, -36.0, -45.0, -54.0]);
    assert_eq!(values(&a), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    assert_eq!(calls(&e), vec!["binary"]);

    let mut short = DenseTensor::zeros(&[3], DType::F32);
    let err = e.apply_in_place_rhs(BinOp::Add, &a, &mut short).unwrap_err();
    assert!(matches!(err, ArithError::ShapeMismatch { .. }));
}

#[test]
fn test_destination_outlives_operands() {
    let e = engine();
    let mut c: Tensor = DenseTensor::zeros(&[2, 3], DType::F32).into();
    let out = {
        let (a, b) = (a23(), b23());
        e.apply_into(BinOp::Add, &a, &b, &mut c).unwrap().done().unwrap()
    };
    assert_eq!(values(&out), vec![11.0, 22.0, 33.0, 44.0, 55.0, 66.0]);
    drop(out);

    let out = {
        let (a, b) = (a23(), b23());
        e.apply_incr(BinOp::Mul, &a, &b, &mut c).unwrap().done().unwrap()
    };
    assert_eq!(values(&out), vec![21.0, 62.0, 123.0, 204.0, 305.0, 426.0]);
    assert_eq!(calls(&e), vec!["binary", "binary_incr"]);
}

#[test]
fn test_sparse_incr() {
    let e = engine();
    let (a, s) = (a23(), sparse23());
    let mut c: Tensor = DenseTensor::from_f32(&[100.0; 6], &[2, 3]).into();
    e.apply_incr(BinOp::Sub, &s, &a, &mut c).unwrap().done().unwrap();
    assert_eq!(values(c.as_dense().unwrap()), vec![99.0, 105.0, 97.0, 96.0, 95.0, 92.0]);
    assert_eq!(calls(&e), vec!["binary_iter_incr"]);
}

#[test]
fn test_sparse_sparse_not_implemented() {
    let e = engine();
    let s = sparse23();
    let err = e.add(&s, &s).unwrap_err();
    assert!(matches!(err, ArithError::MethodNotImplemented { .. }));
    assert!(calls(&e).is_empty());
}

#[test]
fn test_mismatches_and_noop() {
    let e = engine();
    let a = a23();
    let ints = DenseTensor::from_i32(&[1, 2, 3, 4, 5, 6], &[2, 3]);
    assert!(matches!(e.add(&a, &ints), Err(ArithError::TypeMismatch { .. })));
    let short = DenseTensor::from_f32(&[1.0; 6], &[6]);
    assert!(matches!(e.add(&a, &short), Err(ArithError::ShapeMismatch { .. })));
    let bools = DenseTensor::from_bools(&[true; 6], &[2, 3]);
    assert!(e.add(&bools, &bools).unwrap().is_noop());
    assert!(e.map(UnaryOp::Neg, &bools).unwrap().is_noop());
    assert!(calls(&e).is_empty());
}

#[test]
fn test_noop_leaves_destination_alone() {
    let e = engine();
    let bools = DenseTensor::from_bools(&[true, false], &[2]);
    let mut c: Tensor = DenseTensor::from_f32(&[5.0, 5.0], &[2]).into();
    let out = e.apply_incr(BinOp::Add, &bools, &bools, &mut c).unwrap();
    assert!(out.is_noop());
    assert_eq!(values(c.as_dense().unwrap()), vec![5.0, 5.0]);
}

#[test]
fn test_inaccessible_operand() {
    let e = engine();
    let remote = DenseTensor::remote(&[2, 3], DType::F32, Device::Cuda(0));
    assert!(matches!(e.add(&a23(), &remote), Err(ArithError::InaccessibleData(_))));
    assert!(matches!(e.map(UnaryOp::Abs, &remote), Err(ArithError::InaccessibleData(_))));
}

#[test]
fn test_overlapping_in_place_rejected() {
    let e = engine();
    let mut a = DenseTensor::from_f32(&[1.0, 2.0, 3.0], &[1, 3]).expand(&[2, 3]).unwrap();
    let err = e.apply_in_place(BinOp::Add, &mut a, &b23()).unwrap_err();
    assert!(matches!(err, ArithError::OverlappingDestination { .. }));
    assert!(calls(&e).is_empty());
}

#[test]
fn test_options_from_list() {
    let e = engine();
    let (a, b) = (a23(), b23());
    let mut c: Tensor = DenseTensor::zeros(&[2, 3], DType::F32).into();
    let opts = FuncOpts::new([FuncOpt::UnsafeInPlace, FuncOpt::WithIncr(&mut c)]).unwrap();
    e.binary(BinOp::Add, Lhs::Shared(&a), &b, opts).unwrap().done().unwrap();
    assert_eq!(values(c.as_dense().unwrap()), vec![11.0, 22.0, 33.0, 44.0, 55.0, 66.0]);
    assert_eq!(calls(&e), vec!["binary_incr"]);
}

#[test]
fn test_engine_errors_pass_through() {
    let e = engine();
    let a = DenseTensor::from_f64(&[1.0, 2.0], &[2]);
    let err = e.add(&a, &a).unwrap_err();
    assert!(matches!(
        err,
        ArithError::Engine(KernelError::UnsupportedOp { dtype: DType::F64, .. })
    ));
}

#[test]
fn test_width_mismatch_reaches_engine() {
    let e = engine();
    let a = DenseTensor::from_f32(&[1.0, 2.0], &[2]);
    let b = DenseTensor::from_f64(&[1.0, 2.0], &[2]);
    let err = e.add(&a, &b).unwrap_err();
    assert!(matches!(err, ArithError::Engine(KernelError::ElementMismatch { .. })));
}

#[test]
fn test_unary_modes() {
    let e = engine();
    let a = DenseTensor::from_f32(&[1.0, -2.0, 3.0, -4.0], &[2, 2]);

    let fresh = e.map(UnaryOp::Abs, &a).unwrap().done().unwrap();
    assert_eq!(values(&fresh), vec![1.0, 2.0, 3.0, 4.0]);

    let mut b = a.clone();
    e.map_in_place(UnaryOp::Neg, &mut b).unwrap().done().unwrap();
    assert_eq!(values(&b), vec![-1.0, 2.0, -3.0, 4.0]);
    assert_eq!(values(&a), vec![1.0, -2.0, 3.0, -4.0]);

    let mut c: Tensor = DenseTensor::from_f32(&[1.0; 4], &[2, 2]).into();
    e.unary(UnaryOp::Square, Lhs::Shared(&a), FuncOpts::with_incr(&mut c))
        .unwrap()
        .done()
        .unwrap();
    assert_eq!(values(c.as_dense().unwrap()), vec![2.0, 5.0, 10.0, 17.0]);

    let t = a.transpose().unwrap();
    let mut r: Tensor = DenseTensor::zeros(&[2, 2], DType::F32).into();
    e.unary(UnaryOp::Neg, Lhs::Shared(&t), FuncOpts::with_reuse(&mut r))
        .unwrap()
        .done()
        .unwrap();
    assert_eq!(values(r.as_dense().unwrap()), vec![-1.0, -3.0, 2.0, 4.0]);

    let mut s: Tensor = DenseTensor::zeros(&[2, 2], DType::F32).into();
    e.unary(UnaryOp::Abs, Lhs::Shared(&t), FuncOpts::with_incr(&mut s))
        .unwrap()
        .done()
        .unwrap();
    assert_eq!(values(s.as_dense().unwrap()), vec![1.0, 3.0, 2.0, 4.0]);

    assert_eq!(
        calls(&e),
        vec!["unary", "unary", "unary_incr", "unary_iter", "unary_iter_incr"]
    );
}

#[test]
fn test_unary_sparse_not_implemented() {
    let e = engine();
    let err = e.map(UnaryOp::Sqrt, &sparse23()).unwrap_err();
    assert!(matches!(err, ArithError::MethodNotImplemented { .. }));
}

#[derive(Debug)]
struct Foreign {
    shape: Shape,
}

impl TensorLike for Foreign {
    fn dtype(&self) -> DType {
        DType::F32
    }

    fn shape(&self) -> &Shape {
        &self.shape
    }

    fn is_natively_accessible(&self) -> bool {
        true
    }

    fn repr(&self) -> Repr<'_> {
        Repr::Other("Foreign")
    }
}

#[test]
fn test_foreign_operand() {
    let e = engine();
    let f = Foreign { shape: Shape::new(&[2, 3]) };
    let err = e.add(&a23(), &f).unwrap_err();
    assert!(matches!(err, ArithError::TypeNotImplemented { .. }));
    let err = e.add(&f, &sparse23()).unwrap_err();
    assert!(matches!(err, ArithError::TypeNotImplemented { ref operand, .. } if operand == "Foreign"));
}

#[test]
fn test_outcome_noop_for_in_place() {
    let e = engine();
    let mut bools = DenseTensor::from_bools(&[true], &[1]);
    let out = e.map_in_place(UnaryOp::Neg, &mut bools).unwrap();
    assert!(matches!(out, Outcome::NoOp));
}
