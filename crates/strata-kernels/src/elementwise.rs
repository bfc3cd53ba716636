//! Typed elementwise loops.
//!
//! Flat loops run over whole buffers and use rayon when `par` is set.
//! Iterator loops walk their iterators in lockstep and are sequential.

use rayon::prelude::*;
use strata_core::{BinOp, FlatIter, KernelError, Slot, UnaryOp};

use crate::arith::Arith;

#[inline]
fn apply<T: Arith>(op: BinOp, x: T, y: T, index: usize) -> Result<T, KernelError> {
    T::binary(op, x, y).ok_or(KernelError::DivideByZero { index })
}

#[inline]
fn load<T: Arith>(data: &[T], slot: Slot) -> Result<T, KernelError> {
    match slot {
        None => Ok(T::zero()),
        Some(i) => data.get(i).copied().ok_or(KernelError::OutOfBounds {
            index: i,
            len: data.len(),
        }),
    }
}

#[inline]
fn dest(slot: Slot, len: usize) -> Result<usize, KernelError> {
    match slot {
        None => Err(KernelError::HoleInDestination),
        Some(i) if i >= len => Err(KernelError::OutOfBounds { index: i, len }),
        Some(i) => Ok(i),
    }
}

fn same_len(dst: usize, src: usize) -> Result<(), KernelError> {
    if dst != src {
        return Err(KernelError::LengthMismatch { dst, src });
    }
    Ok(())
}

fn check_unary<T: Arith>(op: UnaryOp) -> Result<(), KernelError> {
    if !T::supports(op) {
        return Err(KernelError::UnsupportedOp {
            op: op.name(),
            dtype: T::DTYPE,
        });
    }
    Ok(())
}

#[inline]
fn unary_value<T: Arith>(op: UnaryOp, x: T) -> Result<T, KernelError> {
    T::unary(op, x).ok_or(KernelError::UnsupportedOp {
        op: op.name(),
        dtype: T::DTYPE,
    })
}

/// `dst[i] = dst[i] ⊕ src[i]`
pub fn binary<T: Arith>(op: BinOp, dst: &mut [T], src: &[T], par: bool) -> Result<(), KernelError> {
    same_len(dst.len(), src.len())?;
    if par {
        dst.par_iter_mut()
            .zip(src.par_iter())
            .enumerate()
            .try_for_each(|(i, (d, &s))| {
                *d = apply(op, *d, s, i)?;
                Ok(())
            })
    } else {
        for (i, (d, &s)) in dst.iter_mut().zip(src).enumerate() {
            *d = apply(op, *d, s, i)?;
        }
        Ok(())
    }
}

/// `dst[i] += a[i] ⊕ b[i]`
pub fn binary_incr<T: Arith>(op: BinOp, a: &[T], b: &[T], dst: &mut [T], par: bool) -> Result<(), KernelError> {
    same_len(dst.len(), a.len())?;
    same_len(dst.len(), b.len())?;
    let step = |i: usize, d: &mut T, x: T, y: T| -> Result<(), KernelError> {
        let v = apply(op, x, y, i)?;
        *d = apply(BinOp::Add, *d, v, i)?;
        Ok(())
    };
    if par {
        dst.par_iter_mut()
            .zip(a.par_iter().zip(b.par_iter()))
            .enumerate()
            .try_for_each(|(i, (d, (&x, &y)))| step(i, d, x, y))
    } else {
        for (i, (d, (&x, &y))) in dst.iter_mut().zip(a.iter().zip(b)).enumerate() {
            step(i, d, x, y)?;
        }
        Ok(())
    }
}

/// `dst[d] = dst[d] ⊕ src[s]`
pub fn binary_iter<T: Arith>(
    op: BinOp,
    dst: &mut [T],
    src: &[T],
    dst_it: &mut FlatIter,
    src_it: &mut FlatIter,
) -> Result<(), KernelError> {
    loop {
        match (dst_it.next(), src_it.next()) {
            (Some(d), Some(s)) => {
                let d = dest(d, dst.len())?;
                dst[d] = apply(op, dst[d], load(src, s)?, d)?;
            }
            (None, None) => return Ok(()),
            _ => return Err(KernelError::IteratorLength),
        }
    }
}

/// `dst[k] += a[i] ⊕ b[j]`
pub fn binary_iter_incr<T: Arith>(
    op: BinOp,
    a: &[T],
    b: &[T],
    dst: &mut [T],
    a_it: &mut FlatIter,
    b_it: &mut FlatIter,
    dst_it: &mut FlatIter,
) -> Result<(), KernelError> {
    loop {
        match (a_it.next(), b_it.next(), dst_it.next()) {
            (Some(i), Some(j), Some(k)) => {
                let k = dest(k, dst.len())?;
                let v = apply(op, load(a, i)?, load(b, j)?, k)?;
                dst[k] = apply(BinOp::Add, dst[k], v, k)?;
            }
            (None, None, None) => return Ok(()),
            _ => return Err(KernelError::IteratorLength),
        }
    }
}

/// `dst[i] = op(dst[i])`
pub fn unary<T: Arith>(op: UnaryOp, dst: &mut [T], par: bool) -> Result<(), KernelError> {
    check_unary::<T>(op)?;
    if par {
        dst.par_iter_mut().try_for_each(|d| {
            *d = unary_value(op, *d)?;
            Ok(())
        })
    } else {
        for d in dst.iter_mut() {
            *d = unary_value(op, *d)?;
        }
        Ok(())
    }
}

/// `dst[i] += op(src[i])`
pub fn unary_incr<T: Arith>(op: UnaryOp, src: &[T], dst: &mut [T], par: bool) -> Result<(), KernelError> {
    check_unary::<T>(op)?;
    same_len(dst.len(), src.len())?;
    let step = |i: usize, d: &mut T, x: T| -> Result<(), KernelError> {
        *d = apply(BinOp::Add, *d, unary_value(op, x)?, i)?;
        Ok(())
    };
    if par {
        dst.par_iter_mut()
            .zip(src.par_iter())
            .enumerate()
            .try_for_each(|(i, (d, &x))| step(i, d, x))
    } else {
        for (i, (d, &x)) in dst.iter_mut().zip(src).enumerate() {
            step(i, d, x)?;
        }
        Ok(())
    }
}

/// `dst[d] = op(dst[d])`
pub fn unary_iter<T: Arith>(op: UnaryOp, dst: &mut [T], dst_it: &mut FlatIter) -> Result<(), KernelError> {
    check_unary::<T>(op)?;
    for slot in dst_it {
        let d = dest(slot, dst.len())?;
        dst[d] = unary_value(op, dst[d])?;
    }
    Ok(())
}

/// `dst[d] += op(src[s])`
pub fn unary_iter_incr<T: Arith>(
    op: UnaryOp,
    src: &[T],
    dst: &mut [T],
    src_it: &mut FlatIter,
    dst_it: &mut FlatIter,
) -> Result<(), KernelError> {
    check_unary::<T>(op)?;
    loop {
        match (src_it.next(), dst_it.next()) {
            (Some(s), Some(d)) => {
                let d = dest(d, dst.len())?;
                let v = unary_value(op, load(src, s)?)?;
                dst[d] = apply(BinOp::Add, dst[d], v, d)?;
            }
            (None, None) => return Ok(()),
            _ => return Err(KernelError::IteratorLength),
        }
    }
}
