//! Scalar arithmetic per element type.
//!
//! Floats follow IEEE semantics. Integers wrap on overflow and report
//! division by zero. Half-precision types compute through f32.

use half::{bf16, f16};
use strata_core::{BinOp, Element, UnaryOp};

/// Element types the CPU kernels compute on.
pub trait Arith: Element + Copy {
    fn zero() -> Self;

    /// `x ⊕ y`, or `None` on integer division by zero.
    fn binary(op: BinOp, x: Self, y: Self) -> Option<Self>;

    /// `op(x)`, or `None` if the operator is not defined for this type.
    fn unary(op: UnaryOp, x: Self) -> Option<Self>;

    fn supports(op: UnaryOp) -> bool {
        Self::unary(op, Self::zero()).is_some()
    }
}

macro_rules! float_arith {
    ($($t:ty),*) => {
        $(
            impl Arith for $t {
                fn zero() -> Self {
                    0.0
                }

                fn binary(op: BinOp, x: Self, y: Self) -> Option<Self> {
                    Some(match op {
                        BinOp::Add => x + y,
                        BinOp::Sub => x - y,
                        BinOp::Mul => x * y,
                        BinOp::Div => x / y,
                        BinOp::RevSub => y - x,
                        BinOp::RevDiv => y / x,
                    })
                }

                fn unary(op: UnaryOp, x: Self) -> Option<Self> {
                    Some(match op {
                        UnaryOp::Neg => -x,
                        UnaryOp::Abs => x.abs(),
                        UnaryOp::Square => x * x,
                        UnaryOp::Sqrt => x.sqrt(),
                    })
                }
            }
        )*
    };
}

float_arith!(f32, f64);

macro_rules! half_arith {
    ($($t:ty),*) => {
        $(
            impl Arith for $t {
                fn zero() -> Self {
                    <$t>::ZERO
                }

                fn binary(op: BinOp, x: Self, y: Self) -> Option<Self> {
                    f32::binary(op, x.to_f32(), y.to_f32()).map(<$t>::from_f32)
                }

                fn unary(op: UnaryOp, x: Self) -> Option<Self> {
                    f32::unary(op, x.to_f32()).map(<$t>::from_f32)
                }
            }
        )*
    };
}

half_arith!(f16, bf16);

#[allow(clippy::too_many_arguments)]
fn int_binary<T>(
    op: BinOp,
    x: T,
    y: T,
    zero: T,
    add: fn(T, T) -> T,
    sub: fn(T, T) -> T,
    mul: fn(T, T) -> T,
    div: fn(T, T) -> T,
) -> Option<T>
where
    T: Copy + PartialEq,
{
    match op {
        BinOp::Add => Some(add(x, y)),
        BinOp::Sub => Some(sub(x, y)),
        BinOp::Mul => Some(mul(x, y)),
        BinOp::RevSub => Some(sub(y, x)),
        BinOp::Div if y == zero => None,
        BinOp::Div => Some(div(x, y)),
        BinOp::RevDiv if x == zero => None,
        BinOp::RevDiv => Some(div(y, x)),
    }
}

macro_rules! signed_arith {
    ($($t:ty),*) => {
        $(
            impl Arith for $t {
                fn zero() -> Self {
                    0
                }

                fn binary(op: BinOp, x: Self, y: Self) -> Option<Self> {
                    int_binary(
                        op,
                        x,
                        y,
                        0,
                        <$t>::wrapping_add,
                        <$t>::wrapping_sub,
                        <$t>::wrapping_mul,
                        <$t>::wrapping_div,
                    )
                }

                fn unary(op: UnaryOp, x: Self) -> Option<Self> {
                    match op {
                        UnaryOp::Neg => Some(x.wrapping_neg()),
                        UnaryOp::Abs => Some(x.wrapping_abs()),
                        UnaryOp::Square => Some(x.wrapping_mul(x)),
                        UnaryOp::Sqrt => None,
                    }
                }
            }
        )*
    };
}

signed_arith!(i8, i32, i64);

impl Arith for u8 {
    fn zero() -> Self {
        0
    }

    fn binary(op: BinOp, x: Self, y: Self) -> Option<Self> {
        int_binary(
            op,
            x,
            y,
            0,
            u8::wrapping_add,
            u8::wrapping_sub,
            u8::wrapping_mul,
            u8::wrapping_div,
        )
    }

    fn unary(op: UnaryOp, x: Self) -> Option<Self> {
        match op {
            UnaryOp::Abs => Some(x),
            UnaryOp::Square => Some(x.wrapping_mul(x)),
            UnaryOp::Neg | UnaryOp::Sqrt => None,
        }
    }
}
