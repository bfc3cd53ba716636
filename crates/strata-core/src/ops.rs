//! Elementwise arithmetic dispatch.
//!
//! A call goes through validation, memory-mode resolution and operand
//! classification, then runs exactly one [`ComputeEngine`] entrypoint.
//! Results are a fresh tensor (safe mode) or an alias of the tensor that was
//! written (in-place operand, reuse or increment destination).
//!
//! [`ComputeEngine`]: crate::ComputeEngine

pub mod classify;
pub mod dispatch;
pub mod plan;
pub mod validate;

#[cfg(test)]
mod tests;

pub use classify::Traversal;
pub use dispatch::{ArithEngine, Lhs, Output};
pub use plan::{Destination, FuncOpt, FuncOpts, MemoryPlan};
