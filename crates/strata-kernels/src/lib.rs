//! # strata-kernels
//!
//! CPU compute engine for strata elementwise arithmetic.
//!
//! Provides:
//! - Per-dtype scalar arithmetic (f16/bf16 through f32, wrapping integers)
//! - Flat kernels with rayon parallelism above a configurable threshold
//! - Iterator kernels for strided, broadcast and sparse operands
//! - [`CpuEngine`], the [`strata_core::ComputeEngine`] over host memory

pub mod arith;
pub mod config;
pub mod cpu;
pub mod elementwise;

pub use arith::Arith;
pub use config::KernelConfig;
pub use cpu::{CpuArith, CpuEngine};
