//! Host-memory compute engine.

use half::{bf16, f16};
use strata_core::{
    ArithEngine, BinOp, ComputeEngine, DType, FlatIter, Header, HeaderMut, KernelError, UnaryOp,
};
use tracing::debug;

use crate::config::KernelConfig;
use crate::elementwise;

/// Dispatcher over the CPU engine.
pub type CpuArith = ArithEngine<CpuEngine>;

/// Bind `$T` to the Rust type of `$elem` and evaluate `$body`.
/// `Bool` is rejected as `UnsupportedOp { op: $op }`.
macro_rules! with_elem {
    ($elem:expr, $op:expr, $T:ident => $body:expr) => {
        match $elem {
            DType::F16 => {
                type $T = f16;
                $body
            }
            DType::BF16 => {
                type $T = bf16;
                $body
            }
            DType::F32 => {
                type $T = f32;
                $body
            }
            DType::F64 => {
                type $T = f64;
                $body
            }
            DType::I8 => {
                type $T = i8;
                $body
            }
            DType::U8 => {
                type $T = u8;
                $body
            }
            DType::I32 => {
                type $T = i32;
                $body
            }
            DType::I64 => {
                type $T = i64;
                $body
            }
            DType::Bool => Err(KernelError::UnsupportedOp {
                op: $op,
                dtype: DType::Bool,
            }),
        }
    };
}

/// Elementwise kernels over host buffers.
///
/// Flat kernels switch to rayon once a buffer reaches
/// [`KernelConfig::par_threshold`] elements.
#[derive(Debug, Clone, Default)]
pub struct CpuEngine {
    config: KernelConfig,
}

impl CpuEngine {
    pub fn new(config: KernelConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// A dispatcher that runs on this engine.
    pub fn into_arith(self) -> CpuArith {
        ArithEngine::new(self)
    }

    fn parallel(&self, op: &'static str, len: usize) -> bool {
        let par = len >= self.config.par_threshold;
        if par {
            debug!(op, len, threshold = self.config.par_threshold, "parallel kernel");
        }
        par
    }
}

impl ComputeEngine for CpuEngine {
    fn binary(
        &self,
        op: BinOp,
        elem: DType,
        mut dst: HeaderMut<'_>,
        src: Header<'_>,
    ) -> Result<(), KernelError> {
        let par = self.parallel(op.name(), dst.len());
        with_elem!(elem, op.name(), T => {
            let src = src.as_slice::<T>()?;
            elementwise::binary(op, dst.as_mut_slice::<T>()?, src, par)
        })
    }

    fn binary_incr(
        &self,
        op: BinOp,
        elem: DType,
        a: Header<'_>,
        b: Header<'_>,
        mut dst: HeaderMut<'_>,
    ) -> Result<(), KernelError> {
        let par = self.parallel(op.name(), dst.len());
        with_elem!(elem, op.name(), T => {
            let (a, b) = (a.as_slice::<T>()?, b.as_slice::<T>()?);
            elementwise::binary_incr(op, a, b, dst.as_mut_slice::<T>()?, par)
        })
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
        with_elem!(elem, op.name(), T => {
            let src = src.as_slice::<T>()?;
            elementwise::binary_iter(op, dst.as_mut_slice::<T>()?, src, dst_it, src_it)
        })
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
        with_elem!(elem, op.name(), T => {
            let (a, b) = (a.as_slice::<T>()?, b.as_slice::<T>()?);
            elementwise::binary_iter_incr(op, a, b, dst.as_mut_slice::<T>()?, a_it, b_it, dst_it)
        })
    }

    fn unary(&self, op: UnaryOp, elem: DType, mut dst: HeaderMut<'_>) -> Result<(), KernelError> {
        let par = self.parallel(op.name(), dst.len());
        with_elem!(elem, op.name(), T => {
            elementwise::unary(op, dst.as_mut_slice::<T>()?, par)
        })
    }

    fn unary_incr(
        &self,
        op: UnaryOp,
        elem: DType,
        src: Header<'_>,
        mut dst: HeaderMut<'_>,
    ) -> Result<(), KernelError> {
        let par = self.parallel(op.name(), dst.len());
        with_elem!(elem, op.name(), T => {
            let src = src.as_slice::<T>()?;
            elementwise::unary_incr(op, src, dst.as_mut_slice::<T>()?, par)
        })
    }

    fn unary_iter(
        &self,
        op: UnaryOp,
        elem: DType,
        mut dst: HeaderMut<'_>,
        dst_it: &mut FlatIter,
    ) -> Result<(), KernelError> {
        with_elem!(elem, op.name(), T => {
            elementwise::unary_iter(op, dst.as_mut_slice::<T>()?, dst_it)
        })
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
        with_elem!(elem, op.name(), T => {
            let src = src.as_slice::<T>()?;
            elementwise::unary_iter_incr(op, src, dst.as_mut_slice::<T>()?, src_it, dst_it)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::DenseTensor;

    #[test]
    fn test_binary_on_headers() {
        let engine = CpuEngine::default();
        let src = DenseTensor::from_f32(&[1.0, 2.0], &[2]);
        let mut dst = DenseTensor::from_f32(&[10.0, 20.0], &[2]);
        engine
            .binary(BinOp::Sub, DType::F32, dst.header_mut().unwrap(), src.header().unwrap())
            .unwrap();
        assert_eq!(dst.to_vec::<f32>().unwrap(), vec![9.0, 18.0]);
    }

    #[test]
    fn test_element_type_checked() {
        let engine = CpuEngine::default();
        let src = DenseTensor::from_i32(&[1, 2], &[2]);
        let mut dst = DenseTensor::from_f32(&[1.0, 2.0], &[2]);
        let err = engine
            .binary(BinOp::Add, DType::F32, dst.header_mut().unwrap(), src.header().unwrap())
            .unwrap_err();
        assert_eq!(
            err,
            KernelError::ElementMismatch {
                expected: DType::F32,
                got: DType::I32
            }
        );
    }

    #[test]
    fn test_bool_unsupported() {
        let engine = CpuEngine::new(KernelConfig::sequential());
        let mut dst = DenseTensor::from_bools(&[true, false], &[2]);
        let err = engine
            .unary(UnaryOp::Abs, DType::Bool, dst.header_mut().unwrap())
            .unwrap_err();
        assert_eq!(
            err,
            KernelError::UnsupportedOp {
                op: "Abs",
                dtype: DType::Bool
            }
        );
    }

    #[test]
    fn test_half_precision() {
        let engine = CpuEngine::default();
        let src = DenseTensor::try_from_slice(&[f16::from_f32(0.5); 3], &[3]).unwrap();
        let mut dst = DenseTensor::try_from_slice(&[f16::from_f32(1.0); 3], &[3]).unwrap();
        engine
            .binary(BinOp::Add, DType::F16, dst.header_mut().unwrap(), src.header().unwrap())
            .unwrap();
        assert_eq!(dst.to_vec::<f16>().unwrap(), vec![f16::from_f32(1.5); 3]);
    }

    #[test]
    fn test_parallel_threshold() {
        let engine = CpuEngine::new(KernelConfig { par_threshold: 4 });
        assert!(!engine.parallel("Add", 3));
        assert!(engine.parallel("Add", 4));
        assert!(!CpuEngine::new(KernelConfig::sequential()).parallel("Add", 1 << 30));
    }
}
