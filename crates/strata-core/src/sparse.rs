//! Compressed sparse 2-D tensors (CSR / CSC).

use std::fmt;

use crate::dense::DenseTensor;
use crate::dtype::Element;
use crate::error::ArithError;
use crate::header::{copy_iter, Header};
use crate::iter::{FlatIter, SparseIter};
use crate::shape::Shape;
use crate::storage::Storage;
use crate::{DType, Device, Result};

/// Which axis is compressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompressedAxis {
    /// CSR: `indptr` runs over rows, `indices` hold column numbers.
    Row,
    /// CSC: `indptr` runs over columns, `indices` hold row numbers.
    Column,
}

/// A 2-D tensor that stores only its non-zero entries.
#[derive(Clone)]
pub struct CsTensor {
    shape: Shape,
    axis: CompressedAxis,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    values: Storage,
}

impl CsTensor {
    /// Assemble from compressed arrays, checking that they are consistent.
    pub fn from_parts(
        shape: &[usize],
        axis: CompressedAxis,
        indptr: Vec<usize>,
        indices: Vec<usize>,
        values: Storage,
    ) -> Result<Self> {
        if shape.len() != 2 {
            return Err(ArithError::InvalidSparse(format!(
                "expected a 2-D shape, got {shape:?}"
            )));
        }
        let shape = Shape::new(shape);
        let (major, minor) = major_minor(&shape, axis);

        if indptr.len() != major + 1 {
            return Err(ArithError::InvalidSparse(format!(
                "indptr has {} entries, expected {}",
                indptr.len(),
                major + 1
            )));
        }
        if indptr[0] != 0 || indptr.windows(2).any(|w| w[0] > w[1]) {
            return Err(ArithError::InvalidSparse(
                "indptr must start at 0 and be non-decreasing".into(),
            ));
        }
        let nnz = indptr[major];
        if indices.len() != nnz || values.numel() != nnz {
            return Err(ArithError::InvalidSparse(format!(
                "indptr describes {} entries but got {} indices and {} values",
                nnz,
                indices.len(),
                values.numel()
            )));
        }
        for m in 0..major {
            let lane = &indices[indptr[m]..indptr[m + 1]];
            if lane.iter().any(|&i| i >= minor) {
                return Err(ArithError::InvalidSparse(format!(
                    "index out of range in lane {m} (extent {minor})"
                )));
            }
            if lane.windows(2).any(|w| w[0] >= w[1]) {
                return Err(ArithError::InvalidSparse(format!(
                    "indices of lane {m} are not strictly increasing"
                )));
            }
        }

        Ok(Self {
            shape,
            axis,
            indptr,
            indices,
            values,
        })
    }

    /// Build from `(row, col)` coordinates and their values, in any order.
    pub fn from_coords<T: Element>(
        shape: &[usize],
        axis: CompressedAxis,
        coords: &[(usize, usize)],
        values: &[T],
    ) -> Result<Self> {
        if shape.len() != 2 {
            return Err(ArithError::InvalidSparse(format!(
                "expected a 2-D shape, got {shape:?}"
            )));
        }
        if coords.len() != values.len() {
            return Err(ArithError::InvalidSparse(format!(
                "{} coordinates but {} values",
                coords.len(),
                values.len()
            )));
        }
        let (rows, cols) = (shape[0], shape[1]);
        if let Some(&(r, c)) = coords.iter().find(|&&(r, c)| r >= rows || c >= cols) {
            return Err(ArithError::InvalidSparse(format!(
                "coordinate ({r}, {c}) out of range for shape {shape:?}"
            )));
        }

        let mut order: Vec<(usize, usize, usize)> = coords
            .iter()
            .enumerate()
            .map(|(k, &(r, c))| match axis {
                CompressedAxis::Row => (r, c, k),
                CompressedAxis::Column => (c, r, k),
            })
            .collect();
        order.sort_unstable();
        if let Some(w) = order.windows(2).find(|w| (w[0].0, w[0].1) == (w[1].0, w[1].1)) {
            return Err(ArithError::InvalidSparse(format!(
                "duplicate entry at lane {}, index {}",
                w[0].0, w[0].1
            )));
        }

        let major = match axis {
            CompressedAxis::Row => rows,
            CompressedAxis::Column => cols,
        };
        let mut indptr = vec![0usize; major + 1];
        for &(m, _, _) in &order {
            indptr[m + 1] += 1;
        }
        for m in 0..major {
            indptr[m + 1] += indptr[m];
        }
        let indices = order.iter().map(|&(_, i, _)| i).collect();
        let sorted: Vec<T> = order.iter().map(|&(_, _, k)| values[k]).collect();

        Self::from_parts(shape, axis, indptr, indices, Storage::from_slice(&sorted))
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn dtype(&self) -> DType {
        self.values.dtype()
    }

    pub fn device(&self) -> Device {
        self.values.device()
    }

    pub fn axis(&self) -> CompressedAxis {
        self.axis
    }

    /// Number of stored entries.
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    pub fn indptr(&self) -> &[usize] {
        &self.indptr
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn values(&self) -> &Storage {
        &self.values
    }

    pub fn is_natively_accessible(&self) -> bool {
        self.values.is_natively_accessible()
    }

    /// Read-only view over the stored values.
    pub fn header(&self) -> Result<Header<'_>> {
        Ok(Header::new(self.dtype(), self.values.as_bytes()?))
    }

    /// Row-major walk over every position; positions without a stored value
    /// yield `None`.
    pub fn flat_iter(&self) -> FlatIter {
        let (major, _) = major_minor(&self.shape, self.axis);
        let cols = self.shape.dims()[1];
        let mut entries = Vec::with_capacity(self.nnz());
        for m in 0..major {
            for k in self.indptr[m]..self.indptr[m + 1] {
                let (r, c) = match self.axis {
                    CompressedAxis::Row => (m, self.indices[k]),
                    CompressedAxis::Column => (self.indices[k], m),
                };
                entries.push((r * cols + c, k));
            }
        }
        if self.axis == CompressedAxis::Column {
            entries.sort_unstable();
        }
        FlatIter::Sparse(SparseIter::new(entries, self.shape.numel()))
    }

    /// Densify into a new contiguous tensor.
    pub fn to_dense(&self) -> Result<DenseTensor> {
        let src = self.header()?;
        let mut out = DenseTensor::zeros(self.shape.dims(), self.dtype());
        let numel = out.numel();
        let mut dst = out.header_mut()?;
        copy_iter(&mut dst, &src, &mut FlatIter::contiguous(numel), &mut self.flat_iter())?;
        Ok(out)
    }
}

fn major_minor(shape: &Shape, axis: CompressedAxis) -> (usize, usize) {
    let d = shape.dims();
    match axis {
        CompressedAxis::Row => (d[0], d[1]),
        CompressedAxis::Column => (d[1], d[0]),
    }
}

impl fmt::Debug for CsTensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CsTensor(shape={}, dtype={}, axis={:?}, nnz={})",
            self.shape,
            self.dtype(),
            self.axis,
            self.nnz(),
        )
    }
}
