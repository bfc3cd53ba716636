use std::fmt;

use smallvec::SmallVec;

use crate::dtype::Element;
use crate::engine::KernelError;
use crate::error::ArithError;
use crate::header::{copy_iter, Header, HeaderMut};
use crate::iter::{FlatIter, StridedIter};
use crate::shape::Shape;
use crate::storage::Storage;
use crate::{DType, Device, Result};

/// A strided view over shared storage.
///
/// Views created by `reshape`, `transpose` and `expand` share the parent's
/// storage. Writing through a view whose storage is shared copies the buffer
/// first, so other views never observe the write.
///
/// # Examples
///
/// ```
/// use strata_core::DenseTensor;
///
/// let t = DenseTensor::from_f32(&[1.0, 2.0, 3.0, 4.0], &[2, 2]);
/// assert_eq!(t.shape().dims(), &[2, 2]);
/// assert_eq!(t.numel(), 4);
///
/// // Reshape (zero-copy view)
/// let flat = t.reshape(&[4]).unwrap();
/// assert_eq!(flat.shape().dims(), &[4]);
/// ```
#[derive(Clone)]
pub struct DenseTensor {
    storage: Storage,
    shape: Shape,
    strides: SmallVec<[usize; 4]>,
    offset: usize,
}

impl DenseTensor {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// Create a tensor from f32 data with the given shape.
    ///
    /// # Panics
    /// Panics if `data.len()` differs from the shape's element count.
    pub fn from_f32(data: &[f32], shape: &[usize]) -> Self {
        let s = Shape::new(shape);
        assert_eq!(
            s.numel(),
            data.len(),
            "Shape {:?} requires {} elements, got {}",
            shape,
            s.numel(),
            data.len()
        );
        Self::contiguous_over(Storage::from_f32(data), s)
    }

    /// Create a tensor from f64 data with the given shape.
    pub fn from_f64(data: &[f64], shape: &[usize]) -> Self {
        let s = Shape::new(shape);
        assert_eq!(s.numel(), data.len());
        Self::contiguous_over(Storage::from_f64(data), s)
    }

    /// Create a tensor from i32 data with the given shape.
    pub fn from_i32(data: &[i32], shape: &[usize]) -> Self {
        let s = Shape::new(shape);
        assert_eq!(s.numel(), data.len());
        Self::contiguous_over(Storage::from_i32(data), s)
    }

    /// Create a tensor of any element type, checking the element count.
    pub fn try_from_slice<T: Element>(data: &[T], shape: &[usize]) -> Result<Self> {
        let s = Shape::new(shape);
        if s.numel() != data.len() {
            return Err(ArithError::ShapeMismatch {
                expected: shape.to_vec(),
                got: vec![data.len()],
            });
        }
        Ok(Self::contiguous_over(Storage::from_slice(data), s))
    }

    /// Create a boolean tensor.
    pub fn from_bools(data: &[bool], shape: &[usize]) -> Self {
        let s = Shape::new(shape);
        assert_eq!(s.numel(), data.len());
        Self::contiguous_over(Storage::from_bools(data), s)
    }

    /// Create a tensor of zeros with the given shape and dtype.
    pub fn zeros(shape: &[usize], dtype: DType) -> Self {
        let s = Shape::new(shape);
        Self::contiguous_over(Storage::zeros(dtype, s.numel()), s)
    }

    /// A tensor whose data lives on `device` and is not host addressable.
    pub fn remote(shape: &[usize], dtype: DType, device: Device) -> Self {
        let s = Shape::new(shape);
        Self::contiguous_over(Storage::remote(dtype, s.numel(), device), s)
    }

    fn contiguous_over(storage: Storage, shape: Shape) -> Self {
        let strides = shape.contiguous_strides();
        Self {
            storage,
            shape,
            strides,
            offset: 0,
        }
    }

    // =========================================================================
    // Properties
    // =========================================================================

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.ndim()
    }

    pub fn numel(&self) -> usize {
        self.shape.numel()
    }

    pub fn dtype(&self) -> DType {
        self.storage.dtype()
    }

    pub fn device(&self) -> Device {
        self.storage.device()
    }

    /// Strides (in elements, not bytes).
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Offset of the first element in the backing buffer.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn is_natively_accessible(&self) -> bool {
        self.storage.is_natively_accessible()
    }

    /// Whether this tensor is contiguous in memory (row-major).
    pub fn is_contiguous(&self) -> bool {
        self.strides == self.shape.contiguous_strides() && self.offset == 0
    }

    /// Whether element `i` of the view is not simply element `i` of the
    /// backing buffer.
    pub fn requires_iterator(&self) -> bool {
        !self.is_contiguous() || self.storage.numel() != self.numel()
    }

    /// Whether two logical positions map to the same storage element.
    pub fn has_overlap(&self) -> bool {
        self.shape
            .dims()
            .iter()
            .zip(&self.strides)
            .any(|(&d, &s)| s == 0 && d > 1)
    }

    // =========================================================================
    // Buffer access
    // =========================================================================

    /// Offsets of the logical elements in row-major order.
    pub fn iter(&self) -> FlatIter {
        StridedIter::new(self.shape.dims(), &self.strides, self.offset).into()
    }

    /// Read-only view of the whole backing buffer.
    pub fn header(&self) -> Result<Header<'_>> {
        Ok(Header::new(self.dtype(), self.storage.as_bytes()?))
    }

    /// Writable view of the whole backing buffer (copy-on-write).
    pub fn header_mut(&mut self) -> Result<HeaderMut<'_>> {
        let dtype = self.dtype();
        Ok(HeaderMut::new(dtype, self.storage.as_bytes_mut()?))
    }

    /// A contiguous copy that shares nothing with `self`.
    pub fn detached(&self) -> Result<DenseTensor> {
        let src = self.header()?;
        let mut out = DenseTensor::zeros(self.shape.dims(), self.dtype());
        let numel = out.numel();
        let mut dst = out.header_mut()?;
        copy_iter(&mut dst, &src, &mut FlatIter::contiguous(numel), &mut self.iter())?;
        Ok(out)
    }

    /// Element values in logical order.
    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>> {
        if T::DTYPE != self.dtype() {
            return Err(ArithError::type_mismatch(T::DTYPE, self.dtype()));
        }
        let data = self.header()?.as_slice::<T>()?;
        let mut out = Vec::with_capacity(self.numel());
        for slot in self.iter() {
            let idx = slot.unwrap_or_default();
            let value = data
                .get(idx)
                .copied()
                .ok_or(KernelError::OutOfBounds { index: idx, len: data.len() })?;
            out.push(value);
        }
        Ok(out)
    }

    /// Get a single element by flat (row-major) index.
    pub fn get<T: Element>(&self, flat_index: usize) -> Option<T> {
        let data = self.header().ok()?.as_slice::<T>().ok()?;
        let physical = self.flat_to_physical(flat_index)?;
        data.get(physical).copied()
    }

    /// Get the underlying f32 data as a slice (contiguous tensors only).
    pub fn as_f32_slice(&self) -> Option<&[f32]> {
        if self.requires_iterator() {
            return None;
        }
        self.storage.as_f32_slice()
    }

    /// Convert a flat index to a physical storage index.
    fn flat_to_physical(&self, flat_index: usize) -> Option<usize> {
        if flat_index >= self.numel() {
            return None;
        }
        let mut remaining = flat_index;
        let mut physical = self.offset;
        let contiguous_strides = self.shape.contiguous_strides();
        for (i, &cs) in contiguous_strides.iter().enumerate() {
            let idx = remaining / cs;
            remaining %= cs;
            physical += idx * self.strides[i];
        }
        Some(physical)
    }

    // =========================================================================
    // Shape operations (zero-copy views)
    // =========================================================================

    /// Reshape the tensor (contiguous tensors only).
    pub fn reshape(&self, new_shape: &[isize]) -> Result<DenseTensor> {
        let resolved = self
            .shape
            .resolve_reshape(new_shape)
            .ok_or_else(|| ArithError::InvalidReshape {
                numel: self.numel(),
                shape: new_shape.to_vec(),
            })?;

        if !self.is_contiguous() {
            return Err(ArithError::StorageError(
                "Cannot reshape non-contiguous tensor (call .detached() first)".into(),
            ));
        }

        let strides = resolved.contiguous_strides();
        Ok(DenseTensor {
            storage: self.storage.clone(),
            shape: resolved,
            strides,
            offset: self.offset,
        })
    }

    /// Transpose the last two dimensions (zero-copy view).
    pub fn transpose(&self) -> Result<DenseTensor> {
        let new_shape = self.shape.transpose().ok_or(ArithError::InvalidAxis {
            axis: 0,
            ndim: self.ndim(),
        })?;

        let ndim = self.ndim();
        let mut new_strides = self.strides.clone();
        new_strides.swap(ndim - 2, ndim - 1);

        Ok(DenseTensor {
            storage: self.storage.clone(),
            shape: new_shape,
            strides: new_strides,
            offset: self.offset,
        })
    }

    /// Broadcast size-1 axes to `shape` with zero strides (zero-copy view).
    pub fn expand(&self, shape: &[usize]) -> Result<DenseTensor> {
        let target = Shape::new(shape);
        if !self.shape.expands_to(&target) {
            return Err(ArithError::ShapeMismatch {
                expected: shape.to_vec(),
                got: self.shape.dims().to_vec(),
            });
        }
        let strides = self
            .shape
            .dims()
            .iter()
            .zip(shape)
            .zip(&self.strides)
            .map(|((&from, &to), &s)| if from == 1 && to != 1 { 0 } else { s })
            .collect();
        Ok(DenseTensor {
            storage: self.storage.clone(),
            shape: target,
            strides,
            offset: self.offset,
        })
    }
}

impl fmt::Debug for DenseTensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DenseTensor(shape={}, dtype={}, device={}, contiguous={})",
            self.shape,
            self.dtype(),
            self.device(),
            self.is_contiguous(),
        )
    }
}

impl fmt::Display for DenseTensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(data) = self.as_f32_slice() {
            if self.numel() <= 20 {
                write!(f, "tensor({:?}, shape={})", data, self.shape)
            } else {
                write!(
                    f,
                    "tensor([{:.4}, {:.4}, ..., {:.4}], shape={})",
                    data[0],
                    data[1],
                    data[self.numel() - 1],
                    self.shape
                )
            }
        } else {
            write!(f, "tensor(shape={}, dtype={})", self.shape, self.dtype())
        }
    }
}
