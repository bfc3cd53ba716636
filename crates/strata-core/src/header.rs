//! Raw buffer views handed to compute engines.

use std::fmt;

use crate::dtype::Element;
use crate::engine::KernelError;
use crate::iter::FlatIter;
use crate::DType;

/// Read-only `(dtype, bytes)` view over a contiguous backing buffer.
#[derive(Clone, Copy)]
pub struct Header<'a> {
    dtype: DType,
    bytes: &'a [u8],
}

impl<'a> Header<'a> {
    pub fn new(dtype: DType, bytes: &'a [u8]) -> Self {
        Self { dtype, bytes }
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Number of elements in the buffer.
    pub fn len(&self) -> usize {
        self.bytes.len() / self.dtype.size()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Typed view of the buffer. `T` must match the header's dtype.
    pub fn as_slice<T: Element>(&self) -> Result<&'a [T], KernelError> {
        if T::DTYPE != self.dtype {
            return Err(KernelError::ElementMismatch {
                expected: T::DTYPE,
                got: self.dtype,
            });
        }
        bytemuck::try_cast_slice(self.bytes).map_err(|_| KernelError::Misaligned(self.dtype))
    }
}

impl fmt::Debug for Header<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Header({}, len={})", self.dtype, self.len())
    }
}

/// Writable `(dtype, bytes)` view over a contiguous backing buffer.
pub struct HeaderMut<'a> {
    dtype: DType,
    bytes: &'a mut [u8],
}

impl<'a> HeaderMut<'a> {
    pub fn new(dtype: DType, bytes: &'a mut [u8]) -> Self {
        Self { dtype, bytes }
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn len(&self) -> usize {
        self.bytes.len() / self.dtype.size()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Typed mutable view of the buffer. `T` must match the header's dtype.
    pub fn as_mut_slice<T: Element>(&mut self) -> Result<&mut [T], KernelError> {
        if T::DTYPE != self.dtype {
            return Err(KernelError::ElementMismatch {
                expected: T::DTYPE,
                got: self.dtype,
            });
        }
        let dtype = self.dtype;
        bytemuck::try_cast_slice_mut(&mut *self.bytes).map_err(|_| KernelError::Misaligned(dtype))
    }
}

impl fmt::Debug for HeaderMut<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HeaderMut({}, len={})", self.dtype, self.len())
    }
}

/// Copy the raw contents of `src` into the front of `dst`.
pub fn copy_header(dst: &mut HeaderMut<'_>, src: &Header<'_>) -> Result<(), KernelError> {
    if dst.dtype != src.dtype {
        return Err(KernelError::ElementMismatch {
            expected: dst.dtype,
            got: src.dtype,
        });
    }
    if src.bytes.len() > dst.bytes.len() {
        return Err(KernelError::LengthMismatch {
            dst: dst.len(),
            src: src.len(),
        });
    }
    dst.bytes[..src.bytes.len()].copy_from_slice(src.bytes);
    Ok(())
}

/// Copy element by element, walking both iterators in lockstep.
/// Implicit zeros of a sparse source are written as zero bytes.
pub fn copy_iter(
    dst: &mut HeaderMut<'_>,
    src: &Header<'_>,
    dst_it: &mut FlatIter,
    src_it: &mut FlatIter,
) -> Result<(), KernelError> {
    if dst.dtype != src.dtype {
        return Err(KernelError::ElementMismatch {
            expected: dst.dtype,
            got: src.dtype,
        });
    }
    let size = dst.dtype.size();
    let (dst_len, src_len) = (dst.len(), src.len());
    loop {
        match (dst_it.next(), src_it.next()) {
            (Some(Some(d)), Some(s)) => {
                if d >= dst_len {
                    return Err(KernelError::OutOfBounds { index: d, len: dst_len });
                }
                let out = &mut dst.bytes[d * size..(d + 1) * size];
                match s {
                    Some(s) if s >= src_len => {
                        return Err(KernelError::OutOfBounds { index: s, len: src_len });
                    }
                    Some(s) => out.copy_from_slice(&src.bytes[s * size..(s + 1) * size]),
                    None => out.fill(0),
                }
            }
            (Some(None), _) => return Err(KernelError::HoleInDestination),
            (None, None) => return Ok(()),
            _ => return Err(KernelError::IteratorLength),
        }
    }
}
