//! Flat iterators over tensor buffers.
//!
//! An iterator walks the logical elements of a tensor in row-major order and
//! yields, for each one, the linear offset of that element inside the
//! tensor's [`Header`](crate::Header). Sparse tensors yield `None` for
//! positions that hold no stored value; those positions read as zero.
//!
//! Iterators own their traversal state, are single-pass, and can be
//! restarted with `reset`.

use smallvec::SmallVec;

/// Offset into a header, or `None` for an implicit zero.
pub type Slot = Option<usize>;

/// Odometer over a strided (possibly broadcast) dense layout.
#[derive(Debug, Clone)]
pub struct StridedIter {
    dims: SmallVec<[usize; 4]>,
    strides: SmallVec<[usize; 4]>,
    offset: usize,
    coord: SmallVec<[usize; 4]>,
    next_offset: usize,
    remaining: usize,
    total: usize,
}

impl StridedIter {
    /// Iterate a layout described by `dims`, element `strides` and a base offset.
    pub fn new(dims: &[usize], strides: &[usize], offset: usize) -> Self {
        debug_assert_eq!(dims.len(), strides.len());
        let total = dims.iter().product();
        Self {
            dims: SmallVec::from_slice(dims),
            strides: SmallVec::from_slice(strides),
            offset,
            coord: SmallVec::from_elem(0, dims.len()),
            next_offset: offset,
            remaining: total,
            total,
        }
    }

    /// Iterate `len` consecutive elements starting at offset 0.
    pub fn contiguous(len: usize) -> Self {
        Self::new(&[len], &[1], 0)
    }

    /// Restart from the first element.
    pub fn reset(&mut self) {
        self.coord.iter_mut().for_each(|c| *c = 0);
        self.next_offset = self.offset;
        self.remaining = self.total;
    }
}

impl Iterator for StridedIter {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        let current = self.next_offset;
        self.remaining -= 1;
        if self.remaining > 0 {
            for axis in (0..self.dims.len()).rev() {
                self.coord[axis] += 1;
                self.next_offset += self.strides[axis];
                if self.coord[axis] < self.dims[axis] {
                    break;
                }
                self.next_offset -= self.strides[axis] * self.dims[axis];
                self.coord[axis] = 0;
            }
        }
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for StridedIter {}

/// Row-major walk over every position of a compressed sparse tensor.
#[derive(Debug, Clone)]
pub struct SparseIter {
    /// `(linear position, index into stored values)`, sorted by position.
    entries: Vec<(usize, usize)>,
    total: usize,
    pos: usize,
    cursor: usize,
}

impl SparseIter {
    /// `entries` must be sorted by linear position with no duplicates.
    pub(crate) fn new(entries: Vec<(usize, usize)>, total: usize) -> Self {
        Self {
            entries,
            total,
            pos: 0,
            cursor: 0,
        }
    }

    /// Restart from the first position.
    pub fn reset(&mut self) {
        self.pos = 0;
        self.cursor = 0;
    }
}

impl Iterator for SparseIter {
    type Item = Slot;

    fn next(&mut self) -> Option<Slot> {
        if self.pos >= self.total {
            return None;
        }
        let slot = match self.entries.get(self.cursor) {
            Some(&(linear, value_idx)) if linear == self.pos => {
                self.cursor += 1;
                Some(value_idx)
            }
            _ => None,
        };
        self.pos += 1;
        Some(slot)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.total - self.pos;
        (left, Some(left))
    }
}

impl ExactSizeIterator for SparseIter {}

/// The iterator handed to a compute engine.
#[derive(Debug, Clone)]
pub enum FlatIter {
    Strided(StridedIter),
    Sparse(SparseIter),
}

impl FlatIter {
    /// Iterator over `len` contiguous elements.
    pub fn contiguous(len: usize) -> Self {
        FlatIter::Strided(StridedIter::contiguous(len))
    }

    /// Restart from the first element.
    pub fn reset(&mut self) {
        match self {
            FlatIter::Strided(it) => it.reset(),
            FlatIter::Sparse(it) => it.reset(),
        }
    }
}

impl Iterator for FlatIter {
    type Item = Slot;

    fn next(&mut self) -> Option<Slot> {
        match self {
            FlatIter::Strided(it) => it.next().map(Some),
            FlatIter::Sparse(it) => it.next(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            FlatIter::Strided(it) => it.size_hint(),
            FlatIter::Sparse(it) => it.size_hint(),
        }
    }
}

impl ExactSizeIterator for FlatIter {}

impl From<StridedIter> for FlatIter {
    fn from(it: StridedIter) -> Self {
        FlatIter::Strided(it)
    }
}
