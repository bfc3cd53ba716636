use smallvec::SmallVec;
use std::fmt;

/// Dimensions of a tensor view. Up to four axes are stored inline.
#[derive(Clone, PartialEq, Eq)]
pub struct Shape {
    dims: SmallVec<[usize; 4]>,
}

impl Shape {
    pub fn new(dims: &[usize]) -> Self {
        Self {
            dims: SmallVec::from_slice(dims),
        }
    }

    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Element count. A rank-0 shape holds one element.
    pub fn numel(&self) -> usize {
        self.dims.iter().product()
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Row-major strides, in elements.
    pub fn contiguous_strides(&self) -> SmallVec<[usize; 4]> {
        let mut strides: SmallVec<[usize; 4]> = SmallVec::from_elem(1, self.dims.len());
        let mut step = 1;
        for (stride, &dim) in strides.iter_mut().zip(&self.dims).rev() {
            *stride = step;
            step *= dim;
        }
        strides
    }

    /// The shape `target` names for this many elements, or `None` if it
    /// holds a different count. One axis may be `-1` and is inferred.
    pub fn resolve_reshape(&self, target: &[isize]) -> Option<Shape> {
        let numel = self.numel();
        let mut wildcard = None;
        let mut dims: SmallVec<[usize; 4]> = SmallVec::with_capacity(target.len());
        for (axis, &d) in target.iter().enumerate() {
            match d {
                -1 if wildcard.is_none() => {
                    wildcard = Some(axis);
                    dims.push(1);
                }
                d if d > 0 => dims.push(d as usize),
                _ => return None,
            }
        }

        let known = dims.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))?;
        if let Some(axis) = wildcard {
            if known == 0 || numel % known != 0 {
                return None;
            }
            dims[axis] = numel / known;
        } else if known != numel {
            return None;
        }
        Some(Shape { dims })
    }

    /// The last two axes swapped, or `None` below rank 2.
    pub fn transpose(&self) -> Option<Shape> {
        let n = self.ndim();
        if n < 2 {
            return None;
        }
        let mut dims = self.dims.clone();
        dims.swap(n - 2, n - 1);
        Some(Shape { dims })
    }

    /// Whether `self` can be expanded to `target` by repeating size-1 axes.
    /// Ranks must match; no implicit leading dimensions are added.
    pub fn expands_to(&self, target: &Shape) -> bool {
        self.ndim() == target.ndim()
            && self
                .dims
                .iter()
                .zip(target.dims.iter())
                .all(|(&s, &t)| s == t || s == 1)
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Shape({:?})", self.dims.as_slice())
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.dims.as_slice())
    }
}
