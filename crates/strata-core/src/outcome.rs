/// Result of an operation that may legitimately do nothing.
///
/// Wrapped in [`crate::Result`] this gives three states: success, no-op and
/// failure. A no-op happens when no operand holds numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum Outcome<T> {
    Done(T),
    NoOp,
}

impl<T> Outcome<T> {
    pub fn is_noop(&self) -> bool {
        matches!(self, Outcome::NoOp)
    }

    /// The value, or `None` for a no-op.
    pub fn done(self) -> Option<T> {
        match self {
            Outcome::Done(v) => Some(v),
            Outcome::NoOp => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Done(v) => Outcome::Done(f(v)),
            Outcome::NoOp => Outcome::NoOp,
        }
    }
}
