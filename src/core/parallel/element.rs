use serde::{Deserialize, Serialize};
use std::fmt;

/// A fine-grained model element updated in two phases
///
/// Within one pass every element's `compute` runs before any `commit`, so
/// `compute` may read the current value of any other element and always sees
/// the pre-pass state. `compute` must write only to the element's own buffer.
pub trait BufferedElement: Send + Sync {
    /// Compute the next value into a private buffer
    fn compute(&self);

    /// Make the buffered value current
    fn commit(&self);
}

/// Handle of an element registered with a buffered update engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(u64);

impl ElementId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
