//! Per-operand descent chains for cycle detection.
//!
//! Each operand of a compatibility check carries its own chain of visited
//! declarations. A declaration reappearing in its own descent path means the
//! type is self-referential; when both operands loop at the same point the
//! checker stops descending instead of recursing forever.

use tessera_core::TypeId;

/// Stack of declarations visited on one operand's descent path.
///
/// `mark_state` / `previous_state` bracket each subfield descent so sibling
/// comparisons never see each other's entries. Marks nest; the chain length
/// at a `previous_state` is restored to exactly what it was at the matching
/// `mark_state`.
#[derive(Debug, Clone, Default)]
pub struct CompatibilityChain {
    visited: Vec<TypeId>,
    marks: Vec<usize>,
}

impl CompatibilityChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, id: TypeId) {
        self.visited.push(id);
    }

    /// Remember the current chain length.
    pub fn mark_state(&mut self) {
        self.marks.push(self.visited.len());
    }

    /// Pop back to the most recent mark.
    pub fn previous_state(&mut self) {
        let mark = self
            .marks
            .pop()
            .expect("previous_state without matching mark_state");
        self.visited.truncate(mark);
    }

    /// Whether the most recently pushed declaration already occurs earlier
    /// in the chain.
    pub fn has_recursion(&self) -> bool {
        match self.visited.split_last() {
            Some((last, earlier)) => earlier.contains(last),
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.visited.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visited.is_empty()
    }
}
