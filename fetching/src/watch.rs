/// Remembers the last observed dependency values and reports when they
/// change.
///
/// Used in place of an implicit dependency array: callers feed the current
/// values on every render and re-run the fetch when `observe` returns true.
#[derive(Debug, Clone)]
pub struct Watch<D> {
    last: D,
}

impl<D: PartialEq> Watch<D> {
    /// The initial values count as already seen.
    pub fn new(initial: D) -> Self {
        Self { last: initial }
    }

    pub fn observe(&mut self, next: D) -> bool {
        if self.last == next {
            false
        } else {
            self.last = next;
            true
        }
    }

    pub fn current(&self) -> &D {
        &self.last
    }
}
