use std::cell::Cell;
use std::rc::Rc;

/// Tears a controller down when its owning view goes away.
///
/// After `dispose` the controller applies no further state changes. Calls
/// that are already running are not aborted; their results are dropped.
#[derive(Debug, Clone)]
pub struct Disposer {
    mounted: Rc<Cell<bool>>,
}

impl Disposer {
    pub fn dispose(&self) {
        self.mounted.set(false);
    }

    pub fn is_disposed(&self) -> bool {
        !self.mounted.get()
    }
}

/// Sequence number handed to each fetch call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Ticket(u64);

pub(crate) enum Admission {
    Apply,
    Unmounted,
    Superseded,
}

/// Mount flag plus the number of the most recently issued call.
///
/// A result is applied only while mounted and only if no newer call has been
/// issued since, so out-of-order completions cannot overwrite fresher state.
#[derive(Debug)]
pub(crate) struct Lifecycle {
    mounted: Rc<Cell<bool>>,
    latest: Cell<u64>,
}

impl Lifecycle {
    pub(crate) fn new() -> Self {
        Self {
            mounted: Rc::new(Cell::new(true)),
            latest: Cell::new(0),
        }
    }

    pub(crate) fn disposer(&self) -> Disposer {
        Disposer {
            mounted: Rc::clone(&self.mounted),
        }
    }

    pub(crate) fn is_mounted(&self) -> bool {
        self.mounted.get()
    }

    pub(crate) fn begin(&self) -> Ticket {
        let next = self.latest.get() + 1;
        self.latest.set(next);
        Ticket(next)
    }

    pub(crate) fn admit(&self, ticket: Ticket) -> Admission {
        if !self.mounted.get() {
            Admission::Unmounted
        } else if ticket.0 != self.latest.get() {
            Admission::Superseded
        } else {
            Admission::Apply
        }
    }
}
