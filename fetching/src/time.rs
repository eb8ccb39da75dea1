use jiff::Timestamp;
#[cfg(feature = "mock-time")]
use jiff::Span;
#[cfg(feature = "mock-time")]
use std::{cell::Cell, rc::Rc};

/// Clock consulted by the cache when stamping and aging entries.
///
/// With the `mock-time` feature a source can be created with
/// [`TimeSource::mocked`], after which it only moves when told to.
#[derive(Clone, Default)]
pub struct TimeSource {
    #[cfg(feature = "mock-time")]
    time: Option<Rc<Cell<Timestamp>>>,
}

impl TimeSource {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(feature = "mock-time")]
    pub fn mocked(initial_time: Timestamp) -> Self {
        Self {
            time: Some(Rc::new(Cell::new(initial_time))),
        }
    }

    #[cfg(not(feature = "mock-time"))]
    pub fn now(&self) -> Timestamp {
        Timestamp::now()
    }

    #[cfg(feature = "mock-time")]
    pub fn now(&self) -> Timestamp {
        self.time.as_ref().map_or_else(Timestamp::now, |time| time.get())
    }

    /// No-op on a source that was not created with [`TimeSource::mocked`].
    #[cfg(feature = "mock-time")]
    pub fn advance(&self, duration: Span) {
        if let Some(time) = &self.time {
            time.set(time.get() + duration);
        }
    }

    #[cfg(feature = "mock-time")]
    pub fn set(&self, now: Timestamp) {
        if let Some(time) = &self.time {
            time.set(now);
        }
    }
}
