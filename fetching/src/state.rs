//! View-facing fetch state

use std::collections::BTreeMap;

use crate::FetchError;

/// State of a single fetch controller.
///
/// `data` is the last known-good value and survives failed refreshes.
/// `is_loading` marks the initial fetch and `is_refreshing` an explicit
/// refetch; the two are never set together.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchState<T> {
    pub data: Option<T>,
    pub is_loading: bool,
    pub is_refreshing: bool,
    pub error: Option<FetchError>,
    /// Set once any fetch has settled or was answered from the cache.
    pub fetched: bool,
}

/// Where a controller sits in its lifecycle, derived from [`FetchState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
    Refreshing,
    Ready,
    Errored,
}

impl<T> FetchState<T> {
    pub fn new(initial_data: Option<T>) -> Self {
        Self {
            data: initial_data,
            is_loading: false,
            is_refreshing: false,
            error: None,
            fetched: false,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.is_loading || self.is_refreshing
    }

    /// Loading with nothing to show yet.
    pub fn is_initial_loading(&self) -> bool {
        self.is_loading && self.data.is_none() && self.error.is_none()
    }

    pub fn phase(&self) -> Phase {
        if self.is_loading {
            Phase::Loading
        } else if self.is_refreshing {
            Phase::Refreshing
        } else if self.error.is_some() {
            Phase::Errored
        } else if self.fetched {
            Phase::Ready
        } else {
            Phase::Idle
        }
    }
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Combined state of a multi-fetch controller.
///
/// A key is present in `data` once its producer has succeeded. Keys whose
/// producers failed in the latest cycle are listed in `failures` and keep
/// whatever value an earlier cycle stored for them.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiFetchState<V> {
    pub data: BTreeMap<String, V>,
    pub is_loading: bool,
    pub is_refreshing: bool,
    pub failures: BTreeMap<String, FetchError>,
    pub fetched: bool,
}

impl<V> MultiFetchState<V> {
    pub fn new(initial_data: BTreeMap<String, V>) -> Self {
        Self {
            data: initial_data,
            is_loading: false,
            is_refreshing: false,
            failures: BTreeMap::new(),
            fetched: false,
        }
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.data.get(key)
    }

    pub fn is_busy(&self) -> bool {
        self.is_loading || self.is_refreshing
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

impl<V> Default for MultiFetchState<V> {
    fn default() -> Self {
        Self::new(BTreeMap::new())
    }
}
