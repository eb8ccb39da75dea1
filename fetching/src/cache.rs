//! Shared in-memory data cache
//!
//! Values are stored per string key together with the time they were
//! written. Freshness is decided by the reader: an entry older than the
//! reader's max age is treated as a miss but stays in place until it is
//! overwritten or cleared. There is no sweep and no capacity bound, so keys
//! should be drawn from a small, meaningful set.
//!
//! The cache also keeps a registry of in-flight requests so that controllers
//! asking for the same key at the same time share one producer call.

use futures::FutureExt;
use futures::future::{LocalBoxFuture, Shared, WeakShared};
use jiff::Timestamp;
use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::rc::{Rc, Weak};
use std::time::Duration;
use tracing::{debug, warn};

use crate::{FetchError, TimeSource};

type InFlightCall = LocalBoxFuture<'static, Result<Rc<dyn Any>, FetchError>>;

/// Registry entries do not keep a call alive. Once every waiter has dropped
/// its future the entry no longer upgrades and reads as absent.
type InFlight = WeakShared<InFlightCall>;

/// A cached value and the time it was stored.
#[derive(Clone)]
pub struct CacheEntry {
    value: Rc<dyn Any>,
    stored_at: Timestamp,
}

impl CacheEntry {
    /// The stored value, if it is a `T`.
    pub fn value<T: 'static>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    pub fn stored_at(&self) -> Timestamp {
        self.stored_at
    }
}

impl std::fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheEntry")
            .field("stored_at", &self.stored_at)
            .finish_non_exhaustive()
    }
}

struct DataCacheInner {
    entries: RefCell<HashMap<String, CacheEntry>>,
    in_flight: RefCell<HashMap<String, InFlight>>,
    time_source: TimeSource,
}

/// Handle to a cache shared by every controller it is handed to.
///
/// Cloning the handle shares the underlying store. Create one per
/// application (or per test) and inject it; there is no global instance.
#[derive(Clone)]
pub struct DataCache {
    inner: Rc<DataCacheInner>,
}

impl Default for DataCache {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for DataCache {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for DataCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataCache")
            .field("entries", &self.len())
            .field("in_flight", &self.in_flight_count())
            .finish()
    }
}

impl DataCache {
    pub fn new() -> Self {
        Self::with_time_source(TimeSource::new())
    }

    pub fn with_time_source(time_source: TimeSource) -> Self {
        Self {
            inner: Rc::new(DataCacheInner {
                entries: RefCell::new(HashMap::new()),
                in_flight: RefCell::new(HashMap::new()),
                time_source,
            }),
        }
    }

    pub fn time_source(&self) -> &TimeSource {
        &self.inner.time_source
    }

    /// The entry for `key` regardless of its age.
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        self.inner.entries.borrow().get(key).cloned()
    }

    /// Store `value` under `key`, stamped with the current time. Replaces
    /// any previous entry.
    pub fn set<T: 'static>(&self, key: impl Into<String>, value: T) {
        let entry = CacheEntry {
            value: Rc::new(value),
            stored_at: self.inner.time_source.now(),
        };
        self.inner.entries.borrow_mut().insert(key.into(), entry);
    }

    pub fn is_fresh(&self, entry: &CacheEntry, max_age: Duration) -> bool {
        let now = self.inner.time_source.now().as_millisecond();
        let age = i128::from(now) - i128::from(entry.stored_at.as_millisecond());
        age < i128::try_from(max_age.as_millis()).unwrap_or(i128::MAX)
    }

    /// Typed lookup. Stale entries and entries holding another type read as
    /// misses and are left untouched.
    pub fn get_fresh<T: Clone + 'static>(
        &self,
        key: &str,
        max_age: Duration,
    ) -> Option<T> {
        let entry = self.get(key)?;
        if !self.is_fresh(&entry, max_age) {
            debug!("Cache entry for key {} is stale", key);
            return None;
        }
        match entry.value::<T>() {
            Some(value) => Some(value.clone()),
            None => {
                warn!("Cache entry for key {} holds an unexpected type", key);
                None
            }
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.entries.borrow().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.borrow().is_empty()
    }

    pub fn clear_all(&self) {
        debug!("Clearing all cache entries");
        self.inner.entries.borrow_mut().clear();
    }

    pub fn clear_key(&self, key: &str) {
        debug!("Clearing cache entry for key: {}", key);
        self.inner.entries.borrow_mut().remove(key);
    }

    /// Number of keys with a call that still has someone waiting on it.
    pub fn in_flight_count(&self) -> usize {
        self.inner
            .in_flight
            .borrow()
            .values()
            .filter(|call| call.upgrade().is_some())
            .count()
    }

    /// Share one producer call among everyone asking for `key` while it is
    /// running.
    ///
    /// If a call for `key` is already registered the returned future waits
    /// on it and `start` is not invoked. Otherwise `start` is invoked and its
    /// future registered until it settles. A call whose waiters have all
    /// dropped their futures is abandoned, and the next caller starts a new
    /// one. The cache itself is not written; that stays with the caller.
    pub fn coalesce<T, F>(
        &self,
        key: &str,
        start: F,
    ) -> impl Future<Output = Result<T, FetchError>> + 'static
    where
        T: Clone + 'static,
        F: FnOnce() -> LocalBoxFuture<'static, Result<T, FetchError>>,
    {
        let existing = self
            .inner
            .in_flight
            .borrow()
            .get(key)
            .and_then(WeakShared::upgrade);
        let shared = match existing {
            Some(shared) => {
                debug!("Joining in-flight request for key: {}", key);
                shared
            }
            None => {
                let call = start();
                let registry = Rc::downgrade(&self.inner);
                let owned_key = key.to_owned();
                let shared: Shared<InFlightCall> = async move {
                    let result =
                        call.await.map(|value| Rc::new(value) as Rc<dyn Any>);
                    release(&registry, &owned_key);
                    result
                }
                .boxed_local()
                .shared();
                if let Some(weak) = shared.downgrade() {
                    self.inner
                        .in_flight
                        .borrow_mut()
                        .insert(key.to_owned(), weak);
                }
                shared
            }
        };

        let key = key.to_owned();
        async move {
            let value = shared.await?;
            value
                .downcast::<T>()
                .map(|value| (*value).clone())
                .map_err(|_| FetchError::CacheType { key })
        }
    }
}

fn release(registry: &Weak<DataCacheInner>, key: &str) {
    if let Some(inner) = registry.upgrade() {
        inner.in_flight.borrow_mut().remove(key);
    }
}
