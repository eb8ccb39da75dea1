//! Single-producer fetch controller
//!
//! A controller owns one [`FetchState`] and one producer. Calls go through
//! three gates before touching state:
//!
//! - the cache short-circuit (initial fetches with a cache key only),
//! - the mount flag, flipped by the [`Disposer`] when the view goes away,
//! - the call sequence number, so only the newest call settles the state.
//!
//! Producer errors are caught, logged and stored in `error`; `data` keeps
//! its last good value.

use std::cell::{Cell, RefCell};
use std::fmt::Display;
use std::future::Future;
use std::rc::Rc;
use tracing::{debug, warn};

use crate::lifecycle::{Admission, Lifecycle};
use crate::{
    BoxProducer, DataCache, Disposer, FetchContext, FetchError, FetchOptions,
    FetchState, Notifier, Phase, Severity, boxed_producer,
};

type Listener<T> = Rc<dyn Fn(&FetchState<T>)>;

/// How a fetch was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Mount or dependency change. May be answered from the cache and shows
    /// as `is_loading`.
    Initial,
    /// Explicit refetch. Always calls the producer and shows as
    /// `is_refreshing`; `notify` allows the success notification.
    Refresh { notify: bool },
}

impl FetchMode {
    fn is_initial(self) -> bool {
        matches!(self, FetchMode::Initial)
    }

    fn notifies(self) -> bool {
        matches!(self, FetchMode::Refresh { notify: true })
    }
}

struct Inner<T> {
    state: RefCell<FetchState<T>>,
    producer: BoxProducer<T>,
    options: FetchOptions,
    cache: DataCache,
    notifier: Rc<dyn Notifier>,
    lifecycle: Lifecycle,
    listeners: RefCell<Vec<Listener<T>>>,
    /// Coalesced initial calls of this controller that have not settled.
    joined: Cell<usize>,
}

/// Drives one producer against one piece of view state.
///
/// Cheap to clone; clones share state.
pub struct FetchController<T> {
    inner: Rc<Inner<T>>,
}

impl<T> Clone for FetchController<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + 'static> FetchController<T> {
    pub fn new<F, Fut, E>(
        ctx: &FetchContext,
        options: FetchOptions,
        initial_data: Option<T>,
        producer: F,
    ) -> Self
    where
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = Result<T, E>> + 'static,
        E: Display + 'static,
    {
        Self::from_boxed(ctx, options, initial_data, boxed_producer(producer))
    }

    pub fn from_boxed(
        ctx: &FetchContext,
        options: FetchOptions,
        initial_data: Option<T>,
        producer: BoxProducer<T>,
    ) -> Self {
        Self {
            inner: Rc::new(Inner {
                state: RefCell::new(FetchState::new(initial_data)),
                producer,
                options,
                cache: ctx.cache.clone(),
                notifier: Rc::clone(&ctx.notifier),
                lifecycle: Lifecycle::new(),
                listeners: RefCell::new(Vec::new()),
                joined: Cell::new(0),
            }),
        }
    }

    pub fn options(&self) -> &FetchOptions {
        &self.inner.options
    }

    pub fn state(&self) -> FetchState<T> {
        self.inner.state.borrow().clone()
    }

    pub fn phase(&self) -> Phase {
        self.inner.state.borrow().phase()
    }

    /// Called with a snapshot after every applied state change.
    pub fn subscribe(&self, listener: impl Fn(&FetchState<T>) + 'static) {
        self.inner.listeners.borrow_mut().push(Rc::new(listener));
    }

    pub fn disposer(&self) -> Disposer {
        self.inner.lifecycle.disposer()
    }

    pub fn is_mounted(&self) -> bool {
        self.inner.lifecycle.is_mounted()
    }

    /// Mount path: an initial fetch if `auto_fetch` is set, otherwise
    /// nothing.
    pub async fn start(&self) {
        if self.inner.options.auto_fetch {
            self.fetch(FetchMode::Initial).await;
        }
    }

    /// Explicit refetch; bypasses the cache.
    pub async fn refetch(&self, notify: bool) {
        self.fetch(FetchMode::Refresh { notify }).await;
    }

    /// Replace `data` without calling the producer or touching the cache.
    pub fn set_data(&self, value: T) {
        if !self.is_mounted() {
            return;
        }
        self.update(|state| state.data = Some(value));
    }

    /// Run one fetch. A fresh cache hit on an initial fetch completes on the
    /// first poll without invoking the producer.
    pub async fn fetch(&self, mode: FetchMode) {
        let inner = &self.inner;
        if !inner.lifecycle.is_mounted() {
            debug!("Fetch requested after dispose; ignoring");
            return;
        }

        if mode.is_initial()
            && let Some(key) = inner.options.cache_key.as_deref()
            && let Some(cached) =
                inner.cache.get_fresh::<T>(key, inner.options.cache_time)
        {
            debug!("Cache hit for key: {}", key);
            inner.lifecycle.begin();
            self.update(|state| {
                state.data = Some(cached);
                state.is_loading = false;
                state.is_refreshing = false;
                state.fetched = true;
            });
            return;
        }

        let ticket = inner.lifecycle.begin();
        self.update(|state| {
            state.is_loading = mode.is_initial();
            state.is_refreshing = !mode.is_initial();
            state.error = None;
        });

        let result = self.produce(mode).await;

        match inner.lifecycle.admit(ticket) {
            Admission::Apply => {}
            Admission::Unmounted => {
                debug!("Discarding fetch result: view has been disposed");
                return;
            }
            Admission::Superseded => {
                debug!("Discarding fetch result: superseded by a newer call");
                return;
            }
        }

        match result {
            Ok(value) => {
                if let Some(key) = inner.options.cache_key.as_deref() {
                    inner.cache.set(key, value.clone());
                }
                self.update(|state| {
                    state.data = Some(value);
                    state.error = None;
                    state.is_loading = false;
                    state.is_refreshing = false;
                    state.fetched = true;
                });
                if mode.notifies() && inner.options.show_success_toast {
                    inner
                        .notifier
                        .notify(Severity::Success, &inner.options.success_message);
                }
            }
            Err(error) => {
                match inner.options.cache_key.as_deref() {
                    Some(key) => warn!("Fetch failed for key {}: {}", key, error),
                    None => warn!("Fetch failed: {}", error),
                }
                self.update(|state| {
                    state.error = Some(error);
                    state.is_loading = false;
                    state.is_refreshing = false;
                    state.fetched = true;
                });
                if inner.options.show_error_toast {
                    inner
                        .notifier
                        .notify(Severity::Error, &inner.options.error_message);
                }
            }
        }
    }

    async fn produce(&self, mode: FetchMode) -> Result<T, FetchError> {
        let inner = &self.inner;
        match inner.options.cache_key.as_deref() {
            // Never join a call this controller started for earlier inputs
            Some(key)
                if mode.is_initial()
                    && inner.options.dedupe_in_flight
                    && inner.joined.get() == 0 =>
            {
                let producer = Rc::clone(&inner.producer);
                let _joined = JoinedCall::enter(&inner.joined);
                inner.cache.coalesce(key, move || producer()).await
            }
            _ => (inner.producer)().await,
        }
    }

    fn update(&self, mutate: impl FnOnce(&mut FetchState<T>)) {
        let snapshot = {
            let mut state = self.inner.state.borrow_mut();
            mutate(&mut state);
            state.clone()
        };
        let listeners = self.inner.listeners.borrow().clone();
        for listener in listeners {
            listener(&snapshot);
        }
    }
}

/// Counts a coalesced call for as long as its future is alive.
struct JoinedCall<'a>(&'a Cell<usize>);

impl<'a> JoinedCall<'a> {
    fn enter(count: &'a Cell<usize>) -> Self {
        count.set(count.get() + 1);
        Self(count)
    }
}

impl Drop for JoinedCall<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get() - 1);
    }
}
