//! Multi-producer fetch controller
//!
//! Runs a fixed set of named producers concurrently and folds every settled
//! outcome into one [`MultiFetchState`]. A failing producer never fails the
//! cycle: successful keys are published, failed keys are recorded in
//! `failures` and keep the value from their last successful cycle, and a
//! single warning is emitted for the whole cycle.

use futures::future::join_all;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::future::Future;
use std::rc::Rc;
use tracing::{debug, warn};

use crate::lifecycle::{Admission, Lifecycle};
use crate::{
    BoxProducer, Disposer, FetchContext, FetchMode, MultiFetchOptions,
    MultiFetchState, Notifier, Severity, boxed_producer,
};

type Listener<V> = Rc<dyn Fn(&MultiFetchState<V>)>;

struct Inner<V> {
    state: RefCell<MultiFetchState<V>>,
    producers: BTreeMap<String, BoxProducer<V>>,
    options: MultiFetchOptions,
    notifier: Rc<dyn Notifier>,
    lifecycle: Lifecycle,
    listeners: RefCell<Vec<Listener<V>>>,
}

pub struct MultiFetchBuilder<V> {
    producers: BTreeMap<String, BoxProducer<V>>,
    options: MultiFetchOptions,
    initial_data: BTreeMap<String, V>,
}

impl<V: Clone + 'static> MultiFetchBuilder<V> {
    /// Registering a key twice keeps the last producer.
    pub fn with_producer<F, Fut, E>(self, key: impl Into<String>, producer: F) -> Self
    where
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = Result<V, E>> + 'static,
        E: Display + 'static,
    {
        self.with_boxed_producer(key, boxed_producer(producer))
    }

    pub fn with_boxed_producer(
        mut self,
        key: impl Into<String>,
        producer: BoxProducer<V>,
    ) -> Self {
        self.producers.insert(key.into(), producer);
        self
    }

    pub fn options(mut self, options: MultiFetchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn initial_data(mut self, initial_data: BTreeMap<String, V>) -> Self {
        self.initial_data = initial_data;
        self
    }

    pub fn build(self, ctx: &FetchContext) -> MultiFetchController<V> {
        MultiFetchController {
            inner: Rc::new(Inner {
                state: RefCell::new(MultiFetchState::new(self.initial_data)),
                producers: self.producers,
                options: self.options,
                notifier: Rc::clone(&ctx.notifier),
                lifecycle: Lifecycle::new(),
                listeners: RefCell::new(Vec::new()),
            }),
        }
    }
}

/// Runs several named producers as one unit.
pub struct MultiFetchController<V> {
    inner: Rc<Inner<V>>,
}

impl<V> Clone for MultiFetchController<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<V: Clone + 'static> MultiFetchController<V> {
    pub fn builder() -> MultiFetchBuilder<V> {
        MultiFetchBuilder {
            producers: BTreeMap::new(),
            options: MultiFetchOptions::default(),
            initial_data: BTreeMap::new(),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.inner.producers.keys().map(String::as_str)
    }

    pub fn options(&self) -> &MultiFetchOptions {
        &self.inner.options
    }

    pub fn state(&self) -> MultiFetchState<V> {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self, listener: impl Fn(&MultiFetchState<V>) + 'static) {
        self.inner.listeners.borrow_mut().push(Rc::new(listener));
    }

    pub fn disposer(&self) -> Disposer {
        self.inner.lifecycle.disposer()
    }

    pub fn is_mounted(&self) -> bool {
        self.inner.lifecycle.is_mounted()
    }

    pub async fn start(&self) {
        if self.inner.options.auto_fetch {
            self.fetch_all(FetchMode::Initial).await;
        }
    }

    pub async fn refetch(&self, notify: bool) {
        self.fetch_all(FetchMode::Refresh { notify }).await;
    }

    pub fn set_data(&self, data: BTreeMap<String, V>) {
        if !self.is_mounted() {
            return;
        }
        self.update(|state| state.data = data);
    }

    /// Invoke every producer and wait for all of them to settle.
    pub async fn fetch_all(&self, mode: FetchMode) {
        let inner = &self.inner;
        if !inner.lifecycle.is_mounted() {
            debug!("Multi-fetch requested after dispose; ignoring");
            return;
        }

        let initial = matches!(mode, FetchMode::Initial);
        let ticket = inner.lifecycle.begin();
        self.update(|state| {
            state.is_loading = initial;
            state.is_refreshing = !initial;
            state.failures.clear();
        });

        let calls = inner.producers.iter().map(|(key, producer)| {
            let key = key.clone();
            let call = producer();
            async move { (key, call.await) }
        });
        let outcomes = join_all(calls).await;

        match inner.lifecycle.admit(ticket) {
            Admission::Apply => {}
            Admission::Unmounted => {
                debug!("Discarding multi-fetch results: view has been disposed");
                return;
            }
            Admission::Superseded => {
                debug!("Discarding multi-fetch results: superseded by a newer call");
                return;
            }
        }

        let mut succeeded = Vec::with_capacity(outcomes.len());
        let mut failures = BTreeMap::new();
        for (key, outcome) in outcomes {
            match outcome {
                Ok(value) => succeeded.push((key, value)),
                Err(error) => {
                    warn!("Producer for key {} failed: {}", key, error);
                    failures.insert(key, error);
                }
            }
        }
        let any_failed = !failures.is_empty();

        self.update(|state| {
            state.data.extend(succeeded);
            state.failures = failures;
            state.is_loading = false;
            state.is_refreshing = false;
            state.fetched = true;
        });

        if any_failed {
            if inner.options.show_error_toast {
                inner
                    .notifier
                    .notify(Severity::Warning, &inner.options.warning_message);
            }
        } else if matches!(mode, FetchMode::Refresh { notify: true })
            && inner.options.show_success_toast
        {
            inner
                .notifier
                .notify(Severity::Success, &inner.options.success_message);
        }
    }

    fn update(&self, mutate: impl FnOnce(&mut MultiFetchState<V>)) {
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
