//! Data fetching and caching for client-rendered views.
//!
//! The pieces:
//! - [`FetchController`]: runs one producer against one [`FetchState`],
//!   tracking loading, refreshing and error state
//! - [`MultiFetchController`]: runs several named producers concurrently and
//!   keeps whatever succeeded
//! - [`DataCache`]: injectable keyed cache with age-based freshness and
//!   in-flight request sharing
//!
//! Everything here is single-threaded (`Rc`/`RefCell`) and executor
//! agnostic. Controllers return futures; the caller decides where they run
//! (`spawn_local` in the browser, a current-thread runtime in tests).

mod cache;
mod context;
mod controller;
mod error;
mod lifecycle;
mod multi;
mod notify;
mod options;
mod producer;
mod state;
pub mod time;
mod watch;

pub use cache::{CacheEntry, DataCache};
pub use context::FetchContext;
pub use controller::{FetchController, FetchMode};
pub use error::FetchError;
pub use lifecycle::Disposer;
pub use multi::{MultiFetchBuilder, MultiFetchController};
pub use notify::{NoopNotifier, Notifier, Severity, TracingNotifier};
pub use options::{
    DEFAULT_CACHE_TIME, DEFAULT_ERROR_MESSAGE, DEFAULT_PARTIAL_FAILURE_MESSAGE,
    DEFAULT_SUCCESS_MESSAGE, FetchOptions, MultiFetchOptions,
};
pub use producer::{BoxProducer, boxed_producer};
pub use state::{FetchState, MultiFetchState, Phase};
pub use time::TimeSource;
pub use watch::Watch;
