//! Fetch error types

/// Failure recorded in controller state.
///
/// Errors are values here, not control flow: controllers store them for the
/// view to render and never hand them back to the caller as `Err`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The producer failed; holds its rendered error message.
    #[error("{0}")]
    Producer(String),

    /// A joined in-flight request yielded a value of a different type than
    /// the one requested under the same cache key.
    #[error("in-flight request for cache key '{key}' produced an unexpected type")]
    CacheType { key: String },
}

impl FetchError {
    pub fn producer(error: impl std::fmt::Display) -> Self {
        Self::Producer(error.to_string())
    }
}
