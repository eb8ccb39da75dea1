//! Controller configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_CACHE_TIME: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_SUCCESS_MESSAGE: &str = "Data refreshed successfully";
pub const DEFAULT_ERROR_MESSAGE: &str = "Failed to load data";
pub const DEFAULT_PARTIAL_FAILURE_MESSAGE: &str = "Some data failed to load";

/// Configuration for a [`FetchController`](crate::FetchController).
///
/// Deserializes from camelCase JSON with every field optional, e.g.
/// `{"cacheKey": "countries", "cacheTimeMs": 60000}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FetchOptions {
    /// Run the producer as soon as the controller is started.
    pub auto_fetch: bool,
    /// Notify on success of an explicit refetch.
    pub show_success_toast: bool,
    pub show_error_toast: bool,
    pub success_message: String,
    pub error_message: String,
    /// Enables reads from and writes to the shared cache.
    pub cache_key: Option<String>,
    /// Age after which a cached value is no longer served.
    #[serde(rename = "cacheTimeMs", with = "duration_ms")]
    pub cache_time: Duration,
    /// Join an in-flight request for the same cache key instead of invoking
    /// the producer again. Explicit refetches never join.
    pub dedupe_in_flight: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            auto_fetch: true,
            show_success_toast: false,
            show_error_toast: true,
            success_message: DEFAULT_SUCCESS_MESSAGE.to_string(),
            error_message: DEFAULT_ERROR_MESSAGE.to_string(),
            cache_key: None,
            cache_time: DEFAULT_CACHE_TIME,
            dedupe_in_flight: true,
        }
    }
}

impl FetchOptions {
    pub fn auto_fetch(mut self, auto_fetch: bool) -> Self {
        self.auto_fetch = auto_fetch;
        self
    }

    pub fn show_success_toast(mut self, show: bool) -> Self {
        self.show_success_toast = show;
        self
    }

    pub fn show_error_toast(mut self, show: bool) -> Self {
        self.show_error_toast = show;
        self
    }

    pub fn success_message(mut self, message: impl Into<String>) -> Self {
        self.success_message = message.into();
        self
    }

    pub fn error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = message.into();
        self
    }

    pub fn cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = Some(key.into());
        self
    }

    pub fn cache_time(mut self, cache_time: Duration) -> Self {
        self.cache_time = cache_time;
        self
    }

    pub fn dedupe_in_flight(mut self, dedupe: bool) -> Self {
        self.dedupe_in_flight = dedupe;
        self
    }
}

/// Configuration for a
/// [`MultiFetchController`](crate::MultiFetchController).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MultiFetchOptions {
    pub auto_fetch: bool,
    pub show_success_toast: bool,
    /// Emit a single warning when any producer fails.
    pub show_error_toast: bool,
    pub success_message: String,
    pub warning_message: String,
}

impl Default for MultiFetchOptions {
    fn default() -> Self {
        Self {
            auto_fetch: true,
            show_success_toast: false,
            show_error_toast: true,
            success_message: DEFAULT_SUCCESS_MESSAGE.to_string(),
            warning_message: DEFAULT_PARTIAL_FAILURE_MESSAGE.to_string(),
        }
    }
}

impl MultiFetchOptions {
    pub fn auto_fetch(mut self, auto_fetch: bool) -> Self {
        self.auto_fetch = auto_fetch;
        self
    }

    pub fn show_success_toast(mut self, show: bool) -> Self {
        self.show_success_toast = show;
        self
    }

    pub fn show_error_toast(mut self, show: bool) -> Self {
        self.show_error_toast = show;
        self
    }

    pub fn success_message(mut self, message: impl Into<String>) -> Self {
        self.success_message = message.into();
        self
    }

    pub fn warning_message(mut self, message: impl Into<String>) -> Self {
        self.warning_message = message.into();
        self
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        duration: &Duration,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
