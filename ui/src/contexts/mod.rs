pub mod data_cache;
pub mod toast;

pub use data_cache::{
    DataCacheProvider, use_clear_cache_entry, use_clear_data_cache,
    use_data_cache, use_fetch_context,
};
pub use toast::{ToastProvider, use_optional_toast, use_toast};
