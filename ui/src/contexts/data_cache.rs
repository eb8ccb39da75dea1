//! Injects the shared [`DataCache`] into the component tree.
//!
//! Mount one [`DataCacheProvider`] near the root so every fetch hook below
//! shares the same cache. Hooks used outside a provider fall back to a cache
//! local to the current thread.

use fetching::{DataCache, FetchContext, Notifier, TracingNotifier};
use std::rc::Rc;
use yew::prelude::*;

use super::toast::use_optional_toast;

thread_local! {
    static FALLBACK_CACHE: DataCache = DataCache::new();
}

#[derive(Properties, PartialEq)]
pub struct DataCacheProviderProps {
    pub children: Children,
    /// Use this cache instead of creating a new one. Passing a different
    /// cache later switches every hook below to it.
    #[prop_or_default]
    pub cache: Option<DataCache>,
}

#[function_component]
pub fn DataCacheProvider(props: &DataCacheProviderProps) -> Html {
    let cache = use_memo(props.cache.clone(), provided_or_new);

    html! {
        <ContextProvider<DataCache> context={(*cache).clone()}>
            {props.children.clone()}
        </ContextProvider<DataCache>>
    }
}

fn provided_or_new(provided: &Option<DataCache>) -> DataCache {
    provided.clone().unwrap_or_default()
}

#[hook]
pub fn use_data_cache() -> DataCache {
    let provided = use_context::<DataCache>();
    provided.unwrap_or_else(|| FALLBACK_CACHE.with(DataCache::clone))
}

/// Cache plus notification sink for the fetch hooks. Notifications become
/// toasts when a `ToastProvider` is mounted and log lines otherwise.
#[hook]
pub fn use_fetch_context() -> FetchContext {
    let cache = use_data_cache();
    let toast = use_optional_toast();
    let notifier: Rc<dyn Notifier> = match toast {
        Some(toast) => Rc::new(toast),
        None => Rc::new(TracingNotifier),
    };
    FetchContext::new(cache, notifier)
}

/// Drops every cached entry.
#[hook]
pub fn use_clear_data_cache() -> Callback<()> {
    let cache = use_data_cache();
    Callback::from(move |_| cache.clear_all())
}

/// Drops the cached entry for one key.
#[hook]
pub fn use_clear_cache_entry() -> Callback<String> {
    let cache = use_data_cache();
    Callback::from(move |key: String| cache.clear_key(&key))
}
