use fetching::{
    BoxProducer, FetchController, FetchError, FetchOptions, FetchState, Watch,
    boxed_producer,
};
use futures::FutureExt;
use std::cell::RefCell;
use std::fmt::Display;
use std::future::Future;
use std::rc::Rc;
use yew::prelude::*;

use crate::contexts::use_fetch_context;

/// Return type of [`use_data_fetching`].
pub struct DataFetchingHandle<T> {
    pub data: Option<T>,
    /// Initial fetch in progress.
    pub is_loading: bool,
    /// Explicit refetch in progress; `data` still holds the previous value.
    pub is_refreshing: bool,
    pub error: Option<FetchError>,
    /// Refetch, bypassing the cache. The flag allows the success toast.
    pub refetch: Callback<bool>,
    /// Replace `data` locally, e.g. for optimistic updates.
    pub set_data: Callback<T>,
}

impl<T: Clone> DataFetchingHandle<T> {
    /// Returns true if this is the initial load (no data yet, currently
    /// loading, and no error).
    pub fn is_initial_loading(&self) -> bool {
        self.is_loading && self.data.is_none() && self.error.is_none()
    }

    /// Render based on fetch state with contextual loading/error messages.
    ///
    /// - No data + loading: "Loading {context}..."
    /// - No data + error: "Error loading {context}: ..."
    /// - Has data: `render_fn(data, is_busy, error)`, where `error` comes from
    ///   a failed refetch and the previous data is still shown
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// invoices.render("invoices", |invoices, is_busy, error| html! {
    ///     <div>
    ///         {if is_busy { html! { <span>{"Refreshing..."}</span> } } else { html! {} }}
    ///         {if let Some(err) = error { html! { <div class="error">{err.to_string()}</div> } } else { html! {} }}
    ///         <InvoiceTable invoices={invoices.clone()} />
    ///     </div>
    /// })
    /// ```
    pub fn render<F>(&self, context: &str, render_fn: F) -> Html
    where
        F: Fn(&T, bool, Option<&FetchError>) -> Html,
    {
        match self.data.as_ref() {
            None => {
                if self.is_loading || self.is_refreshing {
                    html! {
                        <div class="text-center py-12">
                            <p class="text-neutral-600 dark:text-neutral-400">
                                {format!("Loading {}...", context)}
                            </p>
                        </div>
                    }
                } else if let Some(error) = &self.error {
                    html! {
                        <div class="p-4 rounded-md bg-red-50 \
                                   dark:bg-red-900/20 border \
                                   border-red-200 dark:border-red-800">
                            <p class="text-sm text-red-700 \
                                      dark:text-red-400">
                                {format!("Error loading {}: {}", context, error)}
                            </p>
                        </div>
                    }
                } else {
                    html! {
                        <div class="text-center py-12">
                            <p class="text-neutral-600 dark:text-neutral-400">
                                {format!("No {} found", context)}
                            </p>
                        </div>
                    }
                }
            }
            Some(data) => render_fn(
                data,
                self.is_loading || self.is_refreshing,
                self.error.as_ref(),
            ),
        }
    }
}

/// Fetch data for a component through a [`FetchController`].
///
/// Fetches on mount (unless `options.auto_fetch` is false) and again
/// whenever `deps` changes. Options and initial data are read on the first
/// render only; the producer is refreshed on every render, so it always sees
/// current props. The controller is disposed when the component unmounts, and
/// anything still in flight is then dropped.
///
/// # Example
///
/// ```rust,ignore
/// #[hook]
/// pub fn use_countries() -> DataFetchingHandle<Vec<Country>> {
///     use_data_fetching(
///         (),
///         FetchOptions::default().cache_key("countries"),
///         None,
///         || async move { api::get_countries().await.map_err(|e| e.to_string()) },
///     )
/// }
/// ```
#[hook]
pub fn use_data_fetching<T, D, F, Fut, E>(
    deps: D,
    options: FetchOptions,
    initial_data: Option<T>,
    producer: F,
) -> DataFetchingHandle<T>
where
    T: Clone + 'static,
    D: PartialEq + Clone + 'static,
    F: Fn() -> Fut + 'static,
    Fut: Future<Output = Result<T, E>> + 'static,
    E: Display + 'static,
{
    let ctx = use_fetch_context();
    let initial_state = FetchState::new(initial_data.clone());
    let state = use_state(move || initial_state);

    let latest = use_mut_ref(|| None::<BoxProducer<T>>);
    *latest.borrow_mut() = Some(boxed_producer(producer));

    let controller = {
        let state = state.clone();
        let latest = latest.clone();
        use_memo((), move |_| {
            let controller = FetchController::from_boxed(
                &ctx,
                options,
                initial_data,
                forward_to_latest(latest),
            );
            controller.subscribe(move |snapshot| state.set(snapshot.clone()));
            controller
        })
    };

    // Start on mount, dispose on unmount
    {
        let controller = controller.clone();
        use_effect_with((), move |_| {
            let disposer = controller.disposer();
            let controller = (*controller).clone();
            yew::platform::spawn_local(async move { controller.start().await });
            move || disposer.dispose()
        });
    }

    // Re-run the auto-fetch path when deps change
    {
        let controller = controller.clone();
        let baseline = deps.clone();
        let watch = use_mut_ref(move || Watch::new(baseline));
        use_effect(move || {
            if watch.borrow_mut().observe(deps) {
                tracing::debug!("Dependencies changed, fetching again");
                let controller = (*controller).clone();
                yew::platform::spawn_local(async move { controller.start().await });
            }
        });
    }

    let refetch = {
        let controller = controller.clone();
        Callback::from(move |notify: bool| {
            let controller = (*controller).clone();
            yew::platform::spawn_local(async move {
                controller.refetch(notify).await
            });
        })
    };

    let set_data = {
        let controller = controller.clone();
        Callback::from(move |value: T| controller.set_data(value))
    };

    let current = (*state).clone();
    DataFetchingHandle {
        data: current.data,
        is_loading: current.is_loading,
        is_refreshing: current.is_refreshing,
        error: current.error,
        refetch,
        set_data,
    }
}

/// A producer that calls whatever producer is in `slot` at call time.
fn forward_to_latest<T: 'static>(
    slot: Rc<RefCell<Option<BoxProducer<T>>>>,
) -> BoxProducer<T> {
    Rc::new(move || {
        let current = slot.borrow().clone();
        match current {
            Some(producer) => producer(),
            None => futures::future::ready(Err(FetchError::Producer(
                "no producer registered".to_string(),
            )))
            .boxed_local(),
        }
    })
}
