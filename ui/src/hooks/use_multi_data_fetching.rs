use fetching::{
    BoxProducer, FetchError, MultiFetchController, MultiFetchOptions,
    MultiFetchState, Watch,
};
use futures::FutureExt;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use yew::prelude::*;

use crate::contexts::use_fetch_context;

/// Return type of [`use_multi_data_fetching`].
pub struct MultiDataFetchingHandle<V> {
    /// Values of every producer that has succeeded so far.
    pub data: BTreeMap<String, V>,
    pub is_loading: bool,
    pub is_refreshing: bool,
    /// Producers that failed in the latest cycle.
    pub failures: BTreeMap<String, FetchError>,
    pub refetch: Callback<bool>,
    pub set_data: Callback<BTreeMap<String, V>>,
}

impl<V> MultiDataFetchingHandle<V> {
    pub fn get(&self, key: &str) -> Option<&V> {
        self.data.get(key)
    }

    pub fn is_busy(&self) -> bool {
        self.is_loading || self.is_refreshing
    }
}

/// Fetch several independent resources for one component.
///
/// All producers run concurrently and the hook waits for every one of them
/// to settle. A failed producer does not hide the others; its key keeps the
/// value from its last successful run and a single warning toast is shown.
///
/// The set of keys is fixed by the first render. Producers are refreshed on
/// every render, looked up by key.
///
/// # Example
///
/// ```rust,ignore
/// let dashboard = use_multi_data_fetching(
///     company_id,
///     MultiFetchOptions::default(),
///     vec![
///         ("revenue".to_string(), boxed_producer(move || api::revenue(company_id))),
///         ("expenses".to_string(), boxed_producer(move || api::expenses(company_id))),
///     ],
/// );
/// ```
#[hook]
pub fn use_multi_data_fetching<V, D>(
    deps: D,
    options: MultiFetchOptions,
    producers: Vec<(String, BoxProducer<V>)>,
) -> MultiDataFetchingHandle<V>
where
    V: Clone + 'static,
    D: PartialEq + Clone + 'static,
{
    let ctx = use_fetch_context();
    let state = use_state(MultiFetchState::<V>::default);

    let latest = use_mut_ref(BTreeMap::<String, BoxProducer<V>>::new);
    *latest.borrow_mut() = producers.into_iter().collect();

    let controller = {
        let state = state.clone();
        let latest = latest.clone();
        use_memo((), move |_| {
            let keys: Vec<String> = latest.borrow().keys().cloned().collect();
            let controller = keys
                .into_iter()
                .fold(MultiFetchController::builder(), |builder, key| {
                    let producer = forward_by_key(Rc::clone(&latest), key.clone());
                    builder.with_boxed_producer(key, producer)
                })
                .options(options)
                .build(&ctx);
            controller.subscribe(move |snapshot| state.set(snapshot.clone()));
            controller
        })
    };

    {
        let controller = controller.clone();
        use_effect_with((), move |_| {
            let disposer = controller.disposer();
            let controller = (*controller).clone();
            yew::platform::spawn_local(async move { controller.start().await });
            move || disposer.dispose()
        });
    }

    {
        let controller = controller.clone();
        let baseline = deps.clone();
        let watch = use_mut_ref(move || Watch::new(baseline));
        use_effect(move || {
            if watch.borrow_mut().observe(deps) {
                tracing::debug!("Dependencies changed, fetching all again");
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
        Callback::from(move |data: BTreeMap<String, V>| controller.set_data(data))
    };

    let current = (*state).clone();
    MultiDataFetchingHandle {
        data: current.data,
        is_loading: current.is_loading,
        is_refreshing: current.is_refreshing,
        failures: current.failures,
        refetch,
        set_data,
    }
}

fn forward_by_key<V: 'static>(
    slot: Rc<RefCell<BTreeMap<String, BoxProducer<V>>>>,
    key: String,
) -> BoxProducer<V> {
    Rc::new(move || {
        let current = slot.borrow().get(&key).cloned();
        match current {
            Some(producer) => producer(),
            None => futures::future::ready(Err(FetchError::Producer(format!(
                "no producer registered for key {}",
                key
            ))))
            .boxed_local(),
        }
    })
}
