use futures::FutureExt;
use futures::future::LocalBoxFuture;
use std::fmt::Display;
use std::future::Future;
use std::rc::Rc;

use crate::FetchError;

/// Type-erased zero-argument async operation producing a `T`.
///
/// Producers are the integration point to the REST layer; nothing here looks
/// inside them.
pub type BoxProducer<T> =
    Rc<dyn Fn() -> LocalBoxFuture<'static, Result<T, FetchError>>>;

/// Box a producer closure, normalizing its error into a [`FetchError`].
pub fn boxed_producer<T, F, Fut, E>(producer: F) -> BoxProducer<T>
where
    T: 'static,
    F: Fn() -> Fut + 'static,
    Fut: Future<Output = Result<T, E>> + 'static,
    E: Display + 'static,
{
    Rc::new(move || {
        let call = producer();
        async move { call.await.map_err(FetchError::producer) }.boxed_local()
    })
}
