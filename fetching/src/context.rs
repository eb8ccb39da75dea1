use std::rc::Rc;

use crate::{DataCache, Notifier, TracingNotifier};

/// Collaborators injected into every controller.
#[derive(Clone)]
pub struct FetchContext {
    pub cache: DataCache,
    pub notifier: Rc<dyn Notifier>,
}

impl FetchContext {
    pub fn new(cache: DataCache, notifier: Rc<dyn Notifier>) -> Self {
        Self { cache, notifier }
    }
}

impl Default for FetchContext {
    /// A fresh cache, with notifications going to the log.
    fn default() -> Self {
        Self::new(DataCache::new(), Rc::new(TracingNotifier))
    }
}
