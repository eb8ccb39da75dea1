//! Yew bindings for the `fetching` crate.
//!
//! Mount [`DataCacheProvider`] and [`ToastProvider`] near the root, render a
//! [`ToastContainer`] somewhere inside them, then call
//! [`use_data_fetching`] or [`use_multi_data_fetching`] from components.
//!
//! ```rust,ignore
//! #[function_component]
//! fn App() -> Html {
//!     ui::init_logging();
//!     html! {
//!         <DataCacheProvider>
//!             <ToastProvider>
//!                 <ToastContainer />
//!                 <Dashboard />
//!             </ToastProvider>
//!         </DataCacheProvider>
//!     }
//! }
//! ```

pub mod components;
pub mod contexts;
pub mod hooks;
mod logs;

pub use components::ToastContainer;
pub use contexts::{
    DataCacheProvider, ToastProvider, use_clear_cache_entry,
    use_clear_data_cache, use_data_cache, use_fetch_context, use_optional_toast,
    use_toast,
};
pub use hooks::{
    DataFetchingHandle, MultiDataFetchingHandle, use_data_fetching,
    use_multi_data_fetching,
};
pub use logs::init_logging;
