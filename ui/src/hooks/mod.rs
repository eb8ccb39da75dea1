//! Data fetching hooks.
//!
//! Both hooks wrap a controller from the `fetching` crate and mirror its
//! state into component state. State combinations:
//!
//! | data    | is_loading | is_refreshing | error   | meaning                          |
//! |---------|------------|---------------|---------|----------------------------------|
//! | None    | true       | false         | None    | initial load                     |
//! | Some    | false      | true          | None    | refetch, previous data shown     |
//! | Some    | false      | false         | Some    | refetch failed, previous data shown |
//! | None    | false      | false         | Some    | initial load failed              |

pub mod use_data_fetching;
pub mod use_multi_data_fetching;

pub use use_data_fetching::{DataFetchingHandle, use_data_fetching};
pub use use_multi_data_fetching::{
    MultiDataFetchingHandle, use_multi_data_fetching,
};
