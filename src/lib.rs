//! Order management core of the campus food-ordering admin console.
//!
//! - [`listing`]: filtered, cursor-paginated order listing with client-side search.
//! - [`lookup`]: invoice-number lookup and the one-way transition to `Delivered`.

pub mod clock;
pub mod config;
pub mod domain;
pub mod listing;
pub mod lookup;
pub mod metrics;
pub mod store;
pub mod utils;
