// ============================================================================
// Order Listing
// ============================================================================
//
// - Filters (status, date window) and their store predicates
// - The listing session: cursor, accumulated pages, client-side narrowing
// - The engine that runs a session against the order store
//
// ============================================================================

pub mod filters;
pub mod session;
pub mod engine;

pub use filters::*;
pub use session::*;
pub use engine::*;
