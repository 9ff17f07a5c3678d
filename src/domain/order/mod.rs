// ============================================================================
// Order Domain - the order record as the admin console sees it
// ============================================================================
//
// - Value objects (OrderId, InvoiceNumber, OrderStatus, Customer, LineItem)
// - The order record and its field-level updates
// - Errors (OrderError enum)
// - Invoice summary helpers for the detail panel
//
// ============================================================================

pub mod value_objects;
pub mod record;
pub mod errors;
pub mod summary;

// Re-export for convenience
pub use value_objects::*;
pub use record::*;
pub use errors::*;
pub use summary::*;
