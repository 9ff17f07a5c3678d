// ============================================================================
// Domain Layer
// ============================================================================
//
// Types shared by the listing engine and the invoice lookup. Nothing in here
// talks to the store.
//
// ============================================================================

pub mod order;
