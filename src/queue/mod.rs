// ============================================================================
// Queue Module
// Blocking FIFO hand-off between threads
// ============================================================================

mod bounded;
mod unbounded;

pub use bounded::BoundedQueue;
pub use unbounded::UnboundedQueue;
