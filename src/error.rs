// ============================================================================
// Market Errors
// Error taxonomy shared by the matcher, the quote book and the market
// ============================================================================

use crate::domain::Side;
use thiserror::Error;

/// Errors surfaced by market operations.
///
/// None of these are fatal: the caller (typically the session layer) decides
/// how to reject the corresponding request. Queue timeouts are not errors and
/// are reported through `Option`/`Result<(), T>` return values instead.
#[derive(Debug, Error)]
pub enum MarketError {
    /// Lookup by client order id failed on the given side
    #[error("order {id} not found on {side:?} side")]
    NotFound { side: Side, id: String },

    /// Top-of-book style query on a one-sided or empty book
    #[error("empty book")]
    EmptyBook,

    /// Order rejected by validation before reaching the book
    #[error("invalid order: {0}")]
    InvalidOrder(String),

    /// Construction-time configuration rejected
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Bar history payload that parses but is not index-aligned
    #[error("malformed bar history: {0}")]
    MalformedHistory(String),

    /// Bar history (de)serialization failure
    #[error("bar history serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for market operations
pub type MarketResult<T> = Result<T, MarketError>;
