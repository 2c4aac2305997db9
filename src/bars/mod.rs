// ============================================================================
// Bars Module
// Stream-to-bar aggregation in both time directions
// ============================================================================

mod bar_builder;
mod reverse_bar_builder;

pub use bar_builder::BarBuilder;
pub use reverse_bar_builder::ReverseBarBuilder;

/// Bar values are strictly positive prices; `0` is the "no bar" sentinel.
pub(crate) fn accepts_value(value: f64) -> bool {
    debug_assert!(
        value > 0.0,
        "bar values must be strictly positive, got {}",
        value
    );
    if value > 0.0 {
        true
    } else {
        tracing::error!(value, "non-positive bar value dropped");
        false
    }
}
