//! Structured diagnostics for cursor and chunk-source behaviour.
//!
//! The `log_metric!` macro renders a set of key/value pairs as a single JSON-like
//! line and routes it through the `log` facade under the `rowset::metric` target,
//! so applications can filter metric lines separately from regular logging.

/// Logs a structured key-value metric line at debug level.
///
/// # Example
/// ```
/// use rowset::log_metric;
/// let rows = 500;
/// log_metric!("event" = "batch_loaded", "ordinal" = 3, "rows" = &rows);
/// ```
#[macro_export]
macro_rules! log_metric {
    ($($key:literal = $value:expr),+ $(,)?) => {
        if $crate::__log::log_enabled!(target: "rowset::metric", $crate::__log::Level::Debug) {
            let mut parts: Vec<String> = Vec::new();
            $(
                parts.push(format!("\"{}\": \"{}\"", $key, $value));
            )+
            $crate::__log::debug!(target: "rowset::metric", "ROWSET_METRIC: {{ {} }}", parts.join(", "));
        }
    };
}
