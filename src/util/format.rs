//! Number formatting utilities.

/// Format a fraction (0.0-1.0) as a whole percentage.
#[must_use]
pub fn format_percent(fraction: f64) -> String {
    format!("{:.0}%", fraction * 100.0)
}

/// Format a cost in USD.
#[must_use]
pub fn format_cost(value: f64) -> String {
    format!("${value:.2}")
}

/// Per-agent costs are often fractions of a cent.
#[must_use]
pub fn format_cost_fine(value: f64) -> String {
    format!("${value:.3}")
}

/// Format a token count as `1.5M`, `12.5K` or the plain number.
#[must_use]
pub fn format_tokens(value: i64) -> String {
    fn format_compact(value: i64, divisor: i64, suffix: &str) -> String {
        let sign = if value < 0 { "-" } else { "" };
        let abs = value.abs();
        let major = abs / divisor;
        let minor = (abs % divisor) / (divisor / 10);
        format!("{sign}{major}.{minor}{suffix}")
    }

    if value.abs() >= 1_000_000 {
        format_compact(value, 1_000_000, "M")
    } else if value.abs() >= 1_000 {
        format_compact(value, 1_000, "K")
    } else {
        value.to_string()
    }
}

/// `150.0K / 200.0K`
#[must_use]
pub fn format_context(tokens: i64, limit: i64) -> String {
    format!("{} / {}", format_tokens(tokens), format_tokens(limit))
}

/// Plan value multiplier, e.g. `4.3x`.
#[must_use]
pub fn format_multiplier(value: f64) -> String {
    format!("{value:.1}x")
}
