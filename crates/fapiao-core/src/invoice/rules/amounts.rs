//! Amount parsing and formatting.

use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Parse an amount as printed on an invoice (e.g. "¥1,234.50" or "100.5").
///
/// Returns `None` for anything that is not a plain decimal number,
/// including `NaN` and scientific notation.
pub fn parse_amount(s: &str) -> Option<Decimal> {
    let trimmed = s.trim();
    let unsigned = trimmed
        .strip_prefix('¥')
        .or_else(|| trimmed.strip_prefix('￥'))
        .unwrap_or(trimmed);

    let cleaned: String = unsigned
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    Decimal::from_str(&cleaned).ok()
}

/// Format an amount with exactly two fraction digits.
pub fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    // -0.00 prints with a sign otherwise
    let rounded = if rounded.is_zero() { Decimal::ZERO } else { rounded };
    format!("{:.2}", rounded)
}

/// Parse and re-render a non-negative amount. Negative amounts are rejected.
pub fn normalize_amount(s: &str) -> Option<String> {
    let amount = parse_amount(s)?;
    if amount.is_sign_negative() && !amount.is_zero() {
        return None;
    }
    Some(format_amount(amount))
}
