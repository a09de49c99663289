//! Rupee formatting and parsing.

use crate::types::Money;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Default currency symbol
pub const RUPEE: &str = "₹";

/// Format an amount in rupees with Indian digit grouping
///
/// Up to three fraction digits are kept, without trailing zeros. A zero or
/// absent amount renders as `₹0`.
///
/// ```
/// use storefront::formatters::format_price;
/// use storefront::types::Money;
///
/// assert_eq!(format_price(Some(Money::from_minor(12_345_650))), "₹1,23,456.5");
/// assert_eq!(format_price(None), "₹0");
/// ```
#[must_use]
pub fn format_price(amount: Option<Money>) -> String {
    format_price_with_symbol(amount, RUPEE)
}

/// [`format_price`] with a custom currency symbol
#[must_use]
pub fn format_price_with_symbol(amount: Option<Money>, symbol: &str) -> String {
    let amount = match amount {
        Some(amount) if !amount.is_zero() => amount.amount(),
        _ => return format!("{symbol}0"),
    };

    let rounded = amount
        .round_dp_with_strategy(3, RoundingStrategy::MidpointAwayFromZero)
        .normalize();
    let sign = if rounded.is_sign_negative() { "-" } else { "" };
    let plain = rounded.abs().to_string();
    let (whole, fraction) = match plain.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (plain.as_str(), None),
    };

    let mut out = format!("{symbol}{sign}{}", group_indian(whole));
    if let Some(fraction) = fraction {
        out.push('.');
        out.push_str(fraction);
    }
    out
}

/// Group an unsigned digit string as `xx,xx,xxx`
fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }

    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(2);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();

    format!("{},{tail}", groups.join(","))
}

/// Parse a displayed price back into money
///
/// Strips the rupee symbol and grouping commas, then reads the leading
/// number up to a second decimal point. Unparseable or negative input
/// yields zero.
#[must_use]
pub fn parse_price(input: &str) -> Money {
    let cleaned: String = input
        .trim()
        .chars()
        .filter(|c| *c != ',')
        .collect::<String>()
        .replace(RUPEE, "");
    let cleaned = cleaned.trim();

    let mut seen_point = false;
    let numeric: String = cleaned
        .char_indices()
        .take_while(|&(i, c)| match c {
            '0'..='9' => true,
            '.' if !seen_point => {
                seen_point = true;
                true
            },
            '-' | '+' => i == 0,
            _ => false,
        })
        .map(|(_, c)| c)
        .collect();
    let numeric = numeric.trim_end_matches('.');
    let numeric = match numeric.strip_prefix('.') {
        Some(rest) => format!("0.{rest}"),
        None => numeric.to_string(),
    };

    match Decimal::from_str(&numeric) {
        Ok(value) if value.is_sign_positive() => Money::new(value),
        Ok(_) => Money::ZERO,
        Err(_) => {
            tracing::debug!(input, "Unparseable price");
            Money::ZERO
        },
    }
}
