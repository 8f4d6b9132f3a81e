//! Typed conversions for individual table cells.

use std::sync::OnceLock;

use regex::Regex;

use crate::models::Money;

/// `$` + digit groups with optional thousands separators and cents.
/// Anchored to the whole cell so "45.0%" or "3 rooms" never read as money.
const CURRENCY_PATTERN: &str = r"^(-)?\$\s?(\d{1,3}(?:,\d{3})+|\d+)(?:\.(\d{1,2}))?$";

static CURRENCY_RE: OnceLock<Regex> = OnceLock::new();

fn currency_re() -> &'static Regex {
    CURRENCY_RE.get_or_init(|| Regex::new(CURRENCY_PATTERN).expect("currency pattern is valid"))
}

/// Parse a currency cell such as `$150,000`, `$1,234.5` or `-$20.00`.
pub fn parse_currency(cell: &str) -> Option<Money> {
    let caps = currency_re().captures(cell.trim())?;
    let negative = caps.get(1).is_some();

    let dollars: i64 = caps.get(2)?.as_str().replace(',', "").parse().ok()?;
    let cents: i64 = match caps.get(3) {
        Some(c) if c.as_str().len() == 1 => c.as_str().parse::<i64>().ok()? * 10,
        Some(c) => c.as_str().parse().ok()?,
        None => 0,
    };

    let total = dollars.checked_mul(100)?.checked_add(cents)?;
    Some(Money::from_cents(if negative { -total } else { total }))
}

/// True if the line carries something that could be a currency cell.
pub fn has_currency_marker(line: &str) -> bool {
    line.contains('$')
}

pub fn parse_id(cell: &str) -> Option<i64> {
    cell.trim().trim_start_matches('#').parse().ok()
}

/// Hours column: `-` means none logged.
pub fn parse_hours(cell: &str) -> Option<Option<f64>> {
    let trimmed = cell.trim();
    if trimmed == "-" {
        return Some(None);
    }
    trimmed.parse::<f64>().ok().filter(|h| h.is_finite()).map(Some)
}

/// Size column: `240 sq ft` or `Not set`.
pub fn parse_square_feet(cell: &str) -> Option<f64> {
    let number = cell.split_whitespace().next()?.replace(',', "");
    number.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Condition column: `3/5` or a bare `3`.
pub fn parse_condition(cell: &str) -> Option<u8> {
    let score = cell.split('/').next()?.trim();
    score.parse().ok().filter(|c| (1..=5).contains(c))
}
