//! Per-field coercion rules for imported rows.
//!
//! Every function here is pure: it takes the raw cell text and returns either
//! the normalized value or `None`/an error message. Row numbering and error
//! prefixes are added by the caller.

use serde_json::Value;

/// Columns that must exist in the header and be non-empty in every row.
pub const REQUIRED_FIELDS: &[&str] = &["vin", "year", "make", "model", "price"];

/// Free-text columns copied through (trimmed) when non-empty.
pub const TEXT_FIELDS: &[&str] = &[
    "make",
    "model",
    "trim",
    "stock_number",
    "condition",
    "exterior_color",
    "interior_color",
    "transmission",
    "drivetrain",
    "fuel_type",
    "body_style",
    "engine",
    "carfax_url",
    "window_sticker_url",
    "primary_image_url",
];

/// Columns holding yes/no style flags.
pub const BOOL_FIELDS: &[&str] = &[
    "is_featured_homepage",
    "call_for_availability_enabled",
    "is_active",
];

pub const VIN_LENGTH: usize = 17;
pub const MIN_YEAR: i64 = 1900;
/// Model years may run this far ahead of the calendar.
pub const MAX_YEARS_AHEAD: i64 = 2;

/// Validate and canonicalize a VIN: trimmed, upper-cased, 17 characters from
/// `0-9` and `A-Z` minus `I`, `O`, `Q`.
pub fn validate_vin(raw: &str) -> Result<String, String> {
    let vin = raw.trim().to_uppercase();
    if vin.is_empty() {
        return Err("VIN is required".into());
    }
    let len = vin.chars().count();
    if len != VIN_LENGTH {
        return Err(format!("VIN must be {VIN_LENGTH} characters (got {len})"));
    }
    let valid = vin
        .chars()
        .all(|c| c.is_ascii_digit() || (c.is_ascii_uppercase() && !matches!(c, 'I' | 'O' | 'Q')));
    if !valid {
        return Err("VIN contains invalid characters".into());
    }
    Ok(vin)
}

/// `true`/`1`/`yes`/`y` and `false`/`0`/`no`/`n`, case-insensitively.
/// Anything else means "not given".
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => Some(true),
        "false" | "0" | "no" | "n" => Some(false),
        _ => None,
    }
}

/// Parse a number written the way spreadsheets export it: `$32,500`,
/// ` 15 000 `, `1.5e4`. Fractions truncate toward zero. Unparseable or
/// non-finite input is `None`.
pub fn parse_number(raw: &str) -> Option<i64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '$' | ',' | '€' | '£' | '¥'))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    if let Ok(n) = cleaned.parse::<i64>() {
        return Some(n);
    }
    let f = cleaned.parse::<f64>().ok().filter(|f| f.is_finite())?;
    if f.abs() >= i64::MAX as f64 {
        return None;
    }
    Some(f.trunc() as i64)
}

/// Canonical condition and whether the token was recognized.
///
/// Unknown tokens map to `Used`; callers surface the `false` as a warning.
pub fn normalize_condition(raw: &str) -> (&'static str, bool) {
    match raw.trim().to_lowercase().as_str() {
        "new" | "nuevo" => ("New", true),
        "used" | "usado" | "pre-owned" => ("Used", true),
        _ => ("Used", false),
    }
}

/// Split the additional-images cell: a JSON array of strings, a
/// `|`-separated list, or a single URL.
pub fn parse_image_urls(raw: &str) -> Vec<String> {
    let value = raw.trim();
    if value.is_empty() {
        return Vec::new();
    }

    if value.starts_with('[')
        && let Ok(items) = serde_json::from_str::<Vec<Value>>(value)
    {
        return items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(String::from)
            .collect();
    }

    if value.contains('|') {
        return value
            .split('|')
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(String::from)
            .collect();
    }

    vec![value.to_string()]
}

/// Primary URL first, then the additional URLs minus repeats of the primary.
pub fn merge_image_urls(primary: Option<&str>, additional: Vec<String>) -> Vec<String> {
    let mut urls = Vec::with_capacity(additional.len() + 1);
    if let Some(p) = primary {
        urls.push(p.to_string());
    }
    urls.extend(additional.into_iter().filter(|u| Some(u.as_str()) != primary));
    urls
}
