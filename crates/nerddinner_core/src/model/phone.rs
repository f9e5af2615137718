//! Country-specific phone number rules.

use once_cell::sync::Lazy;
use regex::Regex;

static COUNTRY_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    vec![
        (
            "USA",
            Regex::new(r"^(\([2-9]\d{2}\) ?|[2-9]\d{2}[-. ])\d{3}[-. ]\d{4}$")
                .expect("valid USA phone regex"),
        ),
        (
            "Canada",
            Regex::new(r"^(\([2-9]\d{2}\) ?|[2-9]\d{2}[-. ])\d{3}[-. ]\d{4}$")
                .expect("valid Canada phone regex"),
        ),
        (
            "UK",
            Regex::new(r"^(\+44 ?|0)(\d ?){9,10}$").expect("valid UK phone regex"),
        ),
        (
            "Netherlands",
            Regex::new(r"^(\+31|0031|0)[1-9][0-9\- ]{8,9}$")
                .expect("valid Netherlands phone regex"),
        ),
        (
            "Germany",
            Regex::new(r"^(\+49 ?|0)[1-9][0-9 /\-]{5,14}$").expect("valid Germany phone regex"),
        ),
    ]
});

/// Returns whether `phone` is a valid number for `country`.
///
/// Countries without a registered rule accept any number; the required and
/// length rules on the dinner still apply.
pub fn is_valid_number(phone: &str, country: &str) -> bool {
    let country = country.trim();
    match COUNTRY_PATTERNS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(country))
    {
        Some((_, pattern)) => pattern.is_match(phone.trim()),
        None => true,
    }
}
