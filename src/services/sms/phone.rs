//! Recipient normalization to E.164

use once_cell::sync::Lazy;
use regex::Regex;

static E164: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+[1-9]\d{1,14}$").expect("valid E.164 pattern"));

/// Normalize a phone number towards E.164 using `country_code` (e.g. `+91`)
pub fn normalize_phone_number(raw: &str, country_code: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    let country_digits = country_code.trim_start_matches('+');

    if !country_digits.is_empty() && digits.starts_with(country_digits) && digits.len() == 12 {
        return format!("+{}", digits);
    }

    if digits.len() == 10 {
        return format!("{}{}", country_code, digits);
    }

    if raw.starts_with('+') {
        return raw.to_string();
    }

    format!("{}{}", country_code, digits)
}

pub fn is_valid_e164(number: &str) -> bool {
    E164.is_match(number)
}

/// Normalized recipient, or `demo_number` when the input cannot be made valid
pub fn resolve_recipient(raw: &str, country_code: &str, demo_number: &str) -> String {
    let formatted = normalize_phone_number(raw, country_code);
    if is_valid_e164(&formatted) {
        formatted
    } else {
        tracing::warn!(
            "Invalid phone number format '{}', using demo number {}",
            raw,
            demo_number
        );
        demo_number.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CC: &str = "+91";

    #[test]
    fn test_ten_digits_get_country_code() {
        assert_eq!(normalize_phone_number("9876543210", CC), "+919876543210");
        assert_eq!(normalize_phone_number("98765 43210", CC), "+919876543210");
    }

    #[test]
    fn test_international_passes_through() {
        assert_eq!(normalize_phone_number("+919876543210", CC), "+919876543210");
        assert_eq!(normalize_phone_number("+15551234567", CC), "+15551234567");
    }

    #[test]
    fn test_twelve_digits_with_prefix() {
        assert_eq!(normalize_phone_number("919876543210", CC), "+919876543210");
    }

    #[test]
    fn test_other_lengths_get_country_code() {
        assert_eq!(normalize_phone_number("12345", CC), "+9112345");
        assert_eq!(normalize_phone_number("", CC), "");
    }

    #[test]
    fn test_e164_validation() {
        assert!(is_valid_e164("+919876543210"));
        assert!(!is_valid_e164("+0123456"));
        assert!(!is_valid_e164("919876543210"));
        assert!(!is_valid_e164("+1234567890123456"));
    }

    #[test]
    fn test_invalid_recipient_falls_back_to_demo() {
        assert_eq!(resolve_recipient("", CC, "+15551234567"), "+15551234567");
        assert_eq!(resolve_recipient("+abc", CC, "+15551234567"), "+15551234567");
        assert_eq!(resolve_recipient("9876543210", CC, "+15551234567"), "+919876543210");
    }
}
