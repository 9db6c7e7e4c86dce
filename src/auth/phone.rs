//! Phone number normalization for a single national numbering plan.
//!
//! Numbers are stored and compared as `+<country code><national number>`. Input may
//! use the trunk prefix (`0912 345 678`), the bare country code (`84912345678`), the
//! international prefix (`0084...`) or full E.164 (`+84 912-345-678`), including the
//! common `+84 0912...` form that keeps the trunk zero.

use thiserror::Error;

const NSN_MIN: usize = 9;
const NSN_MAX: usize = 10;
const E164_MIN: usize = 8;
const E164_MAX: usize = 15;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PhoneError {
    #[error("Phone number is empty")]
    Empty,
    #[error("Phone number contains invalid characters")]
    InvalidCharacters,
    #[error("Phone number has an invalid length")]
    InvalidLength,
}

pub fn normalize_phone(raw: &str, country_code: &str) -> Result<String, PhoneError> {
    let compact: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '.' | '-' | '(' | ')'))
        .collect();

    if compact.is_empty() {
        return Err(PhoneError::Empty);
    }

    let (international, digits) = if let Some(rest) = compact.strip_prefix('+') {
        (true, rest)
    } else if let Some(rest) = compact.strip_prefix("00") {
        (true, rest)
    } else {
        (false, compact.as_str())
    };

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(PhoneError::InvalidCharacters);
    }

    if international {
        if let Some(nsn) = digits.strip_prefix(country_code) {
            // "+84 0912..." carries a redundant trunk zero.
            let nsn = nsn.strip_prefix('0').unwrap_or(nsn);
            return national(nsn, country_code);
        }
        // Foreign number: keep as E.164 without plan-specific checks.
        if (E164_MIN..=E164_MAX).contains(&digits.len()) {
            return Ok(format!("+{digits}"));
        }
        return Err(PhoneError::InvalidLength);
    }

    if let Some(nsn) = digits.strip_prefix('0') {
        return national(nsn, country_code);
    }

    if let Some(nsn) = digits.strip_prefix(country_code) {
        if (NSN_MIN..=NSN_MAX).contains(&nsn.len()) {
            return national(nsn, country_code);
        }
    }

    national(digits, country_code)
}

fn national(nsn: &str, country_code: &str) -> Result<String, PhoneError> {
    if !(NSN_MIN..=NSN_MAX).contains(&nsn.len()) || nsn.starts_with('0') {
        return Err(PhoneError::InvalidLength);
    }
    Ok(format!("+{country_code}{nsn}"))
}

/// True when both inputs normalize to the same number. Unparseable input never matches.
pub fn phones_match(a: &str, b: &str, country_code: &str) -> bool {
    match (normalize_phone(a, country_code), normalize_phone(b, country_code)) {
        (Ok(x), Ok(y)) => x == y,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trunk_prefix_is_replaced_by_country_code() {
        assert_eq!(normalize_phone("0912345678", "84").unwrap(), "+84912345678");
        assert_eq!(normalize_phone("0912 345 678", "84").unwrap(), "+84912345678");
        assert_eq!(normalize_phone("(091) 234-5678", "84").unwrap(), "+84912345678");
    }

    #[test]
    fn international_forms_are_accepted() {
        assert_eq!(normalize_phone("+84 912.345.678", "84").unwrap(), "+84912345678");
        assert_eq!(normalize_phone("0084912345678", "84").unwrap(), "+84912345678");
        assert_eq!(normalize_phone("84912345678", "84").unwrap(), "+84912345678");
    }

    #[test]
    fn trunk_zero_after_country_code_is_dropped() {
        assert_eq!(normalize_phone("+84 0912 345 678", "84").unwrap(), "+84912345678");
        assert_eq!(normalize_phone("0084 0912345678", "84").unwrap(), "+84912345678");
        assert!(phones_match("+84 0912 345 678", "0912345678", "84"));
    }

    #[test]
    fn bare_national_number_is_accepted() {
        assert_eq!(normalize_phone("912345678", "84").unwrap(), "+84912345678");
        // ten digits starting with the country code is still a national number
        assert_eq!(normalize_phone("8412345678", "84").unwrap(), "+848412345678");
    }

    #[test]
    fn foreign_numbers_pass_through() {
        assert_eq!(normalize_phone("+44 20 7946 0958", "84").unwrap(), "+442079460958");
        assert_eq!(normalize_phone("+1234", "84"), Err(PhoneError::InvalidLength));
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        assert_eq!(normalize_phone("   ", "84"), Err(PhoneError::Empty));
        assert_eq!(normalize_phone("09123abc78", "84"), Err(PhoneError::InvalidCharacters));
        assert_eq!(normalize_phone("+", "84"), Err(PhoneError::InvalidCharacters));
        assert_eq!(normalize_phone("091234", "84"), Err(PhoneError::InvalidLength));
        assert_eq!(normalize_phone("0012", "84"), Err(PhoneError::InvalidLength));
        assert_eq!(normalize_phone("+84091234567890", "84"), Err(PhoneError::InvalidLength));
        assert_eq!(normalize_phone("+84 00912 345 678", "84"), Err(PhoneError::InvalidLength));
    }

    #[test]
    fn matching_compares_normalized_forms() {
        assert!(phones_match("0912 345 678", "+84912345678", "84"));
        assert!(phones_match("84912345678", "0912-345-678", "84"));
        assert!(!phones_match("0912345678", "0912345679", "84"));
        assert!(!phones_match("", "", "84"));
    }
}
