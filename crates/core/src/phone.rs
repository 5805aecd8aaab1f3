//! Phone number normalisation for SMS delivery.

use std::sync::LazyLock;

use regex::Regex;

/// Country code prefixed to bare 10-digit national numbers.
pub const DEFAULT_COUNTRY_CODE: &str = "1";

const MIN_DIGITS: usize = 7;
const MAX_DIGITS: usize = 15;

static E164: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+[1-9][0-9]{6,14}$").expect("valid E.164 regex"));

fn digits(input: &str) -> String {
    input.chars().filter(char::is_ascii_digit).collect()
}

/// Whether `input` contains a plausible number of digits (7 to 15).
pub fn is_valid_phone(input: &str) -> bool {
    let len = digits(input).len();
    (MIN_DIGITS..=MAX_DIGITS).contains(&len)
}

/// Convert arbitrary user input to E.164.
///
/// Non-digits are stripped; a 10-digit result is treated as a national
/// number and gets `country_code` prepended. Returns `None` when no digits
/// remain.
pub fn to_e164(input: &str, country_code: &str) -> Option<String> {
    let mut d = digits(input);
    if d.is_empty() {
        return None;
    }
    if d.len() == 10 {
        d.insert_str(0, country_code);
    }
    Some(format!("+{d}"))
}

/// Whether `number` is already in strict E.164 form.
pub fn is_e164(number: &str) -> bool {
    E164.is_match(number)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ten_digits_get_country_code() {
        assert_eq!(
            to_e164("(555) 010-0199", DEFAULT_COUNTRY_CODE).as_deref(),
            Some("+15550100199")
        );
    }

    #[test]
    fn longer_numbers_are_kept_as_is() {
        assert_eq!(to_e164("+44 20 7946 0958", "1").as_deref(), Some("+442079460958"));
    }

    #[test]
    fn custom_country_code() {
        assert_eq!(to_e164("0612345678", "33").as_deref(), Some("+330612345678"));
    }

    #[test]
    fn no_digits_yields_none() {
        assert_eq!(to_e164("n/a", "1"), None);
        assert_eq!(to_e164("", "1"), None);
    }

    #[test]
    fn validity_is_digit_count() {
        assert!(is_valid_phone("555-0100"));
        assert!(!is_valid_phone("12345"));
        assert!(!is_valid_phone("1234567890123456"));
    }

    #[test]
    fn strict_e164_check() {
        assert!(is_e164("+15550100199"));
        assert!(!is_e164("15550100199"));
        assert!(!is_e164("+0123456789"));
    }
}
