//! User-input validation shared by the command handlers.
//!
//! Each variant's `Display` text is the reply sent back to the user, so no
//! internal detail belongs here.

use regex::Regex;
use std::sync::LazyLock;

pub const MIN_FINE_AMOUNT: i64 = 1;
pub const MAX_FINE_AMOUNT: i64 = 1_000_000;

pub const MIN_POLL_OPTIONS: usize = 2;
pub const MAX_POLL_OPTIONS: usize = 10;

/// Poll durations in minutes, up to one week.
pub const MIN_POLL_MINUTES: i64 = 1;
pub const MAX_POLL_MINUTES: i64 = 10_080;

pub const MAX_PREFIX_CHARS: usize = 10;

static FREQUENCY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{3}\.\d{2}$").expect("frequency pattern"));
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?\d[\d \-]{5,18}$").expect("phone pattern"));
static HANDLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@?\w{1,15}$").expect("handle pattern"));

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Fine amount must be between 1 and 1,000,000.")]
    FineAmountOutOfRange,
    #[error("Please provide between 2 and 10 options.")]
    PollOptionCount,
    #[error("Poll duration must be between 1 minute and 1 week (10080 minutes).")]
    PollDurationOutOfRange,
    #[error("Invalid frequency format. Please use format: \"123.45\"")]
    InvalidFrequency,
    #[error("Invalid phone number. Use digits with optional +, spaces or dashes.")]
    InvalidPhone,
    #[error("Invalid handle. Use up to 15 letters, digits or underscores.")]
    InvalidHandle,
    #[error("Prefix must be between 1 and 10 characters.")]
    InvalidPrefix,
    #[error("Invalid timezone \"{0}\". Please use a valid IANA timezone (e.g., \"America/New_York\").")]
    InvalidTimezone(String),
    #[error("Invalid time format. Please use \"YYYY-MM-DD HH:MM\".")]
    InvalidTime,
    #[error("Meeting time must be in the future.")]
    TimeNotInFuture,
}

pub fn validate_fine_amount(amount: i64) -> Result<(), ValidationError> {
    if (MIN_FINE_AMOUNT..=MAX_FINE_AMOUNT).contains(&amount) {
        Ok(())
    } else {
        Err(ValidationError::FineAmountOutOfRange)
    }
}

/// Splits a comma-separated option string into 2..=10 trimmed, non-empty texts.
pub fn parse_poll_options(raw: &str) -> Result<Vec<String>, ValidationError> {
    let options: Vec<String> = raw
        .split(',')
        .map(|opt| opt.trim().to_string())
        .filter(|opt| !opt.is_empty())
        .collect();

    if (MIN_POLL_OPTIONS..=MAX_POLL_OPTIONS).contains(&options.len()) {
        Ok(options)
    } else {
        Err(ValidationError::PollOptionCount)
    }
}

pub fn validate_poll_duration(minutes: i64) -> Result<(), ValidationError> {
    if (MIN_POLL_MINUTES..=MAX_POLL_MINUTES).contains(&minutes) {
        Ok(())
    } else {
        Err(ValidationError::PollDurationOutOfRange)
    }
}

pub fn validate_frequency(frequency: &str) -> Result<(), ValidationError> {
    if FREQUENCY_RE.is_match(frequency) {
        Ok(())
    } else {
        Err(ValidationError::InvalidFrequency)
    }
}

pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if PHONE_RE.is_match(phone.trim()) {
        Ok(())
    } else {
        Err(ValidationError::InvalidPhone)
    }
}

pub fn validate_handle(handle: &str) -> Result<(), ValidationError> {
    if HANDLE_RE.is_match(handle.trim()) {
        Ok(())
    } else {
        Err(ValidationError::InvalidHandle)
    }
}

pub fn validate_prefix(prefix: &str) -> Result<(), ValidationError> {
    let len = prefix.chars().count();
    if len == 0 || len > MAX_PREFIX_CHARS {
        Err(ValidationError::InvalidPrefix)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fine_amount_bounds() {
        assert!(validate_fine_amount(1).is_ok());
        assert!(validate_fine_amount(1_000_000).is_ok());
        assert_eq!(
            validate_fine_amount(0),
            Err(ValidationError::FineAmountOutOfRange)
        );
        assert_eq!(
            validate_fine_amount(-5),
            Err(ValidationError::FineAmountOutOfRange)
        );
        assert_eq!(
            validate_fine_amount(1_000_001),
            Err(ValidationError::FineAmountOutOfRange)
        );
    }

    #[test]
    fn test_poll_option_parsing() {
        let options = parse_poll_options("A, B, C").unwrap();
        assert_eq!(options, vec!["A", "B", "C"]);

        // Empty segments are dropped before counting
        assert_eq!(parse_poll_options("A,,B").unwrap(), vec!["A", "B"]);
        assert_eq!(
            parse_poll_options("only one"),
            Err(ValidationError::PollOptionCount)
        );
        let eleven = (0..11).map(|i| i.to_string()).collect::<Vec<_>>().join(",");
        assert_eq!(
            parse_poll_options(&eleven),
            Err(ValidationError::PollOptionCount)
        );
    }

    #[test]
    fn test_poll_duration_bounds() {
        assert!(validate_poll_duration(1).is_ok());
        assert!(validate_poll_duration(10_080).is_ok());
        assert!(validate_poll_duration(0).is_err());
        assert!(validate_poll_duration(10_081).is_err());
    }

    #[test]
    fn test_frequency_pattern() {
        assert!(validate_frequency("123.45").is_ok());
        assert!(validate_frequency("12.345").is_err());
        assert!(validate_frequency("1234.5").is_err());
        assert!(validate_frequency("abc.de").is_err());
        assert!(validate_frequency("123.456").is_err());
        assert!(validate_frequency(" 123.45").is_err());
    }

    #[test]
    fn test_contact_patterns() {
        assert!(validate_phone("+1 555 0100").is_ok());
        assert!(validate_phone("555-0100-22").is_ok());
        assert!(validate_phone("call me").is_err());
        assert!(validate_phone("12").is_err());

        assert!(validate_handle("@crow_99").is_ok());
        assert!(validate_handle("crow").is_ok());
        assert!(validate_handle("way_too_long_handle_name").is_err());
        assert!(validate_handle("bad handle").is_err());
    }

    #[test]
    fn test_prefix_bounds() {
        assert!(validate_prefix("!").is_ok());
        assert!(validate_prefix("0123456789").is_ok());
        assert!(validate_prefix("").is_err());
        assert!(validate_prefix("0123456789x").is_err());
    }
}
