//! Client-side credential format checks.
//!
//! These run before any attempt is counted. They are a UX pre-check, not an
//! authority: the auth service decides what it accepts.

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

/// Symbols accepted (and one of which is required) in a password.
pub const PASSWORD_SYMBOLS: &str = "@$!%*?&";

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FormatViolation {
    #[error("Invalid email format")]
    InvalidEmail,
    #[error(
        "Password must be at least 8 characters long and contain uppercase, lowercase, number, and special character"
    )]
    WeakPassword,
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Invalid regex"))
}

fn password_alphabet() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9@$!%*?&]+$").expect("Invalid regex"))
}

/// `local@domain.tld` shape: one `@`, no whitespace, a dot inside the domain.
pub fn validate_email(email: &str) -> Result<(), FormatViolation> {
    if email_pattern().is_match(email) {
        Ok(())
    } else {
        Err(FormatViolation::InvalidEmail)
    }
}

pub fn validate_password(password: &str) -> Result<(), FormatViolation> {
    let long_enough = password.chars().count() >= MIN_PASSWORD_LEN;
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_symbol = password.chars().any(|c| PASSWORD_SYMBOLS.contains(c));

    if long_enough
        && has_lower
        && has_upper
        && has_digit
        && has_symbol
        && password_alphabet().is_match(password)
    {
        Ok(())
    } else {
        Err(FormatViolation::WeakPassword)
    }
}

pub fn validate_credentials(email: &str, password: &str) -> Result<(), FormatViolation> {
    validate_email(email)?;
    validate_password(password)
}
