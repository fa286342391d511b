//! Password strength policy consulted before packing.

use tracing::warn;

/// Minimum password length in characters
pub const MIN_PASSWORD_LEN: usize = 8;

/// Decide whether a password may be used for a new archive.
///
/// A strong password has at least [`MIN_PASSWORD_LEN`] characters and at
/// least one uppercase letter, lowercase letter, digit, and punctuation
/// character. With `allow_weak` the rejection degrades to a warning.
pub fn accept_password(password: &str, allow_weak: bool) -> bool {
    match strength_issue(password) {
        None => true,
        Some(issue) if allow_weak => {
            warn!("using weak password: {issue}");
            true
        }
        Some(_) => false,
    }
}

/// Explain why a password is considered weak, if it is
pub fn strength_issue(password: &str) -> Option<&'static str> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Some("shorter than 8 characters");
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Some("no uppercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Some("no lowercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Some("no digit");
    }
    if !password.chars().any(|c| c.is_ascii_punctuation()) {
        return Some("no punctuation character");
    }
    None
}
