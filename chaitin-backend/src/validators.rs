//! Field validators shared by the forms

use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$")
        .expect("valid email regex")
});

static ALPHANUMERIC_HYPHEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z\d-]+$").expect("valid username regex"));

static SLUG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("valid slug regex"));

pub const MSG_REQUIRED: &str = "This field is required.";
pub const MSG_INVALID_EMAIL: &str = "Enter a valid email address.";
pub const MSG_ALPHANUMERIC_HYPHEN: &str =
    "Invalid value. Should include only lowercase letters, numbers, and -";
pub const MSG_HYPHEN_ONLY: &str = "Invalid value. Cannot be just hyphens.";
pub const MSG_INVALID_SLUG: &str =
    "Enter a valid “slug” consisting of letters, numbers, underscores or hyphens.";

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Commonly used passwords that are always rejected
const COMMON_PASSWORDS: &[&str] = &[
    "password", "password1", "password123", "12345678", "123456789", "1234567890",
    "qwerty123", "qwertyuiop", "iloveyou", "sunshine", "football", "baseball",
    "letmein1", "welcome1", "admin123", "abc12345", "trustno1", "passw0rd",
];

pub fn is_valid_email(value: &str) -> bool {
    value.len() <= 254 && EMAIL_RE.is_match(value)
}

/// Username rules: lowercase letters, digits and hyphens, not only hyphens
pub fn validate_username(value: &str) -> Result<(), &'static str> {
    if !ALPHANUMERIC_HYPHEN_RE.is_match(value) {
        return Err(MSG_ALPHANUMERIC_HYPHEN);
    }
    if value.chars().all(|c| c == '-') {
        return Err(MSG_HYPHEN_ONLY);
    }
    Ok(())
}

pub fn is_valid_slug(value: &str) -> bool {
    SLUG_RE.is_match(value)
}

/// Password strength checks; returns every failed rule
pub fn validate_password(password: &str, username: &str) -> Vec<String> {
    let mut errors = Vec::new();

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.push(format!(
            "This password is too short. It must contain at least {} characters.",
            MIN_PASSWORD_LENGTH
        ));
    }

    if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        errors.push("This password is entirely numeric.".to_string());
    }

    let lowered = password.to_lowercase();
    if !username.is_empty() && lowered.contains(&username.to_lowercase()) {
        errors.push("The password is too similar to the username.".to_string());
    }

    if COMMON_PASSWORDS.contains(&lowered.as_str()) {
        errors.push("This password is too common.".to_string());
    }

    errors
}

/// Turn a title into a slug: lowercase ascii words joined by hyphens
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut pending_hyphen = false;

    for c in value.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email() {
        assert!(is_valid_email("tester@example.com"));
        assert!(is_valid_email("first.last+tag@sub.example.org"));
        assert!(!is_valid_email("tester"));
        assert!(!is_valid_email("tester@"));
        assert!(!is_valid_email("tester@localhost"));
        assert!(!is_valid_email("two words@example.com"));
    }

    #[test]
    fn test_username() {
        assert!(validate_username("gregory").is_ok());
        assert!(validate_username("greg-2").is_ok());
        assert_eq!(validate_username("Gregory"), Err(MSG_ALPHANUMERIC_HYPHEN));
        assert_eq!(validate_username("greg ory"), Err(MSG_ALPHANUMERIC_HYPHEN));
        assert_eq!(validate_username(""), Err(MSG_ALPHANUMERIC_HYPHEN));
        assert_eq!(validate_username("---"), Err(MSG_HYPHEN_ONLY));
    }

    #[test]
    fn test_password_rules() {
        assert!(validate_password("kolmogorov-1965", "gregory").is_empty());
        assert_eq!(validate_password("short", "gregory").len(), 1);
        assert!(
            validate_password("1234567890", "gregory")
                .iter()
                .any(|e| e.contains("entirely numeric"))
        );
        assert!(
            validate_password("gregory-rocks", "gregory")
                .iter()
                .any(|e| e.contains("too similar"))
        );
        assert!(
            validate_password("Password123", "gregory")
                .iter()
                .any(|e| e.contains("too common"))
        );
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Intro to Django!"), "intro-to-django");
        assert_eq!(slugify("  Rust -- the  Book "), "rust-the-book");
        assert_eq!(slugify("***"), "");
    }

    #[test]
    fn test_slug() {
        assert!(is_valid_slug("first-post"));
        assert!(is_valid_slug("post_2"));
        assert!(!is_valid_slug("first post"));
        assert!(!is_valid_slug(""));
    }
}
