use once_cell::sync::Lazy;
use regex::Regex;

/// Input validation and login-identifier classification

// Compile regex patterns once at startup
// These patterns are hardcoded and always valid, so we use expect() with explicit reasoning
static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("hardcoded email regex is invalid - fix source code")
});

static USERNAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9_-]{3,32}$")
        .expect("hardcoded username regex is invalid - fix source code")
});

/// How a free-form login identifier should be looked up.
///
/// Classification picks exactly one lookup path; there is no fallback
/// chaining when the chosen path finds nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    Phone,
    Email,
    Username,
}

/// Classify a login identifier: E.164-like strings are phone lookups,
/// email-shaped strings are email lookups, everything else is a username.
pub fn classify_identifier(identifier: &str) -> IdentifierKind {
    if is_valid_e164(identifier) {
        IdentifierKind::Phone
    } else if validate_email(identifier) {
        IdentifierKind::Email
    } else {
        IdentifierKind::Username
    }
}

/// Validate email format (RFC 5322 simplified)
pub fn validate_email(email: &str) -> bool {
    !email.is_empty() && email.len() <= 254 && EMAIL_REGEX.is_match(email)
}

/// Validate username format (3-32 characters, alphanumeric with - and _)
pub fn validate_username(username: &str) -> bool {
    USERNAME_REGEX.is_match(username)
}

/// Validate E.164 phone format: leading +, 8-15 digits, no leading zero
pub fn is_valid_e164(phone: &str) -> bool {
    let Some(digits) = phone.strip_prefix('+') else {
        return false;
    };

    (8..=15).contains(&digits.len())
        && !digits.starts_with('0')
        && digits.chars().all(|c| c.is_ascii_digit())
}

/// Mask an email address for logging
pub fn mask_email(email: &str) -> String {
    if let Some(at_pos) = email.find('@') {
        let local = &email[..at_pos];
        let domain = &email[at_pos..];
        if local.len() <= 2 {
            format!("**{}", domain)
        } else {
            format!("{}***{}", &local[..1], domain)
        }
    } else {
        "***@***".to_string()
    }
}

/// Mask a phone number for logging, keeping the last four digits
pub fn mask_phone(phone: &str) -> String {
    if phone.len() <= 4 {
        "****".to_string()
    } else {
        format!("****{}", &phone[phone.len() - 4..])
    }
}
