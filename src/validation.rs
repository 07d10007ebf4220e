//! Field validators shared by the auth and REST handlers.
//!
//! Each validator records human readable messages into a [`FieldErrors`]
//! so a request reports every problem at once.

use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

use crate::error::FieldErrors;

pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";

pub const USERNAME_MAX: usize = 150;
pub const EMAIL_MAX: usize = 254;
pub const PASSWORD_MIN: usize = 8;
pub const URL_MAX: usize = 200;

lazy_static! {
    static ref USERNAME: Regex = Regex::new(r"^[A-Za-z0-9_.@+-]+$").unwrap();
    static ref EMAIL: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s.]+$").unwrap();
}

const COMMON_PASSWORDS: &[&str] = &[
    "password", "password1", "password123", "passw0rd", "12345678", "123456789",
    "1234567890", "qwerty123", "qwertyuiop", "iloveyou", "letmein1", "sunshine",
    "princess", "football", "baseball", "welcome1", "abc12345", "trustno1",
    "superman", "starwars",
];

/// Records a length violation; returns `false` when the value is too long.
pub fn max_length(errors: &mut FieldErrors, field: &str, value: &str, max: usize) -> bool {
    let length = value.chars().count();
    if length > max {
        errors.add(
            field,
            format!(
                "Ensure this value has at most {} characters (it has {}).",
                max, length
            ),
        );
        return false;
    }
    true
}

/// Trims `value`; records `REQUIRED` when absent and `BLANK` when empty.
pub fn required<'a>(errors: &mut FieldErrors, field: &str, value: Option<&'a str>) -> Option<&'a str> {
    match value.map(str::trim) {
        None => {
            errors.add(field, REQUIRED);
            None
        }
        Some("") => {
            errors.add(field, BLANK);
            None
        }
        Some(v) => Some(v),
    }
}

pub fn validate_username(errors: &mut FieldErrors, username: &str) {
    if !max_length(errors, "username", username, USERNAME_MAX) {
        return;
    }
    if !USERNAME.is_match(username) {
        errors.add(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, \
             and @/./+/-/_ characters.",
        );
    }
}

/// Empty addresses are allowed; anything else must look like `local@domain.tld`.
pub fn validate_email(errors: &mut FieldErrors, field: &str, email: &str) {
    if email.is_empty() {
        return;
    }
    if !max_length(errors, field, email, EMAIL_MAX) {
        return;
    }
    if !EMAIL.is_match(email) {
        errors.add(field, "Enter a valid email address.");
    }
}

/// Empty URLs are allowed; anything else must be absolute http(s).
pub fn validate_url(errors: &mut FieldErrors, field: &str, value: &str) {
    if value.is_empty() {
        return;
    }
    if !max_length(errors, field, value, URL_MAX) {
        return;
    }
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.host().is_some() => {}
        _ => errors.add(field, "Enter a valid URL."),
    }
}

/// Password policy: minimum length, not purely numeric, not a common
/// password, not the username, and matching confirmation when one is given.
pub fn validate_password(
    errors: &mut FieldErrors,
    field: &str,
    password: &str,
    confirmation: Option<&str>,
    username: Option<&str>,
) {
    if password.chars().count() < PASSWORD_MIN {
        errors.add(
            field,
            format!(
                "This password is too short. It must contain at least {} characters.",
                PASSWORD_MIN
            ),
        );
    }
    if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        errors.add(field, "This password is entirely numeric.");
    }
    if COMMON_PASSWORDS.contains(&password.to_lowercase().as_str()) {
        errors.add(field, "This password is too common.");
    }
    if let Some(username) = username {
        if !username.is_empty() && password.eq_ignore_ascii_case(username) {
            errors.add(field, "The password is too similar to the username.");
        }
    }
    if let Some(confirmation) = confirmation {
        if confirmation != password {
            errors.add(
                &format!("{}_confirmation", field),
                "Passwords Entered Do Not Match",
            );
        }
    }
}
