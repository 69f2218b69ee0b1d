//! Local field validation, run before any network call.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

pub const MIN_PASSWORD_LEN: usize = 8;

pub const NAME_MESSAGE: &str = "Enter your name";
pub const EMAIL_MESSAGE: &str = "Enter a valid email";
pub const PASSWORD_MESSAGE: &str = "Password must be at least 8 characters";
pub const CONFIRM_MISMATCH_MESSAGE: &str = "Passwords do not match";

fn email_regex() -> &'static Regex {
    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap()
    })
}

/// True if `email` looks like an email address.
pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_match(email)
}

/// Form fields that can carry a validation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Name,
    Email,
    Password,
    ConfirmPassword,
}

/// Validation messages keyed by field, in display order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<Field, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: Field, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.0.iter().map(|(field, message)| (*field, message.as_str()))
    }
}

pub(crate) fn check_email(errors: &mut FieldErrors, email: &str) {
    if !is_valid_email(email) {
        errors.insert(Field::Email, EMAIL_MESSAGE);
    }
}

pub(crate) fn check_password(errors: &mut FieldErrors, password: &str) {
    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.insert(Field::Password, PASSWORD_MESSAGE);
    }
}
