//! Generic form validation.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ValidationError;

/// Shortest password accepted by any form.
pub const MIN_PASSWORD_LEN: usize = 6;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("invalid email regex")
});

/// How a field's value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text.
    Text,
    /// Email address.
    Email,
    /// Password; subject to [`MIN_PASSWORD_LEN`].
    Password,
}

/// One input in a form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    /// Field name, reported when it is missing.
    pub name: String,
    /// Value interpretation.
    pub kind: FieldKind,
    /// Whether the field must be filled in.
    pub required: bool,
    /// Current value.
    pub value: String,
}

impl FormField {
    /// A required field of the given kind.
    pub fn required(name: impl Into<String>, kind: FieldKind, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
            value: value.into(),
        }
    }

    /// An optional field of the given kind.
    pub fn optional(name: impl Into<String>, kind: FieldKind, value: impl Into<String>) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind, value)
        }
    }
}

/// Whether `value` looks like `local@domain.tld`.
pub fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.is_match(value.trim())
}

/// Check `fields` in order: required fields, then password length, then email shape.
pub fn validate(fields: &[FormField]) -> Result<(), ValidationError> {
    if let Some(missing) = fields
        .iter()
        .find(|field| field.required && field.value.trim().is_empty())
    {
        return Err(ValidationError::MissingRequired {
            field: missing.name.clone(),
        });
    }

    // Passwords are length-checked untrimmed; spaces count.
    if fields.iter().any(|field| {
        field.kind == FieldKind::Password
            && !field.value.is_empty()
            && field.value.chars().count() < MIN_PASSWORD_LEN
    }) {
        return Err(ValidationError::PasswordTooShort);
    }

    if fields.iter().any(|field| {
        field.kind == FieldKind::Email
            && !field.value.trim().is_empty()
            && !is_valid_email(&field.value)
    }) {
        return Err(ValidationError::MalformedEmail);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_fields_come_first() {
        let fields = [
            FormField::required("email", FieldKind::Email, "not-an-email"),
            FormField::required("password", FieldKind::Password, "   "),
        ];
        assert_eq!(
            validate(&fields),
            Err(ValidationError::MissingRequired {
                field: "password".to_string()
            })
        );
        assert_eq!(
            ValidationError::MissingRequired {
                field: "password".to_string()
            }
            .to_string(),
            "Please fill in all required fields"
        );
    }

    #[test]
    fn short_password_is_rejected() {
        let fields = [
            FormField::required("email", FieldKind::Email, "nour@example.com"),
            FormField::required("password", FieldKind::Password, "abc12"),
        ];
        assert_eq!(validate(&fields), Err(ValidationError::PasswordTooShort));
    }

    #[test]
    fn malformed_email_is_rejected() {
        let fields = [
            FormField::required("email", FieldKind::Email, "nour@example"),
            FormField::required("password", FieldKind::Password, "secret99"),
        ];
        assert_eq!(validate(&fields), Err(ValidationError::MalformedEmail));
    }

    #[test]
    fn optional_blank_fields_pass() {
        let fields = [
            FormField::required("name", FieldKind::Text, "Nour"),
            FormField::optional("email", FieldKind::Email, ""),
        ];
        assert_eq!(validate(&fields), Ok(()));
    }

    #[test]
    fn email_shapes() {
        assert!(is_valid_email(" someone@mail.co "));
        assert!(!is_valid_email("someone@"));
        assert!(!is_valid_email("some one@mail.com"));
    }
}
