//! Business logic services.
//!
//! Services contain core business logic separated from HTTP handlers.
//! They handle database transactions, validation, and multi-step operations.

pub mod booking_service;
pub mod change_service;
pub mod club_service;
pub mod communication_service;
pub mod email_service;
pub mod event_service;
pub mod facility_service;
pub mod finance_service;
pub mod member_service;
pub mod subscription_service;
pub mod team_service;
pub mod token_service;
pub mod user_service;

use crate::error::AppError;

/// Trim a required text field and enforce a maximum length.
pub(crate) fn required_text(field: &str, value: &str, max_len: usize) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::InvalidRequest(format!("{field} is required")));
    }
    if value.chars().count() > max_len {
        return Err(AppError::InvalidRequest(format!(
            "{field} must be at most {max_len} characters"
        )));
    }
    Ok(value.to_string())
}

/// Trim an optional text field; blank values become `None`.
pub(crate) fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Normalize and minimally validate an email address.
pub(crate) fn normalize_email(value: &str) -> Result<String, AppError> {
    let email = value.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    };
    if !valid || email.len() > 254 || email.contains(char::is_whitespace) {
        return Err(AppError::InvalidRequest(format!(
            "'{}' is not a valid email address",
            value.trim()
        )));
    }
    Ok(email)
}

/// Ensure `value` is one of `allowed`.
pub(crate) fn one_of(field: &str, value: &str, allowed: &[&str]) -> Result<(), AppError> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(AppError::InvalidRequest(format!(
            "{field} must be one of: {}",
            allowed.join(", ")
        )))
    }
}

/// Map a unique-constraint violation to a 409 with `message`.
pub(crate) fn conflict_on_unique(err: sqlx::Error, message: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Conflict(message.to_string())
        }
        _ => AppError::Database(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_text_trims_and_checks_length() {
        assert_eq!(required_text("name", "  U12 Lions ", 50).unwrap(), "U12 Lions");
        assert!(required_text("name", "   ", 50).is_err());
        assert!(required_text("name", "abcdef", 5).is_err());
    }

    #[test]
    fn optional_text_drops_blanks() {
        assert_eq!(optional_text(Some("  ".into())), None);
        assert_eq!(optional_text(Some(" hall ".into())), Some("hall".into()));
        assert_eq!(optional_text(None), None);
    }

    #[test]
    fn emails_are_lowercased() {
        assert_eq!(
            normalize_email(" Coach@Example.COM ").unwrap(),
            "coach@example.com"
        );
    }

    #[test]
    fn malformed_emails_are_rejected() {
        for bad in ["", "nobody", "@example.com", "a@b", "a b@example.com", "a@.com"] {
            assert!(normalize_email(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn one_of_lists_allowed_values() {
        assert!(one_of("status", "active", &["active", "inactive"]).is_ok());
        match one_of("status", "gone", &["active", "inactive"]) {
            Err(AppError::InvalidRequest(msg)) => {
                assert_eq!(msg, "status must be one of: active, inactive")
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
