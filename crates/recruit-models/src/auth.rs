//! Authentication payloads.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidateEmail};

use crate::validation::{FieldErrors, NON_FIELD_ERRORS};

/// Maximum username length.
pub const MAX_USERNAME_LENGTH: usize = 150;

/// Maximum first/last name length.
pub const MAX_NAME_LENGTH: usize = 150;

pub(crate) const BLANK: &str = "This field may not be blank.";

/// Login request body.
#[derive(Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl LoginRequest {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Field-level checks that run before credentials are looked at.
    pub fn check(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.username.trim().is_empty() {
            errors.add("username", BLANK);
        }
        if self.password.is_empty() {
            errors.add("password", BLANK);
        }
        errors.into_result()
    }
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Registration request body.
#[derive(Clone, Default, Serialize, Deserialize, JsonSchema, Validate)]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(length(max = 150, message = "Ensure this field has no more than 150 characters."))]
    pub username: String,
    #[serde(default)]
    #[validate(length(max = 254, message = "Ensure this field has no more than 254 characters."))]
    pub email: String,
    #[serde(default)]
    #[validate(length(max = 150, message = "Ensure this field has no more than 150 characters."))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(max = 150, message = "Ensure this field has no more than 150 characters."))]
    pub last_name: String,
    #[serde(default)]
    #[validate(length(min = 8, message = "Ensure this field has at least 8 characters."))]
    pub password: String,
    #[serde(default)]
    pub password_confirm: String,
}

impl RegisterRequest {
    /// Run every payload-local check.
    ///
    /// Field errors are reported first; the password confirmation is only
    /// compared once every field is individually valid. Uniqueness is checked
    /// by the server against stored users.
    pub fn check(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();

        if let Err(e) = self.validate() {
            errors.merge(e.into());
        }

        if !self.username.is_empty() && !is_valid_username(&self.username) {
            errors.add(
                "username",
                "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
            );
        }

        if !self.email.is_empty() && !self.email.validate_email() {
            errors.add("email", "Enter a valid email address.");
        }

        for (field, value) in [
            ("username", &self.username),
            ("email", &self.email),
            ("password", &self.password),
            ("password_confirm", &self.password_confirm),
        ] {
            if value.trim().is_empty() {
                errors.set(field, BLANK);
            }
        }

        if errors.is_empty() && self.password != self.password_confirm {
            errors.add(NON_FIELD_ERRORS, "Passwords don't match");
        }

        errors.into_result()
    }
}

impl std::fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .finish_non_exhaustive()
    }
}

/// Usernames: letters, digits and `@ . + - _`.
pub fn is_valid_username(username: &str) -> bool {
    !username.is_empty()
        && username.chars().count() <= MAX_USERNAME_LENGTH
        && username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
}

/// Public user fields returned alongside tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// Response for login and registration.
#[derive(Clone, Serialize, Deserialize, JsonSchema)]
pub struct AuthResponse {
    #[serde(default)]
    pub message: String,
    pub user: UserSummary,
    pub access: String,
    pub refresh: String,
}

impl std::fmt::Debug for AuthResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthResponse")
            .field("message", &self.message)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

/// Body of `POST /auth/token/refresh/`.
#[derive(Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh: String,
}

/// Rotated token pair.
#[derive(Clone, Serialize, Deserialize, JsonSchema)]
pub struct RefreshResponse {
    pub access: String,
    pub refresh: String,
}

impl std::fmt::Debug for RefreshResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RefreshResponse { .. }")
    }
}

/// Body of `POST /auth/logout/`.
#[derive(Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct LogoutRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Plain `{"message": ...}` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Error body for everything that is not a field validation error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ErrorBody {
    pub detail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_registration() -> RegisterRequest {
        RegisterRequest {
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            password: "analytical-engine".to_string(),
            password_confirm: "analytical-engine".to_string(),
        }
    }

    #[test]
    fn test_valid_registration_passes() {
        assert!(valid_registration().check().is_ok());
    }

    #[test]
    fn test_password_mismatch_is_non_field_error() {
        let mut req = valid_registration();
        req.password_confirm = "something-else".to_string();
        let errors = req.check().unwrap_err();
        assert_eq!(
            errors.get(NON_FIELD_ERRORS),
            Some(&["Passwords don't match".to_string()][..])
        );
    }

    #[test]
    fn test_short_password() {
        let mut req = valid_registration();
        req.password = "short".to_string();
        req.password_confirm = "short".to_string();
        let errors = req.check().unwrap_err();
        assert!(errors.contains("password"));
        // Object-level check is skipped while fields are invalid
        assert!(!errors.contains(NON_FIELD_ERRORS));
    }

    #[test]
    fn test_blank_fields_report_single_message() {
        let req = RegisterRequest::default();
        let errors = req.check().unwrap_err();
        for field in ["username", "email", "password", "password_confirm"] {
            assert_eq!(errors.get(field), Some(&[BLANK.to_string()][..]), "{}", field);
        }
        assert!(!errors.contains("first_name"));
    }

    #[test]
    fn test_invalid_email_and_username() {
        let mut req = valid_registration();
        req.email = "not-an-email".to_string();
        req.username = "has space".to_string();
        let errors = req.check().unwrap_err();
        assert!(errors.contains("email"));
        assert!(errors.contains("username"));
    }

    #[test]
    fn test_username_rules() {
        assert!(is_valid_username("john.doe+test@x_y-z"));
        assert!(!is_valid_username(""));
        assert!(!is_valid_username("semi;colon"));
        assert!(!is_valid_username(&"a".repeat(151)));
    }

    #[test]
    fn test_login_check() {
        assert!(LoginRequest::new("ada", "pw").check().is_ok());
        let errors = LoginRequest::new("  ", "").check().unwrap_err();
        assert!(errors.contains("username"));
        assert!(errors.contains("password"));
    }

    #[test]
    fn test_debug_hides_passwords() {
        let debug = format!("{:?}", LoginRequest::new("ada", "hunter22"));
        assert!(!debug.contains("hunter22"));
        let debug = format!("{:?}", valid_registration());
        assert!(!debug.contains("analytical-engine"));
    }

    #[test]
    fn test_error_body_skips_missing_code() {
        let body = ErrorBody {
            detail: "nope".to_string(),
            code: None,
        };
        assert_eq!(serde_json::to_value(&body).unwrap(), serde_json::json!({"detail": "nope"}));
    }

    #[test]
    fn test_logout_request_accepts_missing_token() {
        let req: LogoutRequest = serde_json::from_str("{}").unwrap();
        assert!(req.refresh_token.is_none());
    }
}
