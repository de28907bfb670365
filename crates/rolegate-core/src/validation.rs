//! Field validation for mutation inputs.
//!
//! Every validator collects all rejected fields into one
//! [`ValidationError`] instead of stopping at the first failure.

use crate::error::ValidationError;
use crate::model::{NewPermission, NewRole, NewUser, PermissionPatch, RolePatch, UserPatch};

pub const MAX_USERNAME_LEN: usize = 50;
pub const MAX_EMAIL_LEN: usize = 100;
pub const MAX_PERSON_NAME_LEN: usize = 30;
pub const MAX_ROLE_NAME_LEN: usize = 50;
pub const MAX_PERMISSION_NAME_LEN: usize = 50;
pub const MAX_DESCRIPTION_LEN: usize = 200;
pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 128;

/// Validate an account registration.
pub fn validate_new_user(user: &NewUser) -> Result<(), ValidationError> {
    let mut errors = ValidationError::new();
    check_username(&mut errors, &user.username);
    check_email(&mut errors, &user.email);
    check_password(&mut errors, "password", &user.password);
    check_max(&mut errors, "first_name", &user.first_name, MAX_PERSON_NAME_LEN);
    check_max(&mut errors, "last_name", &user.last_name, MAX_PERSON_NAME_LEN);
    errors.into_result()
}

/// Validate a partial account update.
pub fn validate_user_patch(patch: &UserPatch) -> Result<(), ValidationError> {
    let mut errors = ValidationError::new();
    if let Some(username) = &patch.username {
        check_username(&mut errors, username);
    }
    if let Some(email) = &patch.email {
        check_email(&mut errors, email);
    }
    if let Some(first) = &patch.first_name {
        check_max(&mut errors, "first_name", first, MAX_PERSON_NAME_LEN);
    }
    if let Some(last) = &patch.last_name {
        check_max(&mut errors, "last_name", last, MAX_PERSON_NAME_LEN);
    }
    errors.into_result()
}

/// Validate a replacement password.
pub fn validate_password(field: &str, password: &str) -> Result<(), ValidationError> {
    let mut errors = ValidationError::new();
    check_password(&mut errors, field, password);
    errors.into_result()
}

pub fn validate_new_role(role: &NewRole) -> Result<(), ValidationError> {
    let mut errors = ValidationError::new();
    check_required(&mut errors, "name", &role.name, MAX_ROLE_NAME_LEN);
    check_max(&mut errors, "description", &role.description, MAX_DESCRIPTION_LEN);
    errors.into_result()
}

pub fn validate_role_patch(patch: &RolePatch) -> Result<(), ValidationError> {
    let mut errors = ValidationError::new();
    if let Some(name) = &patch.name {
        check_required(&mut errors, "name", name, MAX_ROLE_NAME_LEN);
    }
    if let Some(description) = &patch.description {
        check_max(&mut errors, "description", description, MAX_DESCRIPTION_LEN);
    }
    errors.into_result()
}

pub fn validate_new_permission(perm: &NewPermission) -> Result<(), ValidationError> {
    let mut errors = ValidationError::new();
    check_required(&mut errors, "name", &perm.name, MAX_PERMISSION_NAME_LEN);
    check_max(&mut errors, "description", &perm.description, MAX_DESCRIPTION_LEN);
    errors.into_result()
}

pub fn validate_permission_patch(patch: &PermissionPatch) -> Result<(), ValidationError> {
    let mut errors = ValidationError::new();
    if let Some(name) = &patch.name {
        check_required(&mut errors, "name", name, MAX_PERMISSION_NAME_LEN);
    }
    if let Some(description) = &patch.description {
        check_max(&mut errors, "description", description, MAX_DESCRIPTION_LEN);
    }
    errors.into_result()
}

fn check_username(errors: &mut ValidationError, username: &str) {
    check_required(errors, "username", username, MAX_USERNAME_LEN);
    if username.chars().any(char::is_whitespace) {
        errors.push("username", "may not contain whitespace");
    }
}

fn check_email(errors: &mut ValidationError, email: &str) {
    if email.trim().is_empty() {
        errors.push("email", "this field may not be blank");
        return;
    }
    check_max(errors, "email", email, MAX_EMAIL_LEN);
    if !is_plausible_email(email) {
        errors.push("email", "enter a valid email address");
    }
}

fn check_password(errors: &mut ValidationError, field: &str, password: &str) {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LEN {
        errors.push(field, "password must be at least 8 characters");
    } else if len > MAX_PASSWORD_LEN {
        errors.push(field, "password must be at most 128 characters");
    }
}

fn check_required(errors: &mut ValidationError, field: &str, value: &str, max: usize) {
    if value.trim().is_empty() {
        errors.push(field, "this field may not be blank");
    } else {
        check_max(errors, field, value, max);
    }
}

fn check_max(errors: &mut ValidationError, field: &str, value: &str, max: usize) {
    if value.chars().count() > max {
        errors.push(field, format!("ensure this field has no more than {max} characters"));
    }
}

fn is_plausible_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && (domain == "localhost"
            || (domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_user() {
        let user = NewUser::new("alice", "alice@example.com", "correct-horse");
        assert!(validate_new_user(&user).is_ok());
    }

    #[test]
    fn test_collects_every_bad_field() {
        let user = NewUser::new("", "not-an-email", "short");
        let err = validate_new_user(&user).unwrap_err();
        assert!(err.has_field("username"));
        assert!(err.has_field("email"));
        assert!(err.has_field("password"));
    }

    #[test]
    fn test_email_shapes() {
        for ok in ["a@b.co", "admin@localhost", "first.last@sub.example.org"] {
            assert!(is_plausible_email(ok), "{ok}");
        }
        for bad in ["a@", "@b.com", "a@b@c.com", "a b@c.com", "a@.com", "a@com."] {
            assert!(!is_plausible_email(bad), "{bad}");
        }
    }

    #[test]
    fn test_limits_count_characters_not_bytes() {
        // 50 CJK characters is 150 bytes but still within the limit.
        let role = NewRole::new("管".repeat(50), "");
        assert!(validate_new_role(&role).is_ok());
        let role = NewRole::new("管".repeat(51), "");
        assert!(validate_new_role(&role).unwrap_err().has_field("name"));
    }

    #[test]
    fn test_patch_only_checks_present_fields() {
        assert!(validate_role_patch(&RolePatch::default()).is_ok());
        let patch = RolePatch {
            name: Some("  ".into()),
            description: None,
        };
        assert!(validate_role_patch(&patch).unwrap_err().has_field("name"));
    }

    #[test]
    fn test_password_bounds() {
        assert!(validate_password("new_password", "1234567").is_err());
        assert!(validate_password("new_password", "12345678").is_ok());
        assert!(validate_password("new_password", &"x".repeat(129)).is_err());
    }
}
