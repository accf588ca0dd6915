use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

fn validate_username(username: &str) -> Result<(), ValidationError> {
	if username.chars().any(|c| !c.is_alphanumeric()) {
		let mut error = ValidationError::new("alphanumeric");
		error.message = Some("username must be alphanumeric".into());

		return Err(error);
	}

	Ok(())
}

/// A single user.
#[derive(Debug, Clone, FromRow, Serialize, JsonSchema)]
pub struct User {
	/// The unique identifier of the user.
	pub id: Uuid,
	/// The username that is displayed to the public.
	pub username: String,
	/// The email address used for confirmation and password resets.
	pub email: String,
	/// The argon2 hash of the password.
	#[serde(skip)]
	pub password: String,
	/// Whether the user may manage posts and register other users.
	pub is_admin: bool,
	/// Whether the user has confirmed their email address.
	pub confirmed: bool,
	/// When the email address was confirmed.
	pub confirmed_on: Option<DateTime<Utc>>,
	/// The creation time of the user.
	pub created_at: DateTime<Utc>,
}

#[derive(Serialize, JsonSchema)]
pub struct SessionCreated {
	/// The session id, also set as a cookie.
	pub session_id: Uuid,
	pub user: User,
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct LoginInput {
	#[validate(length(min = 1, max = 64))]
	pub username: String,
	#[validate(length(min = 1, max = 128))]
	pub password: String,
}

/// Used both for self-service signup and for accounts created by an administrator.
#[derive(Deserialize, Validate, JsonSchema)]
pub struct SignupInput {
	/// The username that is displayed to the public.
	#[validate(length(min = 3, max = 64), custom(function = "validate_username"))]
	pub username: String,
	#[validate(email, length(max = 120))]
	pub email: String,
	#[validate(length(min = 8, max = 128))]
	pub password: String,
	/// Must repeat `password`.
	#[validate(must_match(other = "password", message = "passwords must match"))]
	pub password2: String,
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct UpdateUserInput {
	#[validate(length(min = 3, max = 64), custom(function = "validate_username"))]
	pub username: String,
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct EmailInput {
	#[validate(email, length(max = 120))]
	pub email: String,
}

/// A signed confirmation or password reset token, as found in the emailed link.
#[derive(Deserialize, JsonSchema)]
pub struct TokenInput {
	pub token: String,
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct ResetPasswordInput {
	#[validate(length(min = 8, max = 128))]
	pub password: String,
	#[validate(must_match(other = "password", message = "passwords must match"))]
	pub password2: String,
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct ChangePasswordInput {
	#[validate(length(min = 1, max = 128))]
	pub current_password: String,
	#[validate(length(min = 8, max = 128))]
	pub password: String,
	#[validate(must_match(other = "password", message = "passwords must match"))]
	pub password2: String,
}

#[cfg(test)]
mod test {
	use super::*;

	fn signup(username: &str, password2: &str) -> SignupInput {
		SignupInput {
			username: username.into(),
			email: "alice@example.com".into(),
			password: "correct horse".into(),
			password2: password2.into(),
		}
	}

	#[test]
	fn test_signup_valid() {
		assert!(signup("alice", "correct horse").validate().is_ok());
	}

	#[test]
	fn test_signup_password_mismatch() {
		let errors = signup("alice", "battery staple").validate().unwrap_err();

		assert!(errors.field_errors().contains_key("password2"));
	}

	#[test]
	fn test_signup_username_rules() {
		assert!(signup("al", "correct horse").validate().is_err());
		assert!(signup("alice smith", "correct horse").validate().is_err());
		assert!(signup(&"a".repeat(65), "correct horse").validate().is_err());
	}

	#[test]
	fn test_password_never_serialized() {
		let user = User {
			id: Uuid::new_v4(),
			username: "alice".into(),
			email: "alice@example.com".into(),
			password: "$argon2id$secret".into(),
			is_admin: false,
			confirmed: false,
			confirmed_on: None,
			created_at: Utc::now(),
		};

		let json = serde_json::to_value(&user).unwrap();

		assert!(json.get("password").is_none());
		assert_eq!(json["username"], "alice");
	}
}
