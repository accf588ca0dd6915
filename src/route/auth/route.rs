use aide::axum::IntoApiResponse;
use argon2::Argon2;
use axum::{extract::State, http::header, response::IntoResponse};
use macros::route;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
	error,
	extract::{Json, Path, Session},
	mail,
	openapi::tag,
	password,
	route::model::Notice,
	session,
	token::Purpose,
	AppState, Database,
};

use super::{model, Error, RouteError};

/// Checks a login attempt against the user found by username, if any.
///
/// Unknown users and wrong passwords are indistinguishable to the caller.
pub fn authenticate(
	hasher: &Argon2,
	user: Option<model::User>,
	password: &str,
) -> Result<model::User, Error> {
	let user = user.ok_or(Error::InvalidUsernameOrPassword)?;

	if !password::verify(hasher, password, &user.password) {
		return Err(Error::InvalidUsernameOrPassword);
	}

	if !user.confirmed {
		return Err(Error::Unconfirmed);
	}

	Ok(user)
}

/// Maps the unique constraints of the user table to their errors.
fn map_unique(error: sqlx::Error) -> RouteError {
	match error::unique_violation(&error) {
		Some("user_username_key") => Error::UsernameTaken.into(),
		Some("user_email_key") => Error::EmailTaken.into(),
		_ => error.into(),
	}
}

/// Inserts a new non-admin user with an already hashed password.
pub async fn insert_user(
	conn: &mut PgConnection,
	input: &model::SignupInput,
	hash: &str,
	confirmed: bool,
) -> Result<model::User, RouteError> {
	sqlx::query_as::<_, model::User>(
		r#"
			INSERT INTO "user" (username, email, password, confirmed, confirmed_on)
			VALUES ($1, $2, $3, $4, CASE WHEN $4 THEN now() END)
			RETURNING *
		"#,
	)
	.bind(&input.username)
	.bind(&input.email)
	.bind(hash)
	.bind(confirmed)
	.fetch_one(conn)
	.await
	.map_err(map_unique)
}

async fn insert_session(conn: &mut PgConnection, user_id: Uuid) -> Result<Uuid, sqlx::Error> {
	sqlx::query_scalar::<_, Uuid>("INSERT INTO session (user_id) VALUES ($1) RETURNING id")
		.bind(user_id)
		.fetch_one(conn)
		.await
}

/// Log in
/// Logs in to a confirmed account by username, returning an associated session cookie.
#[route(tag = tag::AUTH, response(status = 200, description = "Logged in successfully.", shape = "Json<model::SessionCreated>"))]
pub async fn login(
	State(state): State<AppState>,
	Json(input): Json<model::LoginInput>,
) -> Result<impl IntoApiResponse, RouteError> {
	let user = sqlx::query_as::<_, model::User>(r#"SELECT * FROM "user" WHERE username = $1"#)
		.bind(&input.username)
		.fetch_optional(&state.database)
		.await?;

	let user = authenticate(&state.hasher, user, &input.password)?;

	let mut conn = state.database.acquire().await?;
	let session_id = insert_session(&mut conn, user.id).await?;
	let cookie = session::create_cookie(session_id, &state.config.cookies);

	tracing::info!(user = %user.id, "user logged in");

	Ok((
		[(header::SET_COOKIE, cookie.to_string())],
		Json(model::SessionCreated { session_id, user }),
	))
}

/// Log out
/// Ends the current session and clears the session cookie.
#[route(tag = tag::AUTH, response(status = 200, description = "Logged out successfully.", shape = "Json<Notice>"))]
pub async fn logout(
	State(state): State<AppState>,
	session: Session,
) -> Result<impl IntoApiResponse, RouteError> {
	sqlx::query("DELETE FROM session WHERE id = $1")
		.bind(session.id)
		.execute(&state.database)
		.await?;

	Ok((
		[(
			header::SET_COOKIE,
			session::clear_cookie(&state.config.cookies).to_string(),
		)],
		Json(Notice::new("you have been logged out")),
	))
}

/// Sign up
/// Creates an unconfirmed account, signs it in and emails a confirmation link.
/// If the email cannot be sent, the account is kept and a new link can be requested.
#[route(tag = tag::AUTH, response(status = 200, description = "Signed up successfully.", shape = "Json<model::SessionCreated>"))]
pub async fn signup(
	State(state): State<AppState>,
	Json(input): Json<model::SignupInput>,
) -> Result<impl IntoApiResponse, RouteError> {
	let hash = password::hash(&state.hasher, &input.password).map_err(Error::Hash)?;

	let mut tx = state.database.begin().await?;
	let user = insert_user(&mut tx, &input, &hash, false).await?;
	let session_id = insert_session(&mut tx, user.id).await?;

	tx.commit().await?;

	tracing::info!(user = %user.id, "user signed up");

	let cookie = [(
		header::SET_COOKIE,
		session::create_cookie(session_id, &state.config.cookies).to_string(),
	)];

	if let Err(error) = send_confirmation(&state, &user).await {
		return Ok((cookie, RouteError::from(error)).into_response());
	}

	Ok((cookie, Json(model::SessionCreated { session_id, user })).into_response())
}

async fn send_confirmation(state: &AppState, user: &model::User) -> Result<(), mail::Error> {
	let token = state.signer.sign(Purpose::Confirm, user.id);
	let link = state.config.url(&format!("/confirm/{token}"));

	state
		.mailer
		.send(mail::confirmation(
			&state.config.blog_name,
			&user.email,
			&user.username,
			&link,
		))
		.await
}

/// Confirm account
/// Confirms the account carried by a signed confirmation token.
#[route(tag = tag::AUTH, response(status = 200, description = "Account confirmed.", shape = "Json<Notice>"))]
pub async fn confirm(
	State(state): State<AppState>,
	Path(model::TokenInput { token }): Path<model::TokenInput>,
) -> Result<Json<Notice>, RouteError> {
	let user_id = state
		.signer
		.verify(&token, Purpose::Confirm)
		.ok_or(Error::InvalidConfirmationToken)?;

	let confirmed = sqlx::query_scalar::<_, bool>(r#"SELECT confirmed FROM "user" WHERE id = $1"#)
		.bind(user_id)
		.fetch_optional(&state.database)
		.await?
		.ok_or(Error::InvalidConfirmationToken)?;

	if confirmed {
		return Ok(Json(Notice::new("your account is already confirmed")));
	}

	// `confirmed_on` keeps the date of the first confirmation.
	sqlx::query(
		r#"UPDATE "user" SET confirmed = TRUE, confirmed_on = COALESCE(confirmed_on, now()) WHERE id = $1"#,
	)
	.bind(user_id)
	.execute(&state.database)
	.await?;

	tracing::info!(user = %user_id, "user confirmed");

	Ok(Json(Notice::new("you have confirmed your account, thanks!")))
}

/// Resend confirmation
/// Sends a new confirmation link to the signed-in, unconfirmed user.
#[route(tag = tag::AUTH, response(status = 200, description = "Confirmation email sent.", shape = "Json<Notice>"))]
pub async fn resend_confirmation(
	State(state): State<AppState>,
	session: Session,
) -> Result<Json<Notice>, RouteError> {
	if session.user.confirmed {
		return Err(Error::AlreadyConfirmed.into());
	}

	send_confirmation(&state, &session.user).await?;

	Ok(Json(Notice::new(
		"a new confirmation email has been sent to you by email",
	)))
}

/// Unconfirmed account
/// Where unconfirmed users are sent until they confirm their email address.
#[route(tag = tag::AUTH)]
pub async fn unconfirmed() -> Json<Notice> {
	Json(Notice::new(
		"you have not confirmed your account yet, please check your inbox for the confirmation link or request a new one",
	))
}

/// Get user
/// Returns the authenticated user.
#[route(tag = tag::AUTH)]
pub async fn get_me(session: Session) -> Json<model::User> {
	Json(session.user)
}

/// Update user
/// Changes the username of the authenticated user.
#[route(tag = tag::AUTH)]
pub async fn update_me(
	State(database): State<Database>,
	session: Session,
	Json(input): Json<model::UpdateUserInput>,
) -> Result<Json<model::User>, RouteError> {
	let user = sqlx::query_as::<_, model::User>(
		r#"UPDATE "user" SET username = $1 WHERE id = $2 RETURNING *"#,
	)
	.bind(&input.username)
	.bind(session.user.id)
	.fetch_one(&database)
	.await
	.map_err(map_unique)?;

	Ok(Json(user))
}

/// Request password reset
/// Emails a password reset link if an account uses the address.
/// The answer is the same whether or not the address is known.
#[route(tag = tag::AUTH, response(status = 200, description = "Request accepted.", shape = "Json<Notice>"))]
pub async fn reset_password_request(
	State(state): State<AppState>,
	Json(input): Json<model::EmailInput>,
) -> Result<Json<Notice>, RouteError> {
	let user = sqlx::query_as::<_, model::User>(r#"SELECT * FROM "user" WHERE email = $1"#)
		.bind(&input.email)
		.fetch_optional(&state.database)
		.await?;

	if let Some(user) = user {
		let token = state.signer.sign(Purpose::ResetPassword, user.id);
		let link = state.config.url(&format!("/reset_password/{token}"));

		let email = mail::password_reset(
			&state.config.blog_name,
			&user.email,
			&user.username,
			&link,
		);

		// A failure must not answer differently from an unknown address.
		if let Err(error) = state.mailer.send(email).await {
			tracing::warn!(%error, user = %user.id, "could not send the password reset email");
		}
	}

	Ok(Json(Notice::new(
		"check your email for the instructions to reset your password",
	)))
}

/// Reset password
/// Sets a new password using a signed reset token. Existing sessions stay valid.
#[route(tag = tag::AUTH, response(status = 200, description = "Password reset.", shape = "Json<Notice>"))]
pub async fn reset_password(
	State(state): State<AppState>,
	Path(model::TokenInput { token }): Path<model::TokenInput>,
	Json(input): Json<model::ResetPasswordInput>,
) -> Result<Json<Notice>, RouteError> {
	let user_id = state
		.signer
		.verify(&token, Purpose::ResetPassword)
		.ok_or(Error::InvalidResetToken)?;

	let hash = password::hash(&state.hasher, &input.password).map_err(Error::Hash)?;

	let updated = sqlx::query(r#"UPDATE "user" SET password = $1 WHERE id = $2"#)
		.bind(&hash)
		.bind(user_id)
		.execute(&state.database)
		.await?;

	if updated.rows_affected() == 0 {
		return Err(Error::InvalidResetToken.into());
	}

	tracing::info!(user = %user_id, "password reset");

	Ok(Json(Notice::new("your password has been reset")))
}

/// Change password
/// Changes the password of the authenticated user, then ends the current session.
#[route(tag = tag::AUTH, response(status = 200, description = "Password changed.", shape = "Json<Notice>"))]
pub async fn change_password(
	State(state): State<AppState>,
	session: Session,
	Json(input): Json<model::ChangePasswordInput>,
) -> Result<impl IntoApiResponse, RouteError> {
	if !password::verify(&state.hasher, &input.current_password, &session.user.password) {
		return Err(Error::WrongPassword.into());
	}

	let hash = password::hash(&state.hasher, &input.password).map_err(Error::Hash)?;

	let mut tx = state.database.begin().await?;

	sqlx::query(r#"UPDATE "user" SET password = $1 WHERE id = $2"#)
		.bind(&hash)
		.bind(session.user.id)
		.execute(&mut *tx)
		.await?;

	sqlx::query("DELETE FROM session WHERE id = $1")
		.bind(session.id)
		.execute(&mut *tx)
		.await?;

	tx.commit().await?;

	tracing::info!(user = %session.user.id, "password changed");

	Ok((
		[(
			header::SET_COOKIE,
			session::clear_cookie(&state.config.cookies).to_string(),
		)],
		Json(Notice::new(
			"your password has been updated, please log in again",
		)),
	))
}

#[cfg(test)]
mod test {
	use chrono::Utc;

	use super::*;

	fn user(hasher: &Argon2, confirmed: bool) -> model::User {
		model::User {
			id: Uuid::new_v4(),
			username: "alice".into(),
			email: "alice@example.com".into(),
			password: password::hash(hasher, "correct horse").unwrap(),
			is_admin: false,
			confirmed,
			confirmed_on: None,
			created_at: Utc::now(),
		}
	}

	#[test]
	fn test_authenticate_unknown_user() {
		let hasher = Argon2::default();

		assert!(matches!(
			authenticate(&hasher, None, "correct horse"),
			Err(Error::InvalidUsernameOrPassword)
		));
	}

	#[test]
	fn test_authenticate_wrong_password() {
		let hasher = Argon2::default();

		assert!(matches!(
			authenticate(&hasher, Some(user(&hasher, true)), "wrong horse"),
			Err(Error::InvalidUsernameOrPassword)
		));
		// An unconfirmed account with a wrong password still looks like any other failure.
		assert!(matches!(
			authenticate(&hasher, Some(user(&hasher, false)), "wrong horse"),
			Err(Error::InvalidUsernameOrPassword)
		));
	}

	#[test]
	fn test_authenticate_unconfirmed() {
		let hasher = Argon2::default();

		assert!(matches!(
			authenticate(&hasher, Some(user(&hasher, false)), "correct horse"),
			Err(Error::Unconfirmed)
		));
	}

	#[test]
	fn test_authenticate_ok() {
		let hasher = Argon2::default();

		assert!(authenticate(&hasher, Some(user(&hasher, true)), "correct horse").is_ok());
	}
}
