use aide::axum::{
	routing::{get_with, post_with},
	ApiRouter,
};
use axum::http::StatusCode;

use crate::{
	error::{self, Message},
	ratelimit, AppState,
};

pub mod model;
pub mod route;

/// An error that can occur during authentication.
///
/// Note that the messages are presented to the client, so they should not contain
/// sensitive information.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("invalid username or password")]
	InvalidUsernameOrPassword,
	#[error("please confirm your account first")]
	Unconfirmed,
	#[error("password hashing error: {0}")]
	Hash(#[from] argon2::password_hash::Error),
	#[error("you must be logged in")]
	NoSessionCookie,
	#[error("invalid session cookie")]
	InvalidSessionCookie,
	#[error("you do not have permission to access this page")]
	PermissionDenied,
	#[error("username already taken")]
	UsernameTaken,
	#[error("email already taken")]
	EmailTaken,
	#[error("the confirmation link is invalid or has expired")]
	InvalidConfirmationToken,
	#[error("the password reset link is invalid or has expired")]
	InvalidResetToken,
	#[error("your account is already confirmed")]
	AlreadyConfirmed,
	#[error("current password is incorrect")]
	WrongPassword,
}

pub type RouteError = error::RouteError<Error>;

impl From<Error> for RouteError {
	fn from(error: Error) -> Self {
		Self::Route(error)
	}
}

pub fn routes(limits: Option<&ratelimit::Limits>) -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new()
		.merge(super::limit(
			ApiRouter::new().api_route("/login", post_with(login, login_docs)),
			limits.map(|limits| &limits.login),
		))
		.merge(super::limit(
			ApiRouter::new().api_route("/signup", post_with(signup, signup_docs)),
			limits.map(|limits| &limits.signup),
		))
		.merge(super::limit(
			ApiRouter::new().api_route(
				"/reset_password_request",
				post_with(reset_password_request, reset_password_request_docs),
			),
			limits.map(|limits| &limits.reset_password),
		))
		.api_route("/logout", get_with(logout, logout_docs))
		.api_route(
			"/me",
			get_with(get_me, get_me_docs).put_with(update_me, update_me_docs),
		)
		.api_route("/confirm/resend", post_with(resend_confirmation, resend_confirmation_docs))
		.api_route("/confirm/:token", get_with(confirm, confirm_docs))
		.api_route("/unconfirmed", get_with(unconfirmed, unconfirmed_docs))
		.api_route("/reset_password/:token", post_with(reset_password, reset_password_docs))
		.api_route("/change_password", post_with(change_password, change_password_docs))
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::InvalidUsernameOrPassword | Self::NoSessionCookie | Self::InvalidSessionCookie => {
				StatusCode::UNAUTHORIZED
			}
			Self::Unconfirmed | Self::PermissionDenied => StatusCode::FORBIDDEN,
			Self::Hash(..) => StatusCode::INTERNAL_SERVER_ERROR,
			Self::UsernameTaken | Self::EmailTaken | Self::AlreadyConfirmed => StatusCode::CONFLICT,
			Self::InvalidConfirmationToken | Self::InvalidResetToken | Self::WrongPassword => {
				StatusCode::BAD_REQUEST
			}
		}
	}

	fn into_errors(self) -> Vec<Message> {
		match self {
			Self::Hash(error) => {
				tracing::error!(%error, "password hashing failed");

				Message::new("something went wrong, please try again").into_vec()
			}
			Self::UsernameTaken => Message::new(self.to_string()).field("username").into_vec(),
			Self::EmailTaken => Message::new(self.to_string()).field("email").into_vec(),
			Self::WrongPassword => Message::new(self.to_string())
				.field("current_password")
				.into_vec(),
			_ => Message::new(self.to_string()).into_vec(),
		}
	}
}

#[cfg(test)]
mod test {
	use crate::test::*;

	#[tokio::test]
	async fn test_me_requires_session() {
		let app = app(lazy_database());

		let response = app.get("/me").await;

		assert_eq!(response.status_code(), 401);
		assert_eq!(
			response.json::<serde_json::Value>()["errors"][0]["content"],
			"you must be logged in"
		);
	}

	#[tokio::test]
	async fn test_signup_validation() {
		let app = app(lazy_database());

		let response = app
			.post("/signup")
			.json(&json!({
				"username": "alice",
				"email": "not an email",
				"password": "correct horse",
				"password2": "battery staple",
			}))
			.await;

		assert_eq!(response.status_code(), 400);

		let body = response.json::<serde_json::Value>();
		let fields = body["errors"]
			.as_array()
			.unwrap()
			.iter()
			.filter_map(|error| error["field"].as_str())
			.collect::<Vec<_>>();

		assert!(fields.contains(&"email"));
		assert!(fields.contains(&"password2"));
	}

	#[sqlx::test]
	#[ignore = "needs a Postgres DATABASE_URL"]
	async fn test_confirmation_flow(pool: Database) {
		let (app, mailer) = app_with_mailer(pool);

		let response = app
			.post("/signup")
			.json(&json!({
				"username": "alice",
				"email": "alice@example.com",
				"password": "correct horse",
				"password2": "correct horse",
			}))
			.await;

		assert_eq!(response.status_code(), 200);
		assert!(response
			.header("set-cookie")
			.to_str()
			.unwrap()
			.contains("session="));

		let link = mailer.last_link().unwrap();

		// Unconfirmed users are sent to the informational page.
		let response = app.get("/me").await;

		assert_eq!(response.status_code(), 303);
		assert_eq!(response.header("location"), "/unconfirmed");

		app.get("/logout").await.assert_status_ok();

		let response = app
			.post("/login")
			.json(&json!({ "username": "alice", "password": "correct horse" }))
			.await;

		assert_eq!(response.status_code(), 403);
		assert_eq!(
			response.json::<serde_json::Value>()["errors"][0]["content"],
			"please confirm your account first"
		);

		let response = app
			.post("/login")
			.json(&json!({ "username": "alice", "password": "wrong horse" }))
			.await;

		assert_eq!(response.status_code(), 401);
		assert_eq!(
			response.json::<serde_json::Value>()["errors"][0]["content"],
			"invalid username or password"
		);

		let path = link.trim_start_matches(BASE_URL);

		app.get(path).await.assert_status_ok();

		let response = app
			.post("/login")
			.json(&json!({ "username": "alice", "password": "correct horse" }))
			.await;

		assert_eq!(response.status_code(), 200);

		let response = app.get("/me").await;

		assert_eq!(response.status_code(), 200);
		assert_eq!(response.json::<serde_json::Value>()["username"], "alice");
		assert_eq!(response.json::<serde_json::Value>()["confirmed"], true);
	}

	#[sqlx::test]
	#[ignore = "needs a Postgres DATABASE_URL"]
	async fn test_signup_conflicts(pool: Database) {
		let app = app(pool.clone());

		create_user(&pool, "alice", false, true).await;

		let response = app
			.post("/signup")
			.json(&json!({
				"username": "alice",
				"email": "someone@example.com",
				"password": "correct horse",
				"password2": "correct horse",
			}))
			.await;

		assert_eq!(response.status_code(), 409);
		assert_eq!(
			response.json::<serde_json::Value>()["errors"][0]["field"],
			"username"
		);
	}

	#[sqlx::test]
	#[ignore = "needs a Postgres DATABASE_URL"]
	async fn test_password_reset_hides_mail_failures(pool: Database) {
		let (app, mailer) = app_with_mailer(pool.clone());

		create_user(&pool, "alice", false, true).await;
		mailer.fail();

		let unknown = app
			.post("/reset_password_request")
			.json(&json!({ "email": "nobody@example.com" }))
			.await;
		let known = app
			.post("/reset_password_request")
			.json(&json!({ "email": "alice@example.com" }))
			.await;

		assert_eq!(known.status_code(), 200);
		assert_eq!(unknown.status_code(), known.status_code());
		assert_eq!(unknown.text(), known.text());
		assert!(mailer.sent().is_empty());
	}

	#[sqlx::test]
	#[ignore = "needs a Postgres DATABASE_URL"]
	async fn test_password_reset(pool: Database) {
		let (app, mailer) = app_with_mailer(pool.clone());

		create_user(&pool, "alice", false, true).await;

		// Unknown addresses get the same answer.
		let unknown = app
			.post("/reset_password_request")
			.json(&json!({ "email": "nobody@example.com" }))
			.await;
		let known = app
			.post("/reset_password_request")
			.json(&json!({ "email": "alice@example.com" }))
			.await;

		assert_eq!(unknown.status_code(), 200);
		assert_eq!(unknown.text(), known.text());
		assert_eq!(mailer.sent().len(), 1);

		let path = mailer.last_link().unwrap();
		let path = path.trim_start_matches(BASE_URL);

		app.post(path)
			.json(&json!({ "password": "battery staple", "password2": "battery staple" }))
			.await
			.assert_status_ok();

		app.post("/login")
			.json(&json!({ "username": "alice", "password": "battery staple" }))
			.await
			.assert_status_ok();

		// A confirmation token cannot be replayed as a reset token.
		let user_id = sqlx::query_scalar::<_, uuid::Uuid>(r#"SELECT id FROM "user" WHERE username = 'alice'"#)
			.fetch_one(&pool)
			.await
			.unwrap();
		let token = signer().sign(crate::token::Purpose::Confirm, user_id);

		let response = app
			.post(&format!("/reset_password/{token}"))
			.json(&json!({ "password": "another one", "password2": "another one" }))
			.await;

		assert_eq!(response.status_code(), 400);
	}

	#[sqlx::test]
	#[ignore = "needs a Postgres DATABASE_URL"]
	async fn test_change_password_logs_out(pool: Database) {
		let app = app(pool.clone());

		create_user(&pool, "alice", false, true).await;
		login(&app, "alice").await;

		let response = app
			.post("/change_password")
			.json(&json!({
				"current_password": "wrong",
				"password": "battery staple",
				"password2": "battery staple",
			}))
			.await;

		assert_eq!(response.status_code(), 400);

		app.post("/change_password")
			.json(&json!({
				"current_password": PASSWORD,
				"password": "battery staple",
				"password2": "battery staple",
			}))
			.await
			.assert_status_ok();

		assert_eq!(app.get("/me").await.status_code(), 401);
	}
}
