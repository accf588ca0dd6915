use aide::OperationInput;
use axum::{
	extract::{FromRef, FromRequestParts},
	http::{header, request},
};
use uuid::Uuid;

use crate::{
	error::RouteError, openapi::SECURITY_SCHEME_SESSION, route::auth, session, Database,
};

/// Extracts the session and related user from the request.
///
/// If it does not exist, a [`auth::Error::NoSessionCookie`] is returned.
/// If the session is invalid, a [`auth::Error::InvalidSessionCookie`] is returned.
///
/// ```rust
/// async fn route(session: Session) {
///   println!("{:?}", session.user);
/// }
/// ```
#[derive(Debug)]
pub struct Session {
	pub id: Uuid,
	pub user: auth::model::User,
}

impl Session {
	/// Loads the session whose id is carried by the request cookies, if any.
	pub async fn from_parts(
		parts: &request::Parts,
		database: &Database,
	) -> Result<Self, RouteError<auth::Error>> {
		let cookies = parts
			.headers
			.get_all(header::COOKIE)
			.into_iter()
			.filter_map(|value| value.to_str().ok());

		let session_id = session::find(cookies)
			.ok_or(auth::Error::NoSessionCookie)?
			.map_err(|_| auth::Error::InvalidSessionCookie)?;

		let user = sqlx::query_as::<_, auth::model::User>(
			r#"
				SELECT "user".* FROM "user"
				INNER JOIN session ON session.user_id = "user".id
				WHERE session.id = $1
			"#,
		)
		.bind(session_id)
		.fetch_optional(database)
		.await?
		.ok_or(auth::Error::InvalidSessionCookie)?;

		Ok(Self {
			id: session_id,
			user,
		})
	}
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Session
where
	Database: FromRef<S>,
	S: Sync + Send,
{
	type Rejection = RouteError<auth::Error>;

	async fn from_request_parts(
		parts: &mut request::Parts,
		state: &S,
	) -> Result<Self, Self::Rejection> {
		Self::from_parts(parts, &Database::from_ref(state)).await
	}
}

impl OperationInput for Session {
	/// Operation input for the session extractor.
	///
	/// This adds a session cookie requirement to the `OpenAPI` operation.
	fn operation_input(_ctx: &mut aide::gen::GenContext, operation: &mut aide::openapi::Operation) {
		operation.security.push(
			[(SECURITY_SCHEME_SESSION.to_string(), Vec::new())]
				.into_iter()
				.collect(),
		);
	}
}

/// A [`Session`] whose user is an administrator.
///
/// Anyone else, signed in or not, is rejected with
/// [`auth::Error::PermissionDenied`] so the reason is not disclosed.
#[derive(Debug)]
pub struct Admin(pub Session);

#[axum::async_trait]
impl<S> FromRequestParts<S> for Admin
where
	Database: FromRef<S>,
	S: Sync + Send,
{
	type Rejection = RouteError<auth::Error>;

	async fn from_request_parts(
		parts: &mut request::Parts,
		state: &S,
	) -> Result<Self, Self::Rejection> {
		match Session::from_parts(parts, &Database::from_ref(state)).await {
			Ok(session) if session.user.is_admin => Ok(Self(session)),
			Ok(..) | Err(RouteError::Route(..)) => Err(auth::Error::PermissionDenied.into()),
			Err(error) => Err(error),
		}
	}
}

impl OperationInput for Admin {
	fn operation_input(ctx: &mut aide::gen::GenContext, operation: &mut aide::openapi::Operation) {
		Session::operation_input(ctx, operation);
	}
}
