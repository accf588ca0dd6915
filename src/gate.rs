//! Keeps signed-in users who have not confirmed their email away from the rest of the site.

use axum::{
	extract::{Request, State},
	middleware::Next,
	response::{IntoResponse, Redirect, Response},
};

use crate::{extract::Session, Database};

pub const UNCONFIRMED_PATH: &str = "/unconfirmed";

/// Paths an unconfirmed user may still reach.
pub fn is_exempt(path: &str) -> bool {
	matches!(
		path,
		"/logout" | UNCONFIRMED_PATH | "/confirm/resend" | "/healthz"
	) || path.starts_with("/confirm/")
		|| path.starts_with("/docs/")
}

/// Redirects signed-in, unconfirmed users to [`UNCONFIRMED_PATH`].
///
/// Anonymous requests and requests with an unknown session pass through
/// untouched; the routes themselves decide whether a session is required.
pub async fn unconfirmed(
	State(database): State<Database>,
	request: Request,
	next: Next,
) -> Response {
	if is_exempt(request.uri().path()) {
		return next.run(request).await;
	}

	let (parts, body) = request.into_parts();

	if let Ok(session) = Session::from_parts(&parts, &database).await {
		if !session.user.confirmed {
			tracing::debug!(user = %session.user.id, path = %parts.uri.path(), "unconfirmed user redirected");

			return Redirect::to(UNCONFIRMED_PATH).into_response();
		}
	}

	next.run(Request::from_parts(parts, body)).await
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_exempt_paths() {
		assert!(is_exempt("/logout"));
		assert!(is_exempt("/unconfirmed"));
		assert!(is_exempt("/confirm/resend"));
		assert!(is_exempt("/confirm/abc.def"));
		assert!(is_exempt("/healthz"));
		assert!(is_exempt("/docs/api.json"));
	}

	#[test]
	fn test_protected_paths() {
		assert!(!is_exempt("/"));
		assert!(!is_exempt("/post/spring-collection"));
		assert!(!is_exempt("/admin"));
		assert!(!is_exempt("/confirm"));
		assert!(!is_exempt("/logout/other"));
		assert!(!is_exempt("/me"));
	}
}
