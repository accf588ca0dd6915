use cookie::{Cookie, CookieBuilder};
use uuid::Uuid;

use crate::config;

pub const COOKIE_NAME: &str = "session";

fn builder<'a>(value: String, config: &config::Cookies) -> CookieBuilder<'a> {
	Cookie::build((COOKIE_NAME, value))
		.secure(config.secure)
		.http_only(config.http_only)
		.same_site(config.same_site)
		.path("/")
}

/// Creates a session cookie with no expiry
pub fn create_cookie(session_id: Uuid, config: &config::Cookies) -> Cookie<'static> {
	builder(session_id.to_string(), config).into()
}

/// Creates an empty session cookie used to invalidate a previous one
pub fn clear_cookie(config: &config::Cookies) -> Cookie<'static> {
	builder(String::new(), config)
		.max_age(cookie::time::Duration::ZERO)
		.into()
}

/// Finds the session id among the `Cookie` header values of a request.
pub fn find<'a, I>(headers: I) -> Option<Result<Uuid, uuid::Error>>
where
	I: IntoIterator<Item = &'a str>,
{
	headers
		.into_iter()
		.flat_map(Cookie::split_parse)
		.filter_map(Result::ok)
		.find(|cookie| cookie.name() == COOKIE_NAME)
		.map(|cookie| Uuid::parse_str(cookie.value()))
}
