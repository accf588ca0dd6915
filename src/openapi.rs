use aide::{
	openapi::{ApiKeyLocation, SecurityScheme, Tag},
	transform::TransformOpenApi,
};

use crate::{
	error::{ErrorResponse, Message},
	extract::Json,
	session,
};

pub const SECURITY_SCHEME_SESSION: &str = "Session";

pub mod tag {
	pub const AUTH: &str = "Auth";
	pub const POST: &str = "Post";
	pub const ADMIN: &str = "Admin";
	pub const COMMENT: &str = "Comment";
	pub const TAG: &str = "Tag";
	pub const NEWSLETTER: &str = "Newsletter";
}

fn tag(name: &str, description: &str) -> Tag {
	Tag {
		name: name.into(),
		description: Some(description.into()),
		..Default::default()
	}
}

pub fn docs(api: TransformOpenApi) -> TransformOpenApi {
	api.title("Blossom")
		.summary("A multi-user blogging platform")
		.description(include_str!("../README.md"))
		.tag(tag(tag::AUTH, "Accounts, sessions, confirmation and password resets"))
		.tag(tag(tag::POST, "Published posts, search and comment submission"))
		.tag(tag(tag::ADMIN, "Post management and user registration for administrators"))
		.tag(tag(tag::COMMENT, "Editing and deleting comments"))
		.tag(tag(tag::TAG, "Posts by tag"))
		.tag(tag(tag::NEWSLETTER, "Newsletter subscriptions"))
		.security_scheme(
			SECURITY_SCHEME_SESSION,
			SecurityScheme::ApiKey {
				location: ApiKeyLocation::Cookie,
				name: session::COOKIE_NAME.into(),
				description: Some("A user session cookie".into()),
				extensions: Default::default(),
			},
		)
		.default_response_with::<Json<ErrorResponse>, _>(|res| {
			res.example(ErrorResponse {
				errors: Message::new("error message")
					.field("optional field")
					.detail("key", "value")
					.into_vec(),
			})
		})
}
