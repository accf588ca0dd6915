use aide::axum::{routing::get_with, ApiRouter};
use axum::http::StatusCode;

use crate::{
	error::{self, Message},
	AppState,
};

pub mod model;
pub mod query;
pub mod route;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("post not found")]
	UnknownPost(String),
}

pub type RouteError = error::RouteError<Error>;

impl From<Error> for RouteError {
	fn from(error: Error) -> Self {
		Self::Route(error)
	}
}

pub fn routes() -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new()
		.api_route("/", get_with(index, index_docs))
		.api_route(
			"/post/:slug",
			get_with(get_post, get_post_docs).post_with(submit_comment, submit_comment_docs),
		)
		.api_route("/search", get_with(search, search_docs))
		.api_route("/sidebar", get_with(sidebar, sidebar_docs))
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::UnknownPost(..) => StatusCode::NOT_FOUND,
		}
	}

	fn into_errors(self) -> Vec<Message> {
		let content = self.to_string();

		match self {
			Self::UnknownPost(slug) => Message::new(content).detail("slug", slug).into_vec(),
		}
	}
}
