use aide::axum::{routing::post_with, ApiRouter};
use axum::http::StatusCode;
use uuid::Uuid;

use crate::{
	error::{self, Message},
	AppState,
};

pub mod model;
pub mod route;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("comment not found")]
	UnknownComment(Uuid),
	#[error("you do not have permission to access this page")]
	PermissionDenied,
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
		.api_route("/comment/:id/edit", post_with(edit_comment, edit_comment_docs))
		.api_route(
			"/comment/:id/delete",
			post_with(delete_comment, delete_comment_docs),
		)
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::UnknownComment(..) => StatusCode::NOT_FOUND,
			Self::PermissionDenied => StatusCode::FORBIDDEN,
		}
	}

	fn into_errors(self) -> Vec<Message> {
		let content = self.to_string();

		match self {
			Self::UnknownComment(id) => Message::new(content)
				.detail("id", id.to_string())
				.into_vec(),
			Self::PermissionDenied => Message::new(content).into_vec(),
		}
	}
}
