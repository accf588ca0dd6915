use aide::axum::{routing::post_with, ApiRouter};
use axum::http::StatusCode;

use crate::{
	error::{self, Message},
	AppState,
};

pub mod model;
pub mod route;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("you are already subscribed")]
	AlreadySubscribed,
}

pub type RouteError = error::RouteError<Error>;

impl From<Error> for RouteError {
	fn from(error: Error) -> Self {
		Self::Route(error)
	}
}

pub fn routes() -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new().api_route("/subscribe", post_with(subscribe, subscribe_docs))
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::AlreadySubscribed => StatusCode::CONFLICT,
		}
	}

	fn into_errors(self) -> Vec<Message> {
		Message::new(self.to_string()).field("email").into_vec()
	}
}
