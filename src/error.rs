use axum::{
	body::Body,
	extract::rejection,
	http::{Response, StatusCode},
	response::IntoResponse,
};
use schemars::JsonSchema;
use serde::Serialize;
use tower_governor::GovernorError;
use validator::{ValidationError, ValidationErrors};

use crate::mail;

pub type Map = serde_json::Map<String, serde_json::Value>;

/// A single error message sent to the client.
#[derive(Debug, Serialize, JsonSchema)]
pub struct Message {
	/// A human-readable description of the error.
	pub content: String,
	/// The input field that caused the error, if any.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub field: Option<String>,
	/// Additional structured information about the error.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<Map>,
}

impl Message {
	pub fn new(content: impl Into<String>) -> Self {
		Self {
			content: content.into(),
			field: None,
			details: None,
		}
	}

	#[must_use]
	pub fn field(mut self, field: impl Into<String>) -> Self {
		self.field = Some(field.into());
		self
	}

	#[must_use]
	pub fn detail(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
		self.details
			.get_or_insert_with(Map::new)
			.insert(key.into(), value.into());
		self
	}

	pub fn into_vec(self) -> Vec<Self> {
		vec![self]
	}
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ErrorResponse {
	pub errors: Vec<Message>,
}

/// Describes how a route-specific error is presented to the client.
pub trait ErrorShape {
	fn status(&self) -> StatusCode;
	fn into_errors(self) -> Vec<Message>;
}

/// Errors shared by every route.
///
/// The Display trait is not sent to the client, so it can show
/// sensitive information.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
	#[error("validation error: {0}")]
	Validation(#[from] ValidationErrors),
	#[error("json error: {0}")]
	Json(#[from] rejection::JsonRejection),
	#[error("query error: {0}")]
	Query(#[from] rejection::QueryRejection),
	#[error("path error: {0}")]
	Path(#[from] rejection::PathRejection),
	#[error("database error: {0}")]
	Database(#[from] sqlx::Error),
	#[error("rate limit error: {0}")]
	RateLimit(#[from] GovernorError),
	#[error("mail error: {0}")]
	Mail(#[from] mail::Error),
}

impl AppError {
	/// Builds a validation error for a single field.
	pub fn field(field: &'static str, code: &'static str, message: &'static str) -> Self {
		let mut error = ValidationError::new(code);
		error.message = Some(message.into());

		let mut errors = ValidationErrors::new();
		errors.add(field, error);

		Self::Validation(errors)
	}
}

impl ErrorShape for AppError {
	fn status(&self) -> StatusCode {
		match self {
			Self::Validation(..) | Self::Json(..) | Self::Query(..) | Self::Path(..) => {
				StatusCode::BAD_REQUEST
			}
			Self::RateLimit(GovernorError::TooManyRequests { .. }) => StatusCode::TOO_MANY_REQUESTS,
			Self::Mail(..) => StatusCode::BAD_GATEWAY,
			Self::Database(sqlx::Error::RowNotFound) => StatusCode::NOT_FOUND,
			Self::Database(..) | Self::RateLimit(..) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	fn into_errors(self) -> Vec<Message> {
		match self {
			Self::Validation(errors) => errors
				.field_errors()
				.into_iter()
				.flat_map(|(field, errors)| {
					errors.iter().map(move |error| {
						let content = error
							.message
							.as_ref()
							.map_or_else(|| error.code.to_string(), ToString::to_string);

						Message::new(content).field(field.to_string())
					})
				})
				.collect(),
			Self::Json(error) => Message::new(error.body_text()).into_vec(),
			Self::Query(error) => Message::new(error.body_text()).into_vec(),
			Self::Path(error) => Message::new(error.body_text()).into_vec(),
			Self::RateLimit(GovernorError::TooManyRequests { wait_time, .. }) => {
				Message::new("too many requests, please slow down")
					.detail("retry_after", wait_time)
					.into_vec()
			}
			Self::Mail(error) => {
				tracing::error!(%error, "failed to send email");

				Message::new("could not send email, please try again later").into_vec()
			}
			Self::Database(sqlx::Error::RowNotFound) => Message::new("not found").into_vec(),
			Self::Database(error) => {
				tracing::error!(%error, "database error");

				Message::new("something went wrong, please try again").into_vec()
			}
			Self::RateLimit(error) => {
				tracing::error!(%error, "rate limiter error");

				Message::new("something went wrong, please try again").into_vec()
			}
		}
	}
}

impl IntoResponse for AppError {
	fn into_response(self) -> Response<Body> {
		let status = self.status();

		(
			status,
			axum::Json(ErrorResponse {
				errors: self.into_errors(),
			}),
		)
			.into_response()
	}
}

/// An error returned from a route, either shared or specific to the route module.
#[derive(Debug)]
pub enum RouteError<T> {
	App(AppError),
	Route(T),
}

impl<T> From<AppError> for RouteError<T> {
	fn from(error: AppError) -> Self {
		Self::App(error)
	}
}

impl<T> From<sqlx::Error> for RouteError<T> {
	fn from(error: sqlx::Error) -> Self {
		Self::App(AppError::Database(error))
	}
}

impl<T> From<ValidationErrors> for RouteError<T> {
	fn from(error: ValidationErrors) -> Self {
		Self::App(AppError::Validation(error))
	}
}

impl<T> From<mail::Error> for RouteError<T> {
	fn from(error: mail::Error) -> Self {
		Self::App(AppError::Mail(error))
	}
}

impl<T> IntoResponse for RouteError<T>
where
	T: ErrorShape,
{
	fn into_response(self) -> Response<Body> {
		match self {
			Self::App(error) => error.into_response(),
			Self::Route(error) => (
				error.status(),
				axum::Json(ErrorResponse {
					errors: error.into_errors(),
				}),
			)
				.into_response(),
		}
	}
}

impl<T> aide::OperationOutput for RouteError<T> {
	type Inner = Self;
}

/// Returns the name of the unique constraint violated by `error`, if any.
pub fn unique_violation(error: &sqlx::Error) -> Option<&str> {
	match error {
		sqlx::Error::Database(e) if e.is_unique_violation() => e.constraint(),
		_ => None,
	}
}
