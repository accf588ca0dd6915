use aide::axum::{routing::get_with, ApiRouter};
use axum::http::StatusCode;

use crate::{
	error::{self, Message},
	AppState,
};

pub mod model;
pub mod route;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("tag not found")]
	UnknownTag(String),
}

pub type RouteError = error::RouteError<Error>;

impl From<Error> for RouteError {
	fn from(error: Error) -> Self {
		Self::Route(error)
	}
}

pub fn routes() -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new().api_route("/tag/:name", get_with(get_tag, get_tag_docs))
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::UnknownTag(..) => StatusCode::NOT_FOUND,
		}
	}

	fn into_errors(self) -> Vec<Message> {
		let content = self.to_string();

		match self {
			Self::UnknownTag(name) => Message::new(content).detail("name", name).into_vec(),
		}
	}
}

#[cfg(test)]
mod test {
	use crate::test::*;

	#[sqlx::test]
	#[ignore = "needs a Postgres DATABASE_URL"]
	async fn test_tag_names_are_normalized(pool: Database) {
		let app = app(pool.clone());

		create_user(&pool, "admin", true, true).await;
		login(&app, "admin").await;

		create_post(&app, "Spring Collection", "Floral, floral , SPRING", true).await;

		let tags = sqlx::query_scalar::<_, String>("SELECT name FROM tag ORDER BY name")
			.fetch_all(&pool)
			.await
			.unwrap();

		assert_eq!(tags, vec!["floral".to_string(), "spring".to_string()]);

		let response = app.get("/tag/FLORAL").await;

		response.assert_status_ok();

		let body = response.json::<serde_json::Value>();

		assert_eq!(body["tag"]["name"], "floral");
		assert_eq!(body["posts"]["items"][0]["title"], "Spring Collection");
	}

	#[sqlx::test]
	#[ignore = "needs a Postgres DATABASE_URL"]
	async fn test_unknown_tag(pool: Database) {
		let app = app(pool);

		let response = app.get("/tag/oud").await;

		assert_eq!(response.status_code(), 404);
		assert_eq!(
			response.json::<serde_json::Value>()["errors"][0]["details"]["name"],
			"oud"
		);
	}
}
