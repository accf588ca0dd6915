use std::sync::Arc;

use aide::{
	axum::{routing::get, ApiRouter, IntoApiResponse},
	openapi::OpenApi,
};
use axum::{response::IntoResponse, Extension};

use crate::{extract::Json, AppState};

pub fn routes() -> ApiRouter<AppState> {
	ApiRouter::new().route("/docs/api.json", get(serve_docs))
}

async fn serve_docs(Extension(api): Extension<Arc<OpenApi>>) -> impl IntoApiResponse {
	Json(api.as_ref()).into_response()
}

#[cfg(test)]
mod test {
	use crate::test::*;

	#[tokio::test]
	async fn test_docs() {
		let app = app(lazy_database());

		let response = app.get("/docs/api.json").await;

		response.assert_status_ok();

		let api = response.json::<serde_json::Value>();

		let paths = api["paths"].as_object().unwrap();

		assert_eq!(api["info"]["title"], "Blossom");
		assert!(paths.contains_key("/login"));
		assert!(paths.contains_key("/subscribe"));
		assert!(paths.keys().any(|path| path.starts_with("/admin/post/")));
		assert!(api["components"]["securitySchemes"]["Session"].is_object());
		// XML routes are not part of the JSON API.
		assert!(!paths.contains_key("/feed.xml"));
	}
}
