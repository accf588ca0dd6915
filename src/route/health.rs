use aide::axum::{routing::get_with, ApiRouter};
use macros::route;
use schemars::JsonSchema;
use serde::Serialize;

use crate::{extract::Json, AppState};

#[derive(Serialize, JsonSchema)]
pub struct Health {
	pub status: &'static str,
}

pub fn routes() -> ApiRouter<AppState> {
	ApiRouter::new().api_route("/healthz", get_with(healthz, healthz_docs))
}

/// Health check
/// Answers as long as the server is running. Never rate limited.
#[route]
pub async fn healthz() -> Json<Health> {
	Json(Health { status: "ok" })
}
