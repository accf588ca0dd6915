use std::sync::Arc;

use aide::{axum::ApiRouter, openapi::OpenApi};
use axum::Extension;
use tower::ServiceBuilder;
use tower_governor::GovernorLayer;
use tower_http::{
	compression::CompressionLayer,
	request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
	trace::TraceLayer,
};

use crate::{gate, openapi, ratelimit, AppState};

pub mod admin;
pub mod auth;
pub mod comment;
pub mod docs;
pub mod feed;
pub mod health;
pub mod model;
pub mod post;
pub mod subscriber;
pub mod tag;

/// Puts every route of `router` behind `limiter`, if any.
pub fn limit(
	router: ApiRouter<AppState>,
	limiter: Option<&ratelimit::Limiter>,
) -> ApiRouter<AppState> {
	match limiter {
		Some(limiter) => router.layer(GovernorLayer {
			config: limiter.clone(),
		}),
		None => router,
	}
}

/// Builds the whole application.
///
/// `limits` is `None` when rate limiting is turned off. Limited routes need the
/// peer address, so the app must then be served with `ConnectInfo`.
pub fn app(state: AppState, limits: Option<&ratelimit::Limits>) -> axum::Router {
	let mut api = OpenApi::default();

	ApiRouter::new()
		.merge(auth::routes(limits))
		.merge(post::routes())
		.merge(tag::routes())
		.merge(comment::routes())
		.merge(admin::routes())
		.merge(subscriber::routes())
		.merge(feed::routes())
		.merge(health::routes())
		.merge(docs::routes())
		.finish_api_with(&mut api, openapi::docs)
		.layer(axum::middleware::from_fn_with_state(
			state.clone(),
			gate::unconfirmed,
		))
		.layer(
			ServiceBuilder::new()
				.layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
				.layer(TraceLayer::new_for_http())
				.layer(PropagateRequestIdLayer::x_request_id())
				.layer(CompressionLayer::new()),
		)
		.layer(Extension(Arc::new(api)))
		.with_state(state)
}
