use axum::extract::State;
use macros::route;

use crate::{error, extract::Json, mail, openapi::tag, AppState};

use super::{model, Error, RouteError};

/// Subscribe
/// Adds an email address to the newsletter and lets the administrator know.
#[route(tag = tag::NEWSLETTER)]
pub async fn subscribe(
	State(state): State<AppState>,
	Json(input): Json<model::SubscribeInput>,
) -> Result<Json<model::Subscriber>, RouteError> {
	let subscriber = sqlx::query_as::<_, model::Subscriber>(
		"INSERT INTO subscriber (email) VALUES ($1) RETURNING *",
	)
	.bind(&input.email)
	.fetch_one(&state.database)
	.await
	.map_err(|error| match error::unique_violation(&error) {
		Some("subscriber_email_key") => Error::AlreadySubscribed.into(),
		_ => RouteError::from(error),
	})?;

	tracing::info!(subscriber = %subscriber.id, "new subscriber");

	if let Some(admin_email) = &state.config.admin_email {
		let email = mail::new_subscriber(&state.config.blog_name, admin_email, &subscriber.email);

		if let Err(error) = state.mailer.send(email).await {
			tracing::warn!(%error, "could not notify the administrator of a new subscriber");
		}
	}

	Ok(Json(subscriber))
}
