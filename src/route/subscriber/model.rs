use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// An email address signed up for the newsletter. Not tied to an account.
#[derive(Debug, FromRow, Serialize, JsonSchema)]
pub struct Subscriber {
	pub id: Uuid,
	pub email: String,
	pub subscribed_at: DateTime<Utc>,
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct SubscribeInput {
	#[validate(email, length(max = 120))]
	pub email: String,
}
