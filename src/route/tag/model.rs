use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::route::{model::Page, post::model::PostWithTags};

/// A lowercase label shared by any number of posts.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, JsonSchema)]
pub struct Tag {
	pub id: Uuid,
	pub name: String,
}

/// A tag with the number of published posts carrying it.
#[derive(Debug, FromRow, Serialize, JsonSchema)]
pub struct PopularTag {
	pub name: String,
	pub posts: i64,
}

#[derive(Deserialize, JsonSchema)]
pub struct NameInput {
	/// Matched case-insensitively.
	pub name: String,
}

#[derive(Serialize, JsonSchema)]
pub struct TagPage {
	pub tag: Tag,
	pub posts: Page<PostWithTags>,
}
