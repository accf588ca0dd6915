use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::{
	publish::Publication,
	route::{comment::model::CommentNode, model::Page, tag::model::{PopularTag, Tag}},
};

#[inline]
fn one() -> i64 {
	1
}

/// A single post, written by an administrator.
#[derive(Debug, Clone, FromRow, Serialize, JsonSchema)]
pub struct Post {
	/// The unique identifier of the post.
	pub id: Uuid,
	/// The user that wrote the post.
	pub user_id: Uuid,
	/// The username of the user that wrote the post.
	pub author: String,
	pub title: String,
	/// The unique, URL-safe name of the post, derived from its title.
	pub slug: String,
	pub body: String,
	/// The hosted featured image, if any.
	pub image_url: Option<String>,
	#[serde(skip)]
	pub image_public_id: Option<String>,
	/// Whether the post is published.
	pub status: bool,
	/// When the post was first published. Kept when the post is unpublished.
	pub published_at: Option<DateTime<Utc>>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl Post {
	pub fn publication(&self) -> Publication {
		Publication {
			status: self.status,
			published_at: self.published_at,
		}
	}
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct PostWithTags {
	#[serde(flatten)]
	pub post: Post,
	pub tags: Vec<Tag>,
}

/// A post with a page of its top-level comments, newest first, and all of their replies.
#[derive(Serialize, JsonSchema)]
pub struct PostView {
	pub post: PostWithTags,
	pub comments: Page<CommentNode>,
}

#[derive(Deserialize, JsonSchema)]
pub struct SlugInput {
	pub slug: String,
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct SearchInput {
	/// Matched case-insensitively against the title and body of published posts.
	#[serde(default)]
	#[validate(length(max = 200))]
	pub q: String,
	/// The page number to return (1-indexed).
	#[validate(range(min = 1, max = 10000))]
	#[serde(default = "one")]
	pub page: i64,
}

#[derive(Serialize, JsonSchema)]
pub struct SearchResults {
	pub query: String,
	/// Set when the query is empty.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub notice: Option<String>,
	pub posts: Page<PostWithTags>,
}

#[derive(Serialize, JsonSchema)]
pub struct Sidebar {
	pub recent_posts: Vec<Post>,
	pub popular_tags: Vec<PopularTag>,
}
