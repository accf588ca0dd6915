use std::collections::HashMap;

use chrono::{DateTime, Utc};
use macros::model;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;

/// A comment on a post, possibly replying to another comment of the same post.
#[model]
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, Validate, FromRow)]
pub struct Comment {
	/// The unique identifier of the comment.
	#[serde(skip_deserializing)]
	pub id: Uuid,
	/// The post the comment belongs to.
	#[serde(skip_deserializing)]
	pub post_id: Uuid,
	/// The user who wrote the comment.
	#[serde(skip_deserializing)]
	pub user_id: Uuid,
	/// The username of the user who wrote the comment.
	#[serde(skip_deserializing)]
	pub author: String,
	/// The comment this one replies to. It must belong to the same post.
	#[model(create_only)]
	pub parent_id: Option<Uuid>,
	/// The text of the comment.
	#[validate(
		length(min = 1, max = 500),
		custom(function = "crate::route::model::not_blank")
	)]
	pub body: String,
	/// The creation time of the comment.
	#[serde(skip_deserializing)]
	pub created_at: DateTime<Utc>,
}

/// A comment with its replies, nested to any depth.
#[derive(Debug, Serialize, JsonSchema)]
pub struct CommentNode {
	#[serde(flatten)]
	pub comment: Comment,
	pub replies: Vec<CommentNode>,
}

/// Nests `replies` under `roots`, keeping the order of both.
///
/// Replies whose parent is neither a root nor another reply are dropped.
pub fn build_tree(roots: Vec<Comment>, replies: Vec<Comment>) -> Vec<CommentNode> {
	let mut children = HashMap::<Uuid, Vec<Comment>>::new();

	for reply in replies {
		if let Some(parent_id) = reply.parent_id {
			children.entry(parent_id).or_default().push(reply);
		}
	}

	roots
		.into_iter()
		.map(|root| attach(root, &mut children))
		.collect()
}

fn attach(comment: Comment, children: &mut HashMap<Uuid, Vec<Comment>>) -> CommentNode {
	let replies = children
		.remove(&comment.id)
		.unwrap_or_default()
		.into_iter()
		.map(|reply| attach(reply, children))
		.collect();

	CommentNode { comment, replies }
}

/// Checks that a reply's parent exists and belongs to `post_id`.
///
/// `parent_post` is the post of the parent comment, or `None` if there is no such comment.
pub fn check_parent(parent_post: Option<Uuid>, post_id: Uuid) -> Result<(), AppError> {
	match parent_post {
		Some(parent_post) if parent_post == post_id => Ok(()),
		Some(..) => Err(AppError::field(
			"parent_id",
			"parent_post",
			"you can only reply to comments on the same post",
		)),
		None => Err(AppError::field(
			"parent_id",
			"parent_missing",
			"the comment you are replying to does not exist",
		)),
	}
}
