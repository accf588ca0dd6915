//! Tag normalization and post/tag association.

use std::collections::BTreeSet;

use sqlx::PgConnection;
use uuid::Uuid;
use validator::ValidationError;

use crate::route::tag::model::Tag;

/// Longest accepted tag name, in characters.
pub const MAX_LEN: usize = 50;

/// Splits comma-separated input into distinct, trimmed, lowercase tag names.
pub fn parse(raw: &str) -> BTreeSet<String> {
	raw.split(',')
		.map(|name| name.trim().to_lowercase())
		.filter(|name| !name.is_empty())
		.collect()
}

/// Validates raw tag input for use with `#[validate(custom(..))]`.
pub fn validate(raw: &str) -> Result<(), ValidationError> {
	if parse(raw).iter().any(|name| name.chars().count() > MAX_LEN) {
		let mut error = ValidationError::new("tag_too_long");
		error.message = Some("tags must be at most 50 characters long".into());

		return Err(error);
	}

	Ok(())
}

/// Returns the tags named `names`, creating those that do not exist yet.
///
/// Concurrent creation of the same name is absorbed by the unique constraint
/// on `tag.name`; the row is then simply fetched.
pub async fn resolve(conn: &mut PgConnection, names: &BTreeSet<String>) -> Result<Vec<Tag>, sqlx::Error> {
	if names.is_empty() {
		return Ok(Vec::new());
	}

	let names = names.iter().cloned().collect::<Vec<_>>();

	sqlx::query(
		r"
			INSERT INTO tag (name)
			SELECT * FROM UNNEST($1::varchar[])
			ON CONFLICT (name) DO NOTHING
		",
	)
	.bind(&names)
	.execute(&mut *conn)
	.await?;

	sqlx::query_as::<_, Tag>("SELECT id, name FROM tag WHERE name = ANY($1) ORDER BY name")
		.bind(&names)
		.fetch_all(&mut *conn)
		.await
}

/// Replaces every tag of `post_id` with `tags`.
pub async fn replace_for_post(conn: &mut PgConnection, post_id: Uuid, tags: &[Tag]) -> Result<(), sqlx::Error> {
	sqlx::query("DELETE FROM post_tag WHERE post_id = $1")
		.bind(post_id)
		.execute(&mut *conn)
		.await?;

	if tags.is_empty() {
		return Ok(());
	}

	let ids = tags.iter().map(|tag| tag.id).collect::<Vec<_>>();

	sqlx::query(
		r"
			INSERT INTO post_tag (post_id, tag_id)
			SELECT $1::uuid, * FROM UNNEST($2::uuid[])
		",
	)
	.bind(post_id)
	.bind(&ids)
	.execute(&mut *conn)
	.await?;

	Ok(())
}
