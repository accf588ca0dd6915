//! Queries shared by the public, tag, feed and admin views of posts.

use std::collections::HashMap;

use sqlx::PgExecutor;
use uuid::Uuid;

use crate::route::{
	comment::model::{build_tree, Comment, CommentNode},
	model::{Page, Paginate},
	tag::model::Tag,
};

use super::model::{Post, PostWithTags};

/// Selects posts along with the username of their author.
macro_rules! post_select {
	() => {
		r#"SELECT post.*, "user".username AS author FROM post INNER JOIN "user" ON "user".id = post.user_id"#
	};
}

/// Selects comments along with the username of their author.
macro_rules! comment_select {
	() => {
		r#"SELECT comment.*, "user".username AS author FROM comment INNER JOIN "user" ON "user".id = comment.user_id"#
	};
}

pub(crate) use comment_select;
pub(crate) use post_select;

/// The condition a post must meet to be shown to readers.
macro_rules! published {
	() => {
		"post.status AND post.published_at IS NOT NULL"
	};
}

pub(crate) use published;

/// Loads the tags of every post in `posts`, keeping the order of `posts`.
pub async fn with_tags<'c>(
	executor: impl PgExecutor<'c>,
	posts: Vec<Post>,
) -> Result<Vec<PostWithTags>, sqlx::Error> {
	let ids = posts.iter().map(|post| post.id).collect::<Vec<_>>();

	let rows = sqlx::query_as::<_, (Uuid, Uuid, String)>(
		r"
			SELECT post_tag.post_id, tag.id, tag.name FROM post_tag
			INNER JOIN tag ON tag.id = post_tag.tag_id
			WHERE post_tag.post_id = ANY($1)
			ORDER BY tag.name
		",
	)
	.bind(&ids)
	.fetch_all(executor)
	.await?;

	let mut tags = HashMap::<Uuid, Vec<Tag>>::new();

	for (post_id, id, name) in rows {
		tags.entry(post_id).or_default().push(Tag { id, name });
	}

	Ok(posts
		.into_iter()
		.map(|post| PostWithTags {
			tags: tags.remove(&post.id).unwrap_or_default(),
			post,
		})
		.collect())
}

/// Loads the tags of every post in a page.
pub async fn with_tags_page<'c>(
	executor: impl PgExecutor<'c>,
	page: Page<Post>,
) -> Result<Page<PostWithTags>, sqlx::Error> {
	Ok(Page {
		items: with_tags(executor, page.items).await?,
		page: page.page,
		has_next: page.has_next,
	})
}

/// Returns a page of published posts, newest first.
pub async fn published_page(
	database: &crate::Database,
	paginate: &Paginate,
	size: i64,
) -> Result<Page<PostWithTags>, sqlx::Error> {
	let posts = sqlx::query_as::<_, Post>(concat!(
		post_select!(),
		" WHERE ",
		published!(),
		" ORDER BY post.published_at DESC, post.id LIMIT $1 OFFSET $2"
	))
	.bind(Paginate::limit(size))
	.bind(paginate.offset(size))
	.fetch_all(database)
	.await?;

	with_tags_page(database, Page::new(posts, paginate, size)).await
}

/// Finds a published post by its slug.
pub async fn published_by_slug<'c>(
	executor: impl PgExecutor<'c>,
	slug: &str,
) -> Result<Option<Post>, sqlx::Error> {
	sqlx::query_as::<_, Post>(concat!(
		post_select!(),
		" WHERE post.slug = $1 AND ",
		published!()
	))
	.bind(slug)
	.fetch_optional(executor)
	.await
}

/// Finds any post by id, published or not.
pub async fn by_id<'c>(executor: impl PgExecutor<'c>, id: Uuid) -> Result<Option<Post>, sqlx::Error> {
	sqlx::query_as::<_, Post>(concat!(post_select!(), " WHERE post.id = $1"))
		.bind(id)
		.fetch_optional(executor)
		.await
}

/// Returns a page of the top-level comments of a post, newest first, with
/// every reply below them, oldest first.
pub async fn comment_page(
	database: &crate::Database,
	post_id: Uuid,
	paginate: &Paginate,
	size: i64,
) -> Result<Page<CommentNode>, sqlx::Error> {
	let roots = sqlx::query_as::<_, Comment>(concat!(
		comment_select!(),
		" WHERE comment.post_id = $1 AND comment.parent_id IS NULL",
		" ORDER BY comment.created_at DESC, comment.id LIMIT $2 OFFSET $3"
	))
	.bind(post_id)
	.bind(Paginate::limit(size))
	.bind(paginate.offset(size))
	.fetch_all(database)
	.await?;

	let page = Page::new(roots, paginate, size);
	let root_ids = page.items.iter().map(|comment| comment.id).collect::<Vec<_>>();

	let replies = sqlx::query_as::<_, Comment>(concat!(
		r"
			WITH RECURSIVE thread (id) AS (
				SELECT id FROM comment WHERE parent_id = ANY($1)
				UNION ALL
				SELECT comment.id FROM comment INNER JOIN thread ON comment.parent_id = thread.id
			)
		",
		comment_select!(),
		" WHERE comment.id IN (SELECT id FROM thread) ORDER BY comment.created_at, comment.id"
	))
	.bind(&root_ids)
	.fetch_all(database)
	.await?;

	Ok(Page {
		items: build_tree(page.items, replies),
		page: page.page,
		has_next: page.has_next,
	})
}

/// Escapes the wildcards of a user-supplied search term and wraps it for a substring `ILIKE`.
pub fn like_pattern(term: &str) -> String {
	let escaped = term
		.replace('\\', r"\\")
		.replace('%', r"\%")
		.replace('_', r"\_");

	format!("%{escaped}%")
}
