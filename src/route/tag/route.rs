use axum::extract::State;
use macros::route;

use crate::{
	extract::{Json, Path, Query},
	openapi::tag,
	route::{
		model::{Page, Paginate},
		post::{
			model::Post,
			query::{self, post_select, published},
		},
	},
	AppState,
};

use super::{model, Error, RouteError};

/// Get tag
/// Returns a page of the published posts carrying a tag, newest first.
/// The name is matched case-insensitively.
#[route(tag = tag::TAG)]
pub async fn get_tag(
	State(state): State<AppState>,
	Path(model::NameInput { name }): Path<model::NameInput>,
	Query(paginate): Query<Paginate>,
) -> Result<Json<model::TagPage>, RouteError> {
	let name = name.trim().to_lowercase();

	let tag = sqlx::query_as::<_, model::Tag>("SELECT id, name FROM tag WHERE name = $1")
		.bind(&name)
		.fetch_optional(&state.database)
		.await?
		.ok_or(Error::UnknownTag(name))?;

	let size = state.config.pages.tag;
	let posts = sqlx::query_as::<_, Post>(concat!(
		post_select!(),
		" INNER JOIN post_tag ON post_tag.post_id = post.id",
		" WHERE post_tag.tag_id = $1 AND ",
		published!(),
		" ORDER BY post.published_at DESC, post.id LIMIT $2 OFFSET $3"
	))
	.bind(tag.id)
	.bind(Paginate::limit(size))
	.bind(paginate.offset(size))
	.fetch_all(&state.database)
	.await?;

	let posts = query::with_tags_page(&state.database, Page::new(posts, &paginate, size)).await?;

	Ok(Json(model::TagPage { tag, posts }))
}
