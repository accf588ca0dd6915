use axum::extract::State;
use macros::route;

use crate::{
	extract::{Json, Path, Query, Session},
	openapi::tag,
	route::{
		comment::model::{check_parent, Comment, CreateCommentInput},
		model::{Page, Paginate},
	},
	AppState, Database,
};

use super::{
	model,
	query::{self, post_select, published},
	Error, RouteError,
};

/// List posts
/// Returns a page of published posts, newest first.
#[route(tag = tag::POST)]
pub async fn index(
	State(state): State<AppState>,
	Query(paginate): Query<Paginate>,
) -> Result<Json<Page<model::PostWithTags>>, RouteError> {
	let page = query::published_page(&state.database, &paginate, state.config.pages.posts).await?;

	Ok(Json(page))
}

/// Get post
/// Returns a published post by its slug, with a page of its comment threads.
#[route(tag = tag::POST)]
pub async fn get_post(
	State(state): State<AppState>,
	Path(model::SlugInput { slug }): Path<model::SlugInput>,
	Query(paginate): Query<Paginate>,
) -> Result<Json<model::PostView>, RouteError> {
	let post = query::published_by_slug(&state.database, &slug)
		.await?
		.ok_or(Error::UnknownPost(slug))?;

	let comments =
		query::comment_page(&state.database, post.id, &paginate, state.config.pages.comments)
			.await?;

	let post = query::with_tags(&state.database, vec![post])
		.await?
		.pop()
		.ok_or(sqlx::Error::RowNotFound)?;

	Ok(Json(model::PostView { post, comments }))
}

/// Submit comment
/// Comments on a published post, or replies to one of its comments.
#[route(tag = tag::POST)]
pub async fn submit_comment(
	State(database): State<Database>,
	session: Session,
	Path(model::SlugInput { slug }): Path<model::SlugInput>,
	Json(input): Json<CreateCommentInput>,
) -> Result<Json<Comment>, RouteError> {
	let mut tx = database.begin().await?;

	let post = query::published_by_slug(&mut *tx, &slug)
		.await?
		.ok_or(Error::UnknownPost(slug))?;

	if let Some(parent_id) = input.parent_id {
		let parent_post = sqlx::query_scalar::<_, uuid::Uuid>("SELECT post_id FROM comment WHERE id = $1")
			.bind(parent_id)
			.fetch_optional(&mut *tx)
			.await?;

		check_parent(parent_post, post.id)?;
	}

	let comment = sqlx::query_as::<_, Comment>(
		r"
			INSERT INTO comment (post_id, user_id, parent_id, body)
			VALUES ($1, $2, $3, $4)
			RETURNING *, $5::text AS author
		",
	)
	.bind(post.id)
	.bind(session.user.id)
	.bind(input.parent_id)
	.bind(&input.body)
	.bind(&session.user.username)
	.fetch_one(&mut *tx)
	.await?;

	tx.commit().await?;

	tracing::info!(comment = %comment.id, post = %post.id, "comment published");

	Ok(Json(comment))
}

/// Search posts
/// Matches published posts whose title or body contains the query, ignoring case.
#[route(tag = tag::POST)]
pub async fn search(
	State(state): State<AppState>,
	Query(input): Query<model::SearchInput>,
) -> Result<Json<model::SearchResults>, RouteError> {
	let paginate = Paginate { page: input.page };
	let term = input.q.trim();

	if term.is_empty() {
		return Ok(Json(model::SearchResults {
			query: input.q,
			notice: Some("please enter a search term".into()),
			posts: Page::empty(&paginate),
		}));
	}

	let size = state.config.pages.search;
	let posts = sqlx::query_as::<_, model::Post>(concat!(
		post_select!(),
		" WHERE ",
		published!(),
		" AND (post.title ILIKE $1 OR post.body ILIKE $1)",
		" ORDER BY post.published_at DESC, post.id LIMIT $2 OFFSET $3"
	))
	.bind(query::like_pattern(term))
	.bind(Paginate::limit(size))
	.bind(paginate.offset(size))
	.fetch_all(&state.database)
	.await?;

	let posts = query::with_tags_page(&state.database, Page::new(posts, &paginate, size)).await?;

	Ok(Json(model::SearchResults {
		query: term.to_string(),
		notice: None,
		posts,
	}))
}

/// Get sidebar
/// Returns the most recent published posts and the tags used by the most published posts.
#[route(tag = tag::POST)]
pub async fn sidebar(State(state): State<AppState>) -> Result<Json<model::Sidebar>, RouteError> {
	let recent_posts = sqlx::query_as::<_, model::Post>(concat!(
		post_select!(),
		" WHERE ",
		published!(),
		" ORDER BY post.published_at DESC, post.id LIMIT $1"
	))
	.bind(state.config.pages.sidebar_recent_posts)
	.fetch_all(&state.database)
	.await?;

	let popular_tags = sqlx::query_as::<_, crate::route::tag::model::PopularTag>(concat!(
		r"
			SELECT tag.name, COUNT(*) AS posts FROM tag
			INNER JOIN post_tag ON post_tag.tag_id = tag.id
			INNER JOIN post ON post.id = post_tag.post_id
			WHERE ",
		published!(),
		" GROUP BY tag.id, tag.name ORDER BY posts DESC, tag.name LIMIT $1"
	))
	.bind(state.config.pages.sidebar_popular_tags)
	.fetch_all(&state.database)
	.await?;

	Ok(Json(model::Sidebar {
		recent_posts,
		popular_tags,
	}))
}
