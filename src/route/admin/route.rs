use axum::extract::State;
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::Utc;
use macros::route;
use sqlx::PgConnection;

use crate::{
	error::{self, AppError},
	extract::{Admin, Json, Path, Query},
	image::{self, HostedImage, ImageHost},
	openapi::tag,
	password,
	publish::Publication,
	route::{
		auth,
		model::{IdInput, Notice, Page, Paginate},
		post::{
			model::{Post, PostWithTags},
			query::{self, post_select},
		},
	},
	slug, AppState,
};

use super::{model, Error, RouteError};

const UPLOAD_FAILED: &str = "the image could not be uploaded, the post was saved without it";
const DESTROY_FAILED: &str = "the previous image could not be removed from the image host";

/// Checks an image sent with a post and decodes it.
fn decode_image(input: &model::ImageInput) -> Result<image::Upload, AppError> {
	if image::allowed_extension(&input.filename).is_none() {
		return Err(AppError::field(
			"image",
			"image_type",
			"only jpg, jpeg, png and gif images are allowed",
		));
	}

	let bytes = STANDARD.decode(&input.content_base64).map_err(|_| {
		AppError::field("image", "image_encoding", "the image must be base64 encoded")
	})?;

	if bytes.len() > image::MAX_SIZE {
		return Err(AppError::field(
			"image",
			"image_size",
			"images must be at most 5 MiB",
		));
	}

	Ok(image::Upload {
		filename: input.filename.clone(),
		bytes,
	})
}

/// Uploads `upload` if there is one. A failure is turned into a warning.
async fn upload_image(
	images: &dyn ImageHost,
	upload: Option<image::Upload>,
	warnings: &mut Vec<String>,
) -> Option<HostedImage> {
	match images.upload(upload?).await {
		Ok(hosted) => Some(hosted),
		Err(error) => {
			tracing::warn!(%error, "image upload failed");
			warnings.push(UPLOAD_FAILED.into());

			None
		}
	}
}

/// Deletes an image that is no longer used. A failure is turned into a warning.
async fn destroy_image(images: &dyn ImageHost, public_id: &str, warnings: &mut Vec<String>) {
	if let Err(error) = images.destroy(public_id).await {
		tracing::warn!(%error, public_id, "image removal failed");
		warnings.push(DESTROY_FAILED.into());
	}
}

fn map_unique(error: sqlx::Error) -> RouteError {
	match error::unique_violation(&error) {
		Some("post_slug_key") => Error::SlugTaken.into(),
		_ => error.into(),
	}
}

/// Replaces the tags of a post with those named in `raw`, then loads them with the post.
async fn save_tags(
	conn: &mut PgConnection,
	post: Post,
	raw: &str,
) -> Result<PostWithTags, sqlx::Error> {
	let tags = crate::tag::resolve(conn, &crate::tag::parse(raw)).await?;

	crate::tag::replace_for_post(conn, post.id, &tags).await?;

	Ok(PostWithTags { post, tags })
}

/// List all posts
/// Returns a page of every post, drafts included, newest first.
#[route(tag = tag::ADMIN)]
pub async fn index(
	State(state): State<AppState>,
	_admin: Admin,
	Query(paginate): Query<Paginate>,
) -> Result<Json<Page<PostWithTags>>, RouteError> {
	let size = state.config.pages.admin;
	let posts = sqlx::query_as::<_, Post>(concat!(
		post_select!(),
		" ORDER BY post.created_at DESC, post.id LIMIT $1 OFFSET $2"
	))
	.bind(Paginate::limit(size))
	.bind(paginate.offset(size))
	.fetch_all(&state.database)
	.await?;

	let page = query::with_tags_page(&state.database, Page::new(posts, &paginate, size)).await?;

	Ok(Json(page))
}

/// Get post
/// Returns any post by id, drafts included.
#[route(tag = tag::ADMIN)]
pub async fn get_post(
	State(state): State<AppState>,
	_admin: Admin,
	Path(IdInput { id }): Path<IdInput>,
) -> Result<Json<PostWithTags>, RouteError> {
	let post = query::by_id(&state.database, id)
		.await?
		.ok_or(Error::UnknownPost(id))?;

	let post = query::with_tags(&state.database, vec![post])
		.await?
		.pop()
		.ok_or(Error::UnknownPost(id))?;

	Ok(Json(post))
}

/// Create post
/// Creates a post with a unique slug derived from its title.
/// An image that cannot be uploaded is left out and reported in `warnings`.
#[route(tag = tag::ADMIN)]
pub async fn create_post(
	State(state): State<AppState>,
	Admin(session): Admin,
	Json(input): Json<model::CreatePostInput>,
) -> Result<Json<model::Saved<PostWithTags>>, RouteError> {
	let upload = input.image.as_ref().map(decode_image).transpose()?;

	let mut warnings = Vec::new();
	let hosted = upload_image(state.images.as_ref(), upload, &mut warnings).await;

	let result = async {
		let mut tx = state.database.begin().await?;

		let slug = slug::generate_unique_slug(&mut tx, &input.title, None).await?;
		let publication = Publication::DRAFT.transition(input.publish, Utc::now());

		let post = sqlx::query_as::<_, Post>(
			r"
				INSERT INTO post (user_id, title, slug, body, image_url, image_public_id, status, published_at)
				VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
				RETURNING *, $9::text AS author
			",
		)
		.bind(session.user.id)
		.bind(&input.title)
		.bind(&slug)
		.bind(&input.body)
		.bind(hosted.as_ref().map(|image| &image.url))
		.bind(hosted.as_ref().map(|image| &image.public_id))
		.bind(publication.status)
		.bind(publication.published_at)
		.bind(&session.user.username)
		.fetch_one(&mut *tx)
		.await
		.map_err(map_unique)?;

		let post = save_tags(&mut tx, post, &input.tags).await?;

		tx.commit().await?;

		Ok::<_, RouteError>(post)
	}
	.await;

	let post = match result {
		Ok(post) => post,
		Err(error) => {
			if let Some(hosted) = hosted {
				destroy_image(state.images.as_ref(), &hosted.public_id, &mut warnings).await;
			}

			return Err(error);
		}
	};

	tracing::info!(post = %post.post.id, slug = %post.post.slug, "post created");

	Ok(Json(model::Saved {
		value: post,
		warnings,
	}))
}

/// Edit post
/// Updates a post. The slug is regenerated only when the title changes.
/// Tags are replaced, and unpublishing keeps the first publication date.
#[route(tag = tag::ADMIN)]
pub async fn edit_post(
	State(state): State<AppState>,
	_admin: Admin,
	Path(IdInput { id }): Path<IdInput>,
	Json(input): Json<model::EditPostInput>,
) -> Result<Json<model::Saved<PostWithTags>>, RouteError> {
	let upload = input.image.as_ref().map(decode_image).transpose()?;

	let current = query::by_id(&state.database, id)
		.await?
		.ok_or(Error::UnknownPost(id))?;

	let mut warnings = Vec::new();
	let hosted = upload_image(state.images.as_ref(), upload, &mut warnings).await;

	// The image to show after the edit, and the one to remove from the host once saved.
	let (image_url, image_public_id, replaced) = match &hosted {
		Some(hosted) => (
			Some(hosted.url.clone()),
			Some(hosted.public_id.clone()),
			current.image_public_id.clone(),
		),
		None if input.remove_image && input.image.is_none() => {
			(None, None, current.image_public_id.clone())
		}
		None => (
			current.image_url.clone(),
			current.image_public_id.clone(),
			None,
		),
	};

	let result = async {
		let mut tx = state.database.begin().await?;

		let slug = if input.title == current.title {
			current.slug.clone()
		} else {
			slug::generate_unique_slug(&mut tx, &input.title, Some(id)).await?
		};

		let publication = current
			.publication()
			.transition(input.publish, Utc::now());

		let post = sqlx::query_as::<_, Post>(
			r"
				UPDATE post SET
					title = $2, slug = $3, body = $4, image_url = $5, image_public_id = $6,
					status = $7, published_at = $8, updated_at = now()
				WHERE id = $1
				RETURNING *, $9::text AS author
			",
		)
		.bind(id)
		.bind(&input.title)
		.bind(&slug)
		.bind(&input.body)
		.bind(&image_url)
		.bind(&image_public_id)
		.bind(publication.status)
		.bind(publication.published_at)
		.bind(&current.author)
		.fetch_optional(&mut *tx)
		.await
		.map_err(map_unique)?
		.ok_or(Error::UnknownPost(id))?;

		let post = save_tags(&mut tx, post, &input.tags).await?;

		tx.commit().await?;

		Ok::<_, RouteError>(post)
	}
	.await;

	let post = match result {
		Ok(post) => post,
		Err(error) => {
			if let Some(hosted) = hosted {
				destroy_image(state.images.as_ref(), &hosted.public_id, &mut warnings).await;
			}

			return Err(error);
		}
	};

	if let Some(public_id) = replaced {
		destroy_image(state.images.as_ref(), &public_id, &mut warnings).await;
	}

	tracing::info!(post = %id, slug = %post.post.slug, "post updated");

	Ok(Json(model::Saved {
		value: post,
		warnings,
	}))
}

/// Delete post
/// Deletes a post along with its comments and tag associations.
/// Its tags are kept, and its image is removed from the host.
#[route(tag = tag::ADMIN, response(status = 200, description = "Post deleted.", shape = "Json<model::Saved<Notice>>"))]
pub async fn delete_post(
	State(state): State<AppState>,
	_admin: Admin,
	Path(IdInput { id }): Path<IdInput>,
) -> Result<Json<model::Saved<Notice>>, RouteError> {
	let image = sqlx::query_scalar::<_, Option<String>>(
		"DELETE FROM post WHERE id = $1 RETURNING image_public_id",
	)
	.bind(id)
	.fetch_optional(&state.database)
	.await?
	.ok_or(Error::UnknownPost(id))?;

	let mut warnings = Vec::new();

	if let Some(public_id) = image {
		destroy_image(state.images.as_ref(), &public_id, &mut warnings).await;
	}

	tracing::info!(post = %id, "post deleted");

	Ok(Json(model::Saved {
		value: Notice::new("the post has been deleted"),
		warnings,
	}))
}

/// Register user
/// Creates a confirmed, non-administrator account. No email is sent.
#[route(tag = tag::ADMIN)]
pub async fn register(
	State(state): State<AppState>,
	Admin(session): Admin,
	Json(input): Json<auth::model::SignupInput>,
) -> Result<Json<auth::model::User>, auth::RouteError> {
	let hash = password::hash(&state.hasher, &input.password).map_err(auth::Error::Hash)?;

	let mut conn = state.database.acquire().await?;
	let user = auth::route::insert_user(&mut conn, &input, &hash, true).await?;

	tracing::info!(user = %user.id, admin = %session.user.id, "user registered by an administrator");

	Ok(Json(user))
}
