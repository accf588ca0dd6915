use axum::extract::State;
use macros::route;
use uuid::Uuid;

use crate::{
	extract::{Json, Path, Session},
	openapi::tag,
	route::{
		model::{IdInput, Notice},
		post::query::comment_select,
	},
	Database,
};

use super::{model, Error, RouteError};

/// Loads a comment the session user may change: their own, or any if they are an administrator.
async fn owned_comment(
	database: &Database,
	session: &Session,
	id: Uuid,
) -> Result<model::Comment, RouteError> {
	let comment = sqlx::query_as::<_, model::Comment>(concat!(
		comment_select!(),
		" WHERE comment.id = $1"
	))
	.bind(id)
	.fetch_optional(database)
	.await?
	.ok_or(Error::UnknownComment(id))?;

	if comment.user_id != session.user.id && !session.user.is_admin {
		return Err(Error::PermissionDenied.into());
	}

	Ok(comment)
}

/// Edit comment
/// Changes the text of a comment. Only its author or an administrator may do so.
#[route(tag = tag::COMMENT)]
pub async fn edit_comment(
	State(database): State<Database>,
	session: Session,
	Path(IdInput { id }): Path<IdInput>,
	Json(input): Json<model::UpdateCommentInput>,
) -> Result<Json<model::Comment>, RouteError> {
	let comment = owned_comment(&database, &session, id).await?;

	let Some(body) = input.body else {
		return Ok(Json(comment));
	};

	let comment = sqlx::query_as::<_, model::Comment>(
		r"
			UPDATE comment SET body = $1 WHERE id = $2
			RETURNING *, $3::text AS author
		",
	)
	.bind(&body)
	.bind(id)
	.bind(&comment.author)
	.fetch_optional(&database)
	.await?
	.ok_or(Error::UnknownComment(id))?;

	tracing::info!(comment = %id, user = %session.user.id, "comment edited");

	Ok(Json(comment))
}

/// Delete comment
/// Deletes a comment along with every reply below it.
/// Only its author or an administrator may do so.
#[route(tag = tag::COMMENT, response(status = 200, description = "Comment deleted.", shape = "Json<Notice>"))]
pub async fn delete_comment(
	State(database): State<Database>,
	session: Session,
	Path(IdInput { id }): Path<IdInput>,
) -> Result<Json<Notice>, RouteError> {
	owned_comment(&database, &session, id).await?;

	let status = sqlx::query("DELETE FROM comment WHERE id = $1")
		.bind(id)
		.execute(&database)
		.await?;

	if status.rows_affected() == 0 {
		return Err(Error::UnknownComment(id).into());
	}

	tracing::info!(comment = %id, user = %session.user.id, "comment deleted");

	Ok(Json(Notice::new("the comment has been deleted")))
}
