use aide::axum::{
	routing::{get_with, post_with},
	ApiRouter,
};
use axum::http::StatusCode;
use uuid::Uuid;

use crate::{
	error::{self, Message},
	AppState,
};

pub mod model;
pub mod route;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("post not found")]
	UnknownPost(Uuid),
	#[error("a post with the same address was just created, please try again")]
	SlugTaken,
}

pub type RouteError = error::RouteError<Error>;

impl From<Error> for RouteError {
	fn from(error: Error) -> Self {
		Self::Route(error)
	}
}

pub fn routes() -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new()
		.api_route("/admin", get_with(index, index_docs))
		.api_route("/admin/post/new", post_with(create_post, create_post_docs))
		.api_route("/admin/post/:id", get_with(get_post, get_post_docs))
		.api_route("/admin/post/:id/edit", post_with(edit_post, edit_post_docs))
		.api_route(
			"/admin/post/:id/delete",
			post_with(delete_post, delete_post_docs),
		)
		.api_route("/admin/register", post_with(register, register_docs))
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::UnknownPost(..) => StatusCode::NOT_FOUND,
			Self::SlugTaken => StatusCode::CONFLICT,
		}
	}

	fn into_errors(self) -> Vec<Message> {
		let content = self.to_string();

		match self {
			Self::UnknownPost(id) => Message::new(content)
				.detail("id", id.to_string())
				.into_vec(),
			Self::SlugTaken => Message::new(content).field("title").into_vec(),
		}
	}
}

#[cfg(test)]
mod test {
	use crate::test::*;

	#[tokio::test]
	async fn test_requires_session() {
		let app = app(lazy_database());

		let response = app.get("/admin").await;

		assert_eq!(response.status_code(), 403);
		assert_eq!(
			response.json::<serde_json::Value>()["errors"][0]["content"],
			"you do not have permission to access this page"
		);
	}

	#[sqlx::test]
	#[ignore = "needs a Postgres DATABASE_URL"]
	async fn test_requires_admin(pool: Database) {
		let app = app(pool.clone());

		create_user(&pool, "alice", false, true).await;
		login(&app, "alice").await;

		app.get("/admin").await.assert_status_forbidden();

		let response = app
			.post("/admin/post/new")
			.json(&json!({ "title": "Spring Collection", "body": "Rose" }))
			.await;

		assert_eq!(response.status_code(), 403);
	}

	#[sqlx::test]
	#[ignore = "needs a Postgres DATABASE_URL"]
	async fn test_slugs_and_tags(pool: Database) {
		let app = app(pool.clone());

		create_user(&pool, "admin", true, true).await;
		login(&app, "admin").await;

		let first = create_post(&app, "Spring Collection", "Floral, floral , SPRING", true).await;
		let second = create_post(&app, "Spring Collection", "floral, spring", true).await;
		let third = create_post(&app, "Spring Collection!", "", true).await;

		assert_eq!(first["slug"], "spring-collection");
		assert_eq!(second["slug"], "spring-collection-1");
		assert_eq!(third["slug"], "spring-collection-2");

		let names = first["tags"]
			.as_array()
			.unwrap()
			.iter()
			.map(|tag| tag["name"].as_str().unwrap())
			.collect::<Vec<_>>();

		assert_eq!(names, vec!["floral", "spring"]);

		// Both posts point at the same tag rows.
		assert_eq!(first["tags"], second["tags"]);
		assert_eq!(first["tags"][0]["id"], second["tags"][0]["id"]);

		let tags = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tag")
			.fetch_one(&pool)
			.await
			.unwrap();

		assert_eq!(tags, 2);

		let placeholder = create_post(&app, "!!!", "", false).await;

		assert_eq!(placeholder["slug"], "post");
	}

	#[sqlx::test]
	#[ignore = "needs a Postgres DATABASE_URL"]
	async fn test_long_titles_fit_the_slug(pool: Database) {
		let app = app(pool.clone());

		create_user(&pool, "admin", true, true).await;
		login(&app, "admin").await;

		let title = "中".repeat(140);
		let first = create_post(&app, &title, "", true).await;
		let second = create_post(&app, &title, "", true).await;

		let first = first["slug"].as_str().unwrap();

		assert!(first.len() <= crate::slug::MAX_LEN);
		assert_eq!(second["slug"], format!("{first}-1"));

		let wide = create_post(&app, &"Æ".repeat(76), "", true).await;

		assert_eq!(wide["slug"].as_str().unwrap().len(), crate::slug::MAX_LEN);
	}

	#[sqlx::test]
	#[ignore = "needs a Postgres DATABASE_URL"]
	async fn test_edit_keeps_or_regenerates_slug(pool: Database) {
		let app = app(pool.clone());

		create_user(&pool, "admin", true, true).await;
		login(&app, "admin").await;

		let post = create_post(&app, "A", "rose", true).await;
		let id = post["id"].as_str().unwrap();

		// Same title, new body: the slug stays.
		let edited = app
			.post(&format!("/admin/post/{id}/edit"))
			.json(&json!({ "title": "A", "body": "changed", "tags": "rose", "publish": true }))
			.await
			.json::<serde_json::Value>();

		assert_eq!(edited["slug"], "a");
		assert_eq!(edited["body"], "changed");

		// A title that normalizes to the same slug does not collide with itself.
		let edited = app
			.post(&format!("/admin/post/{id}/edit"))
			.json(&json!({ "title": "A!", "body": "changed", "tags": "oud", "publish": true }))
			.await
			.json::<serde_json::Value>();

		assert_eq!(edited["slug"], "a");
		assert_eq!(edited["tags"][0]["name"], "oud");
		assert_eq!(edited["tags"].as_array().unwrap().len(), 1);

		let edited = app
			.post(&format!("/admin/post/{id}/edit"))
			.json(&json!({ "title": "B", "body": "changed", "publish": true }))
			.await
			.json::<serde_json::Value>();

		assert_eq!(edited["slug"], "b");
		assert!(edited["tags"].as_array().unwrap().is_empty());

		// The freed slug can be used again.
		let other = create_post(&app, "A", "", true).await;

		assert_eq!(other["slug"], "a");
	}

	#[sqlx::test]
	#[ignore = "needs a Postgres DATABASE_URL"]
	async fn test_republish_keeps_published_at(pool: Database) {
		let app = app(pool.clone());

		create_user(&pool, "admin", true, true).await;
		login(&app, "admin").await;

		let draft = create_post(&app, "Spring Collection", "", false).await;
		let id = draft["id"].as_str().unwrap();

		assert_eq!(draft["status"], false);
		assert!(draft["published_at"].is_null());

		let edit = |publish: bool| {
			app.post(&format!("/admin/post/{id}/edit")).json(&json!({
				"title": "Spring Collection",
				"body": "Rose",
				"publish": publish,
			}))
		};

		let published = edit(true).await.json::<serde_json::Value>();
		let first_published_at = published["published_at"].clone();

		assert_eq!(published["status"], true);
		assert!(!first_published_at.is_null());

		let unpublished = edit(false).await.json::<serde_json::Value>();

		assert_eq!(unpublished["status"], false);
		assert_eq!(unpublished["published_at"], first_published_at);

		let republished = edit(true).await.json::<serde_json::Value>();

		assert_eq!(republished["published_at"], first_published_at);
	}

	#[sqlx::test]
	#[ignore = "needs a Postgres DATABASE_URL"]
	async fn test_delete_cascades(pool: Database) {
		let app = app(pool.clone());

		create_user(&pool, "admin", true, true).await;
		login(&app, "admin").await;

		let post = create_post(&app, "Spring Collection", "rose", true).await;
		let id = post["id"].as_str().unwrap();
		let slug = post["slug"].as_str().unwrap();

		let comment = app
			.post(&format!("/post/{slug}"))
			.json(&json!({ "body": "Lovely" }))
			.await
			.json::<serde_json::Value>();

		app.post(&format!("/post/{slug}"))
			.json(&json!({ "body": "Agreed", "parent_id": comment["id"] }))
			.await
			.assert_status_ok();

		app.post(&format!("/admin/post/{id}/delete"))
			.await
			.assert_status_ok();

		let count = |table: &'static str| {
			let pool = pool.clone();

			async move {
				sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
					.fetch_one(&pool)
					.await
					.unwrap()
			}
		};

		assert_eq!(count("post").await, 0);
		assert_eq!(count("comment").await, 0);
		assert_eq!(count("post_tag").await, 0);
		// Orphan tags are kept.
		assert_eq!(count("tag").await, 1);

		app.get(&format!("/admin/post/{id}"))
			.await
			.assert_status_not_found();
		app.post(&format!("/admin/post/{id}/delete"))
			.await
			.assert_status_not_found();
	}

	#[sqlx::test]
	#[ignore = "needs a Postgres DATABASE_URL"]
	async fn test_images(pool: Database) {
		let (app, images) = app_with_images(pool.clone());

		create_user(&pool, "admin", true, true).await;
		login(&app, "admin").await;

		let response = app
			.post("/admin/post/new")
			.json(&json!({
				"title": "Spring Collection",
				"body": "Rose",
				"image": { "filename": "notes.txt", "content_base64": "cm9zZQ==" },
			}))
			.await;

		assert_eq!(response.status_code(), 400);
		assert_eq!(
			response.json::<serde_json::Value>()["errors"][0]["field"],
			"image"
		);

		let post = app
			.post("/admin/post/new")
			.json(&json!({
				"title": "Spring Collection",
				"body": "Rose",
				"image": { "filename": "rose.png", "content_base64": "cm9zZQ==" },
			}))
			.await
			.json::<serde_json::Value>();

		assert!(post["warnings"].as_array().unwrap().is_empty());
		assert!(post["image_url"].as_str().unwrap().ends_with("rose.png"));

		let id = post["id"].as_str().unwrap();
		let edited = app
			.post(&format!("/admin/post/{id}/edit"))
			.json(&json!({ "title": "Spring Collection", "body": "Rose", "remove_image": true }))
			.await
			.json::<serde_json::Value>();

		assert!(edited["image_url"].is_null());
		assert_eq!(images.destroyed().len(), 1);

		// A failing host never blocks the save.
		images.fail();

		let post = app
			.post("/admin/post/new")
			.json(&json!({
				"title": "Autumn Collection",
				"body": "Oud",
				"image": { "filename": "oud.png", "content_base64": "b3Vk" },
			}))
			.await
			.json::<serde_json::Value>();

		assert_eq!(post["title"], "Autumn Collection");
		assert!(post["image_url"].is_null());
		assert_eq!(post["warnings"].as_array().unwrap().len(), 1);
	}

	#[sqlx::test]
	#[ignore = "needs a Postgres DATABASE_URL"]
	async fn test_register(pool: Database) {
		let app = app(pool.clone());

		create_user(&pool, "admin", true, true).await;
		login(&app, "admin").await;

		let user = app
			.post("/admin/register")
			.json(&json!({
				"username": "bob",
				"email": "bob@example.com",
				"password": "correct horse",
				"password2": "correct horse",
			}))
			.await
			.json::<serde_json::Value>();

		assert_eq!(user["confirmed"], true);
		assert_eq!(user["is_admin"], false);

		app.get("/logout").await.assert_status_ok();
		app.post("/login")
			.json(&json!({ "username": "bob", "password": "correct horse" }))
			.await
			.assert_status_ok();
	}
}
