//! Machine-readable listings of published posts: an RSS 2.0 feed and a sitemap.
//!
//! These answer with XML, so they are left out of the `OpenAPI` document.

use aide::axum::ApiRouter;
use axum::routing::get;

use crate::AppState;

pub mod route;

pub fn routes() -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new()
		.route("/feed.xml", get(feed))
		.route("/sitemap.xml", get(sitemap))
}

#[cfg(test)]
mod test {
	use crate::test::*;

	#[sqlx::test]
	#[ignore = "needs a Postgres DATABASE_URL"]
	async fn test_feed(pool: Database) {
		let app = app(pool.clone());

		create_user(&pool, "admin", true, true).await;
		login(&app, "admin").await;

		create_post(&app, "Spring Collection", "floral", true).await;
		create_post(&app, "Bits & <Pieces>", "", true).await;

		let response = app.get("/feed.xml").await;

		response.assert_status_ok();
		assert!(response
			.header("content-type")
			.to_str()
			.unwrap()
			.starts_with("application/rss+xml"));

		let body = response.text();

		assert!(body.contains("<rss"));
		assert!(body.contains("<title>Liquid Blossom</title>"));
		assert!(body.contains(&format!("{BASE_URL}/post/spring-collection")));
		assert!(body.contains("<category>floral</category>"));
		assert!(!body.contains("<Pieces>"));
	}

	#[sqlx::test]
	#[ignore = "needs a Postgres DATABASE_URL"]
	async fn test_sitemap(pool: Database) {
		let app = app(pool.clone());

		create_user(&pool, "admin", true, true).await;
		login(&app, "admin").await;

		create_post(&app, "Spring Collection", "", true).await;

		let response = app.get("/sitemap.xml").await;

		response.assert_status_ok();

		let body = response.text();

		assert!(body.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
		assert!(body.contains(&format!("<loc>{BASE_URL}/</loc>")));
		assert!(body.contains(&format!("<loc>{BASE_URL}/post/spring-collection</loc>")));
	}
}
