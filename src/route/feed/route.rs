use axum::{
	extract::State,
	http::header,
	response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use html_escape::encode_text;
use rss::{Category, Channel, Guid, Item};

use crate::{
	error::AppError,
	route::post::{
		model::{Post, PostWithTags},
		query::{self, post_select, published},
	},
	AppState,
};

/// Number of posts in the feed.
const FEED_SIZE: i64 = 20;

fn item(post: PostWithTags, link: String) -> Item {
	let PostWithTags { post, tags } = post;

	let mut guid = Guid::default();
	guid.set_value(link.clone());
	guid.set_permalink(true);

	let mut item = Item::default();
	item.set_title(Some(post.title));
	item.set_link(Some(link));
	item.set_description(Some(post.body));
	item.set_guid(Some(guid));
	item.set_pub_date(post.published_at.map(|date| date.to_rfc2822()));
	item.set_categories(
		tags.into_iter()
			.map(|tag| {
				let mut category = Category::default();
				category.set_name(tag.name);
				category
			})
			.collect::<Vec<_>>(),
	);

	item
}

/// Serves the most recent published posts as RSS 2.0.
pub async fn feed(State(state): State<AppState>) -> Result<Response, AppError> {
	let posts = sqlx::query_as::<_, Post>(concat!(
		post_select!(),
		" WHERE ",
		published!(),
		" ORDER BY post.published_at DESC, post.id LIMIT $1"
	))
	.bind(FEED_SIZE)
	.fetch_all(&state.database)
	.await?;

	let posts = query::with_tags(&state.database, posts).await?;

	let mut channel = Channel::default();
	channel.set_title(state.config.blog_name.clone());
	channel.set_link(state.config.url("/"));
	channel.set_description(format!("The latest posts of {}", state.config.blog_name));
	channel.set_last_build_date(Some(Utc::now().to_rfc2822()));
	channel.set_items(
		posts
			.into_iter()
			.map(|post| {
				let link = state.config.url(&format!("/post/{}", post.post.slug));

				item(post, link)
			})
			.collect::<Vec<_>>(),
	);

	Ok((
		[(header::CONTENT_TYPE, "application/rss+xml; charset=utf-8")],
		channel.to_string(),
	)
		.into_response())
}

/// Builds a sitemap of the home page and every post in `posts`, given as `(url, last modified)`.
fn urlset(home: &str, posts: &[(String, DateTime<Utc>)]) -> String {
	let mut xml = String::from(
		r#"<?xml version="1.0" encoding="UTF-8"?><urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#,
	);

	xml.push_str(&format!("<url><loc>{}</loc></url>", encode_text(home)));

	for (url, modified) in posts {
		xml.push_str(&format!(
			"<url><loc>{}</loc><lastmod>{}</lastmod></url>",
			encode_text(url),
			modified.format("%Y-%m-%d")
		));
	}

	xml.push_str("</urlset>");
	xml
}

/// Serves a sitemap of every published post.
pub async fn sitemap(State(state): State<AppState>) -> Result<Response, AppError> {
	let posts = sqlx::query_as::<_, (String, DateTime<Utc>)>(concat!(
		"SELECT post.slug, post.updated_at FROM post WHERE ",
		published!(),
		" ORDER BY post.published_at DESC, post.id"
	))
	.fetch_all(&state.database)
	.await?
	.into_iter()
	.map(|(slug, modified)| (state.config.url(&format!("/post/{slug}")), modified))
	.collect::<Vec<_>>();

	Ok((
		[(header::CONTENT_TYPE, "application/xml; charset=utf-8")],
		urlset(&state.config.url("/"), &posts),
	)
		.into_response())
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_urlset() {
		let xml = urlset(
			"http://localhost:3000/",
			&[(
				"http://localhost:3000/post/a?b&c".into(),
				DateTime::<Utc>::UNIX_EPOCH,
			)],
		);

		assert!(xml.contains("<url><loc>http://localhost:3000/</loc></url>"));
		assert!(xml.contains(
			"<loc>http://localhost:3000/post/a?b&amp;c</loc><lastmod>1970-01-01</lastmod>"
		));
		assert!(xml.ends_with("</urlset>"));
	}

	#[test]
	fn test_urlset_escapes_markup() {
		let xml = urlset("http://localhost:3000/<home>", &[]);

		assert!(xml.contains("<loc>http://localhost:3000/&lt;home&gt;</loc>"));
	}
}
