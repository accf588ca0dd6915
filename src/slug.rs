//! Slugs are the URL-safe, unique identifiers of posts, derived from their titles.

use std::collections::HashSet;

use sqlx::PgConnection;
use uuid::Uuid;

/// Used when a title has nothing left after normalization.
pub const PLACEHOLDER: &str = "post";

/// Longest base slug. `post.slug` holds 150 characters, which leaves room for a `-N` suffix.
pub const MAX_LEN: usize = 140;

/// Normalizes a title into lowercase, hyphen-separated ASCII.
///
/// ```text
/// "Spring Collection" -> "spring-collection"
/// "Crème Brûlée!"     -> "creme-brulee"
/// "!!!"               -> "post"
/// ```
///
/// The result is at most [`MAX_LEN`] characters long, cut at a word boundary
/// when there is one.
pub fn slugify(title: &str) -> String {
	let slug = ::slug::slugify(title);
	let slug = truncate(&slug);

	if slug.is_empty() {
		PLACEHOLDER.to_string()
	} else {
		slug.to_string()
	}
}

/// Cuts an ASCII slug down to [`MAX_LEN`] bytes without leaving a trailing hyphen.
fn truncate(slug: &str) -> &str {
	if slug.len() <= MAX_LEN {
		return slug;
	}

	let head = &slug[..MAX_LEN];
	let head = if slug.as_bytes()[MAX_LEN] == b'-' {
		head
	} else {
		head.rfind('-').map_or(head, |end| &head[..end])
	};

	head.trim_end_matches('-')
}

/// Picks the first candidate in `base`, `base-1`, `base-2`, ... that is not in `taken`.
pub fn next_free<'a, I>(base: &str, taken: I) -> String
where
	I: IntoIterator<Item = &'a str>,
{
	let taken = taken.into_iter().collect::<HashSet<_>>();

	if !taken.contains(base) {
		return base.to_string();
	}

	(1..)
		.map(|i| format!("{base}-{i}"))
		.find(|candidate| !taken.contains(candidate.as_str()))
		.unwrap_or_else(|| base.to_string())
}

/// Generates a slug for `title` that no post currently uses.
///
/// `exclude` is the post being edited, whose own slug does not count as taken.
/// The returned slug is not reserved; the unique constraint on `post.slug`
/// catches a concurrent insert of the same slug.
pub async fn generate_unique_slug(
	conn: &mut PgConnection,
	title: &str,
	exclude: Option<Uuid>,
) -> Result<String, sqlx::Error> {
	let base = slugify(title);

	let taken = sqlx::query_scalar::<_, String>(
		r"
			SELECT slug FROM post
			WHERE (slug = $1 OR slug LIKE $1 || '-%')
				AND ($2::uuid IS NULL OR id <> $2)
		",
	)
	.bind(&base)
	.bind(exclude)
	.fetch_all(conn)
	.await?;

	Ok(next_free(&base, taken.iter().map(String::as_str)))
}
