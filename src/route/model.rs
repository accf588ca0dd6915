use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// These can be removed when [`serde`] supports
/// literal defaults: <https://github.com/serde-rs/serde/issues/368>
#[inline]
fn one() -> i64 {
	1
}

/// Rejects values made only of whitespace.
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
	if value.trim().is_empty() {
		let mut error = ValidationError::new("blank");
		error.message = Some("this field is required".into());

		return Err(error);
	}

	Ok(())
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct Paginate {
	/// The page number to return (1-indexed).
	#[validate(range(min = 1, max = 10000))]
	#[serde(default = "one")]
	pub page: i64,
}

impl Paginate {
	pub fn offset(&self, size: i64) -> i64 {
		(self.page - 1) * size
	}

	/// One more than the page size, so that [`Page::new`] can tell whether another page follows.
	pub fn limit(size: i64) -> i64 {
		size + 1
	}
}

#[derive(Deserialize, JsonSchema)]
pub struct IdInput {
	pub id: Uuid,
}

/// A page of a listing.
#[derive(Serialize, JsonSchema)]
pub struct Page<T> {
	pub items: Vec<T>,
	/// The page number of this page (1-indexed).
	pub page: i64,
	/// Whether a following page exists.
	pub has_next: bool,
}

impl<T> Page<T> {
	/// Builds a page from rows fetched with [`Paginate::limit`].
	pub fn new(mut rows: Vec<T>, paginate: &Paginate, size: i64) -> Self {
		let size = usize::try_from(size).unwrap_or(0);
		let has_next = rows.len() > size;

		rows.truncate(size);

		Self {
			items: rows,
			page: paginate.page,
			has_next,
		}
	}

	pub fn empty(paginate: &Paginate) -> Self {
		Self {
			items: Vec::new(),
			page: paginate.page,
			has_next: false,
		}
	}
}

/// A human-readable acknowledgement.
#[derive(Serialize, JsonSchema)]
pub struct Notice {
	pub message: String,
}

impl Notice {
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_paginate_offset() {
		let mut paginate = Paginate { page: 1 };

		assert_eq!(paginate.offset(10), 0);

		paginate.page = 2;

		assert_eq!(paginate.offset(10), 10);
		assert_eq!(paginate.offset(5), 5);

		paginate.page = 3;

		assert_eq!(paginate.offset(5), 10);
	}

	#[test]
	fn test_paginate_limit() {
		assert_eq!(Paginate::limit(10), 11);
	}

	#[test]
	fn test_page_has_next() {
		let paginate = Paginate { page: 2 };

		let page = Page::new(vec![1, 2, 3, 4, 5, 6], &paginate, 5);

		assert_eq!(page.items, vec![1, 2, 3, 4, 5]);
		assert_eq!(page.page, 2);
		assert!(page.has_next);

		let page = Page::new(vec![1, 2, 3], &paginate, 5);

		assert_eq!(page.items.len(), 3);
		assert!(!page.has_next);
	}
}
