//! The draft/published lifecycle of a post.

use chrono::{DateTime, Utc};

/// The visibility of a post together with the time it was first published.
///
/// `published_at` is set on the first transition to published and is kept
/// afterwards, so unpublishing and republishing never moves a post in
/// chronological listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Publication {
	pub status: bool,
	pub published_at: Option<DateTime<Utc>>,
}

impl Publication {
	/// A post that has never been published.
	pub const DRAFT: Self = Self {
		status: false,
		published_at: None,
	};

	/// Moves to the requested state at `now`.
	#[must_use]
	pub fn transition(self, publish: bool, now: DateTime<Utc>) -> Self {
		if publish {
			Self {
				status: true,
				published_at: Some(self.published_at.unwrap_or(now)),
			}
		} else {
			Self {
				status: false,
				published_at: self.published_at,
			}
		}
	}

	/// Whether the post may appear in public listings.
	pub fn is_public(&self) -> bool {
		self.status && self.published_at.is_some()
	}
}
