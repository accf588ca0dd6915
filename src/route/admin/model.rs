use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// An image sent along with a post.
#[derive(Deserialize, JsonSchema)]
pub struct ImageInput {
	/// The original file name. Its extension must be jpg, jpeg, png or gif.
	pub filename: String,
	/// The file contents, base64 encoded. At most 5 MiB once decoded.
	pub content_base64: String,
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct CreatePostInput {
	#[validate(
		length(min = 1, max = 140),
		custom(function = "crate::route::model::not_blank")
	)]
	pub title: String,
	#[validate(length(min = 1), custom(function = "crate::route::model::not_blank"))]
	pub body: String,
	/// Comma-separated tag names. Case and surrounding spaces are ignored.
	#[serde(default)]
	#[validate(custom(function = "crate::tag::validate"))]
	pub tags: String,
	/// Publishes the post right away instead of saving it as a draft.
	#[serde(default)]
	pub publish: bool,
	pub image: Option<ImageInput>,
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct EditPostInput {
	#[validate(
		length(min = 1, max = 140),
		custom(function = "crate::route::model::not_blank")
	)]
	pub title: String,
	#[validate(length(min = 1), custom(function = "crate::route::model::not_blank"))]
	pub body: String,
	/// Comma-separated tag names, replacing every current tag of the post.
	#[serde(default)]
	#[validate(custom(function = "crate::tag::validate"))]
	pub tags: String,
	/// Whether the post should be published. Unpublishing keeps its first publication date.
	#[serde(default)]
	pub publish: bool,
	/// Replaces the current image.
	pub image: Option<ImageInput>,
	/// Removes the current image. Ignored when a new image is sent.
	#[serde(default)]
	pub remove_image: bool,
}

/// The outcome of a change, with the problems that did not prevent it.
#[derive(Serialize, JsonSchema)]
pub struct Saved<T> {
	#[serde(flatten)]
	pub value: T,
	/// Image host failures. The change itself was saved.
	pub warnings: Vec<String>,
}
