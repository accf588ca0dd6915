use async_trait::async_trait;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::config;

/// Largest accepted image, in bytes.
pub const MAX_SIZE: usize = 5 * 1024 * 1024;
pub const ALLOWED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "gif"];

const FOLDER: &str = "blossom";

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("image hosting is not configured")]
	NotConfigured,
	#[error("image host request failed: {0}")]
	Request(#[from] reqwest::Error),
	#[error("image host rejected the request: {0}")]
	Rejected(String),
}

/// An image ready to be sent to the host.
#[derive(Debug, Clone)]
pub struct Upload {
	pub filename: String,
	pub bytes: Vec<u8>,
}

/// A stored image: its public URL and the handle needed to delete it later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedImage {
	pub url: String,
	pub public_id: String,
}

/// Third-party image hosting.
#[async_trait]
pub trait ImageHost: Send + Sync {
	async fn upload(&self, upload: Upload) -> Result<HostedImage, Error>;
	async fn destroy(&self, public_id: &str) -> Result<(), Error>;
}

/// Returns the lowercase extension of `filename` if it is an accepted image type.
pub fn allowed_extension(filename: &str) -> Option<String> {
	let (stem, extension) = filename.rsplit_once('.')?;
	let extension = extension.to_ascii_lowercase();

	(!stem.is_empty() && ALLOWED_EXTENSIONS.contains(&extension.as_str())).then_some(extension)
}

/// Used when no image host is configured; every upload fails.
pub struct Disabled;

#[async_trait]
impl ImageHost for Disabled {
	async fn upload(&self, _upload: Upload) -> Result<HostedImage, Error> {
		Err(Error::NotConfigured)
	}

	async fn destroy(&self, _public_id: &str) -> Result<(), Error> {
		Err(Error::NotConfigured)
	}
}

/// A Cloudinary-compatible image host using signed upload requests.
pub struct Cloudinary {
	client: reqwest::Client,
	config: config::ImageHost,
}

#[derive(Deserialize)]
struct UploadResponse {
	secure_url: String,
	public_id: String,
}

#[derive(Deserialize)]
struct DestroyResponse {
	result: String,
}

impl Cloudinary {
	pub fn new(config: config::ImageHost) -> Self {
		Self {
			client: reqwest::Client::new(),
			config,
		}
	}

	fn endpoint(&self, action: &str) -> String {
		format!(
			"https://api.cloudinary.com/v1_1/{}/image/{action}",
			self.config.cloud_name
		)
	}

	/// Signs the `params`, which must already be sorted by key.
	fn sign(&self, params: &[(&str, &str)]) -> String {
		let joined = params
			.iter()
			.map(|(key, value)| format!("{key}={value}"))
			.collect::<Vec<_>>()
			.join("&");

		let mut hasher = Sha256::new();
		hasher.update(joined.as_bytes());
		hasher.update(self.config.api_secret.as_bytes());

		hex::encode(hasher.finalize())
	}
}

#[async_trait]
impl ImageHost for Cloudinary {
	async fn upload(&self, upload: Upload) -> Result<HostedImage, Error> {
		let timestamp = chrono::Utc::now().timestamp().to_string();
		let signature = self.sign(&[("folder", FOLDER), ("timestamp", timestamp.as_str())]);

		let file = reqwest::multipart::Part::bytes(upload.bytes).file_name(upload.filename);
		let form = reqwest::multipart::Form::new()
			.part("file", file)
			.text("api_key", self.config.api_key.clone())
			.text("folder", FOLDER)
			.text("timestamp", timestamp)
			.text("signature", signature)
			.text("signature_algorithm", "sha256");

		let response = self
			.client
			.post(self.endpoint("upload"))
			.multipart(form)
			.send()
			.await?;

		if !response.status().is_success() {
			return Err(Error::Rejected(response.status().to_string()));
		}

		let body = response.json::<UploadResponse>().await?;

		Ok(HostedImage {
			url: body.secure_url,
			public_id: body.public_id,
		})
	}

	async fn destroy(&self, public_id: &str) -> Result<(), Error> {
		let timestamp = chrono::Utc::now().timestamp().to_string();
		let signature = self.sign(&[("public_id", public_id), ("timestamp", timestamp.as_str())]);

		let response = self
			.client
			.post(self.endpoint("destroy"))
			.form(&[
				("public_id", public_id),
				("api_key", self.config.api_key.as_str()),
				("timestamp", timestamp.as_str()),
				("signature", signature.as_str()),
				("signature_algorithm", "sha256"),
			])
			.send()
			.await?;

		if !response.status().is_success() {
			return Err(Error::Rejected(response.status().to_string()));
		}

		let body = response.json::<DestroyResponse>().await?;

		match body.result.as_str() {
			"ok" | "not found" => Ok(()),
			other => Err(Error::Rejected(other.to_string())),
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_allowed_extension() {
		assert_eq!(allowed_extension("rose.JPG").as_deref(), Some("jpg"));
		assert_eq!(allowed_extension("bottle.final.png").as_deref(), Some("png"));
		assert_eq!(allowed_extension("notes.txt"), None);
		assert_eq!(allowed_extension("png"), None);
		assert_eq!(allowed_extension(".gif"), None);
	}

	#[test]
	fn test_signature_is_stable() {
		let host = Cloudinary::new(config::ImageHost {
			cloud_name: "demo".into(),
			api_key: "key".into(),
			api_secret: "secret".into(),
		});

		let a = host.sign(&[("folder", "blossom"), ("timestamp", "1700000000")]);
		let b = host.sign(&[("folder", "blossom"), ("timestamp", "1700000000")]);
		let c = host.sign(&[("folder", "blossom"), ("timestamp", "1700000001")]);

		assert_eq!(a, b);
		assert_ne!(a, c);
		assert_eq!(a.len(), 64);
	}

	#[tokio::test]
	async fn test_disabled_host_refuses_uploads() {
		let result = Disabled
			.upload(Upload {
				filename: "rose.png".into(),
				bytes: vec![0; 4],
			})
			.await;

		assert!(matches!(result, Err(Error::NotConfigured)));
	}
}
