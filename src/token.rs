//! Signed, time-limited tokens carrying a user id.
//!
//! A token is `base64url(payload) "." hex(hmac_sha256(secret, payload))`, where the
//! payload records what the token is for, whom it is for and when it was issued.

use std::{sync::Arc, time::Duration};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// What a token may be used for. A token only verifies for the purpose it was signed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Purpose {
	Confirm,
	ResetPassword,
}

#[derive(Serialize, Deserialize)]
struct Payload {
	purpose: Purpose,
	user_id: Uuid,
	issued_at: i64,
}

#[derive(Clone)]
pub struct TokenSigner {
	key: Arc<[u8]>,
	ttl: Duration,
}

impl TokenSigner {
	pub fn new(key: &[u8], ttl: Duration) -> Self {
		Self {
			key: key.into(),
			ttl,
		}
	}

	fn mac(&self) -> HmacSha256 {
		// HMAC is defined for keys of any length
		HmacSha256::new_from_slice(&self.key).unwrap_or_else(|_| unreachable!())
	}

	pub fn sign(&self, purpose: Purpose, user_id: Uuid) -> String {
		self.sign_at(purpose, user_id, Utc::now().timestamp())
	}

	pub fn sign_at(&self, purpose: Purpose, user_id: Uuid, issued_at: i64) -> String {
		let payload = serde_json::to_vec(&Payload {
			purpose,
			user_id,
			issued_at,
		})
		.unwrap_or_default();
		let payload = URL_SAFE_NO_PAD.encode(payload);

		let mut mac = self.mac();
		mac.update(payload.as_bytes());

		format!("{payload}.{}", hex::encode(mac.finalize().into_bytes()))
	}

	/// Returns the user id carried by `token`, or `None` if it is malformed,
	/// tampered with, signed for another purpose, or expired.
	pub fn verify(&self, token: &str, purpose: Purpose) -> Option<Uuid> {
		self.verify_at(token, purpose, Utc::now().timestamp())
	}

	pub fn verify_at(&self, token: &str, purpose: Purpose, now: i64) -> Option<Uuid> {
		let (payload, signature) = token.split_once('.')?;
		let signature = hex::decode(signature).ok()?;

		let mut mac = self.mac();
		mac.update(payload.as_bytes());
		mac.verify_slice(&signature).ok()?;

		let payload = URL_SAFE_NO_PAD.decode(payload).ok()?;
		let payload = serde_json::from_slice::<Payload>(&payload).ok()?;

		let age = u64::try_from(now.checked_sub(payload.issued_at)?).ok()?;

		(payload.purpose == purpose && age <= self.ttl.as_secs()).then_some(payload.user_id)
	}
}
