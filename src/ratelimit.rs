use std::{sync::Arc, time::Duration};

use axum::{
	body::Body,
	response::{IntoResponse, Response},
};
use governor::{
	clock::QuantaInstant,
	middleware::{RateLimitingMiddleware, StateInformationMiddleware},
};
use tower_governor::{
	governor::{GovernorConfig, GovernorConfigBuilder},
	key_extractor::{KeyExtractor, PeerIpKeyExtractor},
	GovernorError,
};

use crate::{config, error::AppError};

pub type Limiter = Arc<GovernorConfig<PeerIpKeyExtractor, StateInformationMiddleware>>;

/// Per-client-address limiters for the endpoints that send mail or check passwords.
#[derive(Clone)]
pub struct Limits {
	pub login: Limiter,
	pub signup: Limiter,
	pub reset_password: Limiter,
}

impl Limits {
	pub fn new(config: &config::RateLimits) -> Result<Self, config::Error> {
		Ok(Self {
			login: limiter("RATE_LIMIT_LOGIN", config.login)?,
			signup: limiter("RATE_LIMIT_SIGNUP", config.signup)?,
			reset_password: limiter("RATE_LIMIT_RESET", config.reset_password)?,
		})
	}

	/// Spawns the background pruning of stale client keys.
	pub fn cleanup(&self) {
		cleanup_old_limits(&[&self.login, &self.signup, &self.reset_password]);
	}
}

/// Allows a burst of `limit.burst` requests, then one more every `period / burst`.
fn limiter(name: &'static str, limit: config::RateLimit) -> Result<Limiter, config::Error> {
	let replenish = (limit.period / limit.burst).max(Duration::from_millis(1));

	GovernorConfigBuilder::default()
		.period(replenish)
		.burst_size(limit.burst)
		.use_headers()
		.error_handler(error_handler)
		.finish()
		.map(Arc::new)
		.ok_or(config::Error::Invalid {
			name,
			reason: "burst and period must be positive".into(),
		})
}

fn error_handler(error: GovernorError) -> Response<Body> {
	AppError::from(error).into_response()
}

pub fn cleanup_old_limits<T, M>(configs: &[&Arc<GovernorConfig<T, M>>])
where
	T: KeyExtractor,
	<T as KeyExtractor>::Key: Send + Sync + 'static,
	M: RateLimitingMiddleware<QuantaInstant> + Send + Sync + 'static,
{
	let limiters = configs
		.iter()
		.map(|config| config.limiter().clone())
		.collect::<Vec<_>>();
	let interval = Duration::from_secs(60);

	std::thread::spawn(move || loop {
		std::thread::sleep(interval);

		for limiter in &limiters {
			tracing::debug!("rate limiting storage size: {}", limiter.len());

			limiter.retain_recent();
		}
	});
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_limits_from_config() {
		let config = config::test::config();

		assert!(Limits::new(&config.rate_limits).is_ok());
	}

	#[test]
	fn test_dense_limit() {
		let limit = config::RateLimit {
			burst: 10,
			period: Duration::from_secs(1),
		};

		assert!(limiter("RATE_LIMIT_LOGIN", limit).is_ok());
	}
}
