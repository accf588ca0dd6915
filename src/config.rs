use std::{str::FromStr, time::Duration};

use cookie::SameSite;

/// An error raised while reading the configuration at startup.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("{0} must be set")]
	Missing(&'static str),
	#[error("{name} is invalid: {reason}")]
	Invalid { name: &'static str, reason: String },
}

/// SMTP settings. When absent, mail is only logged.
#[derive(Debug, Clone)]
pub struct Mail {
	pub server: String,
	pub port: u16,
	pub use_tls: bool,
	pub use_ssl: bool,
	pub username: Option<String>,
	pub password: Option<String>,
}

/// Credentials for the hosted image service. When absent, uploads are disabled.
#[derive(Debug, Clone)]
pub struct ImageHost {
	pub cloud_name: String,
	pub api_key: String,
	pub api_secret: String,
}

/// Page sizes for each listing.
#[derive(Debug, Clone, Copy)]
pub struct PageSizes {
	pub posts: i64,
	pub comments: i64,
	pub search: i64,
	pub admin: i64,
	pub tag: i64,
	pub sidebar_recent_posts: i64,
	pub sidebar_popular_tags: i64,
}

/// A burst of `burst` requests, replenished one at a time every `period / burst`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
	pub burst: u32,
	pub period: Duration,
}

impl FromStr for RateLimit {
	type Err = String;

	/// Parses `<burst>/<period in seconds>`, e.g. `5/3600` for five per hour.
	fn from_str(value: &str) -> Result<Self, Self::Err> {
		let (burst, period) = value
			.split_once('/')
			.ok_or_else(|| "expected <burst>/<period_secs>".to_string())?;

		let burst = burst.trim().parse::<u32>().map_err(|e| e.to_string())?;
		let period = period.trim().parse::<u64>().map_err(|e| e.to_string())?;

		if burst == 0 || period == 0 {
			return Err("burst and period must be positive".into());
		}

		Ok(Self {
			burst,
			period: Duration::from_secs(period),
		})
	}
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimits {
	pub enabled: bool,
	pub login: RateLimit,
	pub signup: RateLimit,
	pub reset_password: RateLimit,
}

#[derive(Debug, Clone, Copy)]
pub struct Cookies {
	pub secure: bool,
	pub http_only: bool,
	pub same_site: SameSite,
}

/// The full application configuration, read once from the environment.
#[derive(Debug, Clone)]
pub struct Config {
	pub database_url: String,
	pub secret_key: String,
	pub host: String,
	pub port: u16,
	pub base_url: String,
	pub blog_name: String,
	pub token_ttl: Duration,
	pub mail: Option<Mail>,
	pub mail_sender: String,
	pub admin_email: Option<String>,
	pub image_host: Option<ImageHost>,
	pub pages: PageSizes,
	pub rate_limits: RateLimits,
	pub cookies: Cookies,
}

impl Config {
	/// Reads the configuration from the process environment.
	pub fn from_env() -> Result<Self, Error> {
		Self::from_lookup(|name| std::env::var(name).ok())
	}

	/// Reads the configuration through `lookup`, which maps a variable name to its value.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
	where
		F: Fn(&str) -> Option<String>,
	{
		let env = Env(lookup);

		let secret_key = env.required("SECRET_KEY")?;

		if secret_key.len() < 16 {
			return Err(Error::Invalid {
				name: "SECRET_KEY",
				reason: "must be at least 16 bytes long".into(),
			});
		}

		let mail = match env.optional("MAIL_SERVER") {
			Some(server) => Some(Mail {
				server,
				port: env.parse("MAIL_PORT", 587)?,
				use_tls: env.flag("MAIL_USE_TLS", true)?,
				use_ssl: env.flag("MAIL_USE_SSL", false)?,
				username: env.optional("MAIL_USERNAME"),
				password: env.optional("MAIL_PASSWORD"),
			}),
			None => None,
		};

		let image_host = match env.optional("IMAGE_HOST_CLOUD_NAME") {
			Some(cloud_name) => Some(ImageHost {
				cloud_name,
				api_key: env.required("IMAGE_HOST_API_KEY")?,
				api_secret: env.required("IMAGE_HOST_API_SECRET")?,
			}),
			None => None,
		};

		let same_site = match env
			.optional("COOKIE_SAMESITE")
			.map(|value| value.to_ascii_lowercase())
			.as_deref()
		{
			None | Some("lax") => SameSite::Lax,
			Some("strict") => SameSite::Strict,
			Some("none") => SameSite::None,
			Some(other) => {
				return Err(Error::Invalid {
					name: "COOKIE_SAMESITE",
					reason: format!("unknown value {other:?}"),
				})
			}
		};

		let base_url = env
			.optional("BASE_URL")
			.unwrap_or_else(|| "http://localhost:3000".into());

		Ok(Self {
			database_url: env.required("DATABASE_URL")?,
			secret_key,
			host: env.optional("HOST").unwrap_or_else(|| "127.0.0.1".into()),
			port: env.parse("PORT", 3000)?,
			base_url: base_url.trim_end_matches('/').to_string(),
			blog_name: env.optional("BLOG_NAME").unwrap_or_else(|| "My Blog".into()),
			token_ttl: Duration::from_secs(env.parse("TOKEN_TTL_SECS", 1800)?),
			mail,
			mail_sender: env
				.optional("MAIL_DEFAULT_SENDER")
				.unwrap_or_else(|| "noreply@localhost".into()),
			admin_email: env.optional("ADMIN_EMAIL"),
			image_host,
			pages: PageSizes {
				posts: env.parse("POSTS_PER_PAGE", 5)?,
				comments: env.parse("COMMENTS_PER_PAGE", 10)?,
				search: env.parse("SEARCH_PER_PAGE", 10)?,
				admin: env.parse("ADMIN_PER_PAGE", 10)?,
				tag: env.parse("TAG_PER_PAGE", 5)?,
				sidebar_recent_posts: env.parse("SIDEBAR_RECENT_POSTS", 5)?,
				sidebar_popular_tags: env.parse("SIDEBAR_POPULAR_TAGS", 10)?,
			},
			rate_limits: RateLimits {
				enabled: env.flag("RATE_LIMIT_ENABLED", true)?,
				login: env.parse_or("RATE_LIMIT_LOGIN", "10/60")?,
				signup: env.parse_or("RATE_LIMIT_SIGNUP", "5/3600")?,
				reset_password: env.parse_or("RATE_LIMIT_RESET", "5/3600")?,
			},
			cookies: Cookies {
				secure: env.flag("COOKIE_SECURE", false)?,
				http_only: env.flag("COOKIE_HTTPONLY", true)?,
				same_site,
			},
		})
	}

	/// Builds an absolute link to `path` on this blog.
	pub fn url(&self, path: &str) -> String {
		format!("{}{}", self.base_url, path)
	}
}

struct Env<F>(F);

impl<F> Env<F>
where
	F: Fn(&str) -> Option<String>,
{
	fn optional(&self, name: &str) -> Option<String> {
		(self.0)(name).filter(|value| !value.trim().is_empty())
	}

	fn required(&self, name: &'static str) -> Result<String, Error> {
		self.optional(name).ok_or(Error::Missing(name))
	}

	fn parse<T>(&self, name: &'static str, default: T) -> Result<T, Error>
	where
		T: FromStr,
		T::Err: std::fmt::Display,
	{
		match self.optional(name) {
			Some(value) => value.trim().parse().map_err(|e: T::Err| Error::Invalid {
				name,
				reason: e.to_string(),
			}),
			None => Ok(default),
		}
	}

	fn parse_or<T>(&self, name: &'static str, default: &str) -> Result<T, Error>
	where
		T: FromStr<Err = String>,
	{
		self.optional(name)
			.as_deref()
			.unwrap_or(default)
			.parse()
			.map_err(|reason| Error::Invalid { name, reason })
	}

	fn flag(&self, name: &'static str, default: bool) -> Result<bool, Error> {
		match self.optional(name).map(|v| v.trim().to_ascii_lowercase()).as_deref() {
			None => Ok(default),
			Some("true" | "1" | "t" | "yes") => Ok(true),
			Some("false" | "0" | "f" | "no") => Ok(false),
			Some(other) => Err(Error::Invalid {
				name,
				reason: format!("expected a boolean, got {other:?}"),
			}),
		}
	}
}
