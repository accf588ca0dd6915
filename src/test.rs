//! Helpers shared by the HTTP tests.

use std::{
	sync::{
		atomic::{AtomicBool, Ordering},
		Arc, Mutex,
	},
	time::Duration,
};

use argon2::Argon2;
use async_trait::async_trait;
pub use axum_test::TestServer;
use axum_test::TestServerConfig;
pub use serde_json::json;
use sqlx::postgres::PgPoolOptions;

pub use crate::Database;
use crate::{
	config,
	image::{self, HostedImage, ImageHost, Upload},
	mail::{self, Email, Mailer},
	password, route,
	route::auth::model::User,
	token::TokenSigner,
	State,
};

pub const PASSWORD: &str = "correct horse";
pub const BASE_URL: &str = "http://localhost:3000";
pub const ADMIN_EMAIL: &str = "admin@blossom.test";

/// Keeps every email instead of sending it, and can be told to start failing.
#[derive(Default)]
pub struct RecordingMailer {
	failing: AtomicBool,
	sent: Mutex<Vec<Email>>,
}

impl RecordingMailer {
	pub fn fail(&self) {
		self.failing.store(true, Ordering::SeqCst);
	}

	pub fn sent(&self) -> Vec<Email> {
		self.sent.lock().unwrap().clone()
	}

	/// The first link to this blog in the last email sent.
	pub fn last_link(&self) -> Option<String> {
		let sent = self.sent.lock().unwrap();

		sent.last()?
			.body
			.split_whitespace()
			.find(|word| word.starts_with(BASE_URL))
			.map(ToString::to_string)
	}
}

#[async_trait]
impl Mailer for RecordingMailer {
	async fn send(&self, email: Email) -> Result<(), mail::Error> {
		if self.failing.load(Ordering::SeqCst) {
			return Err(mail::Error::Address(
				"unreachable".parse::<lettre::Address>().unwrap_err(),
			));
		}

		self.sent.lock().unwrap().push(email);

		Ok(())
	}
}

/// Pretends to host images, and can be told to start failing.
#[derive(Default)]
pub struct FakeImageHost {
	failing: AtomicBool,
	destroyed: Mutex<Vec<String>>,
}

impl FakeImageHost {
	pub fn fail(&self) {
		self.failing.store(true, Ordering::SeqCst);
	}

	pub fn destroyed(&self) -> Vec<String> {
		self.destroyed.lock().unwrap().clone()
	}

	fn check(&self) -> Result<(), image::Error> {
		if self.failing.load(Ordering::SeqCst) {
			return Err(image::Error::Rejected("unavailable".into()));
		}

		Ok(())
	}
}

#[async_trait]
impl ImageHost for FakeImageHost {
	async fn upload(&self, upload: Upload) -> Result<HostedImage, image::Error> {
		self.check()?;

		Ok(HostedImage {
			url: format!("https://images.example.com/{}", upload.filename),
			public_id: format!("blossom/{}", upload.filename),
		})
	}

	async fn destroy(&self, public_id: &str) -> Result<(), image::Error> {
		self.check()?;
		self.destroyed.lock().unwrap().push(public_id.to_string());

		Ok(())
	}
}

pub fn signer() -> TokenSigner {
	let config = config::test::config();

	TokenSigner::new(config.secret_key.as_bytes(), config.token_ttl)
}

/// A pool that never connects until used, for tests that fail before touching the database.
pub fn lazy_database() -> Database {
	PgPoolOptions::new()
		.acquire_timeout(Duration::from_secs(1))
		.connect_lazy("postgres://localhost/blossom")
		.unwrap()
}

fn server(pool: Database, mailer: Arc<dyn Mailer>, images: Arc<dyn ImageHost>) -> TestServer {
	let mut config = config::test::config();
	config.admin_email = Some(ADMIN_EMAIL.into());

	let state = State {
		database: pool,
		hasher: Argon2::default(),
		signer: signer(),
		config: Arc::new(config),
		mailer,
		images,
	};

	TestServer::new_with_config(
		route::app(state, None),
		TestServerConfig {
			save_cookies: true,
			..TestServerConfig::default()
		},
	)
	.unwrap()
}

pub fn app(pool: Database) -> TestServer {
	app_with_mailer(pool).0
}

pub fn app_with_mailer(pool: Database) -> (TestServer, Arc<RecordingMailer>) {
	let mailer = Arc::new(RecordingMailer::default());

	(
		server(pool, mailer.clone(), Arc::new(FakeImageHost::default())),
		mailer,
	)
}

pub fn app_with_images(pool: Database) -> (TestServer, Arc<FakeImageHost>) {
	let images = Arc::new(FakeImageHost::default());

	(
		server(pool, Arc::new(RecordingMailer::default()), images.clone()),
		images,
	)
}

/// Inserts a user whose password is [`PASSWORD`] and whose email is `{username}@example.com`.
pub async fn create_user(pool: &Database, username: &str, is_admin: bool, confirmed: bool) -> User {
	let hash = password::hash(&Argon2::default(), PASSWORD).unwrap();

	sqlx::query_as::<_, User>(
		r#"
			INSERT INTO "user" (username, email, password, is_admin, confirmed, confirmed_on)
			VALUES ($1, $2, $3, $4, $5, CASE WHEN $5 THEN now() END)
			RETURNING *
		"#,
	)
	.bind(username)
	.bind(format!("{username}@example.com"))
	.bind(hash)
	.bind(is_admin)
	.bind(confirmed)
	.fetch_one(pool)
	.await
	.unwrap()
}

/// Logs in as `username`, replacing the saved session cookie.
pub async fn login(app: &TestServer, username: &str) {
	app.post("/login")
		.json(&json!({ "username": username, "password": PASSWORD }))
		.await
		.assert_status_ok();
}

/// Creates a post as the logged-in administrator and returns it.
pub async fn create_post(app: &TestServer, title: &str, tags: &str, publish: bool) -> serde_json::Value {
	let response = app
		.post("/admin/post/new")
		.json(&json!({
			"title": title,
			"body": "Notes of rose and oud.",
			"tags": tags,
			"publish": publish,
		}))
		.await;

	response.assert_status_ok();
	response.json::<serde_json::Value>()
}
