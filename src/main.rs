#![warn(clippy::pedantic)]

mod config;
mod error;
mod extract;
mod gate;
mod image;
mod mail;
mod openapi;
mod password;
mod publish;
mod ratelimit;
mod route;
mod session;
mod slug;
mod tag;
#[cfg(test)]
mod test;
mod token;
mod trace;

use std::{net::SocketAddr, sync::Arc};

use argon2::Argon2;
use sqlx::postgres::PgPoolOptions;

use crate::{
	config::Config,
	image::ImageHost,
	mail::Mailer,
	token::TokenSigner,
};

pub type Database = sqlx::Pool<sqlx::Postgres>;
pub type AppState = State;

/// The shared application state.
///
/// Every collaborator that talks to the outside world sits behind a trait
/// object, so tests can swap in recording or failing versions.
#[derive(Clone, axum::extract::FromRef)]
pub struct State {
	pub database: Database,
	pub hasher: Argon2<'static>,
	pub config: Arc<Config>,
	pub signer: TokenSigner,
	pub mailer: Arc<dyn Mailer>,
	pub images: Arc<dyn ImageHost>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	dotenvy::dotenv().ok();

	let endpoint = std::env::var(trace::OTLP_ENDPOINT).ok();
	let _guard = trace::init_tracing_subscriber(endpoint.as_deref())?;

	let config = Config::from_env()?;

	let database = PgPoolOptions::new()
		.connect(&config.database_url)
		.await?;

	sqlx::migrate!().run(&database).await?;

	let mailer: Arc<dyn Mailer> = match &config.mail {
		Some(mail) => Arc::new(mail::SmtpMailer::new(mail, config.mail_sender.clone())?),
		None => {
			tracing::warn!("MAIL_SERVER is not set, emails will only be logged");

			Arc::new(mail::LogMailer)
		}
	};

	let images: Arc<dyn ImageHost> = match &config.image_host {
		Some(host) => Arc::new(image::Cloudinary::new(host.clone())),
		None => {
			tracing::warn!("IMAGE_HOST_CLOUD_NAME is not set, image uploads are disabled");

			Arc::new(image::Disabled)
		}
	};

	let limits = if config.rate_limits.enabled {
		let limits = ratelimit::Limits::new(&config.rate_limits)?;

		limits.cleanup();
		Some(limits)
	} else {
		None
	};

	let address = (config.host.clone(), config.port);
	let state = State {
		database,
		hasher: Argon2::default(),
		signer: TokenSigner::new(config.secret_key.as_bytes(), config.token_ttl),
		config: Arc::new(config),
		mailer,
		images,
	};

	let app = route::app(state, limits.as_ref());
	let listener = tokio::net::TcpListener::bind(address).await?;

	tracing::info!("listening on {}", listener.local_addr()?);

	axum::serve(
		listener,
		app.into_make_service_with_connect_info::<SocketAddr>(),
	)
	.await?;

	Ok(())
}
