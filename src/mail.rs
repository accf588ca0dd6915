use async_trait::async_trait;
use lettre::{
	message::header::ContentType, transport::smtp::authentication::Credentials,
	AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::config;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("invalid address: {0}")]
	Address(#[from] lettre::address::AddressError),
	#[error("could not build message: {0}")]
	Message(#[from] lettre::error::Error),
	#[error("smtp error: {0}")]
	Smtp(#[from] lettre::transport::smtp::Error),
}

/// A plain-text email waiting to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
	pub to: String,
	pub subject: String,
	pub body: String,
}

/// Outbound mail delivery.
#[async_trait]
pub trait Mailer: Send + Sync {
	async fn send(&self, email: Email) -> Result<(), Error>;
}

/// Delivers mail over SMTP.
pub struct SmtpMailer {
	transport: AsyncSmtpTransport<Tokio1Executor>,
	sender: String,
}

impl SmtpMailer {
	pub fn new(config: &config::Mail, sender: String) -> Result<Self, Error> {
		let builder = if config.use_ssl {
			AsyncSmtpTransport::<Tokio1Executor>::relay(&config.server)?
		} else if config.use_tls {
			AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.server)?
		} else {
			AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.server)
		};

		let builder = builder.port(config.port);
		let builder = match (&config.username, &config.password) {
			(Some(username), Some(password)) => {
				builder.credentials(Credentials::new(username.clone(), password.clone()))
			}
			_ => builder,
		};

		Ok(Self {
			transport: builder.build(),
			sender,
		})
	}
}

#[async_trait]
impl Mailer for SmtpMailer {
	async fn send(&self, email: Email) -> Result<(), Error> {
		let message = Message::builder()
			.from(self.sender.parse()?)
			.to(email.to.parse()?)
			.subject(email.subject)
			.header(ContentType::TEXT_PLAIN)
			.body(email.body)?;

		self.transport.send(message).await?;

		Ok(())
	}
}

/// Writes mail to the log instead of sending it. Used when no SMTP server is configured.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
	async fn send(&self, email: Email) -> Result<(), Error> {
		tracing::info!(to = %email.to, subject = %email.subject, body = %email.body, "email not sent, no mail server configured");

		Ok(())
	}
}

pub fn confirmation(blog_name: &str, to: &str, username: &str, link: &str) -> Email {
	Email {
		to: to.to_string(),
		subject: format!("{blog_name}: please confirm your email"),
		body: format!(
			"Hi {username},\n\nWelcome to {blog_name}! Please confirm your email address by opening the link below:\n\n{link}\n\nThe link expires soon. If you did not sign up, you can ignore this email.\n"
		),
	}
}

pub fn password_reset(blog_name: &str, to: &str, username: &str, link: &str) -> Email {
	Email {
		to: to.to_string(),
		subject: format!("{blog_name}: reset your password"),
		body: format!(
			"Hi {username},\n\nTo reset your password, open the link below:\n\n{link}\n\nIf you did not request a password reset, ignore this email and your password will stay the same.\n"
		),
	}
}

pub fn new_subscriber(blog_name: &str, to: &str, subscriber: &str) -> Email {
	Email {
		to: to.to_string(),
		subject: format!("{blog_name}: new subscriber"),
		body: format!("{subscriber} just subscribed to the {blog_name} newsletter.\n"),
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_confirmation_contains_link() {
		let email = confirmation(
			"Liquid Blossom",
			"alice@example.com",
			"alice",
			"http://localhost/confirm/abc",
		);

		assert_eq!(email.to, "alice@example.com");
		assert!(email.subject.contains("confirm"));
		assert!(email.body.contains("http://localhost/confirm/abc"));
		assert!(email.body.contains("alice"));
	}

	#[tokio::test]
	async fn test_log_mailer_never_fails() {
		let email = new_subscriber("Liquid Blossom", "admin@example.com", "bob@example.com");

		assert!(LogMailer.send(email).await.is_ok());
	}
}
