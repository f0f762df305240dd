//! Outgoing mail: message type, delivery backends and the admin notification helper

mod memory;
mod smtp;

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use strum::Display;
use thiserror::Error;

use crate::config::{Config, EmailBackend};

pub use memory::{ConsoleMailer, MemoryMailer};
pub use smtp::SmtpMailer;

#[derive(Error, Debug)]
pub enum MailError {
    #[error("Invalid address {address}: {reason}")]
    Address { address: String, reason: String },

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("SMTP transport error: {0}")]
    Transport(String),
}

/// Which SMTP relay a message goes through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
pub enum MailChannel {
    /// Account, RSVP and admin notifications
    Transactional,
    /// Broadcasts and announcements to the whole list
    Broadcast,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attachment {
    pub filename: String,
    pub content: String,
    pub content_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Email {
    pub from: String,
    pub to: Vec<String>,
    pub reply_to: Vec<String>,
    pub subject: String,
    pub body: String,
    /// Extra headers, in order
    pub headers: Vec<(String, String)>,
    pub attachments: Vec<Attachment>,
}

impl Email {
    pub fn new(from: &str, to: &str, subject: &str, body: &str) -> Self {
        Self {
            from: from.to_string(),
            to: vec![to.to_string()],
            reply_to: Vec::new(),
            subject: subject.to_string(),
            body: body.to_string(),
            headers: Vec::new(),
            attachments: Vec::new(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Delivery backend. Messages are sent in order; the first failure aborts the rest.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_messages(&self, channel: MailChannel, messages: &[Email]) -> Result<usize, MailError>;

    async fn send(&self, channel: MailChannel, message: Email) -> Result<(), MailError> {
        self.send_messages(channel, std::slice::from_ref(&message)).await?;
        Ok(())
    }
}

/// Build the configured backend
pub fn create_mailer(config: &Config) -> Arc<dyn Mailer> {
    match config.email.backend {
        EmailBackend::Smtp => Arc::new(SmtpMailer::new(&config.email)),
        EmailBackend::Console => Arc::new(ConsoleMailer),
        EmailBackend::Memory => Arc::new(MemoryMailer::new()),
    }
}

/// Notify the site admins; does nothing when no admin is configured
pub async fn mail_admins(
    mailer: &dyn Mailer,
    config: &Config,
    subject: &str,
    body: &str,
) -> Result<(), MailError> {
    if config.admins.is_empty() {
        return Ok(());
    }

    let message = Email {
        from: config.email.server_email.clone(),
        to: config.admins.clone(),
        reply_to: Vec::new(),
        subject: format!("{}{}", config.email.subject_prefix, subject),
        body: body.to_string(),
        headers: Vec::new(),
        attachments: Vec::new(),
    };

    mailer.send(MailChannel::Transactional, message).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mail_admins_uses_server_email() {
        let mailer = MemoryMailer::new();
        let config = Config::for_tests();

        mail_admins(&mailer, &config, "New subscription: a@example.com", "Hooray")
            .await
            .unwrap();

        let outbox = mailer.outbox();
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox[0].subject, "[chaitin] New subscription: a@example.com");
        assert_eq!(outbox[0].to, vec!["x@chaitinschool.org"]);
        assert_eq!(outbox[0].from, config.email.server_email);
    }

    #[tokio::test]
    async fn test_mail_admins_without_admins_is_noop() {
        let mailer = MemoryMailer::new();
        let mut config = Config::for_tests();
        config.admins.clear();

        mail_admins(&mailer, &config, "subject", "body").await.unwrap();
        assert!(mailer.outbox().is_empty());
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let mut email = Email::new("a@example.com", "b@example.com", "s", "b");
        email.headers.push(("List-Unsubscribe".to_string(), "https://x/".to_string()));
        assert_eq!(email.header("list-unsubscribe"), Some("https://x/"));
        assert_eq!(email.header("X-Missing"), None);
    }
}
