//! SMTP delivery through lettre, one relay per mail channel

use async_trait::async_trait;
use lettre::message::header::{ContentType, HeaderName, HeaderValue};
use lettre::message::{Attachment as MailAttachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{Email, MailChannel, MailError, Mailer};
use crate::config::EmailConfig;

pub struct SmtpMailer {
    config: EmailConfig,
}

impl SmtpMailer {
    pub fn new(config: &EmailConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    fn transport(&self, channel: MailChannel) -> Result<AsyncSmtpTransport<Tokio1Executor>, MailError> {
        let host = match channel {
            MailChannel::Transactional => &self.config.host,
            MailChannel::Broadcast => &self.config.host_broadcasts,
        };

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| MailError::Transport(e.to_string()))?
            .port(self.config.port);

        if let (Some(username), Some(password)) = (&self.config.username, &self.config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(builder.build())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address.parse().map_err(|e: lettre::address::AddressError| MailError::Address {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

/// Convert our message into a lettre message
pub(crate) fn build_message(email: &Email) -> Result<Message, MailError> {
    let mut builder = Message::builder()
        .from(parse_mailbox(&email.from)?)
        .subject(email.subject.clone());

    for to in &email.to {
        builder = builder.to(parse_mailbox(to)?);
    }
    for reply_to in &email.reply_to {
        builder = builder.reply_to(parse_mailbox(reply_to)?);
    }
    for (name, value) in &email.headers {
        let name = HeaderName::new_from_ascii(name.clone())
            .map_err(|e| MailError::Build(format!("invalid header {}: {}", name, e)))?;
        builder = builder.raw_header(HeaderValue::new(name, value.clone()));
    }

    let message = if email.attachments.is_empty() {
        builder
            .header(ContentType::TEXT_PLAIN)
            .body(email.body.clone())
    } else {
        let mut multipart = MultiPart::mixed().singlepart(SinglePart::plain(email.body.clone()));
        for attachment in &email.attachments {
            let content_type = ContentType::parse(&attachment.content_type)
                .map_err(|e| MailError::Build(e.to_string()))?;
            multipart = multipart.singlepart(
                MailAttachment::new(attachment.filename.clone())
                    .body(attachment.content.clone(), content_type),
            );
        }
        builder.multipart(multipart)
    };

    message.map_err(|e| MailError::Build(e.to_string()))
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_messages(&self, channel: MailChannel, messages: &[Email]) -> Result<usize, MailError> {
        if messages.is_empty() {
            return Ok(0);
        }

        let transport = self.transport(channel)?;
        let mut sent = 0;
        for email in messages {
            let message = build_message(email)?;
            transport
                .send(message)
                .await
                .map_err(|e| MailError::Transport(e.to_string()))?;
            sent += 1;
        }

        log::info!("Sent {} message(s) via {} relay", sent, channel);
        Ok(sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::Attachment;

    fn broadcast_email() -> Email {
        let mut email = Email::new(
            "Chaitin School <x@chaitinschool.org>",
            "tester@example.com",
            "Hello",
            "Body",
        );
        email.reply_to.push("Chaitin School <x@chaitinschool.org>".to_string());
        email
            .headers
            .push(("List-Unsubscribe".to_string(), "https://chaitinschool.org/unsubscribe/x/".to_string()));
        email
    }

    #[test]
    fn test_build_plain_message_with_headers() {
        let message = build_message(&broadcast_email()).unwrap();
        let formatted = String::from_utf8(message.formatted()).unwrap();
        assert!(formatted.contains("Subject: Hello"));
        assert!(formatted.contains("List-Unsubscribe: https://chaitinschool.org/unsubscribe/x/"));
        assert!(formatted.contains("Reply-To: "));
    }

    #[test]
    fn test_build_message_with_attachment() {
        let mut email = broadcast_email();
        email.attachments.push(Attachment {
            filename: "chaitin-school-django.ics".to_string(),
            content: "BEGIN:VCALENDAR\r\nEND:VCALENDAR\r\n".to_string(),
            content_type: "application/octet-stream".to_string(),
        });
        let formatted = String::from_utf8(build_message(&email).unwrap().formatted()).unwrap();
        assert!(formatted.contains("multipart/mixed"));
        assert!(formatted.contains("chaitin-school-django.ics"));
    }

    #[test]
    fn test_invalid_address_rejected() {
        let email = Email::new("not an address", "tester@example.com", "s", "b");
        assert!(matches!(build_message(&email), Err(MailError::Address { .. })));
    }
}
