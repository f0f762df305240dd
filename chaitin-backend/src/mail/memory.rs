//! Non-delivering backends: in-memory outbox (tests) and log output (development)

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{Email, MailChannel, MailError, Mailer};

/// Keeps every message, like a test outbox
#[derive(Default)]
pub struct MemoryMailer {
    outbox: Mutex<Vec<(MailChannel, Email)>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outbox(&self) -> Vec<Email> {
        self.outbox.lock().iter().map(|(_, email)| email.clone()).collect()
    }

    /// Messages sent through one channel
    pub fn outbox_for(&self, channel: MailChannel) -> Vec<Email> {
        self.outbox
            .lock()
            .iter()
            .filter(|(c, _)| *c == channel)
            .map(|(_, email)| email.clone())
            .collect()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send_messages(&self, channel: MailChannel, messages: &[Email]) -> Result<usize, MailError> {
        let mut outbox = self.outbox.lock();
        outbox.extend(messages.iter().cloned().map(|email| (channel, email)));
        Ok(messages.len())
    }
}

/// Writes messages to the log instead of sending them
pub struct ConsoleMailer;

#[async_trait]
impl Mailer for ConsoleMailer {
    async fn send_messages(&self, channel: MailChannel, messages: &[Email]) -> Result<usize, MailError> {
        for email in messages {
            log::info!(
                "[{}] mail from {} to {}: {}\n{}{}",
                channel,
                email.from,
                email.to.join(", "),
                email.subject,
                email.body,
                email
                    .attachments
                    .iter()
                    .map(|a| format!("\n[attachment {} ({})]", a.filename, a.content_type))
                    .collect::<String>()
            );
        }
        Ok(messages.len())
    }
}
