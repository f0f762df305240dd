//! Mass mail to the subscription list, logged as email records

use chrono::Utc;
use uuid::Uuid;

use super::email_body_footer;
use crate::config::Config;
use crate::db::Database;
use crate::errors::{AppError, AppResult};
use crate::forms::CleanBroadcast;
use crate::ics;
use crate::mail::{Email, MailChannel, Mailer};
use crate::models::unsubscribe_path;

/// One addressee of a broadcast. Dry runs use a recipient with no stored subscription.
#[derive(Debug, Clone)]
pub struct BroadcastRecipient {
    pub subscription_id: Option<i64>,
    pub email: String,
    pub unsubscribe_key: Uuid,
}

impl BroadcastRecipient {
    fn preview(config: &Config) -> Self {
        Self {
            subscription_id: None,
            email: config.email.broadcast_preview.clone(),
            unsubscribe_key: Uuid::new_v4(),
        }
    }
}

fn recipients(db: &Database, config: &Config, dry_run: bool) -> AppResult<Vec<BroadcastRecipient>> {
    if dry_run {
        return Ok(vec![BroadcastRecipient::preview(config)]);
    }

    Ok(db
        .list_subscriptions()?
        .into_iter()
        .map(|s| BroadcastRecipient {
            subscription_id: Some(s.id),
            email: s.email,
            unsubscribe_key: s.unsubscribe_key,
        })
        .collect())
}

/// Send a broadcast and return how many messages went out.
///
/// Every message is recorded before sending and stamped as sent afterwards. A
/// delivery failure aborts the request and leaves the records unsent.
pub async fn send_broadcast(
    db: &Database,
    mailer: &dyn Mailer,
    config: &Config,
    broadcast: &CleanBroadcast,
) -> AppResult<usize> {
    let attachment = match &broadcast.ics_workshop {
        Some(slug) => {
            let workshop = db.get_workshop_by_slug(slug)?.ok_or(AppError::NotFound)?;
            ics::ics_attachment(config, &workshop)
        }
        None => None,
    };

    let mut messages = Vec::new();
    let mut record_ids = Vec::new();

    for recipient in recipients(db, config, broadcast.dry_run)? {
        let unsubscribe_url = config.absolute_url(&unsubscribe_path(&recipient.unsubscribe_key));
        let body = format!("{}{}", broadcast.body, email_body_footer(&unsubscribe_url));

        let record_id = db.create_email_record(
            recipient.subscription_id,
            &recipient.email,
            &broadcast.subject,
            &body,
        )?;
        record_ids.push(record_id);

        let mut message = Email::new(
            &config.email.default_from,
            &recipient.email,
            &broadcast.subject,
            &body,
        );
        message.reply_to = vec![config.email.default_from.clone()];
        message.headers = vec![
            ("X-PM-Message-Stream".to_string(), config.email.postmark_stream.clone()),
            ("List-Unsubscribe".to_string(), unsubscribe_url),
            (
                "List-Unsubscribe-Post".to_string(),
                "List-Unsubscribe=One-Click".to_string(),
            ),
        ];
        message.attachments.extend(attachment.clone());
        messages.push(message);
    }

    let sent = mailer.send_messages(MailChannel::Broadcast, &messages).await?;
    db.mark_email_records_sent(&record_ids, Utc::now())?;

    log::info!(
        "Broadcast \"{}\" sent to {} recipient(s){}",
        broadcast.subject,
        sent,
        if broadcast.dry_run { " (dry run)" } else { "" }
    );

    Ok(sent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::MemoryMailer;
    use crate::models::WorkshopInput;
    use chrono::NaiveDateTime;

    fn broadcast(dry_run: bool, ics_workshop: Option<&str>) -> CleanBroadcast {
        CleanBroadcast {
            subject: "Spring term".to_string(),
            body: "New workshops are up.".to_string(),
            dry_run,
            ics_workshop: ics_workshop.map(|s| s.to_string()),
        }
    }

    fn setup() -> (Database, MemoryMailer, Config) {
        let db = Database::in_memory().unwrap();
        db.create_subscription("one@example.com").unwrap();
        db.create_subscription("two@example.com").unwrap();
        (db, MemoryMailer::new(), Config::for_tests())
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_subscriber() {
        let (db, mailer, config) = setup();

        let sent = send_broadcast(&db, &mailer, &config, &broadcast(false, None))
            .await
            .unwrap();
        assert_eq!(sent, 2);

        let outbox = mailer.outbox_for(MailChannel::Broadcast);
        assert_eq!(outbox.len(), 2);

        let subscription = &db.list_subscriptions().unwrap()[0];
        let message = outbox
            .iter()
            .find(|m| m.to == vec![subscription.email.clone()])
            .unwrap();
        let url = format!(
            "http://localhost:8000/unsubscribe/{}/",
            subscription.unsubscribe_key
        );
        assert_eq!(
            message.body,
            format!("New workshops are up.\n\n---\nUnsubscribe:\n{}\n", url)
        );
        assert_eq!(message.header("List-Unsubscribe"), Some(url.as_str()));
        assert_eq!(
            message.header("List-Unsubscribe-Post"),
            Some("List-Unsubscribe=One-Click")
        );
        assert_eq!(message.header("X-PM-Message-Stream"), Some("broadcast"));
        assert_eq!(message.reply_to, vec![config.email.default_from.clone()]);
        assert!(message.attachments.is_empty());

        let records = db.list_email_records().unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.sent_at.is_some()));
        assert!(records.iter().all(|r| r.subscription_id.is_some()));
    }

    #[tokio::test]
    async fn test_dry_run_only_reaches_preview() {
        let (db, mailer, config) = setup();

        let sent = send_broadcast(&db, &mailer, &config, &broadcast(true, None))
            .await
            .unwrap();
        assert_eq!(sent, 1);

        let outbox = mailer.outbox();
        assert_eq!(outbox[0].to, vec!["preview@example.com"]);

        let records = db.list_email_records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].subscription_id, None);
        assert!(records[0].sent_at.is_some());
    }

    #[tokio::test]
    async fn test_broadcast_with_calendar() {
        let (db, mailer, config) = setup();
        db.create_workshop(&WorkshopInput {
            title: "Django".to_string(),
            slug: "django".to_string(),
            body: String::new(),
            scheduled_at: Some(
                NaiveDateTime::parse_from_str("2022-04-02 18:30", "%Y-%m-%d %H:%M").unwrap(),
            ),
            location_name: "Newspeak House".to_string(),
            location_address: "London".to_string(),
            location_url: String::new(),
            is_confirmed: true,
        })
        .unwrap();

        send_broadcast(&db, &mailer, &config, &broadcast(false, Some("django")))
            .await
            .unwrap();

        for message in mailer.outbox() {
            assert_eq!(message.attachments.len(), 1);
            assert_eq!(message.attachments[0].filename, "chaitin-school-django.ics");
        }
    }

    #[tokio::test]
    async fn test_unknown_workshop_sends_nothing() {
        let (db, mailer, config) = setup();
        let result = send_broadcast(&db, &mailer, &config, &broadcast(false, Some("nope"))).await;
        assert!(matches!(result, Err(AppError::NotFound)));
        assert!(mailer.outbox().is_empty());
        assert_eq!(db.count_email_records().unwrap(), 0);
    }
}
