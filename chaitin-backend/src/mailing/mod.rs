//! Mail content for the community: list broadcasts, RSVP confirmations and admin notices

mod broadcast;

pub use broadcast::{BroadcastRecipient, send_broadcast};

use crate::config::Config;
use crate::ics;
use crate::mail::{Email, MailChannel, MailError, Mailer, mail_admins};
use crate::models::Workshop;

const RSVP_DATE_FORMAT: &str = "%a, %B %-d, %Y at %H:%M";

/// Appended to every list message
pub fn email_body_footer(unsubscribe_url: &str) -> String {
    format!("\n\n---\nUnsubscribe:\n{}\n", unsubscribe_url)
}

/// Plain-text workshop summary sent to attendees
pub fn workshop_email_body(config: &Config, workshop: &Workshop) -> String {
    let when = match &workshop.scheduled_at {
        Some(at) => format!("On {}", at.format(RSVP_DATE_FORMAT)),
        None => "Date to be announced".to_string(),
    };

    format!(
        "You are attending:\n\n**{title}**\n{url}\n\nLocation:\n{name}\n{address}\n{location_url}\n\n{when}\n\nSee you there!\n\n{project}\n{home}\n",
        title = workshop.title,
        url = config.absolute_url(&workshop.path()),
        name = workshop.location_name,
        address = workshop.location_address,
        location_url = workshop.location_url,
        when = when,
        project = config.project_name,
        home = config.absolute_url(""),
    )
}

/// Confirmation for an attendee, with the calendar attached when the date is known
pub fn rsvp_email(config: &Config, workshop: &Workshop, email: &str) -> Email {
    let mut message = Email::new(
        &config.email.default_from,
        email,
        &format!("See you at: {}", workshop.title),
        &workshop_email_body(config, workshop),
    );
    message.attachments.extend(ics::ics_attachment(config, workshop));
    message
}

/// Send the RSVP confirmation and tell the admins about it
pub async fn notify_rsvp(
    mailer: &dyn Mailer,
    config: &Config,
    workshop: &Workshop,
    email: &str,
) -> Result<(), MailError> {
    mailer
        .send(MailChannel::Transactional, rsvp_email(config, workshop, email))
        .await?;

    mail_admins(
        mailer,
        config,
        &format!("RSVP <{}> for {}", email, workshop.title),
        &format!("**RSVP**\n\n<{}>\n\n**Workshop**\n\n{}", email, workshop.title),
    )
    .await
}

/// Admin notice for a new list subscriber
pub async fn notify_subscription(
    mailer: &dyn Mailer,
    config: &Config,
    email: &str,
) -> Result<(), MailError> {
    mail_admins(
        mailer,
        config,
        &format!("New subscription: {}", email),
        &format!(
            "Someone new has subscribed to the {} list. Hooray!\n\nIt's {}\n",
            config.project_name, email
        ),
    )
    .await
}
