//! iCalendar (RFC 5545) text for workshops
//!
//! Event times are London wall-clock times, declared with a fixed Europe/London VTIMEZONE.

use chrono::{Duration, NaiveDateTime};

use crate::config::Config;
use crate::mail::Attachment;
use crate::models::Workshop;

const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S";

/// Workshops are booked as two-hour slots
const EVENT_LENGTH_HOURS: i64 = 2;

const VTIMEZONE_LONDON: &[&str] = &[
    "BEGIN:VTIMEZONE",
    "TZID:Europe/London",
    "BEGIN:DAYLIGHT",
    "TZNAME:GMT+1",
    "TZOFFSETFROM:+0000",
    "TZOFFSETTO:+0100",
    "DTSTART:19810329T010000",
    "RRULE:FREQ=YEARLY;BYMONTH=3;BYDAY=-1SU",
    "END:DAYLIGHT",
    "BEGIN:STANDARD",
    "TZNAME:GMT",
    "TZOFFSETFROM:+0100",
    "TZOFFSETTO:+0000",
    "DTSTART:19961027T020000",
    "RRULE:FREQ=YEARLY;BYMONTH=10;BYDAY=-1SU",
    "END:STANDARD",
    "END:VTIMEZONE",
];

/// Escape a TEXT property value
fn escape_text(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace(';', "\\;")
        .replace(',', "\\,")
        .replace("\r\n", "\\n")
        .replace('\n', "\\n")
}

fn format_timestamp(at: &NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

fn push_event(lines: &mut Vec<String>, config: &Config, workshop: &Workshop, at: &NaiveDateTime) {
    let begin = format_timestamp(at);
    let finish = format_timestamp(&(*at + Duration::hours(EVENT_LENGTH_HOURS)));

    lines.push("BEGIN:VEVENT".to_string());
    lines.push("TRANSP:OPAQUE".to_string());
    lines.push(format!("DTSTAMP:{}Z", begin));
    lines.push(format!("UID:{}@{}", begin, config.project_url));
    lines.push(format!("DTSTART;TZID=Europe/London:{}", begin));
    lines.push(format!("DTEND;TZID=Europe/London:{}", finish));
    lines.push(format!(
        "SUMMARY:{}: {}",
        escape_text(&config.project_name),
        escape_text(&workshop.title)
    ));
    lines.push(format!("DESCRIPTION:{}", config.absolute_url(&workshop.path())));
    lines.push(format!(
        "LOCATION:{}\\, {}",
        escape_text(&workshop.location_name),
        escape_text(&workshop.location_address)
    ));
    lines.push(format!("URL;VALUE=URI:{}", workshop.location_url));
    lines.push(format!("LAST-MODIFIED:{}Z", begin));
    lines.push(format!("CREATED:{}Z", begin));
    lines.push("END:VEVENT".to_string());
}

/// Calendar with one event per scheduled workshop; drafts are skipped
pub fn calendar(config: &Config, workshops: &[Workshop]) -> String {
    let mut lines: Vec<String> = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        format!("PRODID:{}/ics", config.project_name_slug),
        "CALSCALE:GREGORIAN".to_string(),
    ];
    lines.extend(VTIMEZONE_LONDON.iter().map(|l| l.to_string()));

    for workshop in workshops {
        if let Some(at) = &workshop.scheduled_at {
            push_event(&mut lines, config, workshop, at);
        }
    }

    lines.push("END:VCALENDAR".to_string());

    let mut out = lines.join("\r\n");
    out.push_str("\r\n");
    out
}

/// Calendar for a single workshop, `None` for drafts
pub fn workshop_ics(config: &Config, workshop: &Workshop) -> Option<String> {
    workshop
        .scheduled_at
        .map(|_| calendar(config, std::slice::from_ref(workshop)))
}

/// Download and attachment file name, e.g. `chaitin-school-django.ics`
pub fn ics_filename(config: &Config, workshop: &Workshop) -> String {
    format!("{}-{}.ics", config.project_name_slug, workshop.slug)
}

/// Mail attachment carrying the workshop calendar, if the workshop is scheduled
pub fn ics_attachment(config: &Config, workshop: &Workshop) -> Option<Attachment> {
    workshop_ics(config, workshop).map(|content| Attachment {
        filename: ics_filename(config, workshop),
        content,
        content_type: "application/octet-stream".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workshop(scheduled_at: Option<&str>) -> Workshop {
        Workshop {
            id: 1,
            title: "Django".to_string(),
            slug: "django".to_string(),
            body: "details about django".to_string(),
            scheduled_at: scheduled_at
                .map(|s| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()),
            location_name: "Newspeak House".to_string(),
            location_address: "133 Bethnal Green Rd, London E2 7DG".to_string(),
            location_url: "https://newspeak.house/".to_string(),
            is_confirmed: true,
        }
    }

    #[test]
    fn test_single_workshop_event() {
        let config = Config::for_tests();
        let ics = workshop_ics(&config, &workshop(Some("2022-04-02 18:30"))).unwrap();

        assert!(ics.starts_with("BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:chaitin-school/ics\r\n"));
        assert!(ics.ends_with("END:VEVENT\r\nEND:VCALENDAR\r\n"));
        assert!(ics.contains("TZID:Europe/London\r\n"));
        assert!(ics.contains("DTSTAMP:20220402T183000Z\r\n"));
        assert!(ics.contains("UID:20220402T183000@chaitinschool.org\r\n"));
        assert!(ics.contains("DTSTART;TZID=Europe/London:20220402T183000\r\n"));
        assert!(ics.contains("DTEND;TZID=Europe/London:20220402T203000\r\n"));
        assert!(ics.contains("SUMMARY:Chaitin School: Django\r\n"));
        assert!(ics.contains("DESCRIPTION:http://localhost:8000/workshops/django/\r\n"));
        assert!(ics.contains("LOCATION:Newspeak House\\, 133 Bethnal Green Rd\\, London E2 7DG\r\n"));
        assert!(ics.contains("URL;VALUE=URI:https://newspeak.house/\r\n"));
        assert_eq!(ics.matches("BEGIN:VEVENT").count(), 1);
    }

    #[test]
    fn test_event_end_crosses_midnight() {
        let config = Config::for_tests();
        let ics = workshop_ics(&config, &workshop(Some("2022-12-31 23:00"))).unwrap();
        assert!(ics.contains("DTEND;TZID=Europe/London:20230101T010000\r\n"));
    }

    #[test]
    fn test_draft_has_no_calendar() {
        let config = Config::for_tests();
        assert!(workshop_ics(&config, &workshop(None)).is_none());
        assert!(ics_attachment(&config, &workshop(None)).is_none());
    }

    #[test]
    fn test_calendar_skips_drafts() {
        let config = Config::for_tests();
        let mut second = workshop(Some("2022-05-01 10:00"));
        second.slug = "rust".to_string();
        let ics = calendar(&config, &[workshop(Some("2022-04-02 18:30")), workshop(None), second]);
        assert_eq!(ics.matches("BEGIN:VEVENT").count(), 2);
        assert!(ics.contains("/workshops/rust/"));
    }

    #[test]
    fn test_attachment_name() {
        let config = Config::for_tests();
        let attachment = ics_attachment(&config, &workshop(Some("2022-04-02 18:30"))).unwrap();
        assert_eq!(attachment.filename, "chaitin-school-django.ics");
        assert_eq!(attachment.content_type, "application/octet-stream");
    }

    #[test]
    fn test_escape_text() {
        assert_eq!(escape_text("a,b;c\\d\ne"), "a\\,b\\;c\\\\d\\ne");
    }
}
