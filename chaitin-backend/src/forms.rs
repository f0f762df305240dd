//! Form payloads and their validation
//!
//! Every form deserializes with `#[serde(default)]` so a missing field turns into a
//! field error on re-render instead of a 400 from the extractor.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{NewIncident, NewSubmission, PostInput, UserProfileUpdate, WorkshopInput};
use crate::validators::{
    self, MSG_INVALID_EMAIL, MSG_INVALID_SLUG, MSG_REQUIRED, is_valid_email, is_valid_slug,
};

/// Option value of the broadcast form meaning "no calendar attachment"
pub const NO_ICS: &str = "no-ics";

/// Accepted formats for date-time inputs (`datetime-local` and plain text)
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%d %H:%M:%S"];

/// Field name -> error messages, rendered next to the inputs
#[derive(Debug, Default, Clone, Serialize, PartialEq)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn has(&self, field: &str) -> bool {
        !self.get(field).is_empty()
    }

    /// Ok(value) when no error was recorded
    pub fn into_result<T>(self, value: T) -> Result<T, FormErrors> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }

    fn require(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.add(field, MSG_REQUIRED);
        }
    }

    fn require_email(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.add(field, MSG_REQUIRED);
        } else if !is_valid_email(value.trim()) {
            self.add(field, MSG_INVALID_EMAIL);
        }
    }

    fn optional_email(&mut self, field: &str, value: &str) {
        if !value.trim().is_empty() && !is_valid_email(value.trim()) {
            self.add(field, MSG_INVALID_EMAIL);
        }
    }

    fn require_slug(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.add(field, MSG_REQUIRED);
        } else if !is_valid_slug(value.trim()) {
            self.add(field, MSG_INVALID_SLUG);
        }
    }
}

/// HTML checkboxes post "on" when ticked and nothing otherwise
fn checked(value: &Option<String>) -> bool {
    matches!(value.as_deref(), Some("on") | Some("true") | Some("1"))
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
}

fn parse_datetime_input(value: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value.trim(), fmt).ok())
}

/// Parse an optional date-time field, recording an error when it is malformed
fn optional_datetime(errors: &mut FormErrors, field: &str, value: &str) -> Option<NaiveDateTime> {
    if value.trim().is_empty() {
        return None;
    }
    let parsed = parse_datetime_input(value);
    if parsed.is_none() {
        errors.add(field, "Enter a valid date/time.");
    }
    parsed
}

// ============================================
// Mailing list and RSVP
// ============================================

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailForm {
    pub email: String,
}

impl EmailForm {
    /// Trimmed email, or the field errors
    pub fn clean(&self) -> Result<String, FormErrors> {
        let mut errors = FormErrors::new();
        errors.require_email("email", &self.email);
        errors.into_result(self.email.trim().to_string())
    }
}

pub type SubscriptionForm = EmailForm;
pub type AttendanceForm = EmailForm;

// ============================================
// Contact forms
// ============================================

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackForm {
    pub comment: String,
}

impl FeedbackForm {
    pub fn clean(&self) -> Result<String, FormErrors> {
        let mut errors = FormErrors::new();
        errors.require("comment", &self.comment);
        errors.into_result(self.comment.trim().to_string())
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmissionForm {
    pub submitter: String,
    pub email: String,
    pub links: String,
    pub title: String,
    pub topic: String,
    pub audience: String,
    pub outcome: String,
    pub when: String,
}

impl SubmissionForm {
    pub fn clean(&self) -> Result<NewSubmission, FormErrors> {
        let mut errors = FormErrors::new();
        errors.require("submitter", &self.submitter);
        errors.require_email("email", &self.email);
        errors.require("title", &self.title);
        errors.require("topic", &self.topic);

        errors.into_result(NewSubmission {
            submitter: self.submitter.trim().to_string(),
            email: self.email.trim().to_string(),
            links: self.links.trim().to_string(),
            title: self.title.trim().to_string(),
            topic: self.topic.trim().to_string(),
            audience: self.audience.trim().to_string(),
            outcome: self.outcome.trim().to_string(),
            when: self.when.trim().to_string(),
        })
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProposalForm {
    pub email: String,
    pub topic: String,
}

impl ProposalForm {
    pub fn clean(&self) -> Result<(String, String), FormErrors> {
        let mut errors = FormErrors::new();
        errors.require_email("email", &self.email);
        errors.require("topic", &self.topic);
        errors.into_result((self.email.trim().to_string(), self.topic.trim().to_string()))
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestForm {
    pub email: String,
    pub topic: String,
}

impl RequestForm {
    pub fn clean(&self) -> Result<(Option<String>, String), FormErrors> {
        let mut errors = FormErrors::new();
        errors.optional_email("email", &self.email);
        errors.require("topic", &self.topic);
        errors.into_result((non_empty(&self.email), self.topic.trim().to_string()))
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IncidentForm {
    pub name: String,
    pub email: String,
    pub description: String,
    pub occurred_at: String,
}

impl IncidentForm {
    pub fn clean(&self) -> Result<NewIncident, FormErrors> {
        let mut errors = FormErrors::new();
        errors.optional_email("email", &self.email);
        errors.require("description", &self.description);
        errors.into_result(NewIncident {
            name: non_empty(&self.name),
            email: non_empty(&self.email),
            description: self.description.trim().to_string(),
            occurred_at: non_empty(&self.occurred_at),
        })
    }
}

// ============================================
// Broadcasts
// ============================================

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadcastForm {
    pub subject: String,
    pub body: String,
    pub dry_run: Option<String>,
    /// Workshop slug, or `no-ics`
    pub ics_attachment: String,
}

/// Validated broadcast input
#[derive(Debug, Clone)]
pub struct CleanBroadcast {
    pub subject: String,
    pub body: String,
    pub dry_run: bool,
    /// Slug of the workshop whose calendar goes along, if any
    pub ics_workshop: Option<String>,
}

impl BroadcastForm {
    /// `choices` are the slugs of scheduled workshops
    pub fn clean(&self, choices: &[String]) -> Result<CleanBroadcast, FormErrors> {
        let mut errors = FormErrors::new();
        errors.require("subject", &self.subject);
        errors.require("body", &self.body);

        let choice = self.ics_attachment.trim();
        let ics_workshop = if choice.is_empty() {
            errors.add("ics_attachment", MSG_REQUIRED);
            None
        } else if choice == NO_ICS {
            None
        } else if choices.iter().any(|c| c == choice) {
            Some(choice.to_string())
        } else {
            errors.add(
                "ics_attachment",
                format!("Select a valid choice. {} is not one of the available choices.", choice),
            );
            None
        };

        errors.into_result(CleanBroadcast {
            subject: self.subject.trim().to_string(),
            body: self.body.clone(),
            dry_run: checked(&self.dry_run),
            ics_workshop,
        })
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnounceForm {
    pub subject: String,
    pub body: String,
    pub dry_run: Option<String>,
}

impl AnnounceForm {
    /// The announcement always carries its workshop's calendar
    pub fn clean(&self, workshop_slug: &str) -> Result<CleanBroadcast, FormErrors> {
        let mut errors = FormErrors::new();
        errors.require("subject", &self.subject);
        errors.require("body", &self.body);
        errors.into_result(CleanBroadcast {
            subject: self.subject.trim().to_string(),
            body: self.body.clone(),
            dry_run: checked(&self.dry_run),
            ics_workshop: Some(workshop_slug.to_string()),
        })
    }
}

// ============================================
// Accounts
// ============================================

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UserCreationForm {
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password1: String,
    #[serde(skip_serializing)]
    pub password2: String,
}

impl UserCreationForm {
    /// Field checks that need no database access; uniqueness is checked by the caller
    pub fn clean(&self) -> Result<(String, String, String), FormErrors> {
        let mut errors = FormErrors::new();
        let username = self.username.trim();

        if username.is_empty() {
            errors.add("username", MSG_REQUIRED);
        } else if let Err(msg) = validators::validate_username(username) {
            errors.add("username", msg);
        }
        errors.optional_email("email", &self.email);

        if self.password1.is_empty() {
            errors.add("password1", MSG_REQUIRED);
        }
        if self.password2.is_empty() {
            errors.add("password2", MSG_REQUIRED);
        } else if self.password1 != self.password2 {
            errors.add("password2", "The two password fields didn’t match.");
        } else {
            for msg in validators::validate_password(&self.password2, username) {
                errors.add("password2", msg);
            }
        }

        errors.into_result((
            username.to_string(),
            self.email.trim().to_string(),
            self.password1.clone(),
        ))
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub next: String,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UserUpdateForm {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub about: String,
    pub is_public: Option<String>,
}

impl UserUpdateForm {
    pub fn clean(&self) -> Result<UserProfileUpdate, FormErrors> {
        let mut errors = FormErrors::new();
        let username = self.username.trim();
        if username.is_empty() {
            errors.add("username", MSG_REQUIRED);
        } else if let Err(msg) = validators::validate_username(username) {
            errors.add("username", msg);
        }
        errors.optional_email("email", &self.email);

        errors.into_result(UserProfileUpdate {
            username: username.to_string(),
            email: self.email.trim().to_string(),
            full_name: self.full_name.trim().to_string(),
            about: self.about.clone(),
            is_public: checked(&self.is_public),
        })
    }
}

// ============================================
// Content (back-office and mentorships)
// ============================================

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PostForm {
    pub title: String,
    pub slug: String,
    pub body: String,
    /// Empty for a draft
    pub published_at: String,
}

impl PostForm {
    pub fn clean(&self, author_id: Option<i64>) -> Result<PostInput, FormErrors> {
        let mut errors = FormErrors::new();
        errors.require("title", &self.title);
        errors.require_slug("slug", &self.slug);
        errors.require("body", &self.body);
        let published_at = optional_datetime(&mut errors, "published_at", &self.published_at)
            .map(|naive| DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc));

        errors.into_result(PostInput {
            title: self.title.trim().to_string(),
            slug: self.slug.trim().to_string(),
            body: self.body.clone(),
            published_at,
            author_id,
        })
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkshopForm {
    pub title: String,
    pub slug: String,
    pub body: String,
    /// Empty for a draft
    pub scheduled_at: String,
    pub location_name: String,
    pub location_address: String,
    pub location_url: String,
    pub is_confirmed: Option<String>,
}

impl WorkshopForm {
    pub fn clean(&self) -> Result<WorkshopInput, FormErrors> {
        let mut errors = FormErrors::new();
        errors.require("title", &self.title);
        errors.require_slug("slug", &self.slug);
        let scheduled_at = optional_datetime(&mut errors, "scheduled_at", &self.scheduled_at);

        errors.into_result(WorkshopInput {
            title: self.title.trim().to_string(),
            slug: self.slug.trim().to_string(),
            body: self.body.clone(),
            scheduled_at,
            location_name: self.location_name.trim().to_string(),
            location_address: self.location_address.trim().to_string(),
            location_url: self.location_url.trim().to_string(),
            is_confirmed: checked(&self.is_confirmed),
        })
    }
}

/// Slugs taken by fixed routes under `/mentorships/`
const RESERVED_MENTORSHIP_SLUGS: &[&str] = &["new"];

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MentorshipForm {
    pub title: String,
    pub slug: String,
    pub body: String,
}

impl MentorshipForm {
    /// Returns (title, slug, body); the slug falls back to the slugified title
    pub fn clean(&self) -> Result<(String, String, String), FormErrors> {
        let mut errors = FormErrors::new();
        errors.require("title", &self.title);
        errors.require("body", &self.body);

        let slug = if self.slug.trim().is_empty() {
            validators::slugify(&self.title)
        } else {
            self.slug.trim().to_string()
        };
        if !self.title.trim().is_empty() && !is_valid_slug(&slug) {
            errors.add("slug", MSG_INVALID_SLUG);
        } else if RESERVED_MENTORSHIP_SLUGS.contains(&slug.as_str()) {
            errors.add("slug", "This slug is reserved.");
        }

        errors.into_result((self.title.trim().to_string(), slug, self.body.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_form() {
        let form = EmailForm {
            email: "  tester@example.com ".to_string(),
        };
        assert_eq!(form.clean().unwrap(), "tester@example.com");

        let errors = EmailForm::default().clean().unwrap_err();
        assert_eq!(errors.get("email"), &[MSG_REQUIRED.to_string()]);

        let errors = EmailForm {
            email: "nope".to_string(),
        }
        .clean()
        .unwrap_err();
        assert_eq!(errors.get("email"), &[MSG_INVALID_EMAIL.to_string()]);
    }

    #[test]
    fn test_broadcast_choices() {
        let choices = vec!["django".to_string()];
        let form = BroadcastForm {
            subject: "News".to_string(),
            body: "Hello".to_string(),
            dry_run: Some("on".to_string()),
            ics_attachment: NO_ICS.to_string(),
        };
        let clean = form.clean(&choices).unwrap();
        assert!(clean.dry_run);
        assert_eq!(clean.ics_workshop, None);

        let form = BroadcastForm {
            ics_attachment: "django".to_string(),
            dry_run: None,
            ..form
        };
        let clean = form.clean(&choices).unwrap();
        assert!(!clean.dry_run);
        assert_eq!(clean.ics_workshop.as_deref(), Some("django"));

        let form = BroadcastForm {
            ics_attachment: "missing".to_string(),
            ..form
        };
        assert!(form.clean(&choices).unwrap_err().has("ics_attachment"));
    }

    #[test]
    fn test_user_creation_form() {
        let form = UserCreationForm {
            username: "gregory".to_string(),
            email: "g@example.com".to_string(),
            password1: "kolmogorov-1965".to_string(),
            password2: "kolmogorov-1965".to_string(),
        };
        let (username, email, password) = form.clean().unwrap();
        assert_eq!(username, "gregory");
        assert_eq!(email, "g@example.com");
        assert_eq!(password, "kolmogorov-1965");

        let mismatch = UserCreationForm {
            password2: "something-else".to_string(),
            ..form.clone()
        };
        assert!(mismatch.clean().unwrap_err().has("password2"));

        let bad_username = UserCreationForm {
            username: "---".to_string(),
            ..form
        };
        let errors = bad_username.clean().unwrap_err();
        assert_eq!(errors.get("username"), &[validators::MSG_HYPHEN_ONLY.to_string()]);
    }

    #[test]
    fn test_workshop_form_datetime() {
        let form = WorkshopForm {
            title: "Django".to_string(),
            slug: "django".to_string(),
            scheduled_at: "2022-04-02T18:30".to_string(),
            is_confirmed: Some("on".to_string()),
            ..Default::default()
        };
        let input = form.clean().unwrap();
        assert_eq!(
            input.scheduled_at.unwrap().format("%Y-%m-%d %H:%M").to_string(),
            "2022-04-02 18:30"
        );
        assert!(input.is_confirmed);

        let draft = WorkshopForm {
            scheduled_at: String::new(),
            ..form.clone()
        };
        assert!(draft.clean().unwrap().scheduled_at.is_none());

        let broken = WorkshopForm {
            scheduled_at: "next tuesday".to_string(),
            ..form
        };
        assert!(broken.clean().unwrap_err().has("scheduled_at"));
    }

    #[test]
    fn test_mentorship_slug_fallback() {
        let form = MentorshipForm {
            title: "Intro to Rust".to_string(),
            slug: String::new(),
            body: "Weekly pairing".to_string(),
        };
        let (_, slug, _) = form.clean().unwrap();
        assert_eq!(slug, "intro-to-rust");
    }

    #[test]
    fn test_mentorship_reserved_slug() {
        let form = MentorshipForm {
            title: "New".to_string(),
            slug: String::new(),
            body: "Weekly pairing".to_string(),
        };
        assert!(form.clean().unwrap_err().has("slug"));

        let explicit = MentorshipForm {
            title: "Pairing".to_string(),
            slug: "new".to_string(),
            body: "Weekly pairing".to_string(),
        };
        assert!(explicit.clean().unwrap_err().has("slug"));
    }
}
