//! Contact-form records: workshop submissions, proposals, requests, feedback, incident reports

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Submission {
    pub id: i64,
    pub submitter: String,
    pub email: String,
    pub links: String,
    pub title: String,
    pub topic: String,
    pub audience: String,
    pub outcome: String,
    pub when: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Proposal {
    pub id: i64,
    pub email: String,
    pub topic: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Request {
    pub id: i64,
    pub email: Option<String>,
    pub topic: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Feedback {
    pub id: i64,
    pub comment: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Incident {
    pub id: i64,
    pub name: Option<String>,
    pub email: Option<String>,
    pub description: String,
    pub occurred_at: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields of a workshop submission before it is stored
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub submitter: String,
    pub email: String,
    pub links: String,
    pub title: String,
    pub topic: String,
    pub audience: String,
    pub outcome: String,
    pub when: String,
}

#[derive(Debug, Clone)]
pub struct NewIncident {
    pub name: Option<String>,
    pub email: Option<String>,
    pub description: String,
    pub occurred_at: Option<String>,
}
