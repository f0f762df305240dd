//! Contact-form database operations (submissions, proposals, requests, feedback, incidents)

use chrono::Utc;
use rusqlite::Result as SqliteResult;

use super::super::{Database, row_datetime};
use crate::models::{Feedback, Incident, NewIncident, NewSubmission, Proposal, Request, Submission};

impl Database {
    pub fn create_submission(&self, new: &NewSubmission) -> SqliteResult<Submission> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO submissions (submitter, email, links, title, topic, audience, outcome, \"when\")
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                &new.submitter,
                &new.email,
                &new.links,
                &new.title,
                &new.topic,
                &new.audience,
                &new.outcome,
                &new.when
            ],
        )?;

        Ok(Submission {
            id: conn.last_insert_rowid(),
            submitter: new.submitter.clone(),
            email: new.email.clone(),
            links: new.links.clone(),
            title: new.title.clone(),
            topic: new.topic.clone(),
            audience: new.audience.clone(),
            outcome: new.outcome.clone(),
            when: new.when.clone(),
        })
    }

    pub fn list_submissions(&self) -> SqliteResult<Vec<Submission>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, submitter, email, links, title, topic, audience, outcome, \"when\"
             FROM submissions ORDER BY id DESC",
        )?;
        let submissions = stmt
            .query_map([], |row| {
                Ok(Submission {
                    id: row.get(0)?,
                    submitter: row.get(1)?,
                    email: row.get(2)?,
                    links: row.get(3)?,
                    title: row.get(4)?,
                    topic: row.get(5)?,
                    audience: row.get(6)?,
                    outcome: row.get(7)?,
                    when: row.get(8)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(submissions)
    }

    pub fn create_proposal(&self, email: &str, topic: &str) -> SqliteResult<Proposal> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO proposals (email, topic) VALUES (?1, ?2)",
            [email, topic],
        )?;
        Ok(Proposal {
            id: conn.last_insert_rowid(),
            email: email.to_string(),
            topic: topic.to_string(),
        })
    }

    pub fn list_proposals(&self) -> SqliteResult<Vec<Proposal>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT id, email, topic FROM proposals ORDER BY id DESC")?;
        let proposals = stmt
            .query_map([], |row| {
                Ok(Proposal {
                    id: row.get(0)?,
                    email: row.get(1)?,
                    topic: row.get(2)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(proposals)
    }

    pub fn create_request(&self, email: Option<&str>, topic: &str) -> SqliteResult<Request> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO requests (email, topic) VALUES (?1, ?2)",
            rusqlite::params![email, topic],
        )?;
        Ok(Request {
            id: conn.last_insert_rowid(),
            email: email.map(|e| e.to_string()),
            topic: topic.to_string(),
        })
    }

    pub fn list_requests(&self) -> SqliteResult<Vec<Request>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT id, email, topic FROM requests ORDER BY id DESC")?;
        let requests = stmt
            .query_map([], |row| {
                Ok(Request {
                    id: row.get(0)?,
                    email: row.get(1)?,
                    topic: row.get(2)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(requests)
    }

    pub fn create_feedback(&self, comment: &str) -> SqliteResult<Feedback> {
        let conn = self.conn.lock().unwrap();
        conn.execute("INSERT INTO feedback (comment) VALUES (?1)", [comment])?;
        Ok(Feedback {
            id: conn.last_insert_rowid(),
            comment: comment.to_string(),
        })
    }

    pub fn list_feedback(&self) -> SqliteResult<Vec<Feedback>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT id, comment FROM feedback ORDER BY id DESC")?;
        let feedback = stmt
            .query_map([], |row| {
                Ok(Feedback {
                    id: row.get(0)?,
                    comment: row.get(1)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(feedback)
    }

    pub fn create_incident(&self, new: &NewIncident) -> SqliteResult<Incident> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO incidents (name, email, description, occurred_at, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![&new.name, &new.email, &new.description, &new.occurred_at, now.to_rfc3339()],
        )?;
        Ok(Incident {
            id: conn.last_insert_rowid(),
            name: new.name.clone(),
            email: new.email.clone(),
            description: new.description.clone(),
            occurred_at: new.occurred_at.clone(),
            created_at: now,
        })
    }

    pub fn list_incidents(&self) -> SqliteResult<Vec<Incident>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, name, email, description, occurred_at, created_at FROM incidents ORDER BY id DESC",
        )?;
        let incidents = stmt
            .query_map([], |row| {
                Ok(Incident {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    email: row.get(2)?,
                    description: row.get(3)?,
                    occurred_at: row.get(4)?,
                    created_at: row_datetime(row, 5)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(incidents)
    }

    /// Row count of a contact table, for the back-office index
    pub fn count_contact_rows(&self, table: ContactTable) -> SqliteResult<i64> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", table.table_name()),
            [],
            |row| row.get(0),
        )
    }
}

/// Contact tables, so table names never come from user input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactTable {
    Submissions,
    Proposals,
    Requests,
    Feedback,
    Incidents,
}

impl ContactTable {
    fn table_name(&self) -> &'static str {
        match self {
            Self::Submissions => "submissions",
            Self::Proposals => "proposals",
            Self::Requests => "requests",
            Self::Feedback => "feedback",
            Self::Incidents => "incidents",
        }
    }
}
