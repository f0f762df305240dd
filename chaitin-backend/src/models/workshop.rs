use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

/// Workshop or event. `scheduled_at` is London wall-clock time; `None` marks a draft.
#[derive(Debug, Clone, Serialize)]
pub struct Workshop {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub body: String,
    pub scheduled_at: Option<NaiveDateTime>,
    pub location_name: String,
    pub location_address: String,
    pub location_url: String,
    pub is_confirmed: bool,
}

impl Workshop {
    pub fn path(&self) -> String {
        format!("/workshops/{}/", self.slug)
    }

    pub fn is_past(&self, today: NaiveDate) -> bool {
        matches!(self.scheduled_at, Some(at) if at.date() < today)
    }
}

#[derive(Debug, Clone)]
pub struct WorkshopInput {
    pub title: String,
    pub slug: String,
    pub body: String,
    pub scheduled_at: Option<NaiveDateTime>,
    pub location_name: String,
    pub location_address: String,
    pub location_url: String,
    pub is_confirmed: bool,
}

/// Workshops grouped the way the home and events pages show them
#[derive(Debug, Clone, Default, Serialize)]
pub struct WorkshopSchedule {
    pub future: Vec<Workshop>,
    pub past: Vec<Workshop>,
    pub drafts: Vec<Workshop>,
}

impl WorkshopSchedule {
    /// Split workshops ordered newest first into future, past and draft lists
    pub fn split(workshops: Vec<Workshop>, today: NaiveDate) -> Self {
        let mut schedule = Self::default();
        for workshop in workshops {
            match workshop.scheduled_at {
                None => schedule.drafts.push(workshop),
                Some(at) if at.date() < today => schedule.past.push(workshop),
                Some(_) => schedule.future.push(workshop),
            }
        }
        schedule.drafts.sort_by(|a, b| b.title.cmp(&a.title));
        schedule
    }
}
