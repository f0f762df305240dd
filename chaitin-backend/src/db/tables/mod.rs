//! Database table modules - extends Database with domain-specific methods
//!
//! Each module adds `impl Database` blocks with methods for a specific table group.

mod auth;          // auth_sessions
mod contact;       // submissions, proposals, requests, feedback, incidents
mod email_records; // email_records
mod images;        // images
mod mentorships;   // mentorships
mod posts;         // posts
mod subscriptions; // subscriptions
mod users;         // users
mod workshops;     // workshops, attendances

pub use contact::ContactTable;
