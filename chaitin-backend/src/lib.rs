pub mod config;
pub mod controllers;
pub mod db;
pub mod errors;
pub mod forms;
pub mod ics;
pub mod mail;
pub mod mailing;
pub mod middleware;
pub mod models;
pub mod passwords;
pub mod templates;
pub mod validators;

#[cfg(test)]
mod test_support;

use actix_web::web;
use std::sync::Arc;
use tera::Tera;

use config::Config;
use db::Database;
use mail::Mailer;

pub struct AppState {
    pub db: Arc<Database>,
    pub config: Config,
    pub templates: Arc<Tera>,
    pub mailer: Arc<dyn Mailer>,
}

/// Every route of the site
pub fn configure_app(cfg: &mut web::ServiceConfig) {
    cfg.configure(controllers::health::config)
        .configure(controllers::pages::config)
        .configure(controllers::workshops::config)
        .configure(controllers::blog::config)
        .configure(controllers::mailing::config)
        .configure(controllers::contact::config)
        .configure(controllers::mentorships::config)
        .configure(controllers::images::config)
        .configure(controllers::accounts::config)
        .configure(controllers::admin::config);
}
