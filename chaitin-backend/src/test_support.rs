//! Shared setup for handler tests: in-memory database, in-memory mailer, full route table

use actix_web::body::BoxBody;
use actix_web::cookie::Cookie;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, web};
use std::sync::Arc;

use crate::config::Config;
use crate::db::Database;
use crate::mail::MemoryMailer;
use crate::middleware::flash::{self, FLASH_COOKIE};
use crate::middleware::session_auth::session_cookie;
use crate::models::User;
use crate::{AppState, configure_app, passwords, templates};

pub const PASSWORD: &str = "kolmogorov-1965";

pub struct TestApp {
    pub state: web::Data<AppState>,
    pub mailer: Arc<MemoryMailer>,
}

impl TestApp {
    pub fn new() -> Self {
        let mailer = Arc::new(MemoryMailer::new());
        let state = web::Data::new(AppState {
            db: Arc::new(Database::in_memory().unwrap()),
            config: Config::for_tests(),
            templates: Arc::new(templates::build_templates().unwrap()),
            mailer: mailer.clone(),
        });
        Self { state, mailer }
    }

    pub fn app(
        &self,
    ) -> App<
        impl ServiceFactory<
            ServiceRequest,
            Config = (),
            Response = ServiceResponse<BoxBody>,
            Error = actix_web::Error,
            InitError = (),
        > + use<>,
    > {
        App::new()
            .app_data(self.state.clone())
            .configure(configure_app)
    }

    pub fn db(&self) -> &Database {
        &self.state.db
    }

    /// Member with the shared test password
    pub fn create_user(&self, username: &str, is_superuser: bool) -> User {
        let hash = passwords::hash_password(PASSWORD).unwrap();
        self.db()
            .create_user(username, &format!("{}@example.com", username), &hash, is_superuser)
            .unwrap()
    }

    /// Cookie of a fresh session for `user`
    pub fn login(&self, user: &User) -> Cookie<'static> {
        let session = self.db().create_session(user.id).unwrap();
        session_cookie(&session.token)
    }
}

/// Flash message texts set by a response
pub fn flash_messages(resp: &ServiceResponse) -> Vec<String> {
    resp.response()
        .cookies()
        .filter(|c| c.name() == FLASH_COOKIE)
        .flat_map(|c| flash::decode_messages(c.value()))
        .map(|m| m.message)
        .collect()
}

pub fn location(resp: &ServiceResponse) -> &str {
    resp.headers()
        .get(actix_web::http::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

pub async fn body_text(resp: ServiceResponse) -> String {
    let bytes = actix_web::test::read_body(resp).await;
    String::from_utf8(bytes.to_vec()).unwrap()
}
