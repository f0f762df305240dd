// Session authentication helpers
// The `sessionid` cookie holds a token from auth_sessions. Handlers call these
// helpers directly instead of going through a middleware wrapper.

use actix_web::HttpRequest;
use actix_web::cookie::{Cookie, SameSite, time::Duration};

use crate::AppState;
use crate::errors::{AppError, AppResult};
use crate::models::{SESSION_AGE_SECONDS, User};

pub const SESSION_COOKIE: &str = "sessionid";

pub fn extract_token(req: &HttpRequest) -> Option<String> {
    req.cookie(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|t| !t.is_empty())
}

/// Logged-in user, if the cookie names a live session
pub fn current_user(state: &AppState, req: &HttpRequest) -> AppResult<Option<User>> {
    match extract_token(req) {
        Some(token) => Ok(state.db.get_user_by_session(&token)?),
        None => Ok(None),
    }
}

/// Anonymous visitors are sent to the login page, then back here
pub fn require_login(state: &AppState, req: &HttpRequest) -> AppResult<User> {
    current_user(state, req)?.ok_or_else(|| AppError::LoginRequired {
        next: req.path().to_string(),
    })
}

/// Back-office pages answer 403 to anyone but a superuser
pub fn require_superuser(state: &AppState, req: &HttpRequest) -> AppResult<User> {
    match current_user(state, req)? {
        Some(user) if user.is_superuser => Ok(user),
        _ => Err(AppError::PermissionDenied),
    }
}

pub fn session_cookie(token: &str) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token.to_string())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::seconds(SESSION_AGE_SECONDS))
        .finish()
}

pub fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    cookie.make_removal();
    cookie
}
