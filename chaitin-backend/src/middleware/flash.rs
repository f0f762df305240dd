//! One-shot notices carried across a redirect in the `messages` cookie

use actix_web::cookie::{Cookie, SameSite};
use actix_web::{HttpRequest, HttpResponse, http::header};
use serde::{Deserialize, Serialize};
use strum::Display;

pub const FLASH_COOKIE: &str = "messages";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub level: Level,
    pub message: String,
}

impl FlashMessage {
    pub fn info(message: impl Into<String>) -> Self {
        Self { level: Level::Info, message: message.into() }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self { level: Level::Success, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: Level::Error, message: message.into() }
    }
}

/// Decode a cookie value, whether or not the percent-encoding survived the round trip
pub fn decode_messages(value: &str) -> Vec<FlashMessage> {
    if let Ok(messages) = serde_json::from_str(value) {
        return messages;
    }
    urlencoding::decode(value)
        .ok()
        .and_then(|decoded| serde_json::from_str(&decoded).ok())
        .unwrap_or_default()
}

/// Messages waiting in the request cookie
pub fn incoming(req: &HttpRequest) -> Vec<FlashMessage> {
    req.cookie(FLASH_COOKIE)
        .map(|c| decode_messages(c.value()))
        .unwrap_or_default()
}

fn messages_cookie(messages: &[FlashMessage]) -> Cookie<'static> {
    let json = serde_json::to_string(messages).unwrap_or_else(|_| "[]".to_string());
    Cookie::build(FLASH_COOKIE, urlencoding::encode(&json).into_owned())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .finish()
}

/// Expired cookie that clears delivered messages
pub fn clear_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build(FLASH_COOKIE, "").path("/").finish();
    cookie.make_removal();
    cookie
}

/// 302 to `location`, queueing `messages` after any not yet shown
pub fn redirect(req: &HttpRequest, location: &str, messages: Vec<FlashMessage>) -> HttpResponse {
    let mut queued = incoming(req);
    queued.extend(messages);

    let mut builder = HttpResponse::Found();
    builder.insert_header((header::LOCATION, location.to_string()));
    if !queued.is_empty() {
        builder.cookie(messages_cookie(&queued));
    }
    builder.finish()
}
