use actix_web::{HttpResponse, ResponseError, http::StatusCode, http::header};
use thiserror::Error;

use crate::mail::MailError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found")]
    NotFound,

    #[error("Permission denied")]
    PermissionDenied,

    /// Anonymous visitor hit a page that needs an account
    #[error("Login required")]
    LoginRequired { next: String },

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("Mail error: {0}")]
    Mail(#[from] MailError),

    #[error("Password hashing error: {0}")]
    Password(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::PermissionDenied => StatusCode::FORBIDDEN,
            AppError::LoginRequired { .. } => StatusCode::FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_)
            | AppError::Template(_)
            | AppError::Mail(_)
            | AppError::Password(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let body = match self {
            AppError::NotFound => "404 Not Found".to_string(),
            AppError::PermissionDenied => "403 Forbidden".to_string(),
            AppError::LoginRequired { next } => {
                let location = format!("/accounts/login/?next={}", urlencoding::encode(next));
                return HttpResponse::Found()
                    .insert_header((header::LOCATION, location))
                    .finish();
            }
            AppError::BadRequest(msg) => format!("400 Bad Request: {}", msg),
            _ => {
                log::error!("{}", self);
                "500 Internal Server Error".to_string()
            }
        };

        HttpResponse::build(status)
            .content_type("text/plain; charset=utf-8")
            .body(body)
    }
}
