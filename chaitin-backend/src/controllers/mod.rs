pub mod accounts;
pub mod admin;
pub mod blog;
pub mod contact;
pub mod health;
pub mod images;
pub mod mailing;
pub mod mentorships;
pub mod pages;
pub mod workshops;

use actix_multipart::Multipart;
use chrono::{NaiveDate, Utc};
use futures_util::StreamExt;

use crate::errors::{AppError, AppResult};

/// Date used to split workshops into past and upcoming
pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// File part of a multipart upload
pub(crate) struct UploadedFile {
    pub filename: String,
    pub data: Vec<u8>,
    /// Set when the file is larger than the limit; `data` then holds only a prefix
    pub too_big: bool,
}

impl UploadedFile {
    /// Lower-cased extension from the client file name, `jpg` normalised to `jpeg`
    pub fn extension(&self) -> Option<String> {
        let (_, ext) = self.filename.rsplit_once('.')?;
        let ext = ext.to_lowercase();
        Some(if ext == "jpg" { "jpeg".to_string() } else { ext })
    }
}

/// Read the `field` file part, stopping once more than `limit` bytes arrived
pub(crate) async fn read_upload(
    mut payload: Multipart,
    field: &str,
    limit: usize,
) -> AppResult<Option<UploadedFile>> {
    while let Some(item) = payload.next().await {
        let mut part = item.map_err(|e| AppError::BadRequest(e.to_string()))?;

        let disposition = part.content_disposition();
        if disposition.get_name() != Some(field) {
            continue;
        }
        let filename = disposition.get_filename().unwrap_or_default().to_string();

        let mut data = Vec::new();
        let mut too_big = false;
        while let Some(chunk) = part.next().await {
            let chunk = chunk.map_err(|e| AppError::BadRequest(e.to_string()))?;
            if data.len() + chunk.len() > limit {
                too_big = true;
                break;
            }
            data.extend_from_slice(&chunk);
        }

        if filename.is_empty() && data.is_empty() {
            return Ok(None);
        }
        return Ok(Some(UploadedFile { filename, data, too_big }));
    }

    Ok(None)
}

/// Raw multipart body with a single file part, for handler tests
#[cfg(test)]
pub(crate) fn multipart_body(field: &str, filename: &str, data: &[u8]) -> (String, Vec<u8>) {
    let boundary = "----chaitinboundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    (format!("multipart/form-data; boundary={}", boundary), body)
}
