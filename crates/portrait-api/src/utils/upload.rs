//! Multipart helpers for the image upload handler

use axum::extract::multipart::MultipartError;
use axum::extract::Multipart;
use axum::http::StatusCode;
use bytes::Bytes;
use portrait_core::AppError;

use crate::error::{FILE_TOO_LARGE_MESSAGE, NO_FILE_MESSAGE};

/// The single file of an upload request.
#[derive(Debug)]
pub struct UploadedFile {
    pub data: Bytes,
    pub file_name: String,
    pub content_type: String,
}

fn read_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return AppError::PayloadTooLarge(FILE_TOO_LARGE_MESSAGE.to_string());
    }
    AppError::InvalidInput(format!("Failed to read multipart: {}", e))
}

/// Extract the field named `file` from a multipart form.
/// Only one such field is accepted; other fields are ignored.
pub async fn extract_multipart_file(mut multipart: Multipart) -> Result<UploadedFile, AppError> {
    let mut file: Option<UploadedFile> = None;

    while let Some(field) = multipart.next_field().await.map_err(read_error)? {
        if field.name() != Some("file") {
            continue;
        }
        if file.is_some() {
            return Err(AppError::InvalidInput(
                "Multiple file fields are not allowed; send exactly one field named 'file'"
                    .to_string(),
            ));
        }

        let file_name = field.file_name().unwrap_or("unknown").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field.bytes().await.map_err(read_error)?;

        file = Some(UploadedFile {
            data,
            file_name,
            content_type,
        });
    }

    file.ok_or_else(|| AppError::BadRequest(NO_FILE_MESSAGE.to_string()))
}
