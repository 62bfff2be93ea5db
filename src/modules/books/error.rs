use axum::http::StatusCode;
use bookshelf_http::error::AppError;
use bookshelf_store::StoreError;
use serde_json::json;
use thiserror::Error;

use super::models::BookId;

/// Failure of a books operation, distinguished by kind at the HTTP boundary.
#[derive(Error, Debug)]
pub enum BookError {
    /// Request rejected before the document was touched.
    #[error("{message}")]
    Validation {
        message: String,
        fields: Vec<String>,
    },

    #[error("Book not found")]
    NotFound(BookId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl BookError {
    pub fn validation(message: impl Into<String>, fields: Vec<String>) -> Self {
        Self::Validation {
            message: message.into(),
            fields,
        }
    }
}

impl From<BookError> for AppError {
    fn from(err: BookError) -> Self {
        match err {
            // Rejected input keeps the 401 status existing clients expect.
            BookError::Validation { message, fields } => {
                let details = fields
                    .into_iter()
                    .map(|field| json!({ "field": field }))
                    .collect();
                AppError::validation(details, message).with_status(StatusCode::UNAUTHORIZED)
            }
            BookError::NotFound(id) => {
                tracing::debug!(book_id = %id, "book lookup missed");
                AppError::not_found("Book not found")
            }
            BookError::Store(err) => AppError::Internal(anyhow::Error::new(err)),
        }
    }
}
