use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use log::error;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use validator::ValidationErrors;

/// Everything a comment endpoint can fail with.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid comment: {0}")]
    Validation(#[from] ValidationErrors),
    #[error("comment {0} not found")]
    NotFound(i64),
    /// The body was not JSON or did not fit a comment request.
    #[error("malformed request body: {0}")]
    MalformedBody(String),
    /// The path segment was not a comment id.
    #[error("no comment at this path: {0}")]
    BadId(String),
    /// Storage failures. The cause is logged but never sent to the client.
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

#[derive(Debug, Serialize)]
struct FieldError {
    field: &'static str,
    message: String,
}

fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by_key(|(field, _)| *field);

    fields
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| FieldError {
                field,
                message: e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string()),
            })
        })
        .collect()
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::MalformedBody(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) | ApiError::BadId(_) => StatusCode::NOT_FOUND,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            ApiError::Validation(errors) => json!({ "errors": field_errors(errors) }),
            ApiError::NotFound(_) | ApiError::MalformedBody(_) | ApiError::BadId(_) => {
                json!({ "message": self.to_string() })
            }
            ApiError::Storage(e) => {
                error!("{:#}", e);
                json!({ "message": "internal server error" })
            }
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}
