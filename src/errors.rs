//! Request-boundary error type for the prediction pipeline

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error as ThisError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Required columns or fields are absent from the input
    #[error("Missing columns in input: {missing:?}")]
    Schema { missing: Vec<String> },

    /// A single-record field violates its declared constraint
    #[error("Invalid value for {field}: {message}")]
    Validation { field: String, message: String },

    /// Unexpected failure while parsing, deriving features or scoring
    #[error("Error processing {context}: {source:#}")]
    Processing {
        context: String,
        #[source]
        source: anyhow::Error,
    },
}

impl Error {
    pub fn schema<I, S>(missing: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Error::Schema {
            missing: missing.into_iter().map(Into::into).collect(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn processing(context: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Error::Processing {
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Schema { .. } => StatusCode::BAD_REQUEST,
            Error::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Processing { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Attach request context to fallible pipeline steps.
pub trait ProcessingContext<T> {
    fn processing(self, context: &str) -> Result<T>;
}

impl<T, E> ProcessingContext<T> for std::result::Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn processing(self, context: &str) -> Result<T> {
        self.map_err(|e| Error::processing(context, e))
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self {
            Error::Processing { .. } => {
                tracing::error!("Internal processing error: {:#}", self);
            }
            Error::Schema { .. } | Error::Validation { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let status = self.status_code();
        let body = match &self {
            Error::Schema { missing } => json!({
                "detail": self.to_string(),
                "missing": missing,
            }),
            Error::Validation { field, message } => json!({
                "detail": self.to_string(),
                "field": field,
                "message": message,
            }),
            Error::Processing { .. } => json!({ "detail": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}
