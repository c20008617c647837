use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Body of every non-2xx answer: `{"error": ..., "details"?: ..., ...}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<ValidationErrorDetail>>,
}

#[derive(Debug, Serialize)]
pub struct ValidationErrorDetail {
    pub field: String,
    pub title: String,   // validator code, e.g. "is_required"
    pub message: String,
}

impl ErrorBody {
    pub fn new(error: &str) -> Self {
        Self {
            error: error.to_string(),
            details: None,
            retryable: None,
            fields: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = Some(retryable);
        self
    }

    pub fn with_fields(mut self, fields: Vec<ValidationErrorDetail>) -> Self {
        self.fields = Some(fields);
        self
    }
}

// Wrapper to combine StatusCode and the Body
pub struct ApiResponseResult<T>(pub StatusCode, pub T);

impl<T> IntoResponse for ApiResponseResult<T>
where
    T: Serialize,
{
    fn into_response(self) -> Response {
        (self.0, Json(self.1)).into_response()
    }
}

pub struct ResponseBuilder;

impl ResponseBuilder {
    pub fn success<T: Serialize>(data: T) -> ApiResponseResult<T> {
        ApiResponseResult(StatusCode::OK, data)
    }

    pub fn error(status_code: StatusCode, message: &str) -> ApiResponseResult<ErrorBody> {
        ApiResponseResult(status_code, ErrorBody::new(message))
    }

    pub fn error_with_details(
        status_code: StatusCode,
        message: &str,
        details: impl Into<String>,
    ) -> ApiResponseResult<ErrorBody> {
        ApiResponseResult(status_code, ErrorBody::new(message).with_details(details))
    }

    pub fn fail_with_fields(
        status_code: StatusCode,
        message: &str,
        fields: Vec<ValidationErrorDetail>,
    ) -> ApiResponseResult<ErrorBody> {
        ApiResponseResult(status_code, ErrorBody::new(message).with_fields(fields))
    }
}
