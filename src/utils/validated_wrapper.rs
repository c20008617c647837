use axum::{
    extract::{FromRequest, Request},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use validator::{Validate, ValidationErrors};

use crate::utils::api_response::{ResponseBuilder, ValidationErrorDetail};

/// JSON body extractor that runs `validator` rules before the handler sees it.
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: serde::de::DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = axum::response::Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(payload) = Json::<T>::from_request(req, state)
            .await
            .map_err(|err| {
                tracing::warn!("Rejected request body: {}", err.body_text());
                ResponseBuilder::error_with_details(
                    StatusCode::BAD_REQUEST,
                    "Invalid JSON body",
                    err.body_text(),
                )
                .into_response()
            })?;

        if let Err(e) = payload.validate() {
            let fields = map_validation_errors(e);
            tracing::warn!(
                "Rejected request with missing fields: {:?}",
                fields.iter().map(|f| f.field.as_str()).collect::<Vec<_>>()
            );

            return Err(ResponseBuilder::fail_with_fields(
                StatusCode::BAD_REQUEST,
                "Missing required parameters",
                fields,
            )
            .into_response());
        }

        Ok(ValidatedJson(payload))
    }
}

fn map_validation_errors(errors: ValidationErrors) -> Vec<ValidationErrorDetail> {
    let mut details = Vec::new();

    for (field, error_kind) in errors.field_errors() {
        for err in error_kind {
            details.push(ValidationErrorDetail {
                field: to_camel_case(&field),
                title: err.code.to_string(),
                message: err
                    .message
                    .clone()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "Invalid value".to_string()),
            });
        }
    }

    // field_errors() iterates a HashMap
    details.sort_by(|a, b| a.field.cmp(&b.field));
    details
}

// request bodies use `rename_all = "camelCase"`; report names as the client sent them
fn to_camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper_next = false;

    for c in field.chars() {
        if c == '_' {
            upper_next = !out.is_empty();
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }

    out
}
