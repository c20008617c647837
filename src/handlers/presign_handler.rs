use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::config::BucketPolicy;
use crate::models::presign_model::{PresignRequest, PresignResponse, PRESIGN_EXPIRES_IN_SECS};
use crate::services::s3_service::Presigner;
use crate::utils::api_response::{ApiResponseResult, ErrorBody, ResponseBuilder};
use crate::utils::validated_wrapper::ValidatedJson;

pub async fn presign_upload_handler(
    State(presigner): State<Arc<dyn Presigner>>,
    State(bucket_policy): State<Arc<BucketPolicy>>,
    ValidatedJson(payload): ValidatedJson<PresignRequest>,
) -> Response {
    if !bucket_policy.allows(&payload.bucket) {
        tracing::warn!("Presign refused for bucket outside allow-list: {}", payload.bucket);
        return ResponseBuilder::error(StatusCode::FORBIDDEN, "Bucket not allowed").into_response();
    }

    let expires_in = Duration::from_secs(PRESIGN_EXPIRES_IN_SECS);

    match presigner
        .presign_put(&payload.bucket, &payload.key, &payload.content_type, expires_in)
        .await
    {
        Ok(url) => {
            tracing::info!("Issued upload URL for {}/{}", payload.bucket, payload.key);
            ResponseBuilder::success(PresignResponse {
                url,
                bucket: payload.bucket,
                key: payload.key,
                expires_in: PRESIGN_EXPIRES_IN_SECS,
            })
            .into_response()
        }
        Err(e) => {
            tracing::error!(
                retryable = e.is_retryable(),
                "S3 presign error for {}/{}: {}",
                payload.bucket,
                payload.key,
                e
            );
            ApiResponseResult(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody::new("Failed to generate presigned URL")
                    .with_details(e.public_detail())
                    .with_retryable(e.is_retryable()),
            )
            .into_response()
        }
    }
}

pub async fn method_not_allowed_handler() -> impl IntoResponse {
    ResponseBuilder::error(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}
