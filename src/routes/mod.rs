use axum::http::Method;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::AppState;
use crate::handlers::health_check_handler;

pub mod presign_route;

pub fn create_routes(state: AppState) -> Router<AppState> {
    // Browsers upload straight from the dashboard origin
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        .merge(presign_route::presign_routes(state))
        .route("/api/health", get(health_check_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::extract::ConnectInfo;
    use axum::http::{header, Request, StatusCode};
    use axum::Router;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::create_routes;
    use crate::config::{AppState, BucketPolicy};
    use crate::middleware::rate_limiter::RateLimiter;
    use crate::services::fake_presigner::FakePresigner;

    fn app_with(presigner: Arc<FakePresigner>, allowed: &[&str], limiter: RateLimiter) -> Router {
        let state = AppState {
            presigner,
            bucket_policy: Arc::new(BucketPolicy::new(allowed.iter().copied())),
            rate_limiter: Arc::new(limiter),
        };
        create_routes(state.clone()).with_state(state)
    }

    fn limit(max_requests: usize) -> RateLimiter {
        RateLimiter::new(max_requests, Duration::from_secs(60))
    }

    fn app(presigner: Arc<FakePresigner>) -> Router {
        app_with(presigner, &[], limit(1000))
    }

    fn from_peer(mut req: Request<Body>, peer: &str, forwarded: Option<&str>) -> Request<Body> {
        let addr: SocketAddr = peer.parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));
        if let Some(value) = forwarded {
            req.headers_mut()
                .insert("x-forwarded-for", value.parse().unwrap());
        }
        req
    }

    fn presign_request(body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/presign")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn valid_body() -> Value {
        json!({ "bucket": "uploads", "key": "a/b/c.png", "contentType": "image/png" })
    }

    #[tokio::test]
    async fn valid_request_returns_signed_url_and_echoes_target() {
        let presigner = Arc::new(FakePresigner::default());
        let app = app(presigner.clone());

        let (status, body) = send(&app, presign_request(&valid_body())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["bucket"], "uploads");
        assert_eq!(body["key"], "a/b/c.png");
        assert_eq!(body["expiresIn"], 3600);
        let url = body["url"].as_str().unwrap();
        assert!(url.starts_with("https://storage.test/uploads/a/b/c.png?X-Amz-"));
        assert_eq!(presigner.calls(), 1);
    }

    #[tokio::test]
    async fn any_missing_field_is_rejected_without_signing() {
        let presigner = Arc::new(FakePresigner::default());
        let app = app(presigner.clone());
        let full = valid_body();
        let fields = ["bucket", "key", "contentType"];

        // every proper subset of the three fields, including the empty one
        for mask in 0..7u8 {
            let mut body = serde_json::Map::new();
            for (i, field) in fields.iter().enumerate() {
                if mask & (1 << i) != 0 {
                    body.insert(field.to_string(), full[field].clone());
                }
            }

            let (status, resp) = send(&app, presign_request(&Value::Object(body))).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "mask {mask}");
            assert_eq!(resp["error"], "Missing required parameters");

            let reported: Vec<&str> = resp["fields"]
                .as_array()
                .unwrap()
                .iter()
                .filter_map(|f| f["field"].as_str())
                .collect();
            let mut expected: Vec<&str> = fields
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) == 0)
                .map(|(_, field)| *field)
                .collect();
            expected.sort();
            assert_eq!(reported, expected, "mask {mask}");
        }

        assert_eq!(presigner.calls(), 0);
    }

    #[tokio::test]
    async fn blank_field_counts_as_missing() {
        let presigner = Arc::new(FakePresigner::default());
        let app = app(presigner.clone());

        let body = json!({ "bucket": "uploads", "key": "   ", "contentType": "image/png" });
        let (status, resp) = send(&app, presign_request(&body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(resp["fields"][0]["field"], "key");
        assert_eq!(resp["fields"][0]["title"], "is_required");
        assert_eq!(presigner.calls(), 0);
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request() {
        let presigner = Arc::new(FakePresigner::default());
        let app = app(presigner.clone());

        let req = Request::builder()
            .method("POST")
            .uri("/api/presign")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"bucket\": "))
            .unwrap();
        let (status, resp) = send(&app, req).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(resp["error"], "Invalid JSON body");
        assert_eq!(presigner.calls(), 0);
    }

    #[tokio::test]
    async fn identical_requests_get_distinct_urls_for_same_object() {
        let app = app(Arc::new(FakePresigner::default()));

        let (_, first) = send(&app, presign_request(&valid_body())).await;
        let (_, second) = send(&app, presign_request(&valid_body())).await;

        assert_ne!(first["url"], second["url"]);
        assert_eq!(first["bucket"], second["bucket"]);
        assert_eq!(first["key"], second["key"]);
    }

    #[tokio::test]
    async fn signer_failure_is_500_without_leaking_and_service_recovers() {
        let presigner = Arc::new(FakePresigner::default());
        let app = app(presigner.clone());

        presigner.set_failing(true);
        let (status, resp) = send(&app, presign_request(&valid_body())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(resp["error"], "Failed to generate presigned URL");
        assert_eq!(resp["details"], "storage backend unavailable");
        assert_eq!(resp["retryable"], true);
        assert!(!resp.to_string().contains("10.0.0.3"));

        presigner.set_failing(false);
        let (status, resp) = send(&app, presign_request(&valid_body())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(resp["key"], "a/b/c.png");
    }

    #[tokio::test]
    async fn other_methods_get_405_json() {
        let app = app(Arc::new(FakePresigner::default()));

        for method in ["GET", "PUT", "DELETE"] {
            let req = Request::builder()
                .method(method)
                .uri("/api/presign")
                .body(Body::empty())
                .unwrap();
            let (status, resp) = send(&app, req).await;

            assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "{method}");
            assert_eq!(resp, json!({ "error": "Method not allowed" }));
        }
    }

    #[tokio::test]
    async fn bucket_outside_allow_list_is_forbidden() {
        let presigner = Arc::new(FakePresigner::default());
        let app = app_with(presigner.clone(), &["uploads"], limit(1000));

        let body = json!({ "bucket": "backups", "key": "db.sql", "contentType": "text/plain" });
        let (status, resp) = send(&app, presign_request(&body)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(resp["error"], "Bucket not allowed");
        assert_eq!(presigner.calls(), 0);

        let (status, _) = send(&app, presign_request(&valid_body())).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn rotating_forwarded_header_does_not_bypass_limit() {
        let app = app_with(Arc::new(FakePresigner::default()), &[], limit(1));
        let send_as = |hop: &str| {
            from_peer(presign_request(&valid_body()), "198.51.100.4:40000", Some(hop))
        };

        assert_eq!(send(&app, send_as("1.1.1.0")).await.0, StatusCode::OK);
        for i in 1..5 {
            let (status, resp) = send(&app, send_as(&format!("1.1.1.{i}"))).await;
            assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
            assert_eq!(resp["error"], "Too many requests");
        }

        let other_peer = from_peer(presign_request(&valid_body()), "198.51.100.5:40000", None);
        assert_eq!(send(&app, other_peer).await.0, StatusCode::OK);
    }

    #[tokio::test]
    async fn trusted_proxy_limits_per_forwarded_client() {
        let limiter = limit(1).trust_forwarded_for(true);
        let app = app_with(Arc::new(FakePresigner::default()), &[], limiter);
        let via_proxy = |hop: &str| {
            from_peer(presign_request(&valid_body()), "10.0.0.254:443", Some(hop))
        };

        assert_eq!(send(&app, via_proxy("10.1.1.1")).await.0, StatusCode::OK);
        let (status, _) = send(&app, via_proxy("10.1.1.1, 172.16.0.1")).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(send(&app, via_proxy("10.2.2.2")).await.0, StatusCode::OK);
    }

    #[tokio::test]
    async fn rejected_methods_do_not_consume_quota() {
        let app = app_with(Arc::new(FakePresigner::default()), &[], limit(1));

        let get = Request::builder()
            .method("GET")
            .uri("/api/presign")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, from_peer(get, "198.51.100.9:1234", None)).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

        let post = from_peer(presign_request(&valid_body()), "198.51.100.9:1234", None);
        assert_eq!(send(&app, post).await.0, StatusCode::OK);
    }

    #[tokio::test]
    async fn health_check_reports_up() {
        let app = app(Arc::new(FakePresigner::default()));

        let req = Request::builder().uri("/api/health").body(Body::empty()).unwrap();
        let (status, body) = send(&app, req).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "up");
        assert!(body["server_time"].is_string());
    }
}
