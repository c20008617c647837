use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::RwLock;

use crate::utils::api_response::ResponseBuilder;

/// Sliding-window request counter keyed by client identifier.
pub struct RateLimiter {
    requests: Arc<RwLock<HashMap<String, Vec<Instant>>>>,
    max_requests: usize,
    window: Duration,
    max_clients: usize,
    trust_forwarded_for: bool,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            requests: Arc::new(RwLock::new(HashMap::new())),
            max_requests,
            window,
            max_clients: 10_000,
            trust_forwarded_for: false,
        }
    }

    /// Caps how many distinct clients are tracked inside one window.
    pub fn with_max_clients(mut self, max_clients: usize) -> Self {
        self.max_clients = max_clients;
        self
    }

    /// Keys clients by the first `X-Forwarded-For` hop instead of the peer address.
    pub fn trust_forwarded_for(mut self, trust: bool) -> Self {
        self.trust_forwarded_for = trust;
        self
    }

    fn client_identifier(&self, request: &Request) -> String {
        if self.trust_forwarded_for {
            let forwarded = request
                .headers()
                .get("x-forwarded-for")
                .and_then(|h| h.to_str().ok())
                .map(|s| s.split(',').next().unwrap_or(s).trim())
                .filter(|s| !s.is_empty());
            if let Some(client) = forwarded {
                return client.to_string();
            }
        }

        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// Records the attempt and returns whether it fits in the window.
    pub async fn check_rate_limit(&self, identifier: &str) -> bool {
        let mut requests = self.requests.write().await;
        let now = Instant::now();
        let cutoff = now.checked_sub(self.window).unwrap_or(now);

        if !requests.contains_key(identifier) && requests.len() >= self.max_clients {
            requests.retain(|_, timestamps| timestamps.iter().any(|&t| t > cutoff));
            if requests.len() >= self.max_clients {
                return false;
            }
        }

        let entry = requests.entry(identifier.to_string()).or_default();
        entry.retain(|&timestamp| timestamp > cutoff);

        if entry.len() >= self.max_requests {
            return false;
        }

        entry.push(now);
        true
    }

    /// Drops identifiers with no attempts left inside the window.
    pub async fn purge_idle(&self) {
        let mut requests = self.requests.write().await;
        let now = Instant::now();
        let cutoff = now.checked_sub(self.window).unwrap_or(now);

        requests.retain(|_, timestamps| timestamps.iter().any(|&t| t > cutoff));
    }

    #[cfg(test)]
    pub async fn tracked_clients(&self) -> usize {
        self.requests.read().await.len()
    }
}

pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let identifier = limiter.client_identifier(&request);

    if !limiter.check_rate_limit(&identifier).await {
        tracing::warn!("Rate limit exceeded for {}", identifier);
        return ResponseBuilder::error(StatusCode::TOO_MANY_REQUESTS, "Too many requests")
            .into_response();
    }

    next.run(request).await
}

/// Periodically purges idle clients until the process exits.
pub fn spawn_purge_task(limiter: Arc<RateLimiter>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(limiter.window);
        loop {
            ticker.tick().await;
            limiter.purge_idle().await;
        }
    })
}
