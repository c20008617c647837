use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use anyhow::{anyhow, Context};

use crate::middleware::rate_limiter::RateLimiter;
use crate::services::s3_service::Presigner;

#[derive(Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub s3_endpoint: String,
    pub s3_port: Option<u16>,
    pub s3_use_ssl: bool,
    pub s3_region: String,
    pub s3_access_key: String,
    pub s3_secret_key: String,
    pub s3_force_path_style: bool,
    pub allowed_buckets: Vec<String>,
    pub rate_limit_max_requests: usize,
    pub rate_limit_window_secs: u64,
    pub rate_limit_max_clients: usize,
    pub trust_forwarded_for: bool,
}

#[derive(Clone, axum::extract::FromRef)]
pub struct AppState {
    pub presigner: Arc<dyn Presigner>,
    pub bucket_policy: Arc<BucketPolicy>,
    pub rate_limiter: Arc<RateLimiter>,
}

/// Buckets a client may request uploads for. An empty policy allows any bucket.
#[derive(Debug, Default)]
pub struct BucketPolicy {
    allowed: HashSet<String>,
}

impl BucketPolicy {
    pub fn new<I, S>(buckets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: buckets.into_iter().map(Into::into).collect(),
        }
    }

    pub fn allows(&self, bucket: &str) -> bool {
        self.allowed.is_empty() || self.allowed.contains(bucket)
    }
}

impl Config {
    pub fn init() -> anyhow::Result<Config> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        // blank values count as unset
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &str| var(name).ok_or_else(|| anyhow!("{} must be set", name));

        let server_host = var("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let server_port = var("PORT")
            .map(|v| v.trim().parse::<u16>())
            .unwrap_or(Ok(3000))
            .context("PORT")?;

        let s3_endpoint = required("S3_ENDPOINT")?;
        let s3_port = var("S3_PORT")
            .map(|v| v.trim().parse::<u16>())
            .transpose()
            .context("S3_PORT")?;
        let s3_use_ssl = var("S3_USE_SSL")
            .map(|v| parse_bool(&v))
            .unwrap_or(Ok(true))
            .context("S3_USE_SSL")?;
        let s3_region = var("S3_REGION").unwrap_or_else(|| "us-east-1".to_string());
        let s3_access_key = required("S3_ACCESS_KEY")?;
        let s3_secret_key = required("S3_SECRET_KEY")?;
        let s3_force_path_style = var("S3_FORCE_PATH_STYLE")
            .map(|v| parse_bool(&v))
            .unwrap_or(Ok(true))
            .context("S3_FORCE_PATH_STYLE")?;

        let allowed_buckets = var("PRESIGN_ALLOWED_BUCKETS")
            .map(|v| {
                v.split(',')
                    .map(|b| b.trim().to_string())
                    .filter(|b| !b.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let rate_limit_max_requests = var("RATE_LIMIT_MAX_REQUESTS")
            .map(|v| v.trim().parse::<usize>())
            .unwrap_or(Ok(100))
            .context("RATE_LIMIT_MAX_REQUESTS")?;
        let rate_limit_window_secs = var("RATE_LIMIT_WINDOW_SECS")
            .map(|v| v.trim().parse::<u64>())
            .unwrap_or(Ok(60))
            .context("RATE_LIMIT_WINDOW_SECS")?;
        // only honour X-Forwarded-For when a proxy we control sets it
        let trust_forwarded_for = var("TRUST_FORWARDED_FOR")
            .map(|v| parse_bool(&v))
            .unwrap_or(Ok(false))
            .context("TRUST_FORWARDED_FOR")?;
        let rate_limit_max_clients = var("RATE_LIMIT_MAX_CLIENTS")
            .map(|v| v.trim().parse::<usize>())
            .unwrap_or(Ok(10_000))
            .context("RATE_LIMIT_MAX_CLIENTS")?;
        if rate_limit_max_requests == 0 || rate_limit_window_secs == 0 || rate_limit_max_clients == 0 {
            return Err(anyhow!("rate limit settings must be greater than zero"));
        }

        Ok(Config {
            server_host,
            server_port,
            s3_endpoint,
            s3_port,
            s3_use_ssl,
            s3_region,
            s3_access_key,
            s3_secret_key,
            s3_force_path_style,
            allowed_buckets,
            rate_limit_max_requests,
            rate_limit_window_secs,
            rate_limit_max_clients,
            trust_forwarded_for,
        })
    }

    /// Full endpoint URL handed to the S3 client, e.g. `https://minio.local:9000`.
    pub fn s3_endpoint_url(&self) -> String {
        let host = self
            .s3_endpoint
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/');
        let scheme = if self.s3_use_ssl { "https" } else { "http" };

        match self.s3_port {
            Some(port) => format!("{}://{}:{}", scheme, host, port),
            None => format!("{}://{}", scheme, host),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("server_host", &self.server_host)
            .field("server_port", &self.server_port)
            .field("s3_endpoint", &self.s3_endpoint)
            .field("s3_port", &self.s3_port)
            .field("s3_use_ssl", &self.s3_use_ssl)
            .field("s3_region", &self.s3_region)
            .field("s3_access_key", &self.s3_access_key)
            .field("s3_secret_key", &"<redacted>")
            .field("s3_force_path_style", &self.s3_force_path_style)
            .field("allowed_buckets", &self.allowed_buckets)
            .field("rate_limit_max_requests", &self.rate_limit_max_requests)
            .field("rate_limit_window_secs", &self.rate_limit_window_secs)
            .field("rate_limit_max_clients", &self.rate_limit_max_clients)
            .field("trust_forwarded_for", &self.trust_forwarded_for)
            .finish()
    }
}

fn parse_bool(value: &str) -> anyhow::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(anyhow!("expected a boolean, got {:?}", other)),
    }
}
