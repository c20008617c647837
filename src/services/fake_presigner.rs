use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::services::s3_service::{PresignError, Presigner};

/// In-memory signer: counts calls, stamps each URL with a nonce, fails on demand.
#[derive(Default)]
pub struct FakePresigner {
    calls: AtomicUsize,
    failing: AtomicBool,
}

impl FakePresigner {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl Presigner for FakePresigner {
    async fn presign_put(
        &self,
        bucket: &str,
        key: &str,
        _content_type: &str,
        expires_in: Duration,
    ) -> Result<String, PresignError> {
        let nonce = self.calls.fetch_add(1, Ordering::SeqCst);

        if self.failing.load(Ordering::SeqCst) {
            return Err(PresignError::Unavailable(
                "dispatch failure: connection refused (10.0.0.3:9000)".to_string(),
            ));
        }

        Ok(format!(
            "https://storage.test/{}/{}?X-Amz-Expires={}&X-Amz-Signature={:08x}",
            bucket,
            key,
            expires_in.as_secs(),
            nonce
        ))
    }
}
