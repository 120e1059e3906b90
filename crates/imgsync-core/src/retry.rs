//! Transfer retry policy.
//!
//! Wraps a single upload with bounded retries on a fixed backoff schedule.
//! Rate limits, unavailable services and network failures are retried;
//! authentication failures abort at once; anything else fails without
//! retrying.
//!
//! Default delays: 2s → 5s → 10s, the last value repeating for any
//! further retries.

use std::time::Duration;

use crate::cache::SessionCache;
use crate::error::SyncError;
use crate::host::{DestinationHost, FailureClass};
use crate::model::{MediaIdentity, ObjectMetadata};

/// Retries after the initial attempt.
pub const DEFAULT_RETRIES: u32 = 3;

/// Delay before retry 1, 2, 3.
pub const DEFAULT_SCHEDULE_SECS: [u64; 3] = [2, 5, 10];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferPolicy {
    retries: u32,
    schedule: Vec<Duration>,
}

impl Default for TransferPolicy {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            schedule: DEFAULT_SCHEDULE_SECS
                .iter()
                .map(|s| Duration::from_secs(*s))
                .collect(),
        }
    }
}

impl TransferPolicy {
    pub fn new(retries: u32, schedule: Vec<Duration>) -> Self {
        Self { retries, schedule }
    }

    /// Default schedule with a different retry count.
    pub fn with_retries(retries: u32) -> Self {
        Self {
            retries,
            ..Self::default()
        }
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Delay before the `retry`-th retry (1-based). Past the end of the
    /// schedule the last delay repeats.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let idx = (retry.max(1) as usize - 1).min(self.schedule.len().saturating_sub(1));
        self.schedule.get(idx).copied().unwrap_or(Duration::ZERO)
    }

    /// Upload `bytes` as `filename`, apply descriptive metadata, and
    /// register the new identity in `cache`.
    ///
    /// Makes at most `retries + 1` upload attempts. The metadata update is
    /// best-effort: its failure is logged and the upload stands.
    pub async fn transfer(
        &self,
        host: &dyn DestinationHost,
        cache: &SessionCache,
        bytes: &[u8],
        filename: &str,
        metadata: &ObjectMetadata,
    ) -> Result<MediaIdentity, SyncError> {
        let operation = format!("upload {filename}");
        let max_attempts = self.retries.saturating_add(1);
        let mut attempt = 0;

        let identity = loop {
            attempt += 1;
            let err = match host.create_object(bytes, filename, metadata).await {
                Ok(identity) => break identity,
                Err(e) => e,
            };

            match err.class() {
                FailureClass::Authentication => return Err(SyncError::from_host(operation, err)),
                FailureClass::Fatal => {
                    return Err(SyncError::Remote {
                        operation,
                        source: err,
                    })
                }
                FailureClass::Retryable if attempt >= max_attempts => {
                    return Err(SyncError::TransferExhausted {
                        filename: filename.to_string(),
                        size_bytes: bytes.len(),
                        attempts: attempt,
                        last_error: err,
                    });
                }
                FailureClass::Retryable => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        filename,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "upload failed, retrying in {delay:?}: {err}"
                    );
                    metrics::counter!("imgsync_transfer_retries_total").increment(1);
                    tokio::time::sleep(delay).await;
                }
            }
        };

        if metadata.has_descriptive_fields() {
            if let Err(e) = host.update_object_metadata(&identity.id, metadata).await {
                tracing::warn!(filename, id = %identity.id, "metadata update failed, keeping upload: {e}");
            }
        }

        tracing::info!(filename, id = %identity.id, attempts = attempt, "uploaded");
        metrics::counter!("imgsync_uploads_total").increment(1);
        cache.put(filename, identity.clone());
        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use crate::host::HostError;
    use crate::model::{Document, RemoteObject};
    use async_trait::async_trait;
    use chrono::Utc;
    use parking_lot::Mutex;

    /// Host whose uploads replay a scripted list of outcomes.
    struct ScriptedHost {
        outcomes: Mutex<Vec<Result<MediaIdentity, HostError>>>,
        attempts: Mutex<Vec<tokio::time::Instant>>,
        metadata_fails: bool,
        metadata_calls: Mutex<u32>,
    }

    impl ScriptedHost {
        fn new(mut outcomes: Vec<Result<MediaIdentity, HostError>>) -> Self {
            outcomes.reverse();
            Self {
                outcomes: Mutex::new(outcomes),
                attempts: Mutex::new(Vec::new()),
                metadata_fails: false,
                metadata_calls: Mutex::new(0),
            }
        }

        fn attempt_count(&self) -> usize {
            self.attempts.lock().len()
        }
    }

    #[async_trait]
    impl DestinationHost for ScriptedHost {
        fn endpoint(&self) -> &str {
            "https://cms.example"
        }

        async fn list_objects(&self, _: u32, _: u32) -> Result<Vec<RemoteObject>, HostError> {
            Ok(vec![])
        }

        async fn search_objects(&self, _: &str, _: u32) -> Result<Vec<RemoteObject>, HostError> {
            Ok(vec![])
        }

        async fn create_object(
            &self,
            _: &[u8],
            _: &str,
            _: &ObjectMetadata,
        ) -> Result<MediaIdentity, HostError> {
            self.attempts.lock().push(tokio::time::Instant::now());
            self.outcomes.lock().pop().unwrap_or_else(rate_limited)
        }

        async fn update_object_metadata(&self, _: &str, _: &ObjectMetadata) -> Result<(), HostError> {
            *self.metadata_calls.lock() += 1;
            if self.metadata_fails {
                Err(HostError::Rejected {
                    operation: "POST media/1".into(),
                    status: 500,
                    body: "boom".into(),
                })
            } else {
                Ok(())
            }
        }

        async fn get_document(&self, id: &str) -> Result<Document, HostError> {
            Ok(Document {
                id: id.into(),
                body: String::new(),
            })
        }

        async fn update_document(&self, _: &str, _: &str) -> Result<(), HostError> {
            Ok(())
        }
    }

    fn rate_limited() -> Result<MediaIdentity, HostError> {
        Err(HostError::RateLimited {
            operation: "POST media".into(),
        })
    }

    fn session() -> SessionCache {
        SessionCache::open(Box::new(MemoryStore::new()), "https://cms.example", Utc::now())
    }

    fn described() -> ObjectMetadata {
        ObjectMetadata {
            title: Some("sunset".into()),
            alt_text: Some("sunset".into()),
            ..Default::default()
        }
    }

    #[test]
    fn schedule_repeats_last_delay() {
        let policy = TransferPolicy::with_retries(5);
        let delays: Vec<u64> = (1..=5).map(|n| policy.delay_for(n).as_secs()).collect();
        assert_eq!(delays, vec![2, 5, 10, 10, 10]);
    }

    #[test]
    fn empty_schedule_means_no_delay() {
        let policy = TransferPolicy::new(2, vec![]);
        assert_eq!(policy.delay_for(1), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_after_retries_plus_one_attempts_with_scheduled_delays() {
        let host = ScriptedHost::new(vec![]);
        let cache = session();
        let policy = TransferPolicy::default();

        let err = policy
            .transfer(&host, &cache, &[0u8; 1024], "sunset.jpg", &described())
            .await
            .unwrap_err();

        match err {
            SyncError::TransferExhausted {
                attempts,
                size_bytes,
                ..
            } => {
                assert_eq!(attempts, 4);
                assert_eq!(size_bytes, 1024);
            }
            other => panic!("expected TransferExhausted, got {other:?}"),
        }

        let times = host.attempts.lock().clone();
        assert_eq!(times.len(), 4);
        let gaps: Vec<u64> = times.windows(2).map(|w| (w[1] - w[0]).as_secs()).collect();
        assert_eq!(gaps, vec![2, 5, 10]);
        assert!(cache.lookup("sunset.jpg").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn unbounded_retry_count_keeps_retrying() {
        let host = ScriptedHost::new(vec![
            rate_limited(),
            rate_limited(),
            Ok(MediaIdentity::new("77", "https://cms.example/u/sunset.jpg")),
        ]);
        let cache = session();

        let identity = TransferPolicy::with_retries(u32::MAX)
            .transfer(&host, &cache, b"img", "sunset.jpg", &described())
            .await
            .unwrap();

        assert_eq!(identity.id, "77");
        assert_eq!(host.attempt_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn authentication_failure_is_not_retried() {
        let host = ScriptedHost::new(vec![Err(HostError::Unauthorized {
            operation: "POST media".into(),
            status: 401,
        })]);
        let cache = session();

        let err = TransferPolicy::default()
            .transfer(&host, &cache, b"img", "sunset.jpg", &described())
            .await
            .unwrap_err();

        assert!(err.is_authentication());
        assert_eq!(host.attempt_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn other_failures_are_fatal_without_retry() {
        let host = ScriptedHost::new(vec![Err(HostError::Rejected {
            operation: "POST media".into(),
            status: 415,
            body: "unsupported".into(),
        })]);
        let cache = session();

        let err = TransferPolicy::default()
            .transfer(&host, &cache, b"img", "sunset.jpg", &described())
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Remote { .. }));
        assert_eq!(host.attempt_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_transient_failure_and_registers_once() {
        let host = ScriptedHost::new(vec![
            Err(HostError::Network {
                operation: "POST media".into(),
                detail: "reset".into(),
            }),
            Ok(MediaIdentity::new("77", "https://cms.example/u/sunset.jpg")),
        ]);
        let cache = session();

        let identity = TransferPolicy::default()
            .transfer(&host, &cache, b"img", "sunset.jpg", &described())
            .await
            .unwrap();

        assert_eq!(identity.id, "77");
        assert_eq!(host.attempt_count(), 2);
        assert_eq!(cache.lookup("sunset"), Some(identity));
        assert_eq!(*host.metadata_calls.lock(), 1);
    }

    #[tokio::test]
    async fn metadata_failure_keeps_upload() {
        let mut host = ScriptedHost::new(vec![Ok(MediaIdentity::new("5", "https://cms.example/u/a.jpg"))]);
        host.metadata_fails = true;
        let cache = session();

        let identity = TransferPolicy::default()
            .transfer(&host, &cache, b"img", "a.jpg", &described())
            .await
            .unwrap();

        assert_eq!(identity.id, "5");
        assert_eq!(cache.lookup("a.jpg"), Some(identity));
    }

    #[tokio::test]
    async fn zero_retries_means_single_attempt() {
        let host = ScriptedHost::new(vec![]);
        let cache = session();

        let err = TransferPolicy::with_retries(0)
            .transfer(&host, &cache, b"img", "a.jpg", &ObjectMetadata::default())
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::TransferExhausted { attempts: 1, .. }));
        assert_eq!(host.attempt_count(), 1);
    }
}
