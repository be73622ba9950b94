// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Broadcast-with-retry over a per-recipient acknowledgement set.

use crate::error::IncompleteNotice;
use dashmap::{DashMap, DashSet};
use std::sync::Arc;
use std::time::Duration;

/// Retry policy for a single `notice` call.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_retry: u32,
    pub retry_interval: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retry: 10,
            retry_interval: Duration::from_millis(100),
        }
    }
}

impl RetryConfig {
    /// The absolute TTL for a notice under this policy, computed once at
    /// registration and never extended by subsequent retries.
    pub fn ttl(&self) -> Duration {
        self.retry_interval * (self.max_retry + 1)
    }
}

/// Tracks which recipients of one outstanding notice have not yet acked.
pub struct PendingNotice {
    pub id: i64,
    pub label: String,
    outstanding: Arc<DashSet<String>>,
}

impl PendingNotice {
    pub fn new(id: i64, label: impl Into<String>, recipients: impl IntoIterator<Item = String>) -> Self {
        let outstanding = Arc::new(DashSet::new());
        for r in recipients {
            outstanding.insert(r);
        }
        Self {
            id,
            label: label.into(),
            outstanding,
        }
    }

    /// Marks `addr` as acked. Returns true if every recipient has now acked.
    pub fn ack(&self, addr: &str) -> bool {
        self.outstanding.remove(addr);
        self.outstanding.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.outstanding.is_empty()
    }

    pub fn outstanding(&self) -> Vec<String> {
        self.outstanding.iter().map(|e| e.clone()).collect()
    }

    pub fn outstanding_count(&self) -> usize {
        self.outstanding.len()
    }
}

/// Drives a single notice's send/wait/retry loop against a caller-supplied
/// send function, following the TTL = `(max_retry+1) x retry_interval`
/// decision: the deadline is fixed at registration, not extended per retry.
pub async fn run_retry_loop<F, Fut>(
    notice: &PendingNotice,
    name: &str,
    config: RetryConfig,
    mut send: F,
) -> Result<(), IncompleteNotice>
where
    F: FnMut(Vec<String>) -> Fut,
    Fut: std::future::Future<Output = ()>,
{
    if notice.is_complete() {
        return Ok(());
    }

    for _ in 0..=config.max_retry {
        let targets = notice.outstanding();
        if targets.is_empty() {
            return Ok(());
        }
        send(targets).await;
        tokio::time::sleep(config.retry_interval).await;
        if notice.is_complete() {
            return Ok(());
        }
    }

    Err(IncompleteNotice {
        label: notice.label.clone(),
        name: name.to_string(),
        outstanding: notice.outstanding_count(),
    })
}

/// Engine-owned table of outstanding notices, keyed by id, shared between
/// the retry loop (which reads `outstanding`) and the dispatcher (which
/// calls `ack` when a `REPLY(NoticeAck)` arrives).
#[derive(Default)]
pub struct NoticeTable {
    pending: DashMap<i64, Arc<PendingNotice>>,
}

impl NoticeTable {
    pub fn new() -> Self {
        Self {
            pending: DashMap::new(),
        }
    }

    pub fn register(&self, notice: Arc<PendingNotice>) {
        self.pending.insert(notice.id, notice);
    }

    /// Delivers an ack for `id` from `from`. Returns true if that id was
    /// known and is now fully acked.
    pub fn ack(&self, id: i64, from: &str) -> bool {
        match self.pending.get(&id) {
            Some(notice) => notice.ack(from),
            None => false,
        }
    }

    pub fn remove(&self, id: i64) {
        self.pending.remove(&id);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn completes_immediately_with_no_recipients() {
        let pending = PendingNotice::new(1, "ping", Vec::<String>::new());
        let result = run_retry_loop(&pending, "n1", RetryConfig::default(), |_| async {}).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn acks_before_second_retry_stop_the_loop() {
        let pending = Arc::new(PendingNotice::new(
            1,
            "ping",
            vec!["n1".to_string()],
        ));
        let sends = Arc::new(AtomicUsize::new(0));
        let p2 = pending.clone();
        let s2 = sends.clone();
        let cfg = RetryConfig {
            max_retry: 10,
            retry_interval: Duration::from_millis(10),
        };
        let result = run_retry_loop(&pending, "n1", cfg, move |_targets| {
            let p2 = p2.clone();
            let s2 = s2.clone();
            async move {
                s2.fetch_add(1, Ordering::SeqCst);
                p2.ack("n1");
            }
        })
        .await;
        assert!(result.is_ok());
        assert_eq!(sends.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausts_retries_and_reports_incomplete() {
        let pending = PendingNotice::new(1, "ping", vec!["n1".to_string()]);
        let cfg = RetryConfig {
            max_retry: 2,
            retry_interval: Duration::from_millis(5),
        };
        let err = run_retry_loop(&pending, "n1", cfg, |_| async {})
            .await
            .unwrap_err();
        assert_eq!(err.label, "ping");
        assert_eq!(err.outstanding, 1);
    }

    #[test]
    fn ttl_is_fixed_bound_not_per_retry() {
        let cfg = RetryConfig {
            max_retry: 2,
            retry_interval: Duration::from_millis(200),
        };
        assert_eq!(cfg.ttl(), Duration::from_millis(600));
    }

    #[test]
    fn table_ack_delivers_to_registered_notice() {
        let table = NoticeTable::new();
        let notice = Arc::new(PendingNotice::new(9, "ping", vec!["n1".to_string()]));
        table.register(notice.clone());
        assert!(table.ack(9, "n1"));
        assert!(notice.is_complete());
    }

    #[test]
    fn table_ack_for_unknown_id_is_false() {
        let table = NoticeTable::new();
        assert!(!table.ack(123, "n1"));
    }
}
