// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Request/reply correlation by id, modeled on `hdds::rpc::client`'s
//! `pending: Arc<DashMap<Key, oneshot::Sender<_>>>` table.

use crate::error::RequestTimeout;
use dashmap::DashMap;
use std::time::Duration;
use tokio::sync::oneshot;

const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Tracks in-flight `get` requests keyed by request id.
#[derive(Default)]
pub struct Correlator {
    pending: DashMap<i64, oneshot::Sender<Vec<u8>>>,
}

impl Correlator {
    pub fn new() -> Self {
        Self {
            pending: DashMap::new(),
        }
    }

    /// Registers `id` and returns the receiving half. Callers must call this
    /// and hold the returned receiver *before* transmitting the request frame,
    /// since `deliver` only finds an entry once `register` has run — an
    /// `async fn` that registered internally would not do so until first
    /// polled, which can race a reply dispatched on another task.
    pub(crate) fn register(&self, id: i64) -> oneshot::Receiver<Vec<u8>> {
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);
        rx
    }

    /// Delivers `response` to whoever is waiting on `id`. No-op if nobody is.
    pub fn deliver(&self, id: i64, response: Vec<u8>) {
        if let Some((_, tx)) = self.pending.remove(&id) {
            let _ = tx.send(response);
        }
    }

    /// Awaits a reply on a receiver obtained from `register`, up to `timeout`.
    pub async fn await_reply(
        &self,
        id: i64,
        rx: oneshot::Receiver<Vec<u8>>,
        label: &str,
        name: &str,
        addr: &str,
        timeout: Duration,
    ) -> Result<Vec<u8>, RequestTimeout> {
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(data)) => Ok(data),
            _ => {
                self.pending.remove(&id);
                Err(RequestTimeout {
                    label: label.to_string(),
                    name: name.to_string(),
                    addr: addr.to_string(),
                })
            }
        }
    }

    /// Registers `id`, then waits up to `timeout` for a reply. Only safe to
    /// use when nothing can deliver before `register` runs (e.g. in tests);
    /// production callers that transmit a frame must call `register` first
    /// and use `await_reply` once the frame is on the wire.
    pub async fn wait(
        &self,
        id: i64,
        label: &str,
        name: &str,
        addr: &str,
        timeout: Duration,
    ) -> Result<Vec<u8>, RequestTimeout> {
        let rx = self.register(id);
        self.await_reply(id, rx, label, name, addr, timeout).await
    }

    /// Waits with the default 1000 ms timeout.
    pub async fn wait_default(
        &self,
        id: i64,
        label: &str,
        name: &str,
        addr: &str,
    ) -> Result<Vec<u8>, RequestTimeout> {
        self.wait(id, label, name, addr, DEFAULT_TIMEOUT).await
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
