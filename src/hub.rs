// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The hub: the listening endpoint that serves many nodes.

use crate::config::HubConfig;
use crate::core::EngineCore;
use crate::error::{ConfigError, EngineError, IncompleteNotice};
use crate::handler::{HubCtx, HubHandlers};
use crate::notice::{run_retry_loop, PendingNotice, RetryConfig};
use crate::outbox::Outbox;
use crate::session::{Roster, STALE_AFTER, SWEEP_INTERVAL};
use crate::signature::SignatureRegistry;
use crate::wire::{Command, Frame, GetRequest, NoticeRecord, PostRecord, ReplyBody};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::Notify;

/// Default timeout for `Hub::get`, matching the node side's default.
const DEFAULT_GET_TIMEOUT: Duration = Duration::from_millis(1000);

pub struct Hub {
    config: HubConfig,
    core: EngineCore,
    signatures: SignatureRegistry,
    roster: Roster,
    pub handlers: HubHandlers,
    shutdown: Arc<Notify>,
}

impl Hub {
    /// Binds the hub's UDP socket and loads any backlog left by a previous
    /// run from the configured spill directory.
    pub async fn bind(config: HubConfig) -> Result<Arc<Self>, ConfigError> {
        config.validate()?;
        let addr = SocketAddr::new(config.bind_address, config.port);
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|e| ConfigError::InvalidValue(format!("bind {addr}: {e}")))?;
        let outbox = Outbox::new(&config.spill_dir)?;
        let loaded = outbox.load()?;
        if loaded > 0 {
            tracing::info!(loaded, "reloaded outbox backlog from spill directory");
        }
        let key = config.secret_key_bytes();

        Ok(Arc::new(Self {
            core: EngineCore::new(Arc::new(socket), key, outbox),
            signatures: SignatureRegistry::new(),
            roster: Roster::new(),
            handlers: HubHandlers::new(),
            shutdown: Arc::new(Notify::new()),
            config,
        }))
    }

    pub fn online_table(&self) -> HashMap<String, String> {
        self.roster.online_table()
    }

    /// Drives the reader loop, liveness sweep, and shutdown-signal spill
    /// until a termination signal arrives.
    pub async fn run(self: Arc<Self>) -> std::io::Result<()> {
        let sweep_handle = self.clone().spawn_sweep();
        let signal_handle = self.clone().spawn_shutdown_spill();

        let mut buf = vec![0u8; 2048];
        loop {
            tokio::select! {
                result = self.core.socket.recv_from(&mut buf) => {
                    let (len, addr) = result?;
                    match self.core.decode(&buf[..len]) {
                        Ok(frame) => {
                            let this = self.clone();
                            tokio::spawn(async move { this.dispatch(frame, addr).await });
                        }
                        Err(e) => tracing::debug!(%addr, error = %e, "dropping undecodable frame"),
                    }
                }
                _ = self.shutdown.notified() => {
                    tracing::info!("hub shutting down");
                    break;
                }
            }
        }

        sweep_handle.abort();
        signal_handle.abort();
        self.core.outbox.spill()?;
        Ok(())
    }

    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }

    fn spawn_sweep(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(SWEEP_INTERVAL).await;
                let discarded = self.roster.sweep();
                for name in discarded {
                    tracing::info!(name, after = ?STALE_AFTER, "peer discarded as offline");
                }
            }
        })
    }

    fn spawn_shutdown_spill(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            #[cfg(unix)]
            {
                use tokio::signal::unix::{signal, SignalKind};
                let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
                let mut int = signal(SignalKind::interrupt()).expect("install SIGINT handler");
                let mut hup = signal(SignalKind::hangup()).expect("install SIGHUP handler");
                let mut quit = signal(SignalKind::quit()).expect("install SIGQUIT handler");
                tokio::select! {
                    _ = term.recv() => {}
                    _ = int.recv() => {}
                    _ = hup.recv() => {}
                    _ = quit.recv() => {}
                }
            }
            #[cfg(not(unix))]
            {
                let _ = tokio::signal::ctrl_c().await;
            }
            tracing::info!("termination signal received, spilling outbox");
            self.shutdown.notify_waiters();
        })
    }

    async fn dispatch(&self, frame: Frame, addr: SocketAddr) {
        match frame.command {
            Command::Connect | Command::Heartbeat => self.handle_handshake(&frame, addr).await,
            Command::Post => self.handle_post(&frame, addr).await,
            Command::Get => self.handle_get(&frame, addr).await,
            Command::Notice => self.handle_notice(&frame, addr).await,
            Command::Reply => self.handle_reply(&frame, addr).await,
        }
    }

    async fn handle_handshake(&self, frame: &Frame, addr: SocketAddr) {
        if frame.data != self.config.connect_code.as_bytes() {
            tracing::warn!(%addr, "handshake rejected: bad connect code");
            return;
        }
        self.roster.touch(&frame.name, &addr.to_string());
        let signature = self.signatures.issue(&addr.to_string());
        let reply = ReplyBody::Connect {
            signature: signature.clone(),
        };
        self.reply(addr, &reply).await;
    }

    async fn handle_post(&self, frame: &Frame, addr: SocketAddr) {
        if !self.signatures.check(&addr.to_string(), &frame.signature) {
            self.reply(addr, &ReplyBody::Post { id: 0, status: 1 }).await;
            return;
        }
        let Ok(record) = serde_json::from_slice::<PostRecord>(&frame.data) else {
            tracing::debug!(%addr, "dropping post with unparsable body");
            return;
        };
        self.handlers
            .dispatch_request(&record.label, &HubCtx, &record.body);
        self.reply(
            addr,
            &ReplyBody::Post {
                id: record.id,
                status: 0,
            },
        )
        .await;
    }

    async fn handle_get(&self, frame: &Frame, addr: SocketAddr) {
        if !self.signatures.check(&addr.to_string(), &frame.signature) {
            self.reply(
                addr,
                &ReplyBody::Get {
                    id: 0,
                    status: 1,
                    body: Vec::new(),
                },
            )
            .await;
            return;
        }
        let Ok(request) = serde_json::from_slice::<GetRequest>(&frame.data) else {
            tracing::debug!(%addr, "dropping get with unparsable body");
            return;
        };
        let Some(response) = self
            .handlers
            .dispatch_request(&request.label, &HubCtx, &request.body)
        else {
            tracing::debug!(label = %request.label, "no handler registered for get, dropping");
            return;
        };
        self.reply(
            addr,
            &ReplyBody::Get {
                id: request.id,
                status: 0,
                body: response,
            },
        )
        .await;
    }

    async fn handle_notice(&self, frame: &Frame, addr: SocketAddr) {
        if !self.signatures.check(&addr.to_string(), &frame.signature) {
            tracing::debug!(%addr, "dropping notice with bad signature");
            return;
        }
        let Ok(record) = serde_json::from_slice::<NoticeRecord>(&frame.data) else {
            tracing::debug!(%addr, "dropping notice with unparsable body");
            return;
        };
        self.handlers
            .dispatch_notice(&record.label, &HubCtx, &record.body);
        self.reply(addr, &ReplyBody::NoticeAck { id: record.id }).await;
    }

    async fn handle_reply(&self, frame: &Frame, _addr: SocketAddr) {
        match serde_json::from_slice::<ReplyBody>(&frame.data) {
            Ok(body) => self.core.handle_common_reply(&body, &frame.name),
            Err(e) => tracing::debug!(error = %e, "dropping unparsable reply"),
        }
    }

    async fn reply(&self, addr: SocketAddr, body: &ReplyBody) {
        let payload = match serde_json::to_vec(body) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize reply");
                return;
            }
        };
        let signature = self.signatures.current(&addr.to_string()).unwrap_or_default();
        let _ = self
            .core
            .send_frame(addr, Command::Reply, &self.config.name, &signature, &payload)
            .await;
    }

    /// Posts a record into the outbox and attempts immediate delivery to
    /// every known address for `name`. Delivery is retried by the node's
    /// own heartbeat-driven outbox flush if the hub is unreachable now.
    pub async fn post(&self, name: &str, label: &str, body: Vec<u8>) -> std::io::Result<i64> {
        let id = self.core.ids.next();
        let record = PostRecord {
            id,
            label: label.to_string(),
            body,
        };
        self.core.outbox.add(id, record.clone())?;
        for addr in self.roster.addresses(name) {
            if let Ok(socket_addr) = addr.parse::<SocketAddr>() {
                let payload = serde_json::to_vec(&record).unwrap_or_default();
                let signature = self.signatures.current(&addr).unwrap_or_default();
                self.core
                    .send_frame(socket_addr, Command::Post, &self.config.name, &signature, &payload)
                    .await?;
            }
        }
        Ok(id)
    }

    /// Sends a `get` request to `name` and waits for its reply with the
    /// default 1000 ms timeout.
    pub async fn get(&self, name: &str, label: &str, body: Vec<u8>) -> Result<Vec<u8>, EngineError> {
        self.get_with_timeout(name, label, body, DEFAULT_GET_TIMEOUT)
            .await
    }

    /// Sends a `get` request to the first known address for `name` and
    /// waits up to `timeout` for its reply.
    pub async fn get_with_timeout(
        &self,
        name: &str,
        label: &str,
        body: Vec<u8>,
        timeout: Duration,
    ) -> Result<Vec<u8>, EngineError> {
        let addr = self
            .roster
            .addresses(name)
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::NotFound(name.to_string()))?;
        let socket_addr: SocketAddr = addr
            .parse()
            .map_err(|_| EngineError::NotFound(name.to_string()))?;

        let id = self.core.ids.next();
        let request = GetRequest {
            id,
            label: label.to_string(),
            body,
        };
        let payload = serde_json::to_vec(&request).map_err(|e| {
            EngineError::Frame(crate::error::FrameError::BadPayload(e.to_string()))
        })?;
        let signature = self.signatures.current(&addr).unwrap_or_default();

        let rx = self.core.correlator.register(id);
        self.core
            .send_frame(socket_addr, Command::Get, &self.config.name, &signature, &payload)
            .await
            .map_err(|e| EngineError::Frame(crate::error::FrameError::BadPayload(e.to_string())))?;

        self.core
            .correlator
            .await_reply(id, rx, label, name, &addr, timeout)
            .await
            .map_err(EngineError::from)
    }

    /// Broadcasts a retried notice to every known address for `name`.
    pub async fn notice(
        &self,
        name: &str,
        label: &str,
        data: &[u8],
        retry: RetryConfig,
    ) -> Result<(), IncompleteNotice> {
        let addrs = self.roster.addresses(name);
        if addrs.is_empty() {
            return Err(IncompleteNotice {
                label: label.to_string(),
                name: name.to_string(),
                outstanding: 0,
            });
        }
        let id = self.core.ids.next();
        let pending = Arc::new(PendingNotice::new(id, label, addrs.clone()));
        self.core.notices.register(pending.clone());

        let record = NoticeRecord {
            id,
            label: label.to_string(),
            body: data.to_vec(),
        };
        let payload = serde_json::to_vec(&record).unwrap_or_default();

        let result = run_retry_loop(&pending, name, retry, |targets| {
            let payload = payload.clone();
            async move {
                for addr in targets {
                    if let Ok(socket_addr) = addr.parse::<SocketAddr>() {
                        let signature = self.signatures.current(&addr).unwrap_or_default();
                        let _ = self
                            .core
                            .send_frame(
                                socket_addr,
                                Command::Notice,
                                &self.config.name,
                                &signature,
                                &payload,
                            )
                            .await;
                    }
                }
            }
        })
        .await;

        self.core.notices.remove(id);
        result
    }

    /// Fans a notice out to every currently registered peer name.
    pub async fn notice_all(
        &self,
        label: &str,
        data: &[u8],
        retry: RetryConfig,
    ) -> Vec<(String, Result<(), IncompleteNotice>)> {
        let mut results = Vec::new();
        for name in self.roster.all_names() {
            let result = self.notice(&name, label, data, retry).await;
            results.push((name, result));
        }
        results
    }
}
