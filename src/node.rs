// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The node: a peer that dials a single hub.

use crate::config::NodeConfig;
use crate::core::EngineCore;
use crate::error::{ConfigError, EngineError};
use crate::handler::{NodeCtx, NodeHandlers};
use crate::outbox::Outbox;
use crate::session::{Handshake, NodeState, HEARTBEAT_INTERVAL};
use crate::wire::{Command, Frame, GetRequest, NoticeAck, NoticeRecord, PostRecord, ReplyBody};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::{oneshot, Notify};

pub struct Node {
    config: NodeConfig,
    core: EngineCore,
    handshake: Handshake,
    hub_addr: SocketAddr,
    pub handlers: NodeHandlers,
    connect_waiter: Mutex<Option<oneshot::Sender<String>>>,
    shutdown: Arc<Notify>,
}

impl Node {
    /// Binds an ephemeral local socket and resolves the hub address. Does
    /// not perform the handshake yet; call `run` for that.
    pub async fn connect(config: NodeConfig) -> Result<Arc<Self>, ConfigError> {
        config.validate()?;
        let hub_addr: SocketAddr = config
            .hub_address
            .parse()
            .map_err(|e| ConfigError::InvalidValue(format!("hub_address: {e}")))?;
        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(|e| ConfigError::InvalidValue(format!("bind local socket: {e}")))?;
        let outbox = Outbox::new(&config.spill_dir)?;
        let key = config.secret_key_bytes();

        Ok(Arc::new(Self {
            core: EngineCore::new(Arc::new(socket), key, outbox),
            handshake: Handshake::new(),
            hub_addr,
            handlers: NodeHandlers::new(),
            connect_waiter: Mutex::new(None),
            shutdown: Arc::new(Notify::new()),
            config,
        }))
    }

    pub fn state(&self) -> NodeState {
        self.handshake.state()
    }

    /// Drives the reader loop, the initial handshake, and the recurring
    /// heartbeat that renews the signature and drains the outbox.
    pub async fn run(self: Arc<Self>) -> std::io::Result<()> {
        let reader = self.clone().spawn_reader();
        let signal_handle = self.clone().spawn_shutdown_spill();

        self.handshake.begin_connecting();
        if let Err(e) = self.clone().send_handshake(Command::Connect).await {
            tracing::warn!(error = %e, "initial handshake send failed");
        }

        loop {
            tokio::select! {
                _ = tokio::time::sleep(HEARTBEAT_INTERVAL) => {
                    if let Err(e) = self.clone().send_handshake(Command::Heartbeat).await {
                        tracing::warn!(error = %e, "heartbeat send failed");
                        self.handshake.mark_lost();
                    }
                }
                _ = self.shutdown.notified() => {
                    tracing::info!("node shutting down");
                    break;
                }
            }
        }

        reader.abort();
        signal_handle.abort();
        self.core.outbox.spill()?;
        Ok(())
    }

    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }

    async fn send_handshake(self: Arc<Self>, command: Command) -> std::io::Result<()> {
        let (tx, rx) = oneshot::channel();
        *self.connect_waiter.lock() = Some(tx);
        self.core
            .send_frame(
                self.hub_addr,
                command,
                &self.config.name,
                "",
                self.config.connect_code.as_bytes(),
            )
            .await?;

        match tokio::time::timeout(self.config.heartbeat_interval(), rx).await {
            Ok(Ok(signature)) => {
                let was_connected = self.handshake.is_connected();
                self.handshake.mark_connected(signature);
                if !was_connected {
                    tracing::info!("node connected, flushing outbox");
                    if let Err(e) = self.core.outbox.load() {
                        tracing::warn!(error = %e, "outbox load failed after reconnect");
                    }
                    self.flush_outbox().await;
                }
            }
            _ => {
                self.handshake.mark_lost();
            }
        }
        Ok(())
    }

    async fn flush_outbox(&self) {
        for record in self.core.outbox.snapshot() {
            let payload = serde_json::to_vec(&record).unwrap_or_default();
            let _ = self
                .core
                .send_frame(
                    self.hub_addr,
                    Command::Post,
                    &self.config.name,
                    &self.handshake.signature(),
                    &payload,
                )
                .await;
        }
    }

    fn spawn_reader(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut buf = vec![0u8; 2048];
            loop {
                match self.core.socket.recv_from(&mut buf).await {
                    Ok((len, _addr)) => match self.core.decode(&buf[..len]) {
                        Ok(frame) => {
                            let this = self.clone();
                            tokio::spawn(async move { this.dispatch(frame).await });
                        }
                        Err(e) => tracing::debug!(error = %e, "dropping undecodable frame"),
                    },
                    Err(e) => {
                        tracing::warn!(error = %e, "socket read error");
                        self.handshake.mark_lost();
                    }
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

    async fn dispatch(&self, frame: Frame) {
        match frame.command {
            Command::Reply => self.handle_reply(&frame).await,
            Command::Get => self.handle_get(&frame).await,
            Command::Notice => self.handle_notice(&frame).await,
            Command::Connect | Command::Heartbeat | Command::Post => {
                tracing::debug!(command = ?frame.command, "unexpected inbound command at node");
            }
        }
    }

    async fn handle_reply(&self, frame: &Frame) {
        let body = match serde_json::from_slice::<ReplyBody>(&frame.data) {
            Ok(b) => b,
            Err(e) => {
                tracing::debug!(error = %e, "dropping unparsable reply");
                return;
            }
        };
        if let ReplyBody::Connect { signature } = &body {
            if let Some(tx) = self.connect_waiter.lock().take() {
                let _ = tx.send(signature.clone());
            }
            return;
        }
        self.core.handle_common_reply(&body, &frame.name);
    }

    fn signature_valid(&self, frame: &Frame) -> bool {
        self.handshake.is_connected() && frame.signature == self.handshake.signature()
    }

    async fn handle_get(&self, frame: &Frame) {
        if !self.signature_valid(frame) {
            tracing::debug!("dropping get with stale or missing signature");
            return;
        }
        let Ok(request) = serde_json::from_slice::<GetRequest>(&frame.data) else {
            return;
        };
        let Some(response) = self
            .handlers
            .dispatch_request(&request.label, &NodeCtx, &request.body)
        else {
            tracing::debug!(label = %request.label, "no handler registered for get, dropping");
            return;
        };
        let reply = ReplyBody::Get {
            id: request.id,
            status: 0,
            body: response,
        };
        if let Ok(payload) = serde_json::to_vec(&reply) {
            let _ = self
                .core
                .send_frame(
                    self.hub_addr,
                    Command::Reply,
                    &self.config.name,
                    &self.handshake.signature(),
                    &payload,
                )
                .await;
        }
    }

    async fn handle_notice(&self, frame: &Frame) {
        if !self.signature_valid(frame) {
            tracing::debug!("dropping notice with stale or missing signature");
            return;
        }
        let Ok(record) = serde_json::from_slice::<NoticeRecord>(&frame.data) else {
            return;
        };
        let ack = NoticeAck {
            id: record.id,
            from: self.config.name.clone(),
        };
        let reply = ReplyBody::NoticeAck { id: ack.id };
        if let Ok(payload) = serde_json::to_vec(&reply) {
            let _ = self
                .core
                .send_frame(
                    self.hub_addr,
                    Command::Reply,
                    &self.config.name,
                    &self.handshake.signature(),
                    &payload,
                )
                .await;
        }
        self.handlers
            .dispatch_notice(&record.label, &NodeCtx, &record.body);
    }

    /// Buffers a post in the outbox and, if connected, sends it immediately.
    pub async fn post(&self, label: &str, body: Vec<u8>) -> std::io::Result<i64> {
        let id = self.core.ids.next();
        let record = PostRecord {
            id,
            label: label.to_string(),
            body,
        };
        self.core.outbox.add(id, record.clone())?;
        if self.handshake.is_connected() {
            let payload = serde_json::to_vec(&record).unwrap_or_default();
            self.core
                .send_frame(
                    self.hub_addr,
                    Command::Post,
                    &self.config.name,
                    &self.handshake.signature(),
                    &payload,
                )
                .await?;
        }
        Ok(id)
    }

    /// Sends a `get` request and waits for the matching reply with the
    /// configured default timeout.
    pub async fn get(&self, label: &str, body: Vec<u8>) -> Result<Vec<u8>, EngineError> {
        self.get_with_timeout(label, body, self.config.get_timeout())
            .await
    }

    pub async fn get_with_timeout(
        &self,
        label: &str,
        body: Vec<u8>,
        timeout: Duration,
    ) -> Result<Vec<u8>, EngineError> {
        let id = self.core.ids.next();
        let request = GetRequest {
            id,
            label: label.to_string(),
            body,
        };
        let payload = serde_json::to_vec(&request).map_err(|e| {
            EngineError::Frame(crate::error::FrameError::BadPayload(e.to_string()))
        })?;

        let hub_addr_str = self.hub_addr.to_string();
        let rx = self.core.correlator.register(id);
        self.core
            .send_frame(
                self.hub_addr,
                Command::Get,
                &self.config.name,
                &self.handshake.signature(),
                &payload,
            )
            .await
            .map_err(|e| EngineError::Frame(crate::error::FrameError::BadPayload(e.to_string())))?;

        self.core
            .correlator
            .await_reply(id, rx, label, &self.config.name, &hub_addr_str, timeout)
            .await
            .map_err(EngineError::from)
    }
}
