// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Collaborators shared identically by `Hub` and `Node`: the outbox,
//! correlator, and notice table every peer owns regardless of which side
//! of the handshake it plays, since posts/gets/notices are symmetric.

use crate::correlator::Correlator;
use crate::error::FrameError;
use crate::id::IdSource;
use crate::notice::NoticeTable;
use crate::outbox::Outbox;
use crate::wire::{self, Command, Frame, ReplyBody};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;

/// Collaborators and the socket every engine (hub or node) owns.
pub struct EngineCore {
    pub key: [u8; 8],
    pub socket: Arc<UdpSocket>,
    pub outbox: Outbox,
    pub correlator: Correlator,
    pub notices: NoticeTable,
    pub ids: IdSource,
}

impl EngineCore {
    pub fn new(socket: Arc<UdpSocket>, key: [u8; 8], outbox: Outbox) -> Self {
        Self {
            key,
            socket,
            outbox,
            correlator: Correlator::new(),
            notices: NoticeTable::new(),
            ids: IdSource::new(),
        }
    }

    pub async fn send_frame(
        &self,
        addr: SocketAddr,
        command: Command,
        name: &str,
        signature: &str,
        payload: &[u8],
    ) -> std::io::Result<()> {
        match wire::encode(command, name, signature, &self.key, payload) {
            Ok(raw) => {
                self.socket.send_to(&raw, addr).await?;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "dropping outbound frame that failed to encode");
                Ok(())
            }
        }
    }

    pub fn decode(&self, raw: &[u8]) -> Result<Frame, FrameError> {
        wire::decode(&self.key, raw)
    }

    /// Common handling for an inbound `REPLY` frame: resolves the posting
    /// outbox entry, the waiting `get` caller, or the acking notice.
    /// `Connect` replies are handshake-specific and handled by the node
    /// directly rather than here.
    pub fn handle_common_reply(&self, body: &ReplyBody, from_name: &str) {
        match body {
            ReplyBody::Connect { .. } => {
                tracing::debug!("ignoring unsolicited connect reply outside handshake flow");
            }
            ReplyBody::Post { id, status } => {
                if *status == 0 {
                    self.outbox.delete(*id);
                } else {
                    tracing::debug!(id, "post rejected: auth failure");
                }
            }
            ReplyBody::Get { id, body, .. } => {
                self.correlator.deliver(*id, body.clone());
            }
            ReplyBody::NoticeAck { id } => {
                self.notices.ack(*id, from_name);
            }
        }
    }
}
