// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Session state: hub-side peer roster and node-side handshake machine.

pub mod handshake;
pub mod roster;

pub use handshake::{Handshake, NodeState, HEARTBEAT_INTERVAL};
pub use roster::{PeerState, Roster, STALE_AFTER, SWEEP_INTERVAL};
