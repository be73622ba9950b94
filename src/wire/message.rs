// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Self-describing payload records carried inside frame bodies.

use serde::{Deserialize, Serialize};

/// A one-way post delivered to a peer's registered label.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostRecord {
    pub id: i64,
    pub label: String,
    pub body: Vec<u8>,
}

/// A request sent via `get`, expecting exactly one `Reply`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GetRequest {
    pub id: i64,
    pub label: String,
    pub body: Vec<u8>,
}

/// A broadcast notice that expects a per-recipient ack.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NoticeRecord {
    pub id: i64,
    pub label: String,
    pub body: Vec<u8>,
}

/// The ack sent back in response to a `NoticeRecord`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NoticeAck {
    pub id: i64,
    pub from: String,
}

/// The body carried by a `REPLY` frame. The dispatcher routes a `REPLY` to
/// the correlator keyed by `id` after branching on which inner type it is,
/// per the dispatcher's command table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind")]
pub enum ReplyBody {
    /// Response to `CONNECT`/`HEARTBEAT`: a freshly issued signature.
    Connect { signature: String },
    /// Response to `POST`: `status` 0 = accepted, 1 = auth failure.
    Post { id: i64, status: u8 },
    /// Response to `GET`: `status` 0 = ok, 1 = auth failure.
    Get { id: i64, status: u8, body: Vec<u8> },
    /// Response to `NOTICE`: acknowledges receipt by `id`.
    NoticeAck { id: i64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_record_roundtrips_through_json() {
        let rec = PostRecord {
            id: 42,
            label: "greet".into(),
            body: b"hi".to_vec(),
        };
        let json = serde_json::to_string(&rec).unwrap();
        let back: PostRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(rec, back);
    }

    #[test]
    fn notice_ack_roundtrips() {
        let ack = NoticeAck {
            id: 7,
            from: "node01".into(),
        };
        let json = serde_json::to_string(&ack).unwrap();
        let back: NoticeAck = serde_json::from_str(&json).unwrap();
        assert_eq!(ack, back);
    }

    #[test]
    fn reply_body_variants_roundtrip() {
        let variants = vec![
            ReplyBody::Connect {
                signature: "abc1234".into(),
            },
            ReplyBody::Post { id: 1, status: 0 },
            ReplyBody::Get {
                id: 2,
                status: 0,
                body: b"ok".to_vec(),
            },
            ReplyBody::NoticeAck { id: 3 },
        ];
        for v in variants {
            let json = serde_json::to_string(&v).unwrap();
            let back: ReplyBody = serde_json::from_str(&json).unwrap();
            assert_eq!(v, back);
        }
    }
}
