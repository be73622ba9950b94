// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types for the messaging engine.

use std::fmt;

/// Errors raised while encoding or decoding a frame.
#[derive(Debug)]
pub enum FrameError {
    /// The datagram was shorter than the 15-byte minimum header.
    EmptyFrame,
    /// Decryption or decompression of the payload failed.
    BadPayload(String),
    /// The peer name exceeded 7 bytes.
    NameTooLong,
    /// The encrypted payload exceeded the 540-byte budget (warning, frame still emitted).
    PayloadTooLarge,
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyFrame => write!(f, "frame shorter than 15 bytes"),
            Self::BadPayload(s) => write!(f, "bad payload: {}", s),
            Self::NameTooLong => write!(f, "name exceeds 7 bytes"),
            Self::PayloadTooLarge => write!(f, "encrypted payload exceeds 540 bytes"),
        }
    }
}

impl std::error::Error for FrameError {}

/// Errors surfaced at hub/node construction time.
#[derive(Debug)]
pub enum ConfigError {
    /// A peer name was empty, too long, or contained `@`.
    BadName(String),
    /// The secret key was not exactly 8 bytes.
    BadKey(String),
    /// I/O error loading or saving a config file.
    Io(String),
    /// The config file could not be parsed.
    Parse(String),
    /// Bind address or port was invalid.
    InvalidValue(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadName(s) => write!(f, "bad name: {}", s),
            Self::BadKey(s) => write!(f, "bad secret key: {}", s),
            Self::Io(s) => write!(f, "config I/O error: {}", s),
            Self::Parse(s) => write!(f, "config parse error: {}", s),
            Self::InvalidValue(s) => write!(f, "invalid config value: {}", s),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

/// Error returned by a timed-out or unmatched `get` request.
#[derive(Debug, Clone)]
pub struct RequestTimeout {
    pub label: String,
    pub name: String,
    pub addr: String,
}

impl fmt::Display for RequestTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "request timed out: label={} name={} addr={}",
            self.label, self.name, self.addr
        )
    }
}

impl std::error::Error for RequestTimeout {}

/// Error returned when a notice could not be acknowledged by every recipient.
#[derive(Debug, Clone)]
pub struct IncompleteNotice {
    pub label: String,
    pub name: String,
    pub outstanding: usize,
}

impl fmt::Display for IncompleteNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "notice '{}' to '{}' incomplete: {} recipient(s) never acked",
            self.label, self.name, self.outstanding
        )
    }
}

impl std::error::Error for IncompleteNotice {}

/// Errors returned by the blocking `get`/`notice` calling API.
#[derive(Debug)]
pub enum EngineError {
    Timeout(RequestTimeout),
    Incomplete(IncompleteNotice),
    NotFound(String),
    Frame(FrameError),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout(e) => write!(f, "{}", e),
            Self::Incomplete(e) => write!(f, "{}", e),
            Self::NotFound(name) => write!(f, "peer not found: {}", name),
            Self::Frame(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<RequestTimeout> for EngineError {
    fn from(e: RequestTimeout) -> Self {
        Self::Timeout(e)
    }
}

impl From<IncompleteNotice> for EngineError {
    fn from(e: IncompleteNotice) -> Self {
        Self::Incomplete(e)
    }
}

impl From<FrameError> for EngineError {
    fn from(e: FrameError) -> Self {
        Self::Frame(e)
    }
}
