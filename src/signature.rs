// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-peer rotating signature tokens, issued by the hub on handshake.

use dashmap::DashMap;
use rand::Rng;

/// 85-character alphabet used to draw signature tokens, carried over
/// verbatim from the original implementation's `SignLetterBytes` so tokens
/// stay visually compatible with the original wire format.
const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ-_+=~!@#$%^&*()<>{},.?~";

const TOKEN_LEN: usize = 7;

/// Per-engine registry of address -> current signature token.
///
/// Scoped to a single `Hub` instance rather than a process-global map, so
/// multiple hubs can coexist in one process (e.g. in integration tests).
#[derive(Default)]
pub struct SignatureRegistry {
    tokens: DashMap<String, String>,
}

impl SignatureRegistry {
    pub fn new() -> Self {
        Self {
            tokens: DashMap::new(),
        }
    }

    /// Draws and stores a fresh token for `addr`, overwriting any existing one.
    pub fn issue(&self, addr: &str) -> String {
        let token = random_token();
        self.tokens.insert(addr.to_string(), token.clone());
        token
    }

    /// Returns true iff `token` matches the token currently stored for `addr`.
    pub fn check(&self, addr: &str, token: &str) -> bool {
        self.tokens
            .get(addr)
            .map(|v| v.as_str() == token)
            .unwrap_or(false)
    }

    /// Overwrites the token for `addr` unconditionally.
    pub fn store(&self, addr: &str, token: String) {
        self.tokens.insert(addr.to_string(), token);
    }

    /// Returns the token currently stored for `addr`, if any.
    pub fn current(&self, addr: &str) -> Option<String> {
        self.tokens.get(addr).map(|v| v.clone())
    }
}

fn random_token() -> String {
    let mut rng = rand::thread_rng();
    (0..TOKEN_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_then_check_succeeds() {
        let reg = SignatureRegistry::new();
        let tok = reg.issue("1.2.3.4:9000");
        assert_eq!(tok.len(), TOKEN_LEN);
        assert!(tok.bytes().all(|b| ALPHABET.contains(&b)));
        assert!(reg.check("1.2.3.4:9000", &tok));
    }

    #[test]
    fn check_fails_for_unknown_address() {
        let reg = SignatureRegistry::new();
        assert!(!reg.check("nobody:0", "abcdefg"));
    }

    #[test]
    fn reissue_invalidates_old_token() {
        let reg = SignatureRegistry::new();
        let first = reg.issue("addr:1");
        let second = reg.issue("addr:1");
        assert_ne!(first, second);
        assert!(!reg.check("addr:1", &first));
        assert!(reg.check("addr:1", &second));
    }
}
