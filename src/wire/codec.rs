// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Frame encode/decode: fixed header, DES-ECB encryption, raw zlib compression.
//!
//! ```text
//! +------------+--------------+-------------+---------------------------+
//! | cmd (1B)   | name (7B)    | sign (7B)   | encrypted+compressed data |
//! +------------+--------------+-------------+---------------------------+
//! ```
//!
//! DES-ECB and a pre-distributed 8-byte key are not a cryptographic design,
//! they're chosen for deterministic fixed-size blocks under the 540-byte
//! datagram budget. Not secure against a motivated adversary.

use crate::error::FrameError;
use crate::wire::command::Command;
use cipher::block_padding::Pkcs7;
use cipher::{BlockDecryptMut, BlockEncryptMut, KeyInit};
use des::Des;
use ecb::{Decryptor, Encryptor};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

const HEADER_LEN: usize = 15;
const NAME_LEN: usize = 7;
const SIGN_LEN: usize = 7;
const ABSENT: &[u8; 7] = b"0000000";
const MAX_ENCRYPTED_PAYLOAD: usize = 540;

/// A decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: Command,
    pub name: String,
    pub signature: String,
    pub data: Vec<u8>,
}

fn pad_field(s: &str, len: usize, absent: &[u8; 7]) -> Result<[u8; 7], FrameError> {
    if s.is_empty() {
        return Ok(*absent);
    }
    if s.len() > len {
        return Err(FrameError::NameTooLong);
    }
    let mut out = [b' '; 7];
    out[..s.len()].copy_from_slice(s.as_bytes());
    Ok(out)
}

fn zlib_compress(src: &[u8]) -> Vec<u8> {
    let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
    enc.write_all(src).expect("in-memory writer never fails");
    enc.finish().expect("in-memory writer never fails")
}

fn zlib_decompress(src: &[u8]) -> Result<Vec<u8>, FrameError> {
    let mut dec = ZlibDecoder::new(src);
    let mut out = Vec::new();
    dec.read_to_end(&mut out)
        .map_err(|e| FrameError::BadPayload(format!("zlib: {}", e)))?;
    Ok(out)
}

fn unpad_field(raw: &[u8]) -> String {
    if raw == ABSENT {
        return String::new();
    }
    String::from_utf8_lossy(raw).trim_end().to_string()
}

fn des_ecb_encrypt(data: &[u8], key: &[u8; 8]) -> Vec<u8> {
    Encryptor::<Des>::new(key.into()).encrypt_padded_vec_mut::<Pkcs7>(data)
}

fn des_ecb_decrypt(data: &[u8], key: &[u8; 8]) -> Result<Vec<u8>, FrameError> {
    Decryptor::<Des>::new(key.into())
        .decrypt_padded_vec_mut::<Pkcs7>(data)
        .map_err(|e| FrameError::BadPayload(format!("des: {}", e)))
}

/// Encode a frame. Returns the raw datagram bytes.
///
/// `PayloadTooLarge` is a warning condition, not a hard failure: the frame is
/// still returned so callers can choose to emit it (and let the transport
/// truncate) or drop it.
pub fn encode(
    command: Command,
    name: &str,
    signature: &str,
    key: &[u8; 8],
    payload: &[u8],
) -> Result<Vec<u8>, FrameError> {
    let name_field = pad_field(name, NAME_LEN, ABSENT)?;
    let sign_field = pad_field(signature, SIGN_LEN, ABSENT)?;

    let compressed = zlib_compress(payload);
    let encrypted = des_ecb_encrypt(&compressed, key);

    let mut out = Vec::with_capacity(HEADER_LEN + encrypted.len());
    out.push(command.as_byte());
    out.extend_from_slice(&name_field);
    out.extend_from_slice(&sign_field);
    out.extend_from_slice(&encrypted);

    if encrypted.len() > MAX_ENCRYPTED_PAYLOAD {
        tracing::warn!(
            len = encrypted.len(),
            limit = MAX_ENCRYPTED_PAYLOAD,
            "encrypted payload exceeds budget, transport may truncate"
        );
    }

    Ok(out)
}

/// Decode a raw datagram into a frame.
pub fn decode(key: &[u8; 8], raw: &[u8]) -> Result<Frame, FrameError> {
    if raw.len() < HEADER_LEN {
        return Err(FrameError::EmptyFrame);
    }

    let command = Command::from_byte(raw[0])
        .ok_or_else(|| FrameError::BadPayload(format!("unknown command byte {}", raw[0])))?;
    let name = unpad_field(&raw[1..8]);
    let signature = unpad_field(&raw[8..15]);

    let decrypted = des_ecb_decrypt(&raw[HEADER_LEN..], key)?;
    let data = zlib_decompress(&decrypted)?;

    Ok(Frame {
        command,
        name,
        signature,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8; 8] = b"12345678";

    #[test]
    fn roundtrip_basic() {
        let raw = encode(Command::Post, "n1", "abc1234", KEY, b"hello").unwrap();
        let frame = decode(KEY, &raw).unwrap();
        assert_eq!(frame.command, Command::Post);
        assert_eq!(frame.name, "n1");
        assert_eq!(frame.signature, "abc1234");
        assert_eq!(frame.data, b"hello");
    }

    #[test]
    fn roundtrip_absent_name_and_signature() {
        let raw = encode(Command::Connect, "", "", KEY, b"c").unwrap();
        let frame = decode(KEY, &raw).unwrap();
        assert_eq!(frame.name, "");
        assert_eq!(frame.signature, "");
    }

    #[test]
    fn roundtrip_payload_sizes() {
        for size in [0usize, 1, 16, 128, 500] {
            let payload = vec![b'x'; size];
            let raw = encode(Command::Get, "node01", "sig0001", KEY, &payload).unwrap();
            let frame = decode(KEY, &raw).unwrap();
            assert_eq!(frame.data, payload, "size={size}");
        }
    }

    #[test]
    fn name_too_long_rejected() {
        let err = encode(Command::Post, "toolongname", "", KEY, b"x").unwrap_err();
        assert!(matches!(err, FrameError::NameTooLong));
    }

    #[test]
    fn decode_rejects_short_frame() {
        let err = decode(KEY, &[0u8; 10]).unwrap_err();
        assert!(matches!(err, FrameError::EmptyFrame));
    }

    #[test]
    fn decode_rejects_garbage_payload() {
        let mut raw = vec![Command::Post.as_byte()];
        raw.extend_from_slice(b"n1     ");
        raw.extend_from_slice(b"sig0001");
        raw.extend_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]); // not a valid DES block stream
        let err = decode(KEY, &raw).unwrap_err();
        assert!(matches!(err, FrameError::BadPayload(_)));
    }

    #[test]
    fn name_trims_trailing_space_not_interior() {
        let raw = encode(Command::Heartbeat, "a b", "", KEY, b"").unwrap();
        let frame = decode(KEY, &raw).unwrap();
        assert_eq!(frame.name, "a b");
    }
}
