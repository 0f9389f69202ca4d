//! Shared OrreryStream protocol helpers.
//!
//! The protocol sends a fixed-size header followed by a MessagePack payload.
//! This crate keeps the framing logic in one place so the feed tool and the
//! viewer stay interoperable.

use std::convert::TryFrom;

use bytes::Buf;
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};
use thiserror::Error;

/// Bytes that prefix every OrreryStream message ("ORRY").
pub const HEADER_MAGIC: [u8; 4] = *b"ORRY";

/// Protocol revision understood by this crate.
pub const PROTOCOL_VERSION: u16 = 0x0001;

/// Length of the binary header in bytes.
pub const HEADER_LEN: usize = 4 + 2 + 2 + 4;

/// Upper bound on payload size; headers declaring more are rejected before
/// any allocation happens.
pub const MAX_PAYLOAD_LEN: u32 = 1024 * 1024;

/// Message kinds understood by OrreryStream v1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr, Hash)]
#[repr(u16)]
pub enum MessageKind {
    Hello = 0x0001,
    HolderSnapshot = 0x0002,
    CustomizationSet = 0x0003,
    Heartbeat = 0x0004,
}

/// Envelope describing the upcoming payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeader {
    pub version: u16,
    pub kind: MessageKind,
    pub length: u32,
}

impl MessageHeader {
    /// Encode the header as big-endian bytes.
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[..4].copy_from_slice(&HEADER_MAGIC);
        out[4..6].copy_from_slice(&self.version.to_be_bytes());
        out[6..8].copy_from_slice(&(self.kind as u16).to_be_bytes());
        out[8..12].copy_from_slice(&self.length.to_be_bytes());
        out
    }

    /// Decode a header from raw bytes.
    pub fn decode(input: &[u8]) -> Result<Self, ProtocolError> {
        if input.len() < HEADER_LEN {
            return Err(ProtocolError::TruncatedHeader);
        }
        if &input[..4] != HEADER_MAGIC {
            return Err(ProtocolError::BadMagic);
        }
        let mut version_bytes = &input[4..6];
        let version = version_bytes.get_u16();
        if version != PROTOCOL_VERSION {
            return Err(ProtocolError::UnsupportedVersion(version));
        }
        let mut kind_bytes = &input[6..8];
        let kind_raw = kind_bytes.get_u16();
        let kind = MessageKind::try_from(kind_raw)
            .map_err(|_| ProtocolError::UnknownMessageKind(kind_raw))?;
        let mut len_bytes = &input[8..12];
        let length = len_bytes.get_u32();
        if length > MAX_PAYLOAD_LEN {
            return Err(ProtocolError::OversizedPayload {
                limit: MAX_PAYLOAD_LEN,
                declared: length,
            });
        }
        Ok(Self {
            version,
            kind,
            length,
        })
    }
}

impl TryFrom<u16> for MessageKind {
    type Error = ();

    fn try_from(value: u16) -> std::result::Result<Self, Self::Error> {
        match value {
            0x0001 => Ok(Self::Hello),
            0x0002 => Ok(Self::HolderSnapshot),
            0x0003 => Ok(Self::CustomizationSet),
            0x0004 => Ok(Self::Heartbeat),
            _ => Err(()),
        }
    }
}

/// Minimal handshake message that opens a stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hello {
    pub protocol: String,
    pub producer: String,
    pub build: Option<String>,
}

impl Hello {
    pub fn new(producer: impl Into<String>, build: Option<String>) -> Self {
        Self {
            protocol: "OrreryStream".to_string(),
            producer: producer.into(),
            build,
        }
    }
}

/// One holder row as carried on the wire. Already normalized by the
/// producer; consumers still validate at their boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HolderRow {
    pub wallet_address: String,
    pub token_amount: f64,
    pub percentage: f64,
}

/// Fully-replacing holder snapshot published by the feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HolderSnapshot {
    pub seq: u64,
    pub generated_at_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_name: Option<String>,
    pub rows: Vec<HolderRow>,
}

/// Per-wallet appearance override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomizationEntry {
    pub wallet_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skin_index: Option<u32>,
}

/// Batch of customization entries; replaces any prior entry for the same
/// wallet, never the whole set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomizationSet {
    pub seq: u64,
    pub entries: Vec<CustomizationEntry>,
}

/// Keep-alive sent between snapshots so consumers can tell an idle feed
/// from a dead one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Heartbeat {
    pub seq: u64,
    pub host_time_ms: u64,
}

/// Error conditions returned by the protocol helpers.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("header smaller than {HEADER_LEN} bytes")]
    TruncatedHeader,
    #[error("header magic mismatch")]
    BadMagic,
    #[error("protocol version {0:#06x} is unsupported")]
    UnsupportedVersion(u16),
    #[error("message kind {0:#06x} is unknown")]
    UnknownMessageKind(u16),
    #[error("payload of {declared} bytes exceeds the {limit} byte limit")]
    OversizedPayload { limit: u32, declared: u32 },
    #[error("payload length mismatch: header declared {expected} bytes but read {actual}")]
    LengthMismatch { expected: u32, actual: usize },
    #[error("payload decode error: {0}")]
    PayloadDecode(#[from] rmp_serde::decode::Error),
    #[error("payload encode error: {0}")]
    PayloadEncode(#[from] rmp_serde::encode::Error),
}

/// Wraps a payload with framing suitable for the wire.
pub fn encode_message<T>(kind: MessageKind, payload: &T) -> Result<Vec<u8>, ProtocolError>
where
    T: Serialize,
{
    let payload_bytes = rmp_serde::to_vec_named(payload)?;
    let length =
        u32::try_from(payload_bytes.len()).map_err(|_| ProtocolError::OversizedPayload {
            limit: MAX_PAYLOAD_LEN,
            declared: u32::MAX,
        })?;
    if length > MAX_PAYLOAD_LEN {
        return Err(ProtocolError::OversizedPayload {
            limit: MAX_PAYLOAD_LEN,
            declared: length,
        });
    }
    let header = MessageHeader {
        version: PROTOCOL_VERSION,
        kind,
        length,
    };
    let mut out = Vec::with_capacity(HEADER_LEN + payload_bytes.len());
    out.extend_from_slice(&header.encode());
    out.extend_from_slice(&payload_bytes);
    Ok(out)
}

/// Decodes a framed message returning both header and payload bytes.
pub fn decode_envelope(bytes: &[u8]) -> std::result::Result<(MessageHeader, &[u8]), ProtocolError> {
    if bytes.len() < HEADER_LEN {
        return Err(ProtocolError::TruncatedHeader);
    }
    let header = MessageHeader::decode(&bytes[..HEADER_LEN])?;
    let payload = &bytes[HEADER_LEN..];
    if payload.len() != header.length as usize {
        return Err(ProtocolError::LengthMismatch {
            expected: header.length,
            actual: payload.len(),
        });
    }
    Ok((header, payload))
}

/// Decode a payload straight into the requested type.
pub fn decode_payload<T>(payload: &[u8]) -> std::result::Result<T, ProtocolError>
where
    T: for<'de> Deserialize<'de>,
{
    let value = rmp_serde::from_slice(payload)?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_snapshot() -> HolderSnapshot {
        HolderSnapshot {
            seq: 7,
            generated_at_ms: 1_700_000_000_000,
            token_name: Some("SOL".to_string()),
            rows: vec![
                HolderRow {
                    wallet_address: "wallet-alpha".to_string(),
                    token_amount: 5_000.0,
                    percentage: 50.0,
                },
                HolderRow {
                    wallet_address: "wallet-beta".to_string(),
                    token_amount: 1_000.0,
                    percentage: 10.0,
                },
            ],
        }
    }

    #[test]
    fn header_round_trips() {
        let header = MessageHeader {
            version: PROTOCOL_VERSION,
            kind: MessageKind::HolderSnapshot,
            length: 42,
        };
        let decoded = MessageHeader::decode(&header.encode()).expect("decode header");
        assert_eq!(decoded, header);
    }

    #[test]
    fn snapshot_round_trips_through_envelope() {
        let snapshot = sample_snapshot();
        let framed =
            encode_message(MessageKind::HolderSnapshot, &snapshot).expect("encode snapshot");
        let (header, payload) = decode_envelope(&framed).expect("decode envelope");
        assert_eq!(header.kind, MessageKind::HolderSnapshot);
        let decoded: HolderSnapshot = decode_payload(payload).expect("decode payload");
        assert_eq!(decoded.seq, snapshot.seq);
        assert_eq!(decoded.rows, snapshot.rows);
        assert_eq!(decoded.token_name.as_deref(), Some("SOL"));
    }

    #[test]
    fn rejects_bad_magic() {
        let mut framed = encode_message(MessageKind::Heartbeat, &Heartbeat {
            seq: 1,
            host_time_ms: 0,
        })
        .expect("encode heartbeat");
        framed[0] = b'X';
        assert!(matches!(
            decode_envelope(&framed),
            Err(ProtocolError::BadMagic)
        ));
    }

    #[test]
    fn rejects_truncated_header() {
        assert!(matches!(
            MessageHeader::decode(&[0u8; 4]),
            Err(ProtocolError::TruncatedHeader)
        ));
    }

    #[test]
    fn rejects_unknown_kind() {
        let header = MessageHeader {
            version: PROTOCOL_VERSION,
            kind: MessageKind::Hello,
            length: 0,
        };
        let mut bytes = header.encode();
        bytes[6..8].copy_from_slice(&0x00ffu16.to_be_bytes());
        assert!(matches!(
            MessageHeader::decode(&bytes),
            Err(ProtocolError::UnknownMessageKind(0x00ff))
        ));
    }

    #[test]
    fn rejects_unsupported_version() {
        let header = MessageHeader {
            version: PROTOCOL_VERSION,
            kind: MessageKind::Hello,
            length: 0,
        };
        let mut bytes = header.encode();
        bytes[4..6].copy_from_slice(&0x0009u16.to_be_bytes());
        assert!(matches!(
            MessageHeader::decode(&bytes),
            Err(ProtocolError::UnsupportedVersion(0x0009))
        ));
    }

    #[test]
    fn rejects_oversized_declared_payload() {
        let header = MessageHeader {
            version: PROTOCOL_VERSION,
            kind: MessageKind::HolderSnapshot,
            length: 0,
        };
        let mut bytes = header.encode();
        bytes[8..12].copy_from_slice(&(MAX_PAYLOAD_LEN + 1).to_be_bytes());
        assert!(matches!(
            MessageHeader::decode(&bytes),
            Err(ProtocolError::OversizedPayload { .. })
        ));
    }

    #[test]
    fn envelope_length_must_match_payload() {
        let mut framed = encode_message(MessageKind::Hello, &Hello::new("test", None))
            .expect("encode hello");
        framed.push(0);
        assert!(matches!(
            decode_envelope(&framed),
            Err(ProtocolError::LengthMismatch { .. })
        ));
    }
}
