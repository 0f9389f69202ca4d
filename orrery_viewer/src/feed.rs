use std::io::Read;
use std::net::TcpStream;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use orrery_stream::{
    CustomizationSet, HEADER_LEN, Heartbeat, Hello, HolderSnapshot, MessageHeader, MessageKind,
    ProtocolError, decode_payload,
};
use thiserror::Error;

const INITIAL_RECONNECT_DELAY_MS: u64 = 750;
const MAX_RECONNECT_DELAY_MS: u64 = 6_000;

#[derive(Debug, Clone)]
pub enum FeedEvent {
    Connecting { addr: String, attempt: u32 },
    Connected(Hello),
    Snapshot(HolderSnapshot),
    Customizations(CustomizationSet),
    Heartbeat(Heartbeat),
    ProtocolError(String),
    Disconnected { reason: String },
}

/// Spawns the background feed client. The thread reconnects forever with
/// capped exponential backoff and dies once the receiver is dropped.
pub fn spawn_feed_client(addr: String) -> Receiver<FeedEvent> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("orrery_feed".to_string())
        .spawn(move || feed_loop(addr, tx))
        .expect("spawn feed client thread");
    rx
}

fn feed_loop(addr: String, tx: Sender<FeedEvent>) {
    let mut attempt: u32 = 0;
    let mut delay_ms = INITIAL_RECONNECT_DELAY_MS;
    loop {
        attempt = attempt.wrapping_add(1);
        if tx
            .send(FeedEvent::Connecting {
                addr: addr.clone(),
                attempt,
            })
            .is_err()
        {
            break;
        }

        match TcpStream::connect(&addr) {
            Ok(mut stream) => {
                delay_ms = INITIAL_RECONNECT_DELAY_MS;
                if let Err(err) = stream.set_nodelay(true) {
                    let _ = tx.send(FeedEvent::ProtocolError(format!(
                        "failed to enable TCP_NODELAY: {err}"
                    )));
                }
                if let Err(err) = feed_session(&mut stream, &tx) {
                    if tx
                        .send(FeedEvent::Disconnected {
                            reason: err.to_string(),
                        })
                        .is_err()
                    {
                        break;
                    }
                }
            }
            Err(err) => {
                if tx
                    .send(FeedEvent::Disconnected {
                        reason: format!("connect error: {err}"),
                    })
                    .is_err()
                {
                    break;
                }
            }
        }

        thread::sleep(Duration::from_millis(delay_ms));
        delay_ms = (delay_ms * 2).min(MAX_RECONNECT_DELAY_MS);
    }
}

fn feed_session(stream: &mut TcpStream, tx: &Sender<FeedEvent>) -> Result<(), FeedReadError> {
    loop {
        let (header, payload) = read_message(stream)?;
        let event = match header.kind {
            MessageKind::Hello => FeedEvent::Connected(decode_payload::<Hello>(&payload)?),
            MessageKind::HolderSnapshot => {
                FeedEvent::Snapshot(decode_payload::<HolderSnapshot>(&payload)?)
            }
            MessageKind::CustomizationSet => {
                FeedEvent::Customizations(decode_payload::<CustomizationSet>(&payload)?)
            }
            MessageKind::Heartbeat => FeedEvent::Heartbeat(decode_payload::<Heartbeat>(&payload)?),
        };
        if tx.send(event).is_err() {
            break;
        }
    }
    Ok(())
}

fn read_message<R: Read>(reader: &mut R) -> Result<(MessageHeader, Vec<u8>), FeedReadError> {
    let mut header_bytes = [0u8; HEADER_LEN];
    reader.read_exact(&mut header_bytes)?;
    let header = MessageHeader::decode(&header_bytes)?;
    let mut payload = vec![0u8; header.length as usize];
    reader.read_exact(&mut payload)?;
    Ok((header, payload))
}

#[derive(Debug, Error)]
enum FeedReadError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use orrery_stream::encode_message;
    use std::io::Cursor;

    #[test]
    fn reads_a_framed_message_back() {
        let hello = Hello::new("test_feed", None);
        let framed = encode_message(MessageKind::Hello, &hello).expect("encode hello");
        let mut cursor = Cursor::new(framed);

        let (header, payload) = read_message(&mut cursor).expect("read message");
        assert_eq!(header.kind, MessageKind::Hello);
        let decoded: Hello = decode_payload(&payload).expect("decode hello");
        assert_eq!(decoded.producer, "test_feed");
    }

    #[test]
    fn corrupt_magic_is_a_protocol_error() {
        let hello = Hello::new("test_feed", None);
        let mut framed = encode_message(MessageKind::Hello, &hello).expect("encode hello");
        framed[0] = b'X';
        let mut cursor = Cursor::new(framed);

        let err = read_message(&mut cursor).expect_err("bad magic rejected");
        assert!(matches!(err, FeedReadError::Protocol(_)));
    }

    #[test]
    fn truncated_stream_is_an_io_error() {
        let hello = Hello::new("test_feed", None);
        let mut framed = encode_message(MessageKind::Hello, &hello).expect("encode hello");
        framed.truncate(framed.len() - 1);
        let mut cursor = Cursor::new(framed);

        let err = read_message(&mut cursor).expect_err("short payload rejected");
        assert!(matches!(err, FeedReadError::Io(_)));
    }
}
