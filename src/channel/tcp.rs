//! TCP channel - plaintext lines over a TCP connection
//!
//! Connects lazily on the first send. Once a connect or write fails the
//! channel marks itself broken and reports failure from then on: a TCP
//! stream that errored is not worth salvaging, and rebuilding the channel
//! is the job of [`ResilientChannel`](super::ResilientChannel), which does
//! exactly that once failures cross its threshold.

use super::Channel;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, error};

enum Connection {
    /// Not yet connected
    Idle,
    Open(TcpStream),
    /// Stays broken until the channel is replaced or released
    Broken,
}

/// TCP channel - writes each message as one `\n`-terminated line
pub struct TcpChannel {
    addr: String,
    conn: Mutex<Connection>,
    /// Count of lines successfully written
    sent_count: AtomicU64,
}

impl TcpChannel {
    /// Create a new TcpChannel for the given address
    ///
    /// No connection is made until the first send.
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            conn: Mutex::new(Connection::Idle),
            sent_count: AtomicU64::new(0),
        }
    }

    /// Total lines successfully written
    pub fn sent_count(&self) -> u64 {
        self.sent_count.load(Ordering::Relaxed)
    }

    async fn write_payload(&self, payload: &[u8], lines: u64) -> bool {
        let mut conn = self.conn.lock().await;

        if let Connection::Idle = &*conn {
            match TcpStream::connect(&self.addr).await {
                Ok(stream) => {
                    debug!(addr = %self.addr, "tcp channel connected");
                    *conn = Connection::Open(stream);
                }
                Err(e) => {
                    error!(addr = %self.addr, error = %e, "tcp connect failed");
                    *conn = Connection::Broken;
                }
            }
        }

        let result = match &mut *conn {
            Connection::Open(stream) => write_all_flushed(stream, payload).await,
            _ => return false,
        };

        match result {
            Ok(()) => {
                self.sent_count.fetch_add(lines, Ordering::Relaxed);
                true
            }
            Err(e) => {
                error!(addr = %self.addr, error = %e, "tcp write failed, channel is broken");
                *conn = Connection::Broken;
                false
            }
        }
    }
}

async fn write_all_flushed(stream: &mut TcpStream, payload: &[u8]) -> std::io::Result<()> {
    stream.write_all(payload).await?;
    stream.flush().await
}

#[async_trait]
impl Channel for TcpChannel {
    fn name(&self) -> &'static str {
        "tcp"
    }

    async fn send(&self, message: &str) -> bool {
        self.write_payload(format!("{message}\n").as_bytes(), 1).await
    }

    async fn send_batch(&self, messages: &[String]) -> bool {
        if messages.is_empty() {
            return true;
        }

        let mut payload = String::with_capacity(messages.iter().map(|m| m.len() + 1).sum());
        for message in messages {
            payload.push_str(message);
            payload.push('\n');
        }

        self.write_payload(payload.as_bytes(), messages.len() as u64)
            .await
    }

    async fn release(&self) {
        let mut conn = self.conn.lock().await;
        if let Connection::Open(mut stream) = std::mem::replace(&mut *conn, Connection::Broken) {
            stream.shutdown().await.ok();
            debug!(addr = %self.addr, "tcp channel released");
        }
    }
}
