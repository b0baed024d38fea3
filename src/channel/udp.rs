//! UDP channel - plaintext lines as datagrams
//!
//! Binds an ephemeral socket lazily on the first send. A single message
//! becomes one datagram; a batch becomes one datagram holding all its lines,
//! so the batch lands or is lost as a whole. Datagram sockets do not go
//! stale the way streams do, so there is no broken state here; a failed
//! send simply reports failure and the next one tries again.

use super::Channel;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::net::UdpSocket;
use tokio::sync::Mutex;
use tracing::{debug, error};

/// UDP channel - sends `\n`-terminated lines as datagrams
pub struct UdpChannel {
    addr: String,
    socket: Mutex<Option<UdpSocket>>,
    /// Count of lines successfully sent
    sent_count: AtomicU64,
}

impl UdpChannel {
    /// Create a new UdpChannel for the given destination address
    ///
    /// No socket is bound until the first send.
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            socket: Mutex::new(None),
            sent_count: AtomicU64::new(0),
        }
    }

    /// Total lines successfully sent
    pub fn sent_count(&self) -> u64 {
        self.sent_count.load(Ordering::Relaxed)
    }

    async fn send_datagram(&self, payload: &[u8], lines: u64) -> bool {
        let mut socket = self.socket.lock().await;

        if socket.is_none() {
            match bind_connected(&self.addr).await {
                Ok(bound) => {
                    debug!(addr = %self.addr, "udp channel bound");
                    *socket = Some(bound);
                }
                Err(e) => {
                    error!(addr = %self.addr, error = %e, "udp socket setup failed");
                    return false;
                }
            }
        }

        let Some(socket) = socket.as_ref() else {
            return false;
        };

        match socket.send(payload).await {
            Ok(_) => {
                self.sent_count.fetch_add(lines, Ordering::Relaxed);
                true
            }
            Err(e) => {
                error!(addr = %self.addr, error = %e, "udp send failed");
                false
            }
        }
    }
}

async fn bind_connected(addr: &str) -> std::io::Result<UdpSocket> {
    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    socket.connect(addr).await?;
    Ok(socket)
}

#[async_trait]
impl Channel for UdpChannel {
    fn name(&self) -> &'static str {
        "udp"
    }

    async fn send(&self, message: &str) -> bool {
        self.send_datagram(format!("{message}\n").as_bytes(), 1).await
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

        self.send_datagram(payload.as_bytes(), messages.len() as u64)
            .await
    }

    async fn release(&self) {
        // Dropping the socket closes it
        if self.socket.lock().await.take().is_some() {
            debug!(addr = %self.addr, "udp channel released");
        }
    }
}
