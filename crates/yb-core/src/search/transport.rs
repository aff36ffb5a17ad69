//! Full-duplex message channel a search session talks through.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("search transport closed")]
pub struct TransportClosed;

#[async_trait]
pub trait SearchTransport: Send {
    /// Next client token, or `None` once the client has gone away.
    async fn receive(&mut self) -> Option<String>;

    /// Sends one discrete value (a Yell id or the sentinel).
    async fn send(&mut self, value: String) -> Result<(), TransportClosed>;

    /// Non-blocking disconnect probe used between candidates while scanning.
    fn is_closed(&self) -> bool {
        false
    }
}

/// `SearchTransport` over a pair of tokio channels.
pub struct ChannelTransport {
    inbound: mpsc::Receiver<String>,
    outbound: mpsc::Sender<String>,
}

/// The peer side of a `ChannelTransport`.
pub struct ClientEnd {
    pub to_server: mpsc::Sender<String>,
    pub from_server: mpsc::Receiver<String>,
}

impl ChannelTransport {
    pub fn new(inbound: mpsc::Receiver<String>, outbound: mpsc::Sender<String>) -> Self {
        Self { inbound, outbound }
    }

    pub fn pair(buffer: usize) -> (Self, ClientEnd) {
        let (to_server, inbound) = mpsc::channel(buffer);
        let (outbound, from_server) = mpsc::channel(buffer);
        (
            Self::new(inbound, outbound),
            ClientEnd {
                to_server,
                from_server,
            },
        )
    }
}

#[async_trait]
impl SearchTransport for ChannelTransport {
    async fn receive(&mut self) -> Option<String> {
        self.inbound.recv().await
    }

    async fn send(&mut self, value: String) -> Result<(), TransportClosed> {
        self.outbound.send(value).await.map_err(|_| TransportClosed)
    }

    fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }
}
