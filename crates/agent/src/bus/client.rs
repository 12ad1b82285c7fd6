use std::time::Duration;

use async_trait::async_trait;
use flexalert_common::BusEvent;

use super::error::BusError;

/// A message delivered to the agent.
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    /// Event on a consumed stream.
    Stream {
        stream: String,
        topic: String,
        event: BusEvent,
    },
    /// Frames addressed to the agent's mailbox.
    Mailbox {
        sender: String,
        subject: String,
        frames: Vec<String>,
        reply_to: Option<String>,
    },
}

/// Transport used by the dispatch loop.
///
/// `recv` must be cancel safe: the loop races it against the control channel
/// and drops it when the other side wins.
#[async_trait]
pub trait BusClient: Send {
    async fn connect(&mut self, endpoint: &str, name: &str) -> Result<(), BusError>;

    async fn set_producer(&mut self, stream: &str) -> Result<(), BusError>;

    /// Subscribes to `stream`, keeping only topics matching the `pattern`
    /// regular expression. May be called repeatedly to add patterns.
    async fn set_consumer(&mut self, stream: &str, pattern: &str) -> Result<(), BusError>;

    async fn publish(&mut self, topic: &str, event: &BusEvent) -> Result<(), BusError>;

    /// Sends frames to another agent's mailbox.
    async fn send_to(
        &mut self,
        address: &str,
        subject: &str,
        frames: &[String],
        timeout: Duration,
    ) -> Result<(), BusError>;

    async fn reply(&mut self, reply_to: &str, frames: &[String], timeout: Duration) -> Result<(), BusError>;

    /// Next incoming message; `None` once the transport is closed.
    async fn recv(&mut self) -> Option<Incoming>;
}
