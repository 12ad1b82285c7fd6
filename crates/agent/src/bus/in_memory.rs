use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use flexalert_common::BusEvent;

use super::client::{BusClient, Incoming};
use super::error::BusError;
use super::filter::TopicFilters;

/// Something the agent put on the bus.
#[derive(Debug, Clone, PartialEq)]
pub enum Outgoing {
    Published {
        topic: String,
        event: BusEvent,
    },
    Sent {
        address: String,
        subject: String,
        frames: Vec<String>,
    },
    Reply {
        reply_to: String,
        frames: Vec<String>,
    },
}

/// Connection bookkeeping, readable from the peer side.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BusState {
    pub endpoint: Option<String>,
    pub name: Option<String>,
    pub producer: Option<String>,
    pub consumers: Vec<(String, Vec<String>)>,
}

/// Process-local bus used by tests and dry runs. The other end is an
/// [`InMemoryPeer`] that injects traffic and observes what the agent sends.
pub struct InMemoryBus {
    inbox: mpsc::UnboundedReceiver<Incoming>,
    outbox: mpsc::UnboundedSender<Outgoing>,
    filters: TopicFilters,
    state: Arc<Mutex<BusState>>,
}

pub struct InMemoryPeer {
    inbox: mpsc::UnboundedSender<Incoming>,
    outbox: mpsc::UnboundedReceiver<Outgoing>,
    state: Arc<Mutex<BusState>>,
}

impl InMemoryBus {
    pub fn pair() -> (InMemoryBus, InMemoryPeer) {
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let state = Arc::new(Mutex::new(BusState::default()));
        let bus = InMemoryBus {
            inbox: in_rx,
            outbox: out_tx,
            filters: TopicFilters::default(),
            state: Arc::clone(&state),
        };
        let peer = InMemoryPeer {
            inbox: in_tx,
            outbox: out_rx,
            state,
        };
        (bus, peer)
    }

    async fn ensure_connected(&self) -> Result<(), BusError> {
        if self.state.lock().await.name.is_some() {
            Ok(())
        } else {
            Err(BusError::NotConnected)
        }
    }

    fn emit(&self, out: Outgoing) -> Result<(), BusError> {
        self.outbox
            .send(out)
            .map_err(|_| BusError::Publish("peer dropped".into()))
    }
}

#[async_trait]
impl BusClient for InMemoryBus {
    async fn connect(&mut self, endpoint: &str, name: &str) -> Result<(), BusError> {
        let mut state = self.state.lock().await;
        state.endpoint = Some(endpoint.to_string());
        state.name = Some(name.to_string());
        Ok(())
    }

    async fn set_producer(&mut self, stream: &str) -> Result<(), BusError> {
        self.ensure_connected().await?;
        self.state.lock().await.producer = Some(stream.to_string());
        Ok(())
    }

    async fn set_consumer(&mut self, stream: &str, pattern: &str) -> Result<(), BusError> {
        self.ensure_connected().await?;
        self.filters.add(stream, pattern)?;
        let mut consumers = self.filters.consumed();
        consumers.sort();
        self.state.lock().await.consumers = consumers;
        Ok(())
    }

    async fn publish(&mut self, topic: &str, event: &BusEvent) -> Result<(), BusError> {
        self.ensure_connected().await?;
        if self.state.lock().await.producer.is_none() {
            return Err(BusError::NoProducer);
        }
        self.emit(Outgoing::Published {
            topic: topic.to_string(),
            event: event.clone(),
        })
    }

    async fn send_to(
        &mut self,
        address: &str,
        subject: &str,
        frames: &[String],
        _timeout: Duration,
    ) -> Result<(), BusError> {
        self.ensure_connected().await?;
        self.emit(Outgoing::Sent {
            address: address.to_string(),
            subject: subject.to_string(),
            frames: frames.to_vec(),
        })
    }

    async fn reply(&mut self, reply_to: &str, frames: &[String], _timeout: Duration) -> Result<(), BusError> {
        self.ensure_connected().await?;
        self.emit(Outgoing::Reply {
            reply_to: reply_to.to_string(),
            frames: frames.to_vec(),
        })
    }

    async fn recv(&mut self) -> Option<Incoming> {
        loop {
            let msg = self.inbox.recv().await?;
            if let Incoming::Stream { stream, topic, .. } = &msg {
                if !self.filters.accepts(stream, topic) {
                    tracing::trace!(%stream, %topic, "filtered out");
                    continue;
                }
            }
            return Some(msg);
        }
    }
}

impl InMemoryPeer {
    pub fn inject_event(&self, stream: &str, topic: &str, event: BusEvent) {
        let _ = self.inbox.send(Incoming::Stream {
            stream: stream.to_string(),
            topic: topic.to_string(),
            event,
        });
    }

    /// Mailbox message without a reply address; answers go back via `send_to`.
    pub fn inject_mailbox<S: AsRef<str>>(&self, sender: &str, subject: &str, frames: &[S]) {
        self.inject(sender, subject, frames, None);
    }

    /// Mailbox message carrying a reply address.
    pub fn inject_request<S: AsRef<str>>(&self, sender: &str, reply_to: &str, frames: &[S]) {
        self.inject(sender, "", frames, Some(reply_to.to_string()));
    }

    fn inject<S: AsRef<str>>(&self, sender: &str, subject: &str, frames: &[S], reply_to: Option<String>) {
        let _ = self.inbox.send(Incoming::Mailbox {
            sender: sender.to_string(),
            subject: subject.to_string(),
            frames: flexalert_common::frames::frames(frames),
            reply_to,
        });
    }

    /// Waits for the next outgoing message; `None` once the bus is dropped.
    pub async fn next_outgoing(&mut self) -> Option<Outgoing> {
        self.outbox.recv().await
    }

    pub fn try_outgoing(&mut self) -> Option<Outgoing> {
        self.outbox.try_recv().ok()
    }

    pub async fn state(&self) -> BusState {
        self.state.lock().await.clone()
    }
}
