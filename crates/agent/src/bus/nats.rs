use std::time::Duration;

use async_nats::{Client, ConnectOptions, HeaderMap, Message, Subscriber};
use async_trait::async_trait;
use futures::stream::SelectAll;
use futures::StreamExt;
use regex::Regex;

use flexalert_common::subjects::{
    mailbox_subject, split_stream_subject, stream_subject, stream_wildcard, HEADER_SENDER,
    HEADER_SUBJECT,
};
use flexalert_common::{frames, BusEvent};

use super::client::{BusClient, Incoming};
use super::error::BusError;
use super::filter::TopicFilters;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// NATS transport. Streams are subject prefixes (`METRICS.<topic>`), the
/// mailbox is `mailbox.<name>`, and sender identity travels in headers.
#[derive(Default)]
pub struct NatsBus {
    client: Option<Client>,
    name: String,
    mailbox: String,
    producer: Option<String>,
    filters: TopicFilters,
    subscriptions: SelectAll<Subscriber>,
}

impl NatsBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn client(&self) -> Result<&Client, BusError> {
        self.client.as_ref().ok_or(BusError::NotConnected)
    }

    fn headers(&self, subject: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_SENDER, self.name.as_str());
        if let Some(subject) = subject {
            headers.insert(HEADER_SUBJECT, subject);
        }
        headers
    }

    async fn send_frames(
        &self,
        subject: String,
        headers: HeaderMap,
        frames: &[String],
        timeout: Duration,
    ) -> Result<(), BusError> {
        let client = self.client()?;
        let payload = frames::encode(frames);
        let send = async {
            client
                .publish_with_headers(subject, headers, payload.into())
                .await
                .map_err(|e| BusError::Publish(e.to_string()))?;
            client
                .flush()
                .await
                .map_err(|e| BusError::Publish(e.to_string()))
        };
        tokio::time::timeout(timeout, send)
            .await
            .map_err(|_| BusError::Timeout)?
    }

    fn decode(&self, msg: Message) -> Option<Incoming> {
        let subject = msg.subject.as_str();

        if subject == self.mailbox {
            let sender = header(&msg, HEADER_SENDER).unwrap_or_default();
            let subject = header(&msg, HEADER_SUBJECT).unwrap_or_default();
            return match frames::decode(&msg.payload) {
                Ok(frames) => Some(Incoming::Mailbox {
                    sender,
                    subject,
                    frames,
                    reply_to: msg.reply.as_ref().map(|r| r.to_string()),
                }),
                Err(e) => {
                    tracing::warn!(sender = %sender, error = %e, "dropping mailbox message");
                    None
                }
            };
        }

        let (stream, topic) = split_stream_subject(subject)?;
        if !self.filters.accepts(stream, topic) {
            return None;
        }
        match serde_json::from_slice::<BusEvent>(&msg.payload) {
            Ok(event) => Some(Incoming::Stream {
                stream: stream.to_string(),
                topic: topic.to_string(),
                event,
            }),
            Err(e) => {
                tracing::debug!(subject, error = %e, "not a bus event");
                None
            }
        }
    }
}

fn header(msg: &Message, key: &str) -> Option<String> {
    msg.headers.as_ref()?.get(key).map(|v| v.to_string())
}

#[async_trait]
impl BusClient for NatsBus {
    async fn connect(&mut self, endpoint: &str, name: &str) -> Result<(), BusError> {
        let client = ConnectOptions::new()
            .name(name)
            .connection_timeout(CONNECT_TIMEOUT)
            .connect(endpoint)
            .await
            .map_err(|e| BusError::Connect(e.to_string()))?;

        let mailbox = mailbox_subject(name);
        let inbox = client
            .subscribe(mailbox.clone())
            .await
            .map_err(|e| BusError::Subscribe(e.to_string()))?;

        self.subscriptions.push(inbox);
        self.client = Some(client);
        self.name = name.to_string();
        self.mailbox = mailbox;
        tracing::info!(endpoint, name, "connected to bus");
        Ok(())
    }

    async fn set_producer(&mut self, stream: &str) -> Result<(), BusError> {
        self.producer = Some(stream.to_string());
        Ok(())
    }

    async fn set_consumer(&mut self, stream: &str, pattern: &str) -> Result<(), BusError> {
        let client = self.client()?.clone();
        let re = Regex::new(pattern)?;
        if !self.filters.consumes(stream) {
            let sub = client
                .subscribe(stream_wildcard(stream))
                .await
                .map_err(|e| BusError::Subscribe(e.to_string()))?;
            self.subscriptions.push(sub);
        }
        // only a live subscription marks the stream as consumed
        self.filters.push(stream, re);
        tracing::debug!(stream, pattern, "consumer registered");
        Ok(())
    }

    async fn publish(&mut self, topic: &str, event: &BusEvent) -> Result<(), BusError> {
        let client = self.client()?;
        let stream = self.producer.as_deref().ok_or(BusError::NoProducer)?;
        let payload = serde_json::to_vec(event)?;
        client
            .publish_with_headers(stream_subject(stream, topic), self.headers(None), payload.into())
            .await
            .map_err(|e| BusError::Publish(e.to_string()))
    }

    async fn send_to(
        &mut self,
        address: &str,
        subject: &str,
        frames: &[String],
        timeout: Duration,
    ) -> Result<(), BusError> {
        let headers = self.headers(Some(subject));
        self.send_frames(mailbox_subject(address), headers, frames, timeout)
            .await
    }

    async fn reply(&mut self, reply_to: &str, frames: &[String], timeout: Duration) -> Result<(), BusError> {
        let headers = self.headers(None);
        self.send_frames(reply_to.to_string(), headers, frames, timeout)
            .await
    }

    async fn recv(&mut self) -> Option<Incoming> {
        loop {
            if self.subscriptions.is_empty() {
                return futures::future::pending().await;
            }
            let msg = self.subscriptions.next().await?;
            if let Some(incoming) = self.decode(msg) {
                return Some(incoming);
            }
        }
    }
}
