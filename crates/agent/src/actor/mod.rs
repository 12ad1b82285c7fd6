//! The dispatch loop. One task owns the agent state and the bus, and handles
//! exactly one control command or bus message at a time.

mod control;

use std::future::Future;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::mpsc;

use flexalert_common::frames::frames;
use flexalert_common::subjects::{ASSET_AGENT, STREAM_METRICS, STREAM_METRICS_SENSOR};
use flexalert_common::BusEvent;

use crate::bus::{BusClient, Incoming};
use crate::engine::{FlexibleAlert, Outbound};
use crate::logging::LevelHandle;

pub use control::{Command, ControlError};

pub const REPUBLISH_SUBJECT: &str = "REPUBLISH";
pub const REPUBLISH_TIMEOUT: Duration = Duration::from_secs(5);
pub const ADMIN_REPLY_TIMEOUT: Duration = Duration::from_secs(1);

const CONTROL_CAPACITY: usize = 64;

/// Sends control frames to a running [`Actor`].
#[derive(Clone)]
pub struct ActorHandle {
    tx: mpsc::Sender<Vec<String>>,
}

impl ActorHandle {
    pub async fn send(&self, frames: Vec<String>) -> Result<(), mpsc::error::SendError<Vec<String>>> {
        self.tx.send(frames).await
    }

    pub async fn command<S: AsRef<str>>(&self, parts: &[S]) -> Result<(), mpsc::error::SendError<Vec<String>>> {
        self.send(frames(parts)).await
    }
}

pub struct Actor<B> {
    engine: FlexibleAlert,
    bus: B,
    control: mpsc::Receiver<Vec<String>>,
    log: Option<LevelHandle>,
    control_open: bool,
    bus_open: bool,
}

impl<B: BusClient> Actor<B> {
    pub fn new(engine: FlexibleAlert, bus: B) -> (Self, ActorHandle) {
        let (tx, rx) = mpsc::channel(CONTROL_CAPACITY);
        let actor = Self {
            engine,
            bus,
            control: rx,
            log: None,
            control_open: true,
            bus_open: true,
        };
        (actor, ActorHandle { tx })
    }

    pub fn with_log_handle(mut self, handle: LevelHandle) -> Self {
        self.log = Some(handle);
        self
    }

    pub fn engine(&self) -> &FlexibleAlert {
        &self.engine
    }

    /// Runs until `TERM` arrives or `shutdown` resolves. Shutdown is checked
    /// before every message, so a busy bus cannot hold the loop open. Returns
    /// the actor so callers can inspect the final state.
    pub async fn run_until<F>(mut self, shutdown: F) -> Self
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        tracing::info!("dispatch loop started");

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    tracing::info!("shutdown requested");
                    break;
                }
                cmd = self.control.recv(), if self.control_open => match cmd {
                    Some(frames) => {
                        if self.handle_control(&frames).await {
                            break;
                        }
                    }
                    None => {
                        tracing::debug!("control channel closed");
                        self.control_open = false;
                    }
                },
                msg = self.bus.recv(), if self.bus_open => match msg {
                    Some(msg) => self.handle_incoming(msg).await,
                    None => {
                        tracing::warn!("bus closed");
                        self.bus_open = false;
                    }
                },
            }
        }

        tracing::info!("dispatch loop stopped");
        self
    }

    /// Returns `true` when the loop should stop.
    async fn handle_control(&mut self, frames: &[String]) -> bool {
        let command = match Command::parse(frames) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = %e, ?frames, "ignoring control command");
                return false;
            }
        };
        tracing::debug!(?command, "control command");

        match command {
            Command::Term => return true,
            Command::Bind { endpoint, name } => {
                if let Err(e) = self.bus.connect(&endpoint, &name).await {
                    tracing::error!(endpoint = %endpoint, error = %e, "bind failed");
                }
            }
            Command::Producer { stream } => {
                if let Err(e) = self.bus.set_producer(&stream).await {
                    tracing::error!(stream = %stream, error = %e, "cannot set producer");
                }
            }
            Command::Consumer { stream, pattern } => {
                if let Err(e) = self.bus.set_consumer(&stream, &pattern).await {
                    tracing::error!(stream = %stream, pattern = %pattern, error = %e, "cannot set consumer");
                }
            }
            Command::LoadRules { dir } => self.engine.load_rules(&dir),
            Command::Verbose => {
                self.engine.set_verbose(true);
                if let Some(handle) = &self.log {
                    if let Err(e) = handle.set_debug() {
                        tracing::warn!(error = %e, "cannot raise log level");
                    }
                }
            }
        }
        false
    }

    async fn handle_incoming(&mut self, msg: Incoming) {
        match msg {
            Incoming::Stream { stream, topic, event } => {
                let outbound = match event {
                    BusEvent::Asset(asset) => {
                        self.engine.handle_asset(&asset);
                        return;
                    }
                    BusEvent::Metric(metric) if stream == STREAM_METRICS_SENSOR => {
                        self.engine.handle_sensor_metric(&topic, &metric, unix_now())
                    }
                    BusEvent::Metric(metric) if stream == STREAM_METRICS => {
                        self.engine.handle_metric(&topic, &metric, unix_now())
                    }
                    BusEvent::Metric(_) => {
                        tracing::debug!(stream = %stream, topic = %topic, "metric on unexpected stream");
                        return;
                    }
                    BusEvent::Alert(_) => {
                        tracing::debug!(stream = %stream, topic = %topic, "ignoring alert event");
                        return;
                    }
                };
                self.deliver(outbound).await;
            }
            Incoming::Mailbox {
                sender,
                subject,
                frames,
                reply_to,
            } => self.handle_mailbox(&sender, &subject, &frames, reply_to.as_deref()).await,
        }
    }

    async fn handle_mailbox(&mut self, sender: &str, subject: &str, request: &[String], reply_to: Option<&str>) {
        let Some(reply) = self.engine.handle_admin(sender, request) else {
            return;
        };

        let sent = match reply_to {
            Some(inbox) => self.bus.reply(inbox, &reply, ADMIN_REPLY_TIMEOUT).await,
            None if !sender.is_empty() => {
                self.bus
                    .send_to(sender, subject, &reply, ADMIN_REPLY_TIMEOUT)
                    .await
            }
            None => {
                tracing::warn!("admin request without sender, reply dropped");
                return;
            }
        };
        if let Err(e) = sent {
            tracing::warn!(sender, error = %e, "admin reply failed");
        }
    }

    async fn deliver(&mut self, outbound: Vec<Outbound>) {
        for out in outbound {
            match out {
                Outbound::Alert(alert) => {
                    tracing::debug!(topic = %alert.topic, "publishing alert");
                    if let Err(e) = self.bus.publish(&alert.topic, &BusEvent::Alert(alert.event)).await {
                        tracing::error!(topic = %alert.topic, error = %e, "alert publish failed");
                    }
                }
                Outbound::Republish { asset } => {
                    let request = frames(&[REPUBLISH_SUBJECT, asset.as_str()]);
                    if let Err(e) = self
                        .bus
                        .send_to(ASSET_AGENT, REPUBLISH_SUBJECT, &request, REPUBLISH_TIMEOUT)
                        .await
                    {
                        tracing::warn!(asset = %asset, error = %e, "republish request failed");
                    }
                }
            }
        }
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{InMemoryBus, Outgoing};
    use crate::script::LuaEngine;
    use flexalert_common::{AssetEvent, MetricEvent};

    fn actor() -> (Actor<InMemoryBus>, ActorHandle, crate::bus::InMemoryPeer) {
        let (bus, peer) = InMemoryBus::pair();
        let (actor, handle) = Actor::new(FlexibleAlert::new(Box::new(LuaEngine)), bus);
        (actor, handle, peer)
    }

    #[tokio::test]
    async fn term_stops_loop() {
        let (actor, handle, _peer) = actor();
        handle.command(&["$TERM"]).await.unwrap();
        let actor = actor.run_until(std::future::pending()).await;
        assert!(!actor.engine().is_verbose());
    }

    #[tokio::test]
    async fn shutdown_future_stops_loop() {
        let (actor, _handle, _peer) = actor();
        actor.run_until(async {}).await;
    }

    #[tokio::test]
    async fn shutdown_wins_over_queued_traffic() {
        let (mut bus, peer) = InMemoryBus::pair();
        bus.connect("memory://", "flexible-alert").await.unwrap();
        bus.set_consumer("ASSETS", ".*").await.unwrap();
        for i in 0..2000 {
            let name = format!("asset-{i}");
            peer.inject_event("ASSETS", &name, BusEvent::Asset(AssetEvent::new(&name, "update")));
        }
        let (actor, handle) = Actor::new(FlexibleAlert::new(Box::new(LuaEngine)), bus);
        handle.command(&["VERBOSE"]).await.unwrap();

        let actor = actor.run_until(async {}).await;
        assert!(!actor.engine().assets().is_known("asset-0"));
        assert!(!actor.engine().is_verbose());
    }

    #[tokio::test]
    async fn metrics_only_from_known_streams() {
        let (actor, handle, mut peer) = actor();
        for cmd in [
            vec!["BIND", "memory://", "flexible-alert"],
            vec!["PRODUCER", "_ALERTS_SYS"],
            vec!["CONSUMER", "METRICS", ".*"],
            vec!["CONSUMER", "LICENSING", ".*"],
        ] {
            handle.command(&cmd[..]).await.unwrap();
        }
        let nagios = |q: &str| {
            BusEvent::Metric(MetricEvent::new(q, "srv-1", "2", 60).with_aux("description", "down"))
        };
        peer.inject_event("LICENSING", "nagios.lic@srv-1", nagios("nagios.lic"));
        peer.inject_event("METRICS", "nagios.disk@srv-1", nagios("nagios.disk"));

        let task = tokio::spawn(actor.run_until(std::future::pending()));
        let first = peer.next_outgoing().await.unwrap();
        handle.command(&["TERM"]).await.unwrap();
        task.await.unwrap();

        match first {
            Outgoing::Published { topic, .. } => assert_eq!(topic, "nagios.disk/CRITICAL@srv-1"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(peer.try_outgoing().is_none());
    }

    #[tokio::test]
    async fn setup_commands_reach_bus() {
        let (actor, handle, peer) = actor();
        for cmd in [
            vec!["BIND", "memory://", "flexible-alert"],
            vec!["PRODUCER", "_ALERTS_SYS"],
            vec!["CONSUMER", "METRICS", ".*"],
            vec!["BOGUS"],
            vec!["CONSUMER", "ASSETS"],
            vec!["VERBOSE"],
            vec!["TERM"],
        ] {
            handle.command(&cmd[..]).await.unwrap();
        }
        let actor = actor.run_until(std::future::pending()).await;

        let state = peer.state().await;
        assert_eq!(state.name.as_deref(), Some("flexible-alert"));
        assert_eq!(state.producer.as_deref(), Some("_ALERTS_SYS"));
        assert_eq!(state.consumers, vec![("METRICS".to_string(), vec![".*".to_string()])]);
        assert!(actor.engine().is_verbose());
    }

    #[tokio::test]
    async fn admin_reply_falls_back_to_sender_mailbox() {
        let (actor, handle, mut peer) = actor();
        handle.command(&["BIND", "memory://", "flexible-alert"]).await.unwrap();
        peer.inject_mailbox("ops", "rules", &["GET", "missing"]);
        peer.inject_request("ops", "_INBOX.7", &["GET", "missing"]);
        peer.inject_mailbox("ops", "rules", &["NOPE"]);

        let task = tokio::spawn(actor.run_until(std::future::pending()));
        let first = peer.next_outgoing().await.unwrap();
        let second = peer.next_outgoing().await.unwrap();
        handle.command(&["TERM"]).await.unwrap();
        task.await.unwrap();

        assert_eq!(
            first,
            Outgoing::Sent {
                address: "ops".into(),
                subject: "rules".into(),
                frames: frames(&["ERROR", "NOT_FOUND"]),
            }
        );
        assert_eq!(
            second,
            Outgoing::Reply {
                reply_to: "_INBOX.7".into(),
                frames: frames(&["ERROR", "NOT_FOUND"]),
            }
        );
        assert!(peer.try_outgoing().is_none());
    }
}
