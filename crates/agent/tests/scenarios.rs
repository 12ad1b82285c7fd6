use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::task::JoinHandle;

use flexalert_agent::actor::{Actor, ActorHandle};
use flexalert_agent::bus::{InMemoryBus, InMemoryPeer, Outgoing};
use flexalert_agent::config::AgentConfig;
use flexalert_agent::engine::FlexibleAlert;
use flexalert_agent::run::startup_commands;
use flexalert_agent::script::LuaEngine;
use flexalert_common::{Action, AlertEvent, AlertState, AssetEvent, BusEvent, MetricEvent, Severity};

const WAIT: Duration = Duration::from_secs(5);

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(format!("{name}.rule"))
}

struct Agent {
    handle: ActorHandle,
    peer: InMemoryPeer,
    task: JoinHandle<Actor<InMemoryBus>>,
    dir: tempfile::TempDir,
}

impl Agent {
    async fn start(fixtures: &[&str]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        for name in fixtures {
            std::fs::copy(fixture(name), dir.path().join(format!("{name}.rule"))).unwrap();
        }

        let mut cfg = AgentConfig::default();
        cfg.bus.endpoint = "memory://".into();
        cfg.server.rules_dir = dir.path().display().to_string();

        let (bus, peer) = InMemoryBus::pair();
        let (actor, handle) = Actor::new(FlexibleAlert::new(Box::new(LuaEngine)), bus);
        for cmd in startup_commands(&cfg) {
            handle.send(cmd).await.unwrap();
        }
        let task = tokio::spawn(actor.run_until(std::future::pending()));

        Self { handle, peer, task, dir }
    }

    fn asset(&self, asset: AssetEvent) {
        let topic = asset.name.clone();
        self.peer.inject_event("ASSETS", &topic, BusEvent::Asset(asset));
    }

    fn metric(&self, stream: &str, metric: MetricEvent) {
        let topic = metric.topic();
        self.peer.inject_event(stream, &topic, BusEvent::Metric(metric));
    }

    async fn request(&mut self, frames: &[&str]) -> Vec<String> {
        self.peer.inject_request("ops", "_INBOX.test", frames);
        match self.next().await {
            Outgoing::Reply { reply_to, frames } => {
                assert_eq!(reply_to, "_INBOX.test");
                frames
            }
            other => panic!("expected reply, got {other:?}"),
        }
    }

    async fn next(&mut self) -> Outgoing {
        tokio::time::timeout(WAIT, self.peer.next_outgoing())
            .await
            .expect("agent stayed silent")
            .expect("bus dropped")
    }

    async fn next_alert(&mut self) -> (String, AlertEvent) {
        match self.next().await {
            Outgoing::Published {
                topic,
                event: BusEvent::Alert(alert),
            } => (topic, alert),
            other => panic!("expected alert, got {other:?}"),
        }
    }

    async fn stop(self) -> Actor<InMemoryBus> {
        self.handle.command(&["TERM"]).await.unwrap();
        tokio::time::timeout(WAIT, self.task)
            .await
            .expect("loop did not stop")
            .unwrap()
    }
}

#[tokio::test]
async fn metric_on_matching_asset_publishes_resolved_alert() {
    let mut agent = Agent::start(&["load"]).await;

    agent.asset(AssetEvent::new("mydevice", "update"));
    agent.metric("METRICS", MetricEvent::new("status.ups", "mydevice", "64", 60));

    let (topic, alert) = agent.next_alert().await;
    assert_eq!(topic, "load/OK@mydevice");
    assert_eq!(alert.state, AlertState::Resolved);
    assert_eq!(alert.severity, Severity::Ok);
    assert_eq!(alert.message.as_deref(), Some("ok"));
    assert_eq!(alert.actions, vec![Action::Email]);
    assert_eq!(alert.ttl, 150);

    agent.metric("METRICS", MetricEvent::new("status.ups", "mydevice", "95", 60));
    let (topic, alert) = agent.next_alert().await;
    assert_eq!(topic, "load/CRITICAL@mydevice");
    assert_eq!(alert.state, AlertState::Active);
    assert_eq!(alert.actions, vec![Action::Email, Action::Sms]);

    let actor = agent.stop().await;
    assert!(actor.engine().metrics().get("status.ups", "mydevice").is_some());
}

#[tokio::test]
async fn list_reply_starts_with_request_tokens() {
    let mut agent = Agent::start(&["load", "voltage", "broken"]).await;

    let reply = agent.request(&["LIST", "all", "myclass"]).await;
    assert_eq!(&reply[..3], ["LIST", "all", "myclass"]);
    assert_eq!(reply.len(), 5);
    for wrapped in &reply[3..] {
        assert!(wrapped.starts_with("{\"flexible\": "));
        let doc: serde_json::Value = serde_json::from_str(wrapped).unwrap();
        assert!(doc["flexible"]["name"].is_string());
    }

    let reply = agent.request(&["LIST", "bogus", ""]).await;
    assert_eq!(reply, ["ERROR", "INVALID_TYPE"]);
    agent.stop().await;
}

#[tokio::test]
async fn add_get_delete_round_trip() {
    let mut agent = Agent::start(&[]).await;
    let body = r#"{"name":"temp","metrics":["temperature"],"assets":["rack-1"],"evaluation":"function main(t) return OK, t end"}"#;

    let reply = agent.request(&["ADD", body]).await;
    assert_eq!(reply, ["OK", body]);
    assert!(agent.dir.path().join("temp.rule").exists());

    let reply = agent.request(&["GET", "temp"]).await;
    assert_eq!(reply[0], "OK");
    let doc: serde_json::Value = serde_json::from_str(&reply[1]).unwrap();
    assert_eq!(doc["name"], "temp");

    let reply = agent.request(&["ADD", body]).await;
    assert_eq!(reply, ["ERROR", "ALREADY_EXISTS"]);

    let reply = agent.request(&["DELETE", "temp"]).await;
    assert_eq!(reply, ["DELETE", "temp", "OK"]);
    assert!(!agent.dir.path().join("temp.rule").exists());

    let reply = agent.request(&["GET", "temp"]).await;
    assert_eq!(reply, ["ERROR", "NOT_FOUND"]);
    agent.stop().await;
}

#[tokio::test]
async fn added_rule_evaluates_live_traffic() {
    let mut agent = Agent::start(&[]).await;
    let body = r#"{"name":"temp","metrics":["temperature"],"groups":["racks"],"results":{"high_warning":{"action":[{"action":"SMS"}]}},"evaluation":"function main(t) if tonumber(t) > 30 then return HIGH_WARNING, 'hot' end return OK, 'cool' end"}"#;
    assert_eq!(agent.request(&["ADD", body]).await[0], "OK");

    agent.asset(AssetEvent::new("rack-1", "update").with_ext("group.1", "racks"));
    agent.metric("METRICS", MetricEvent::new("temperature", "rack-1", "35", 30));

    let (topic, alert) = agent.next_alert().await;
    assert_eq!(topic, "temp/WARNING@rack-1");
    assert_eq!(alert.message.as_deref(), Some("hot"));
    assert_eq!(alert.actions, vec![Action::Sms]);
    agent.stop().await;
}

#[tokio::test]
async fn nagios_metric_alerts_without_rule() {
    let mut agent = Agent::start(&[]).await;

    agent.metric(
        "METRICS",
        MetricEvent::new("nagios.disk", "srv-1", "2", 300).with_aux("description", "disk almost full"),
    );

    let (topic, alert) = agent.next_alert().await;
    assert_eq!(topic, "nagios.disk/CRITICAL@srv-1");
    assert_eq!(alert.severity, Severity::Critical);
    assert_eq!(alert.state, AlertState::Active);
    assert_eq!(alert.message.as_deref(), Some("disk almost full"));
    assert_eq!(alert.ttl, 300);
    agent.stop().await;
}

#[tokio::test]
async fn malformed_ext_port_quantity_dropped() {
    let mut agent = Agent::start(&["load"]).await;
    agent.asset(AssetEvent::new("mydevice", "update"));

    agent.metric(
        "METRICS",
        MetricEvent::new("status", "mydevice", "64", 60).with_aux("ext-port", "1"),
    );
    agent.metric(
        "METRICS",
        MetricEvent::new("nagios.ping", "mydevice", "0", 60).with_aux("description", "alive"),
    );

    // the first thing out is the nagios alert, nothing came from the bad metric
    let (topic, _) = agent.next_alert().await;
    assert_eq!(topic, "nagios.ping/OK@mydevice");
    let actor = agent.stop().await;
    assert!(actor.engine().metrics().is_empty());
}

#[tokio::test]
async fn unknown_sensor_requests_republish() {
    let mut agent = Agent::start(&["sensorgpio-door"]).await;

    agent.metric(
        "_METRICS_SENSOR",
        MetricEvent::new("status.GPI1", "ipc-1", "closed", 60)
            .with_aux("port", "GPI1")
            .with_aux("sname", "sensor-door"),
    );

    assert_eq!(
        agent.next().await,
        Outgoing::Sent {
            address: "asset-agent".into(),
            subject: "REPUBLISH".into(),
            frames: vec!["REPUBLISH".into(), "sensor-door".into()],
        }
    );
    agent.stop().await;
}

#[tokio::test]
async fn known_sensor_evaluates_under_sensor_name() {
    let mut agent = Agent::start(&["sensorgpio-door"]).await;

    agent.asset(
        AssetEvent::new("sensor-door", "update")
            .with_aux("type", "device")
            .with_aux("subtype", "sensorgpio")
            .with_ext("model", "DCS001")
            .with_ext("name", "Door sensor"),
    );
    agent.metric(
        "_METRICS_SENSOR",
        MetricEvent::new("status.GPI1", "ipc-1", "opened", 60)
            .with_aux("port", "GPI1")
            .with_aux("sname", "sensor-door"),
    );

    let (topic, alert) = agent.next_alert().await;
    assert_eq!(topic, "sensorgpio-door/WARNING@sensor-door");
    assert_eq!(alert.message.as_deref(), Some("Door sensor is open"));
    assert_eq!(
        alert.actions,
        vec![Action::GpoInteraction {
            asset: "gpo-1".into(),
            mode: Some("open".into()),
        }]
    );
    agent.stop().await;
}

#[tokio::test]
async fn deleted_asset_stops_evaluation() {
    let mut agent = Agent::start(&["load"]).await;

    agent.asset(AssetEvent::new("mydevice", "update"));
    agent.asset(AssetEvent::new("mydevice", "delete"));
    agent.metric("METRICS", MetricEvent::new("status.ups", "mydevice", "64", 60));
    agent.metric(
        "METRICS",
        MetricEvent::new("nagios.ping", "mydevice", "1", 60).with_aux("description", "slow"),
    );

    let (topic, _) = agent.next_alert().await;
    assert_eq!(topic, "nagios.ping/WARNING@mydevice");
    agent.stop().await;
}

#[tokio::test]
async fn term_stops_the_loop() {
    let agent = Agent::start(&["load", "voltage"]).await;
    let actor = agent.stop().await;
    assert_eq!(actor.engine().rules().len(), 2);
    assert!(actor.engine().rules().contains("voltage.input@ups"));
}
