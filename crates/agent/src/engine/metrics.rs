use flexalert_common::event::{
    MetricEvent, METRIC_AUX_DESCRIPTION, METRIC_AUX_EXT_PORT, METRIC_AUX_PORT,
    METRIC_AUX_SENSOR_NAME,
};

use super::{FlexibleAlert, Outbound};
use crate::alert::{self, Alert};
use crate::cache::normalize_quantity;
use crate::evaluator;

const NAGIOS_PREFIX: &str = "nagios.";
const GPI_PORT_MARKER: &str = "GPI";

impl FlexibleAlert {
    /// Handles a metric from the plain metrics stream. `topic` is the bus
    /// topic the event arrived on; a topic already present in the cache
    /// triggers a sweep of expired entries.
    pub fn handle_metric(&mut self, topic: &str, metric: &MetricEvent, now: i64) -> Vec<Outbound> {
        if self.metrics.contains_topic(topic) {
            let removed = self.metrics.sweep_expired(now);
            if removed > 0 {
                tracing::debug!(removed, "expired metrics dropped");
            }
        }

        let quantity = if metric.aux_str(METRIC_AUX_EXT_PORT).is_some() {
            match normalize_quantity(&metric.quantity) {
                Some(q) => q,
                None => {
                    tracing::debug!(quantity = %metric.quantity, "malformed quantity, dropping");
                    return Vec::new();
                }
            }
        } else {
            metric.quantity.clone()
        };

        if let Some(alert) = nagios_alert(metric, now) {
            return vec![Outbound::Alert(alert)];
        }

        let Some(applicable) = self.assets.applicable_rules(&metric.asset) else {
            return Vec::new();
        };
        let applicable = applicable.to_vec();
        let display_name = self.assets.display_name(&metric.asset).map(str::to_string);

        let mut out = Vec::new();
        let mut cached = false;
        for name in &applicable {
            let wants_metric = self.rules.get(name).is_some_and(|r| r.has_metric(&quantity));
            if !wants_metric {
                continue;
            }
            if !cached {
                self.metrics
                    .record(&quantity, &metric.asset, &metric.value, now, metric.ttl);
                cached = true;
            }
            if let Some(alert) = self.evaluate_rule(name, &metric.asset, display_name.as_deref(), now) {
                out.push(Outbound::Alert(alert));
            }
        }
        out
    }

    /// Handles a metric relayed from a GPIO sensor input. The sensor name
    /// becomes the asset; unknown sensors are requested from the asset
    /// directory before the metric is processed as usual.
    pub fn handle_sensor_metric(&mut self, topic: &str, metric: &MetricEvent, now: i64) -> Vec<Outbound> {
        let port = metric.aux_str(METRIC_AUX_PORT).unwrap_or_default();
        if !port.contains(GPI_PORT_MARKER) {
            tracing::debug!(port, "sensor metric not on a GPI port");
            return Vec::new();
        }
        let Some(sensor) = metric.aux_str(METRIC_AUX_SENSOR_NAME) else {
            tracing::debug!("no sensor name in sensor metric");
            return Vec::new();
        };

        let mut out = Vec::new();
        if self.assets.is_known(sensor) {
            if self.verbose {
                tracing::info!(sensor, "sensor known");
            }
        } else {
            if self.verbose {
                tracing::info!(sensor, "asking for sensor");
            }
            out.push(Outbound::Republish {
                asset: sensor.to_string(),
            });
        }

        let mut renamed = metric.clone();
        renamed.asset = sensor.to_string();
        out.extend(self.handle_metric(topic, &renamed, now));
        out
    }

    fn evaluate_rule(
        &mut self,
        name: &str,
        asset: &str,
        display_name: Option<&str>,
        now: i64,
    ) -> Option<Alert> {
        let rule = self.rules.get_mut(name)?;

        let mut params = Vec::with_capacity(rule.metrics.len());
        let mut min_ttl: Option<u32> = None;
        for quantity in &rule.metrics {
            let Some(cached) = self.metrics.get(quantity, asset) else {
                tracing::debug!(rule = %name, metric = %quantity, asset, "missing metric");
                return None;
            };
            params.push(cached.value.clone());
            min_ttl = Some(min_ttl.map_or(cached.ttl, |t| t.min(cached.ttl)));
        }

        let result = evaluator::evaluate(self.script.as_ref(), rule, &params, asset, display_name);
        if result.is_error() {
            tracing::warn!(rule = %name, asset, "rule evaluation failed, alerting without verdict");
        }

        Some(alert::compose(
            &rule.name,
            rule.result_actions(result.code),
            asset,
            result.code,
            result.message.as_deref(),
            alert::evaluation_ttl(min_ttl.unwrap_or_default()),
            now,
        ))
    }
}

/// Nagios-style checks carry their verdict directly: a `nagios.*` quantity
/// with a description and a value of 0, 1 or 2 becomes an alert without any
/// rule. Anything else falls through to rule processing.
fn nagios_alert(metric: &MetricEvent, now: i64) -> Option<Alert> {
    if !metric.quantity.starts_with(NAGIOS_PREFIX) {
        return None;
    }
    let description = metric
        .aux_str(METRIC_AUX_DESCRIPTION)
        .filter(|d| !d.is_empty())?;
    let code = parse_status(&metric.value).filter(|c| (0..=2).contains(c))?;
    Some(alert::compose(
        &metric.quantity,
        &[],
        &metric.asset,
        code,
        Some(description),
        metric.ttl,
        now,
    ))
}

fn parse_status(value: &str) -> Option<i32> {
    let value = value.trim();
    value.parse::<i32>().ok().or_else(|| {
        value
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(|v| v.trunc() as i32)
    })
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    use flexalert_common::{Action, AlertState, AssetEvent, Severity};

    fn alerts(out: &[Outbound]) -> Vec<&Alert> {
        out.iter()
            .filter_map(|o| match o {
                Outbound::Alert(a) => Some(a),
                _ => None,
            })
            .collect()
    }

    fn ready_engine(dir: &std::path::Path) -> FlexibleAlert {
        let mut engine = engine_with(dir, &[("load", OK_RULE)]);
        engine.handle_asset(&AssetEvent::new("mydevice", "update"));
        engine
    }

    #[test]
    fn metric_triggers_resolved_alert() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = ready_engine(dir.path());

        let metric = MetricEvent::new("status.ups", "mydevice", "64", 60);
        let out = engine.handle_metric("status.ups@mydevice", &metric, 1_000);
        let alerts = alerts(&out);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].topic, "load/OK@mydevice");
        assert_eq!(alerts[0].event.state, AlertState::Resolved);
        assert_eq!(alerts[0].event.ttl, 150);
        assert_eq!(alerts[0].event.message.as_deref(), Some("ok"));
        assert_eq!(alerts[0].event.actions, vec![Action::Email]);
    }

    #[test]
    fn unknown_asset_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine_with(dir.path(), &[("load", OK_RULE)]);
        let metric = MetricEvent::new("status.ups", "mydevice", "64", 60);
        assert!(engine.handle_metric("status.ups@mydevice", &metric, 0).is_empty());
        assert!(engine.metrics().is_empty());
    }

    #[test]
    fn unrelated_quantity_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = ready_engine(dir.path());
        let metric = MetricEvent::new("realpower.default", "mydevice", "10", 60);
        assert!(engine.handle_metric("realpower.default@mydevice", &metric, 0).is_empty());
        assert!(engine.metrics().is_empty());
    }

    #[test]
    fn waits_for_all_metrics() {
        let dir = tempfile::tempdir().unwrap();
        let two = r#"{"name":"two","metrics":["a.x","b.x"],"assets":["dev"],
            "evaluation":"function main(a, b) return OK, a .. ',' .. b end"}"#;
        let mut engine = engine_with(dir.path(), &[("two", two)]);
        engine.handle_asset(&AssetEvent::new("dev", "update"));

        let out = engine.handle_metric("a.x@dev", &MetricEvent::new("a.x", "dev", "1", 100), 0);
        assert!(out.is_empty());
        assert_eq!(engine.metrics().len(), 1);

        let out = engine.handle_metric("b.x@dev", &MetricEvent::new("b.x", "dev", "2", 40), 0);
        let alerts = alerts(&out);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].event.message.as_deref(), Some("1,2"));
        assert_eq!(alerts[0].event.ttl, 100);
    }

    #[test]
    fn repeated_topic_sweeps_expired() {
        let dir = tempfile::tempdir().unwrap();
        let two = r#"{"name":"two","metrics":["a.x","b.x"],"assets":["dev"],
            "evaluation":"function main(a, b) return OK, 'x' end"}"#;
        let mut engine = engine_with(dir.path(), &[("two", two)]);
        engine.handle_asset(&AssetEvent::new("dev", "update"));

        engine.handle_metric("b.x@dev", &MetricEvent::new("b.x", "dev", "2", 10), 0);
        engine.handle_metric("a.x@dev", &MetricEvent::new("a.x", "dev", "1", 100), 0);
        // b.x expired at t=11 but nothing swept it yet
        assert_eq!(engine.metrics().len(), 2);

        let out = engine.handle_metric("a.x@dev", &MetricEvent::new("a.x", "dev", "1", 100), 50);
        assert!(out.is_empty());
        assert!(engine.metrics().get("b.x", "dev").is_none());
    }

    #[test]
    fn nagios_alert_without_rules() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine_with(dir.path(), &[]);
        let metric = MetricEvent::new("nagios.check_disk", "srv-1", "2", 300)
            .with_aux("description", "disk almost full");
        let out = engine.handle_metric("nagios.check_disk@srv-1", &metric, 5);
        let alerts = alerts(&out);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].topic, "nagios.check_disk/CRITICAL@srv-1");
        assert_eq!(alerts[0].event.severity, Severity::Critical);
        assert_eq!(alerts[0].event.message.as_deref(), Some("disk almost full"));
        assert_eq!(alerts[0].event.ttl, 300);
        assert!(alerts[0].event.actions.is_empty());
    }

    #[test]
    fn nagios_needs_description_and_range() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine_with(dir.path(), &[]);
        let no_desc = MetricEvent::new("nagios.check", "srv", "2", 60);
        let out_of_range = MetricEvent::new("nagios.check", "srv", "3", 60).with_aux("description", "d");
        assert!(engine.handle_metric("t", &no_desc, 0).is_empty());
        assert!(engine.handle_metric("t", &out_of_range, 0).is_empty());
    }

    #[test]
    fn ext_port_quantity_normalized() {
        let dir = tempfile::tempdir().unwrap();
        let gpi = r#"{"name":"door","metrics":["status.GPI1"],"assets":["sensor-1"],
            "evaluation":"function main(v) return WARNING, 'open' end"}"#;
        let mut engine = engine_with(dir.path(), &[("door", gpi)]);
        engine.handle_asset(&AssetEvent::new("sensor-1", "update"));

        let metric = MetricEvent::new("status.GPI1.2", "sensor-1", "1", 30).with_aux("ext-port", "2");
        let out = engine.handle_metric("status.GPI1.2@sensor-1", &metric, 0);
        assert_eq!(alerts(&out)[0].topic, "door/WARNING@sensor-1");
        assert!(engine.metrics().get("status.GPI1", "sensor-1").is_some());
    }

    #[test]
    fn malformed_ext_port_quantity_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = ready_engine(dir.path());
        let metric = MetricEvent::new("status", "mydevice", "1", 30).with_aux("ext-port", "2");
        assert!(engine.handle_metric("status@mydevice", &metric, 0).is_empty());
        assert!(engine.metrics().is_empty());
    }

    #[test]
    fn sensor_metric_requests_unknown_sensor() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = ready_engine(dir.path());
        let metric = MetricEvent::new("status.ups", "gpio-host", "64", 60)
            .with_aux("port", "GPI2")
            .with_aux("sname", "newsensor");
        let out = engine.handle_sensor_metric("status.GPI2@gpio-host", &metric, 0);
        assert_eq!(out, vec![Outbound::Republish { asset: "newsensor".into() }]);
    }

    #[test]
    fn sensor_metric_renamed_to_known_sensor() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = ready_engine(dir.path());
        let metric = MetricEvent::new("status.ups", "gpio-host", "64", 60)
            .with_aux("port", "GPI2")
            .with_aux("sname", "mydevice");
        let out = engine.handle_sensor_metric("status.GPI2@gpio-host", &metric, 0);
        let alerts = alerts(&out);
        assert_eq!(out.len(), 1);
        assert_eq!(alerts[0].topic, "load/OK@mydevice");
    }

    #[test]
    fn sensor_metric_needs_gpi_port_and_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = ready_engine(dir.path());
        let not_gpi = MetricEvent::new("status.ups", "h", "1", 60)
            .with_aux("port", "DI1")
            .with_aux("sname", "mydevice");
        let no_name = MetricEvent::new("status.ups", "h", "1", 60).with_aux("port", "GPI1");
        assert!(engine.handle_sensor_metric("t", &not_gpi, 0).is_empty());
        assert!(engine.handle_sensor_metric("t", &no_name, 0).is_empty());
    }

    #[test]
    fn evaluation_error_emits_active_ok() {
        let dir = tempfile::tempdir().unwrap();
        let broken = r#"{"name":"broken","metrics":["status.ups"],"assets":["mydevice"],
            "results":{"ok":{"action":["EMAIL"]}},
            "evaluation":"function main(v) return 'no', 'code' end"}"#;
        let mut engine = engine_with(dir.path(), &[("broken", broken)]);
        engine.handle_asset(&AssetEvent::new("mydevice", "update"));
        let metric = MetricEvent::new("status.ups", "mydevice", "1", 60);

        let out = engine.handle_metric("status.ups@mydevice", &metric, 0);
        let alerts = alerts(&out);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].topic, "broken/OK@mydevice");
        assert_eq!(alerts[0].event.severity, Severity::Ok);
        assert_eq!(alerts[0].event.state, AlertState::Active);
        assert!(alerts[0].event.message.is_none());
        assert!(alerts[0].event.actions.is_empty());
        assert_eq!(engine.metrics().len(), 1);
    }

    #[test]
    fn status_values() {
        assert_eq!(parse_status("2"), Some(2));
        assert_eq!(parse_status("1.7"), Some(1));
        assert_eq!(parse_status("warn"), None);
    }
}
