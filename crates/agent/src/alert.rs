use flexalert_common::{Action, AlertEvent, AlertState, Severity};

/// An alert ready to publish on the producer stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub topic: String,
    pub event: AlertEvent,
}

/// `<rule>/<severity>@<asset>`
pub fn topic(rule: &str, severity: Severity, asset: &str) -> String {
    format!("{rule}/{}@{asset}", severity.as_str())
}

pub fn compose(
    rule: &str,
    actions: &[Action],
    asset: &str,
    code: i32,
    message: Option<&str>,
    ttl: u32,
    now: i64,
) -> Alert {
    let severity = Severity::from_code(code);
    Alert {
        topic: topic(rule, severity, asset),
        event: AlertEvent {
            time: now,
            ttl,
            rule: rule.to_string(),
            asset: asset.to_string(),
            state: AlertState::from_code(code),
            severity,
            message: message.map(str::to_string),
            actions: actions.to_vec(),
        },
    }
}

/// Alert lifetime for a rule evaluation: two and a half times the shortest
/// metric TTL, rounded down.
pub fn evaluation_ttl(min_metric_ttl: u32) -> u32 {
    min_metric_ttl.saturating_mul(5) / 2
}
