pub const STREAM_ASSETS: &str = "ASSETS";
pub const STREAM_METRICS: &str = "METRICS";
pub const STREAM_METRICS_SENSOR: &str = "_METRICS_SENSOR";
pub const STREAM_ALERTS_SYS: &str = "_ALERTS_SYS";

pub const AGENT_NAME: &str = "flexible-alert";
pub const ASSET_AGENT: &str = "asset-agent";
pub const AUTOCONFIG_SENDER: &str = "fty-autoconfig";

pub const MAILBOX_PREFIX: &str = "mailbox";
pub const HEADER_SENDER: &str = "X-Sender";
pub const HEADER_SUBJECT: &str = "X-Subject";

pub fn stream_subject(stream: &str, topic: &str) -> String {
    format!("{stream}.{topic}")
}

pub fn stream_wildcard(stream: &str) -> String {
    format!("{stream}.>")
}

pub fn mailbox_subject(name: &str) -> String {
    format!("{MAILBOX_PREFIX}.{name}")
}

/// Splits a bus subject into `(stream, topic)`. Topics may themselves
/// contain dots, so only the first separator counts.
pub fn split_stream_subject(subject: &str) -> Option<(&str, &str)> {
    let (stream, topic) = subject.split_once('.')?;
    if stream.is_empty() || topic.is_empty() {
        return None;
    }
    Some((stream, topic))
}
