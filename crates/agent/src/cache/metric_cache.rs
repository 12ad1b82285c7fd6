use std::collections::HashMap;

/// Cache key: a quantity measured on an asset, `<quantity>@<asset>` on the
/// wire.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct MetricKey {
    pub quantity: String,
    pub asset: String,
}

impl MetricKey {
    pub fn new(quantity: &str, asset: &str) -> Self {
        Self {
            quantity: quantity.to_string(),
            asset: asset.to_string(),
        }
    }

    /// Splits a `<quantity>@<asset>` topic at its last `@`.
    pub fn from_topic(topic: &str) -> Option<Self> {
        let (quantity, asset) = topic.rsplit_once('@')?;
        Some(Self::new(quantity, asset))
    }

    pub fn topic(&self) -> String {
        format!("{}@{}", self.quantity, self.asset)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CachedMetric {
    pub value: String,
    pub received_at: i64,
    pub ttl: u32,
}

impl CachedMetric {
    pub fn is_expired(&self, now: i64) -> bool {
        self.received_at + i64::from(self.ttl) < now
    }
}

#[derive(Debug, Default)]
pub struct MetricCache {
    entries: HashMap<MetricKey, CachedMetric>,
}

impl MetricCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, quantity: &str, asset: &str, value: &str, received_at: i64, ttl: u32) {
        self.entries.insert(
            MetricKey::new(quantity, asset),
            CachedMetric {
                value: value.to_string(),
                received_at,
                ttl,
            },
        );
    }

    pub fn get(&self, quantity: &str, asset: &str) -> Option<&CachedMetric> {
        self.entries.get(&MetricKey::new(quantity, asset))
    }

    pub fn contains_topic(&self, topic: &str) -> bool {
        MetricKey::from_topic(topic).is_some_and(|key| self.entries.contains_key(&key))
    }

    /// Drops every entry with `received_at + ttl < now`. Returns how many
    /// were removed.
    pub fn sweep_expired(&mut self, now: i64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, m| !m.is_expired(now));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Keeps the first two `.` segments of a quantity relayed through a chained
/// sensor (`status.GPI1.3` becomes `status.GPI1`). Returns `None` when there
/// is no second segment.
pub fn normalize_quantity(quantity: &str) -> Option<String> {
    let mut parts = quantity.splitn(3, '.');
    let first = parts.next().filter(|s| !s.is_empty())?;
    let second = parts.next().filter(|s| !s.is_empty())?;
    Some(format!("{first}.{second}"))
}
