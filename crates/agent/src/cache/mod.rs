mod asset_index;
mod metric_cache;

pub use asset_index::AssetIndex;
pub use metric_cache::{normalize_quantity, CachedMetric, MetricCache, MetricKey};
