pub mod action;
pub mod event;
pub mod frames;
pub mod subjects;

pub use action::Action;
pub use event::{AlertEvent, AlertState, AssetEvent, BusEvent, MetricEvent, Severity};
