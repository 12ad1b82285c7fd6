use thiserror::Error;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("not connected")]
    NotConnected,
    #[error("no producer stream declared")]
    NoProducer,
    #[error("connect: {0}")]
    Connect(String),
    #[error("subscribe: {0}")]
    Subscribe(String),
    #[error("publish: {0}")]
    Publish(String),
    #[error("send timed out")]
    Timeout,
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("encode: {0}")]
    Encode(#[from] serde_json::Error),
}
