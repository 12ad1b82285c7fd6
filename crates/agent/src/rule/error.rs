use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("invalid rule json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("rule has no name")]
    MissingName,
    #[error("rule io: {0}")]
    Io(#[from] std::io::Error),
}
