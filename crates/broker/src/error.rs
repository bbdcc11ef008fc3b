use thiserror::Error;

/// Startup-time failures only. Once the dispatch loop is running, a peer
/// error never escalates to one of these — see spec.md §7.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("couldn't parse config file: {0}")]
    ConfigParse(#[from] serde_json::Error),
}
