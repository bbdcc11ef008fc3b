//! The process entry point's supporting pieces: configuration, CLI flags,
//! and the error taxonomy for everything that can go wrong before the
//! dispatch loop starts running. None of this changes dispatch semantics —
//! see `broker-dispatch` for the actual broker.

mod cli;
mod config;
mod error;

pub use cli::Cli;
pub use config::BrokerConfig;
pub use error::BrokerError;
