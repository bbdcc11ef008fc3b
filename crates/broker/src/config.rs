use serde::{Deserialize, Serialize};

/// The only contract the core cares about from its surrounding process:
/// two ports and a debug flag (spec.md §1). Everything else in this crate
/// exists to produce one of these and hand it to `broker-dispatch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerConfig {
    pub sources_port: u16,
    pub listeners_port: u16,
    pub debug: bool,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self { sources_port: 8888, listeners_port: 8889, debug: false }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ports_match_spec() {
        let config = BrokerConfig::default();
        assert_eq!(config.sources_port, 8888);
        assert_eq!(config.listeners_port, 8889);
        assert!(!config.debug);
    }

    #[test]
    fn round_trips_through_json() {
        let config = BrokerConfig { sources_port: 1, listeners_port: 2, debug: true };
        let text = serde_json::to_string(&config).unwrap();
        let back: BrokerConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(config, back);
    }
}
