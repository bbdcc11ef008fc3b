use std::{fs, path::PathBuf};

use clap::Parser;

use crate::{BrokerConfig, BrokerError};

/// Command-line flags for the broker process.
///
/// `--config` loads a JSON file shaped like [`BrokerConfig`] (mirroring the
/// original implementation's `confin.json`); any port/debug flag given on
/// the command line overrides the file's value for that field.
#[derive(Debug, Parser)]
#[command(name = "broker", about = "Telemetry dispatch broker")]
pub struct Cli {
    /// Path to a JSON config file with `sources_port`/`listeners_port`/`debug`.
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub sources_port: Option<u16>,

    #[arg(long)]
    pub listeners_port: Option<u16>,

    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Resolves the final [`BrokerConfig`]: start from the config file (or
    /// defaults if none was given), then let any CLI flag override it.
    pub fn resolve(&self) -> Result<BrokerConfig, BrokerError> {
        let mut config = match &self.config {
            Some(path) => {
                let text = fs::read_to_string(path)?;
                serde_json::from_str(&text)?
            }
            None => BrokerConfig::default(),
        };

        if let Some(port) = self.sources_port {
            config.sources_port = port;
        }
        if let Some(port) = self.listeners_port {
            config.listeners_port = port;
        }
        if self.debug {
            config.debug = true;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_when_no_config_given() {
        let cli = Cli { config: None, sources_port: None, listeners_port: None, debug: false };
        assert_eq!(cli.resolve().unwrap(), BrokerConfig::default());
    }

    #[test]
    fn cli_flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"sources_port": 1, "listeners_port": 2, "debug": false}}"#).unwrap();

        let cli = Cli {
            config: Some(file.path().to_path_buf()),
            sources_port: Some(9),
            listeners_port: None,
            debug: true,
        };
        let config = cli.resolve().unwrap();
        assert_eq!(config.sources_port, 9);
        assert_eq!(config.listeners_port, 2);
        assert!(config.debug);
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let cli = Cli {
            config: Some(PathBuf::from("/nonexistent/broker-confin.json")),
            sources_port: None,
            listeners_port: None,
            debug: false,
        };
        assert!(cli.resolve().is_err());
    }
}
