use std::io::Write;

use async_trait::async_trait;
use serde::Deserialize;

use crate::errors::PluginError;
use crate::models::Record;
use crate::traits::{ConfigMap, Info, Plugin, Sink};
use crate::utils::config::build_config;

const SAMPLE_CONFIG: &str = "pretty: false";

#[derive(Debug, Default, Deserialize)]
struct Config {
    #[serde(default)]
    pretty: bool,
}

/// Sink that prints each record as JSON to stdout, one document per
/// line unless pretty-printing is enabled.
#[derive(Debug, Default)]
pub struct ConsoleSink {
    pretty: bool,
}

#[async_trait]
impl Plugin for ConsoleSink {
    fn info(&self) -> Info {
        Info {
            description: "Prints records as JSON to standard output".into(),
            sample_config: SAMPLE_CONFIG.into(),
            summary: "Writes one JSON document per record to stdout".into(),
            tags: vec!["console".into(), "sink".into()],
        }
    }

    fn validate(&self, config: &ConfigMap) -> Result<(), PluginError> {
        build_config::<Config>(config).map(|_| ())
    }

    async fn init(&mut self, config: &ConfigMap) -> Result<(), PluginError> {
        let cfg: Config = build_config(config)?;
        self.pretty = cfg.pretty;
        Ok(())
    }
}

#[async_trait]
impl Sink for ConsoleSink {
    async fn sink(&mut self, batch: &[Record]) -> Result<(), PluginError> {
        let mut out = std::io::stdout().lock();
        for record in batch {
            let document = if self.pretty {
                serde_json::to_string_pretty(record)
            } else {
                serde_json::to_string(record)
            }
            .map_err(|err| PluginError::failure(format!("failed to encode record: {err}")))?;
            writeln!(out, "{document}")?;
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), PluginError> {
        Ok(())
    }
}
