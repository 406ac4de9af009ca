use async_trait::async_trait;
use serde::Deserialize;

use crate::errors::PluginError;
use crate::models::{Labels, Record};
use crate::traits::{ConfigMap, Info, Plugin, Processor};
use crate::utils::config::build_config;

const SAMPLE_CONFIG: &str = "labels:\n  environment: production\n  team: data-platform";

#[derive(Debug, Deserialize)]
struct Config {
    labels: Labels,
}

/// Processor that stamps configured labels onto every record.
///
/// Existing labels with the same key are overwritten; everything else on
/// the asset is left untouched.
#[derive(Debug, Default)]
pub struct EnrichProcessor {
    labels: Labels,
}

impl EnrichProcessor {
    fn parse(config: &ConfigMap) -> Result<Labels, PluginError> {
        let cfg: Config = build_config(config)?;
        if cfg.labels.is_empty() {
            return Err(PluginError::invalid_config("labels must not be empty"));
        }
        Ok(cfg.labels)
    }
}

#[async_trait]
impl Plugin for EnrichProcessor {
    fn info(&self) -> Info {
        Info {
            description: "Stamps configured labels onto every record".into(),
            sample_config: SAMPLE_CONFIG.into(),
            summary: "Merges a fixed label set into each asset, overwriting existing keys".into(),
            tags: vec!["enrich".into(), "processor".into()],
        }
    }

    fn validate(&self, config: &ConfigMap) -> Result<(), PluginError> {
        Self::parse(config).map(|_| ())
    }

    async fn init(&mut self, config: &ConfigMap) -> Result<(), PluginError> {
        self.labels = Self::parse(config)?;
        Ok(())
    }
}

#[async_trait]
impl Processor for EnrichProcessor {
    async fn process(&self, record: Record) -> Result<Option<Record>, PluginError> {
        let mut asset = record.into_data();
        for (key, value) in &self.labels {
            asset.labels_mut().insert(key.clone(), value.clone());
        }
        Ok(Some(Record::new(asset)))
    }
}
