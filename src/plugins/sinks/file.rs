use async_trait::async_trait;
use serde::Deserialize;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::errors::PluginError;
use crate::models::Record;
use crate::traits::{ConfigMap, Info, Plugin, Sink};
use crate::utils::config::build_config;

const SAMPLE_CONFIG: &str = "path: ./out/assets.ndjson\noverwrite: false";

#[derive(Debug, Deserialize)]
struct Config {
    path: String,
    #[serde(default)]
    overwrite: bool,
}

/// Sink appending records to a file as newline-delimited JSON.
#[derive(Debug, Default)]
pub struct FileSink {
    file: Option<File>,
}

#[async_trait]
impl Plugin for FileSink {
    fn info(&self) -> Info {
        Info {
            description: "Appends records to a file as newline-delimited JSON".into(),
            sample_config: SAMPLE_CONFIG.into(),
            summary: "Writes one JSON document per record; set overwrite to truncate on start"
                .into(),
            tags: vec!["file".into(), "sink".into()],
        }
    }

    fn validate(&self, config: &ConfigMap) -> Result<(), PluginError> {
        build_config::<Config>(config).map(|_| ())
    }

    async fn init(&mut self, config: &ConfigMap) -> Result<(), PluginError> {
        let cfg: Config = build_config(config)?;
        let mut options = OpenOptions::new();
        options.create(true);
        if cfg.overwrite {
            options.write(true).truncate(true);
        } else {
            options.append(true);
        }
        self.file = Some(options.open(&cfg.path).await?);
        Ok(())
    }
}

#[async_trait]
impl Sink for FileSink {
    async fn sink(&mut self, batch: &[Record]) -> Result<(), PluginError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| PluginError::failure("sink is not initialized"))?;
        for record in batch {
            let mut line = serde_json::to_vec(record)
                .map_err(|err| PluginError::failure(format!("failed to encode record: {err}")))?;
            line.push(b'\n');
            file.write_all(&line).await?;
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), PluginError> {
        if let Some(file) = self.file.as_mut() {
            file.flush().await?;
        }
        Ok(())
    }
}
