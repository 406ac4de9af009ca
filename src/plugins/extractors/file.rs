use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;

use crate::errors::PluginError;
use crate::models::{Asset, Record};
use crate::traits::{ConfigMap, Emitter, Extractor, Info, Plugin};
use crate::utils::config::build_config;

const SAMPLE_CONFIG: &str = "path: ./assets";

#[derive(Debug, Deserialize)]
struct Config {
    path: String,
}

/// Extractor reading asset documents from a directory.
///
/// Every `*.json` file in the configured directory holds one serialized
/// asset; files are emitted in file-name order so repeated runs produce
/// the same record sequence.
#[derive(Debug, Default)]
pub struct FileExtractor {
    path: Option<PathBuf>,
}

#[async_trait]
impl Plugin for FileExtractor {
    fn info(&self) -> Info {
        Info {
            description: "Asset metadata from JSON documents in a directory".into(),
            sample_config: SAMPLE_CONFIG.into(),
            summary: "Emits one record per JSON asset document found in the configured directory"
                .into(),
            tags: vec!["file".into(), "extractor".into()],
        }
    }

    fn validate(&self, config: &ConfigMap) -> Result<(), PluginError> {
        build_config::<Config>(config).map(|_| ())
    }

    async fn init(&mut self, config: &ConfigMap) -> Result<(), PluginError> {
        let cfg: Config = build_config(config)?;
        let path = PathBuf::from(&cfg.path);
        if !path.is_dir() {
            return Err(PluginError::invalid_config(format!(
                "path \"{}\" is not a directory",
                cfg.path
            )));
        }
        self.path = Some(path);
        Ok(())
    }
}

#[async_trait]
impl Extractor for FileExtractor {
    async fn extract(&mut self, emit: Emitter) -> Result<(), PluginError> {
        let dir = self
            .path
            .clone()
            .ok_or_else(|| PluginError::failure("extractor is not initialized"))?;

        let mut entries = tokio::fs::read_dir(&dir).await?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
                files.push(path);
            }
        }
        files.sort();

        for file in files {
            let content = tokio::fs::read_to_string(&file).await?;
            let asset: Asset = serde_json::from_str(&content).map_err(|err| {
                PluginError::failure(format!("failed to parse \"{}\": {err}", file.display()))
            })?;
            emit.emit(Record::new(asset)).await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{Arc, Mutex};

    use crate::engine::Stream;
    use crate::models::Record;

    fn config_for(path: &std::path::Path) -> ConfigMap {
        ConfigMap::from([(
            "path".to_string(),
            serde_yaml::Value::String(path.display().to_string()),
        )])
    }

    fn table_doc(urn: &str) -> String {
        format!(r#"{{"type":"table","urn":"{urn}","name":"{urn}"}}"#)
    }

    async fn collect(mut extractor: FileExtractor) -> Vec<String> {
        let mut stream = Stream::new();
        let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        stream.subscribe(
            move |batch: Vec<Record>| {
                let sink = Arc::clone(&sink);
                async move {
                    for r in &batch {
                        sink.lock().unwrap().push(r.urn().to_string());
                    }
                    Ok(())
                }
            },
            1,
        );
        let emitter = stream.emitter();
        let extraction = tokio::spawn(async move { extractor.extract(emitter).await });
        stream.broadcast().await.unwrap();
        extraction.await.unwrap().unwrap();
        Arc::try_unwrap(seen).unwrap().into_inner().unwrap()
    }

    #[tokio::test]
    async fn emits_documents_in_file_name_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("20-beta.json"), table_doc("db.beta")).unwrap();
        std::fs::write(dir.path().join("10-alpha.json"), table_doc("db.alpha")).unwrap();
        std::fs::write(dir.path().join("README.txt"), "not an asset").unwrap();

        let mut extractor = FileExtractor::default();
        extractor.init(&config_for(dir.path())).await.unwrap();

        assert_eq!(collect(extractor).await, vec!["db.alpha", "db.beta"]);
    }

    #[tokio::test]
    async fn missing_path_key_is_invalid_config() {
        let extractor = FileExtractor::default();
        let err = extractor.validate(&ConfigMap::new()).unwrap_err();
        assert!(err.is_invalid_config());
    }

    #[tokio::test]
    async fn init_rejects_a_missing_directory() {
        let mut extractor = FileExtractor::default();
        let config = ConfigMap::from([(
            "path".to_string(),
            serde_yaml::Value::String("/no/such/dir".into()),
        )]);
        let err = extractor.init(&config).await.unwrap_err();
        assert!(err.is_invalid_config());
        assert!(err.to_string().contains("/no/such/dir"));
    }

    #[tokio::test]
    async fn malformed_document_fails_extraction() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.json"), "{not json").unwrap();

        let mut extractor = FileExtractor::default();
        extractor.init(&config_for(dir.path())).await.unwrap();

        let stream = Stream::new();
        let emitter = stream.emitter();
        let extraction = tokio::spawn(async move { extractor.extract(emitter).await });
        stream.broadcast().await.unwrap();
        let err = extraction.await.unwrap().unwrap_err();
        assert!(err.to_string().contains("bad.json"));
    }
}
