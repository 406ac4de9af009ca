use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::errors::PluginError;
use crate::models::Record;
use crate::traits::Plugin;

/// Push handle handed to an extractor for the duration of one run.
///
/// The channel behind it is bounded, so `emit` suspends while downstream
/// subscribers are busy. When the last emitter is dropped the stream
/// drains and closes.
#[derive(Clone)]
pub struct Emitter {
    pub(crate) tx: mpsc::Sender<Record>,
}

impl Emitter {
    /// Pushes one record into the stream.
    ///
    /// Fails when the stream has already shut down, e.g. after a fatal
    /// processor error. Extractors should propagate the error and stop.
    pub async fn emit(&self, record: Record) -> Result<(), PluginError> {
        self.tx
            .send(record)
            .await
            .map_err(|_| PluginError::failure("stream is closed"))
    }
}

/// Plugin that reads a data system and emits one record per asset.
#[async_trait]
pub trait Extractor: Plugin {
    /// Runs the extraction to completion, calling `emit` zero or more
    /// times. A non-ok return fails the whole run.
    async fn extract(&mut self, emit: Emitter) -> Result<(), PluginError>;
}

impl std::fmt::Debug for dyn Extractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("dyn Extractor").finish()
    }
}
