use async_trait::async_trait;

use crate::errors::PluginError;
use crate::models::Record;
use crate::traits::Plugin;

/// Plugin that transforms or filters records between extractor and sinks.
///
/// Processors are pure with respect to the stream: they receive a record
/// and return a new (or the same) one, `Ok(None)` to drop it, or an
/// error. Processor errors signal corrupt data and abort the run.
#[async_trait]
pub trait Processor: Plugin {
    async fn process(&self, record: Record) -> Result<Option<Record>, PluginError>;
}
