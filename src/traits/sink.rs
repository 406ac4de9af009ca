use async_trait::async_trait;

use crate::errors::PluginError;
use crate::models::Record;
use crate::traits::Plugin;

/// Plugin that publishes batched records to a catalog endpoint.
///
/// A write error wrapped in [`PluginError::Retryable`] is retried with
/// exponential backoff; any other error is permanent. `close` runs once
/// per run, after the last batch, whether the run succeeded or not.
#[async_trait]
pub trait Sink: Plugin {
    async fn sink(&mut self, batch: &[Record]) -> Result<(), PluginError>;

    async fn close(&mut self) -> Result<(), PluginError>;
}
