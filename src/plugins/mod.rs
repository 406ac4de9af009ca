//! Built-in plugins.
//!
//! A small set of service-free plugins that ship with the agent: enough
//! to run real pipelines from local files and to serve as the reference
//! for writing external plugins. Each follows the same shape: a typed
//! config struct filled through [`crate::utils::config::build_config`],
//! a `sample_config` advertised via `Info`, and `InvalidConfig` on bad
//! input.

pub mod extractors;
pub mod processors;
pub mod sinks;

use crate::errors::RegistryError;
use crate::registry::{ExtractorFactory, ProcessorFactory, SinkFactory};

/// Registers every built-in plugin into the given factories.
pub fn register_defaults(
    extractor_factory: &mut ExtractorFactory,
    processor_factory: &mut ProcessorFactory,
    sink_factory: &mut SinkFactory,
) -> Result<(), RegistryError> {
    extractor_factory.register("file", || {
        Box::new(extractors::file::FileExtractor::default())
    })?;
    processor_factory.register("enrich", || {
        Box::new(processors::enrich::EnrichProcessor::default())
    })?;
    sink_factory.register("console", || {
        Box::new(sinks::console::ConsoleSink::default())
    })?;
    sink_factory.register("file", || Box::new(sinks::file::FileSink::default()))?;
    Ok(())
}
