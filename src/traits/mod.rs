// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod extractor;
pub mod processor;
pub mod sink;

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;

use crate::errors::PluginError;

pub use extractor::{Emitter, Extractor};
pub use processor::Processor;
pub use sink::Sink;

/// Untyped plugin configuration as it appears in a recipe document.
///
/// Plugins convert this into their typed config struct via
/// [`crate::utils::config::build_config`].
pub type ConfigMap = HashMap<String, serde_yaml::Value>;

/// The three plugin roles a registry entry can fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginKind {
    Extractor,
    Processor,
    Sink,
}

impl fmt::Display for PluginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PluginKind::Extractor => "extractor",
            PluginKind::Processor => "processor",
            PluginKind::Sink => "sink",
        };
        f.write_str(s)
    }
}

/// Self-description a plugin exposes for CLI help output.
#[derive(Debug, Clone, Default)]
pub struct Info {
    pub description: String,
    pub sample_config: String,
    pub summary: String,
    pub tags: Vec<String>,
}

/// Prelude shared by every plugin role.
///
/// `validate` checks a config map without touching any external system;
/// `init` primes the plugin for a single run. Both report bad
/// configuration through [`PluginError::InvalidConfig`], which the
/// validator relies on for actionable pre-flight diagnostics. Instances
/// are created fresh per run and never reused.
#[async_trait]
pub trait Plugin: Send + Sync {
    fn info(&self) -> Info;

    fn validate(&self, config: &ConfigMap) -> Result<(), PluginError>;

    async fn init(&mut self, config: &ConfigMap) -> Result<(), PluginError>;
}
