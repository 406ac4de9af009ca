//! Name → constructor factories, one per plugin role.
//!
//! Factories are populated during process init and read-only afterwards.
//! Every `get` invokes the constructor, so each run works with a fresh
//! plugin instance and no state leaks between runs.

use std::collections::HashMap;

use crate::errors::RegistryError;
use crate::traits::{Extractor, PluginKind, Processor, Sink};

type Constructor<P> = Box<dyn Fn() -> Box<P> + Send + Sync>;

/// Resolves plugin names into fresh plugin instances.
pub struct Factory<P: ?Sized> {
    kind: PluginKind,
    constructors: HashMap<String, Constructor<P>>,
}

impl<P: ?Sized> Factory<P> {
    pub fn new(kind: PluginKind) -> Self {
        Self {
            kind,
            constructors: HashMap::new(),
        }
    }

    /// Registers a constructor under a unique name. Registration is
    /// one-shot: a second registration of the same name is an error.
    pub fn register<F>(&mut self, name: &str, constructor: F) -> Result<(), RegistryError>
    where
        F: Fn() -> Box<P> + Send + Sync + 'static,
    {
        if self.constructors.contains_key(name) {
            return Err(RegistryError::Duplicate {
                kind: self.kind,
                name: name.to_string(),
            });
        }
        self.constructors
            .insert(name.to_string(), Box::new(constructor));
        Ok(())
    }

    /// Builds a fresh instance of the named plugin.
    pub fn get(&self, name: &str) -> Result<Box<P>, RegistryError> {
        self.constructors
            .get(name)
            .map(|constructor| constructor())
            .ok_or_else(|| RegistryError::NotFound {
                kind: self.kind,
                name: name.to_string(),
            })
    }

    /// Registered plugin names, sorted for stable help output.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

pub type ExtractorFactory = Factory<dyn Extractor>;
pub type ProcessorFactory = Factory<dyn Processor>;
pub type SinkFactory = Factory<dyn Sink>;

impl Default for Factory<dyn Extractor> {
    fn default() -> Self {
        Factory::new(PluginKind::Extractor)
    }
}

impl Default for Factory<dyn Processor> {
    fn default() -> Self {
        Factory::new(PluginKind::Processor)
    }
}

impl Default for Factory<dyn Sink> {
    fn default() -> Self {
        Factory::new(PluginKind::Sink)
    }
}
