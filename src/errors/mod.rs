// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::any::Any;

use thiserror::Error;

use crate::traits::PluginKind;

/// String form of a caught panic payload.
pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Errors produced by plugins at the plugin boundary.
///
/// Two variants carry pipeline-level meaning: `InvalidConfig` marks a
/// config problem reported from `validate`/`init`, and `Retryable` marks
/// a sink write that may succeed on a later attempt. Everything else is a
/// plain failure.
#[derive(Debug, Error)]
pub enum PluginError {
    /// The caller supplied missing or malformed configuration.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Transient failure; recognized by the retrier only when returned
    /// from a sink write. Anywhere else it behaves like a plain error.
    #[error(transparent)]
    Retryable(Box<PluginError>),

    #[error("{0}")]
    Failure(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PluginError {
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        PluginError::InvalidConfig(reason.into())
    }

    /// Wraps an error so the retrier treats it as transient.
    pub fn retryable(inner: PluginError) -> Self {
        PluginError::Retryable(Box::new(inner))
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        PluginError::Failure(reason.into())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, PluginError::Retryable(_))
    }

    pub fn is_invalid_config(&self) -> bool {
        matches!(self, PluginError::InvalidConfig(_))
    }
}

/// Errors from the plugin factories.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("could not find {kind} \"{name}\"")]
    NotFound { kind: PluginKind, name: String },

    #[error("duplicate {kind} \"{name}\"")]
    Duplicate { kind: PluginKind, name: String },
}

/// Terminal error of one recipe run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("could not initialize {kind} \"{name}\": {source}")]
    PluginInit {
        kind: PluginKind,
        name: String,
        #[source]
        source: PluginError,
    },

    #[error("extractor \"{name}\" failed: {source}")]
    Extractor {
        name: String,
        #[source]
        source: PluginError,
    },

    #[error("processor \"{name}\" failed: {source}")]
    Processor {
        name: String,
        #[source]
        source: PluginError,
    },

    #[error("sink \"{name}\" failed: {source}")]
    Sink {
        name: String,
        #[source]
        source: PluginError,
    },

    /// A plugin panicked; the payload's string form is preserved and the
    /// process keeps running.
    #[error("{context} panicked: {message}")]
    Panicked { context: String, message: String },
}

/// A single finding from pre-flight recipe validation.
///
/// Validation never short-circuits; a recipe yields one entry per
/// problem, and an empty list means the recipe is valid.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("recipe name is missing")]
    MissingName,

    #[error("recipe \"{recipe}\" has no sinks")]
    NoSinks { recipe: String },

    #[error("{kind} entry has an empty name")]
    UnnamedPlugin { kind: PluginKind },

    #[error("could not find {kind} \"{name}\"")]
    PluginNotFound { kind: PluginKind, name: String },

    #[error("invalid config for {kind} \"{name}\": {source}")]
    InvalidConfig {
        kind: PluginKind,
        name: String,
        #[source]
        source: PluginError,
    },
}

/// Errors from loading recipe documents off disk.
#[derive(Debug, Error)]
pub enum RecipeError {
    #[error("failed to read recipe \"{path}\": {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse recipe \"{path}\": {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid recipe: {}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
    Invalid(Vec<ValidationError>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_displays_the_underlying_cause() {
        let err = PluginError::retryable(PluginError::failure("connection reset"));
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "connection reset");
    }

    #[test]
    fn run_error_mentions_plugin_name_and_kind() {
        let err = RunError::PluginInit {
            kind: PluginKind::Sink,
            name: "console".into(),
            source: PluginError::invalid_config("missing key \"path\""),
        };
        let text = err.to_string();
        assert!(text.contains("sink"));
        assert!(text.contains("console"));
        assert!(text.contains("missing key"));
    }

    #[test]
    fn invalid_recipe_error_lists_every_finding() {
        let err = RecipeError::Invalid(vec![
            ValidationError::MissingName,
            ValidationError::NoSinks {
                recipe: "sample".into(),
            },
        ]);
        let text = err.to_string();
        assert!(text.contains("name is missing"));
        assert!(text.contains("no sinks"));
    }
}
