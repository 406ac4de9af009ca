// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::errors::RecipeError;
use crate::traits::ConfigMap;

/// Declarative description of one pipeline.
///
/// A recipe names exactly one source, an ordered (possibly empty) chain
/// of processors, and at least one sink. It is typically loaded from a
/// YAML file:
///
/// ```yaml
/// name: main-postgres
/// source:
///   type: file
///   config:
///     path: ./assets
/// processors:
///   - name: enrich
///     config:
///       labels:
///         environment: production
/// sinks:
///   - name: console
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Recipe {
    #[serde(default)]
    pub name: String,
    pub source: SourceRecipe,
    #[serde(default)]
    pub processors: Vec<ProcessorRecipe>,
    #[serde(default)]
    pub sinks: Vec<SinkRecipe>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SourceRecipe {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub config: ConfigMap,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ProcessorRecipe {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub config: ConfigMap,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SinkRecipe {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub config: ConfigMap,
}

/// Load a recipe from a YAML file.
pub fn load_recipe<P: AsRef<Path>>(path: P) -> Result<Recipe, RecipeError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| RecipeError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_yaml::from_str(&content).map_err(|source| RecipeError::Parse {
        path: path.display().to_string(),
        source,
    })
}

/// Load every `*.yaml`/`*.yml` recipe in a directory, in file-name order.
pub fn load_recipes<P: AsRef<Path>>(dir: P) -> Result<Vec<Recipe>, RecipeError> {
    let dir = dir.as_ref();
    let entries = fs::read_dir(dir).map_err(|source| RecipeError::Io {
        path: dir.display().to_string(),
        source,
    })?;

    let mut paths: Vec<_> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            matches!(
                path.extension().and_then(|ext| ext.to_str()),
                Some("yaml") | Some("yml")
            )
        })
        .collect();
    paths.sort();

    paths.iter().map(load_recipe).collect()
}

/// Load a recipe and apply the structural checks.
///
/// Structural problems (missing name, no sinks, unnamed plugin entries)
/// are all collected into a single [`RecipeError::Invalid`].
pub fn load_and_validate_recipe<P: AsRef<Path>>(path: P) -> Result<Recipe, RecipeError> {
    let recipe = load_recipe(path)?;
    super::validate_recipe(&recipe).map_err(RecipeError::Invalid)?;
    Ok(recipe)
}
