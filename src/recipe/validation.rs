// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Structural recipe checks.
//!
//! These checks look only at the recipe document itself; whether the
//! named plugins exist and accept their config is the agent validator's
//! job, which has the registries in hand. All findings are collected —
//! validation never stops at the first problem.

use crate::errors::ValidationError;
use crate::recipe::Recipe;
use crate::traits::PluginKind;

/// Validates the shape of a recipe.
///
/// Returns every structural problem found: a missing name, an empty sink
/// set, or plugin entries without a name.
pub fn validate_recipe(recipe: &Recipe) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if recipe.name.trim().is_empty() {
        errors.push(ValidationError::MissingName);
    }

    if recipe.source.kind.trim().is_empty() {
        errors.push(ValidationError::UnnamedPlugin {
            kind: PluginKind::Extractor,
        });
    }

    for processor in &recipe.processors {
        if processor.name.trim().is_empty() {
            errors.push(ValidationError::UnnamedPlugin {
                kind: PluginKind::Processor,
            });
        }
    }

    if recipe.sinks.is_empty() {
        errors.push(ValidationError::NoSinks {
            recipe: recipe.name.clone(),
        });
    }
    for sink in &recipe.sinks {
        if sink.name.trim().is_empty() {
            errors.push(ValidationError::UnnamedPlugin {
                kind: PluginKind::Sink,
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::{SinkRecipe, SourceRecipe};

    fn valid_recipe() -> Recipe {
        Recipe {
            name: "sample".into(),
            source: SourceRecipe {
                kind: "file".into(),
                ..SourceRecipe::default()
            },
            processors: vec![],
            sinks: vec![SinkRecipe {
                name: "console".into(),
                ..SinkRecipe::default()
            }],
        }
    }

    #[test]
    fn valid_recipe_passes() {
        assert!(validate_recipe(&valid_recipe()).is_ok());
    }

    #[test]
    fn collects_all_problems_at_once() {
        let recipe = Recipe::default();
        let errors = validate_recipe(&recipe).unwrap_err();

        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::MissingName)));
        assert!(errors.iter().any(|e| matches!(
            e,
            ValidationError::UnnamedPlugin {
                kind: PluginKind::Extractor
            }
        )));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::NoSinks { .. })));
    }

    #[test]
    fn flags_unnamed_sink_entry() {
        let mut recipe = valid_recipe();
        recipe.sinks.push(SinkRecipe::default());
        let errors = validate_recipe(&recipe).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors[0],
            ValidationError::UnnamedPlugin {
                kind: PluginKind::Sink
            }
        ));
    }
}
