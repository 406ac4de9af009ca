use std::env;
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use quarry::engine::{Agent, AgentConfig};
use quarry::plugins::register_defaults;
use quarry::recipe::{load_recipe, Recipe};
use quarry::registry::{ExtractorFactory, ProcessorFactory, SinkFactory};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let paths: Vec<String> = env::args().skip(1).collect();
    if paths.is_empty() {
        eprintln!("Usage: quarry <recipe.yaml> [recipe.yaml ...]");
        eprintln!("Example: quarry recipes/postgres.yaml recipes/kafka.yaml");
        return ExitCode::FAILURE;
    }

    let mut extractors = ExtractorFactory::default();
    let mut processors = ProcessorFactory::default();
    let mut sinks = SinkFactory::default();
    if let Err(err) = register_defaults(&mut extractors, &mut processors, &mut sinks) {
        eprintln!("failed to register built-in plugins: {err}");
        return ExitCode::FAILURE;
    }

    let agent = Agent::new(AgentConfig {
        extractors,
        processors,
        sinks,
        ..AgentConfig::default()
    });

    let mut recipes: Vec<Recipe> = Vec::with_capacity(paths.len());
    let mut invalid = false;
    for path in &paths {
        match load_recipe(path) {
            Ok(recipe) => {
                let errors = agent.validate(&recipe);
                if errors.is_empty() {
                    recipes.push(recipe);
                } else {
                    invalid = true;
                    eprintln!("recipe \"{path}\" is invalid:");
                    for error in errors {
                        eprintln!("  - {error}");
                    }
                }
            }
            Err(err) => {
                invalid = true;
                eprintln!("{err}");
            }
        }
    }
    if invalid {
        return ExitCode::FAILURE;
    }

    let runs = agent.run_multiple(recipes).await;

    let mut failed = false;
    for run in &runs {
        if run.success {
            println!(
                "OK   {}: {} records in {}ms",
                run.recipe.name, run.record_count, run.duration_ms
            );
        } else {
            failed = true;
            let reason = run
                .error
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default();
            println!("FAIL {}: {}", run.recipe.name, reason);
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
