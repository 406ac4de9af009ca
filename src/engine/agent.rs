use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tokio::sync::Mutex;

use crate::engine::{Retrier, Stream};
use crate::errors::{panic_message, PluginError, RunError, ValidationError};
use crate::observability::messages::{
    MonitorPanicked, RunCompleted, RunFailed, RunStarted, SinkCloseFailed, SinkFailed,
    SinkRetrying, StructuredLog,
};
use crate::observability::{Monitor, NoopMonitor};
use crate::recipe::{validate_recipe, ProcessorRecipe, Recipe, SinkRecipe};
use crate::registry::{ExtractorFactory, ProcessorFactory, SinkFactory};
use crate::traits::{ConfigMap, PluginKind, Processor};

const DEFAULT_BATCH_SIZE: usize = 1;

/// Duration measurement, injectable for tests: calling the outer closure
/// starts the clock, calling the returned closure reads elapsed ms.
pub type TimerFn = Box<dyn Fn() -> Box<dyn FnOnce() -> u64 + Send> + Send + Sync>;

fn start_duration() -> Box<dyn FnOnce() -> u64 + Send> {
    let start = Instant::now();
    Box::new(move || start.elapsed().as_millis() as u64)
}

/// Summary of one recipe execution.
///
/// `record_count` counts every record emitted by the extractor,
/// regardless of whether later stages dropped or rejected it.
/// `success` holds exactly when `error` is `None`.
#[derive(Debug)]
pub struct Run {
    pub recipe: Recipe,
    pub record_count: u64,
    pub duration_ms: u64,
    pub success: bool,
    pub error: Option<RunError>,
}

/// Everything an [`Agent`] needs to run recipes.
pub struct AgentConfig {
    pub extractors: ExtractorFactory,
    pub processors: ProcessorFactory,
    pub sinks: SinkFactory,
    pub monitor: Option<Box<dyn Monitor>>,
    /// Abort the run on the first post-retry sink error instead of
    /// logging and carrying on.
    pub stop_on_sink_error: bool,
    /// Total sink write attempts per batch; zero selects the default.
    pub max_retries: usize,
    pub retry_initial_interval: Option<Duration>,
    pub timer_fn: Option<TimerFn>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            extractors: ExtractorFactory::default(),
            processors: ProcessorFactory::default(),
            sinks: SinkFactory::default(),
            monitor: None,
            stop_on_sink_error: false,
            max_retries: 0,
            retry_initial_interval: None,
            timer_fn: None,
        }
    }
}

/// Runs recipes against the registered plugins.
pub struct Agent {
    extractors: ExtractorFactory,
    processors: ProcessorFactory,
    sinks: SinkFactory,
    monitor: Box<dyn Monitor>,
    retrier: Retrier,
    stop_on_sink_error: bool,
    timer_fn: TimerFn,
}

impl Agent {
    pub fn new(config: AgentConfig) -> Self {
        Self {
            extractors: config.extractors,
            processors: config.processors,
            sinks: config.sinks,
            monitor: config
                .monitor
                .unwrap_or_else(|| Box::new(NoopMonitor)),
            retrier: Retrier::new(config.max_retries, config.retry_initial_interval),
            stop_on_sink_error: config.stop_on_sink_error,
            timer_fn: config.timer_fn.unwrap_or_else(|| Box::new(start_duration)),
        }
    }

    /// Pre-flight check of a recipe against the registered plugins.
    ///
    /// Collects every finding instead of stopping at the first: one
    /// entry per structural problem, unresolvable plugin name, and
    /// rejected plugin config.
    pub fn validate(&self, recipe: &Recipe) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if let Err(structural) = validate_recipe(recipe) {
            errors.extend(structural);
        }

        let source = recipe.source.kind.trim();
        if !source.is_empty() {
            match self.extractors.get(source) {
                Ok(extractor) => {
                    if let Err(source_err) = extractor.validate(&recipe.source.config) {
                        errors.push(ValidationError::InvalidConfig {
                            kind: PluginKind::Extractor,
                            name: source.to_string(),
                            source: source_err,
                        });
                    }
                }
                Err(_) => errors.push(ValidationError::PluginNotFound {
                    kind: PluginKind::Extractor,
                    name: source.to_string(),
                }),
            }
        }

        for pr in &recipe.processors {
            if pr.name.trim().is_empty() {
                continue;
            }
            match self.processors.get(&pr.name) {
                Ok(processor) => {
                    if let Err(source_err) = processor.validate(&pr.config) {
                        errors.push(ValidationError::InvalidConfig {
                            kind: PluginKind::Processor,
                            name: pr.name.clone(),
                            source: source_err,
                        });
                    }
                }
                Err(_) => errors.push(ValidationError::PluginNotFound {
                    kind: PluginKind::Processor,
                    name: pr.name.clone(),
                }),
            }
        }

        for sr in &recipe.sinks {
            if sr.name.trim().is_empty() {
                continue;
            }
            match self.sinks.get(&sr.name) {
                Ok(sink) => {
                    if let Err(source_err) = sink.validate(&sr.config) {
                        errors.push(ValidationError::InvalidConfig {
                            kind: PluginKind::Sink,
                            name: sr.name.clone(),
                            source: source_err,
                        });
                    }
                }
                Err(_) => errors.push(ValidationError::PluginNotFound {
                    kind: PluginKind::Sink,
                    name: sr.name.clone(),
                }),
            }
        }

        errors
    }

    /// Executes one recipe end to end and returns its summary.
    ///
    /// Never panics and never returns early without reporting: the
    /// monitor hook is invoked exactly once per call, and the outcome is
    /// logged, whatever happened inside the pipeline.
    pub async fn run(&self, recipe: Recipe) -> Run {
        RunStarted {
            recipe: &recipe.name,
        }
        .log();
        let finish = (self.timer_fn)();
        let record_count = Arc::new(AtomicU64::new(0));

        let error = self.execute(&recipe, &record_count).await.err();
        let run = Run {
            recipe,
            record_count: record_count.load(Ordering::Relaxed),
            duration_ms: finish(),
            success: error.is_none(),
            error,
        };
        self.finish_run(&run);
        run
    }

    /// Runs every recipe concurrently; results come back in input order
    /// and a failing recipe never affects its neighbors.
    pub async fn run_multiple(&self, recipes: Vec<Recipe>) -> Vec<Run> {
        futures::future::join_all(recipes.into_iter().map(|recipe| self.run(recipe))).await
    }

    async fn execute(
        &self,
        recipe: &Recipe,
        record_count: &Arc<AtomicU64>,
    ) -> Result<(), RunError> {
        let mut stream = Stream::new();

        // Counts before the processor chain runs, so the total reflects
        // what the extractor emitted.
        let counter = Arc::clone(record_count);
        stream.set_middleware(move |record| {
            counter.fetch_add(1, Ordering::Relaxed);
            std::future::ready(Ok(Some(record)))
        });

        let mut extractor = self.extractors.get(&recipe.source.kind)?;
        extractor
            .init(&recipe.source.config)
            .await
            .map_err(|source| RunError::PluginInit {
                kind: PluginKind::Extractor,
                name: recipe.source.kind.clone(),
                source,
            })?;

        for pr in &recipe.processors {
            self.attach_processor(&mut stream, pr).await?;
        }
        for sr in &recipe.sinks {
            self.attach_sink(&mut stream, sr).await?;
        }

        let emitter = stream.emitter();
        let source_name = recipe.source.kind.clone();
        let extraction = tokio::spawn(async move { extractor.extract(emitter).await });

        let broadcast_result = stream.broadcast().await;

        let extract_result = match extraction.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(source)) => Err(RunError::Extractor {
                name: source_name,
                source,
            }),
            Err(join_err) if join_err.is_panic() => Err(RunError::Panicked {
                context: format!("extractor \"{source_name}\""),
                message: panic_message(join_err.into_panic()),
            }),
            Err(_) => Err(RunError::Extractor {
                name: source_name,
                source: PluginError::failure("extractor task was cancelled"),
            }),
        };

        broadcast_result.and(extract_result)
    }

    async fn attach_processor(
        &self,
        stream: &mut Stream,
        pr: &ProcessorRecipe,
    ) -> Result<(), RunError> {
        let mut processor = self.processors.get(&pr.name)?;
        processor
            .init(&pr.config)
            .await
            .map_err(|source| RunError::PluginInit {
                kind: PluginKind::Processor,
                name: pr.name.clone(),
                source,
            })?;

        let processor: Arc<dyn Processor> = Arc::from(processor);
        let name = pr.name.clone();
        stream.set_middleware(move |record| {
            let processor = Arc::clone(&processor);
            let name = name.clone();
            async move {
                match AssertUnwindSafe(processor.process(record)).catch_unwind().await {
                    Ok(Ok(output)) => Ok(output),
                    Ok(Err(source)) => Err(RunError::Processor { name, source }),
                    Err(payload) => Err(RunError::Panicked {
                        context: format!("processor \"{name}\""),
                        message: panic_message(payload),
                    }),
                }
            }
        });

        Ok(())
    }

    async fn attach_sink(&self, stream: &mut Stream, sr: &SinkRecipe) -> Result<(), RunError> {
        let mut sink = self.sinks.get(&sr.name)?;
        sink.init(&sr.config)
            .await
            .map_err(|source| RunError::PluginInit {
                kind: PluginKind::Sink,
                name: sr.name.clone(),
                source,
            })?;

        let sink = Arc::new(Mutex::new(sink));
        let batch_size = sink_batch_size(&sr.config);

        let handler_sink = Arc::clone(&sink);
        let name = sr.name.clone();
        let retrier = self.retrier.clone();
        let stop_on_sink_error = self.stop_on_sink_error;
        stream.subscribe(
            move |batch| {
                let sink = Arc::clone(&handler_sink);
                let name = name.clone();
                let retrier = retrier.clone();
                async move {
                    let attempt = retrier.retry(
                        || {
                            let sink = Arc::clone(&sink);
                            let batch = batch.clone();
                            async move { sink.lock().await.sink(&batch).await }
                        },
                        |error, delay| {
                            SinkRetrying {
                                sink: &name,
                                delay,
                                error,
                            }
                            .log();
                        },
                    );
                    let result = match AssertUnwindSafe(attempt).catch_unwind().await {
                        Ok(result) => result,
                        Err(payload) => Err(PluginError::failure(format!(
                            "panicked: {}",
                            panic_message(payload)
                        ))),
                    };

                    // Best-effort delivery: a bad sink is isolated from
                    // the rest of the pipeline unless the operator asked
                    // to stop on sink errors.
                    if let Err(source) = result {
                        SinkFailed {
                            sink: &name,
                            error: &source,
                        }
                        .log();
                        if stop_on_sink_error {
                            return Err(RunError::Sink { name, source });
                        }
                    }
                    Ok(())
                }
            },
            batch_size,
        );

        let close_sink = sink;
        let close_name = sr.name.clone();
        stream.on_close(move || async move {
            if let Err(error) = close_sink.lock().await.close().await {
                SinkCloseFailed {
                    sink: &close_name,
                    error: &error,
                }
                .log();
            }
        });

        Ok(())
    }

    fn finish_run(&self, run: &Run) {
        let recorded =
            std::panic::catch_unwind(AssertUnwindSafe(|| self.monitor.record_run(run)));
        if recorded.is_err() {
            MonitorPanicked {
                recipe: &run.recipe.name,
            }
            .log();
        }

        match &run.error {
            None => RunCompleted {
                recipe: &run.recipe.name,
                record_count: run.record_count,
                duration_ms: run.duration_ms,
            }
            .log(),
            Some(error) => RunFailed {
                recipe: &run.recipe.name,
                record_count: run.record_count,
                duration_ms: run.duration_ms,
                error,
            }
            .log(),
        }
    }
}

/// Batch size for a sink subscription, from the well-known
/// `batch_size` config key; anything missing or out of range falls
/// back to record-at-a-time delivery.
fn sink_batch_size(config: &ConfigMap) -> usize {
    config
        .get("batch_size")
        .and_then(serde_yaml::Value::as_u64)
        .map(|n| n as usize)
        .filter(|&n| n >= 1)
        .unwrap_or(DEFAULT_BATCH_SIZE)
}
