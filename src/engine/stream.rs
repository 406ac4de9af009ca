use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::errors::{panic_message, RunError};
use crate::models::Record;
use crate::traits::Emitter;

/// Capacity of the push channel. Near-rendezvous: a fast extractor gets
/// held back as soon as the dispatcher falls behind, so a slow sink can
/// never make the process buffer unboundedly.
const PUSH_BUFFER: usize = 1;

type Middleware = Box<dyn FnMut(Record) -> BoxFuture<'static, Result<Option<Record>, RunError>> + Send>;
type CloseHook = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

struct Subscriber {
    tx: mpsc::Sender<Record>,
    delivery: JoinHandle<Result<(), RunError>>,
}

/// Per-run conduit between one extractor, the processor chain, and the
/// subscribed sinks.
///
/// Setup (`set_middleware`, `subscribe`, `on_close`, `emitter`) happens
/// strictly before [`Stream::broadcast`], which consumes the stream and
/// drives it to completion. Records flow through the middleware chain in
/// push order, one at a time; each subscriber runs its own delivery task
/// and sees records in push order, but subscribers are not synchronized
/// with each other.
///
/// The stream closes when every emitter has been dropped, or early when
/// a middleware reports a terminal error. Either way remaining batches
/// are flushed, close hooks run exactly once, and `broadcast` returns.
pub struct Stream {
    push_tx: mpsc::Sender<Record>,
    push_rx: mpsc::Receiver<Record>,
    middleware: Vec<Middleware>,
    subscribers: Vec<Subscriber>,
    close_hooks: Vec<CloseHook>,
}

impl Stream {
    pub fn new() -> Self {
        let (push_tx, push_rx) = mpsc::channel(PUSH_BUFFER);
        Self {
            push_tx,
            push_rx,
            middleware: Vec::new(),
            subscribers: Vec::new(),
            close_hooks: Vec::new(),
        }
    }

    /// Hands out a push handle for the extractor.
    pub fn emitter(&self) -> Emitter {
        Emitter {
            tx: self.push_tx.clone(),
        }
    }

    /// Appends a transformation to the middleware chain. The chain runs
    /// in insertion order; `Ok(None)` drops the record, an error becomes
    /// the stream's terminal error.
    pub fn set_middleware<F, Fut>(&mut self, middleware: F)
    where
        F: FnMut(Record) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Option<Record>, RunError>> + Send + 'static,
    {
        let mut middleware = middleware;
        self.middleware
            .push(Box::new(move |record| middleware(record).boxed()));
    }

    /// Registers a batch consumer with its own delivery task.
    ///
    /// The handler receives `batch_size` records at a time (fewer on the
    /// final flush); batch *n+1* is only assembled after batch *n*'s
    /// handler returned. A handler error becomes the stream's terminal
    /// error. Must be called within a tokio runtime.
    pub fn subscribe<F, Fut>(&mut self, handler: F, batch_size: usize)
    where
        F: FnMut(Vec<Record>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), RunError>> + Send + 'static,
    {
        let batch_size = batch_size.max(1);
        let (tx, rx) = mpsc::channel(batch_size);
        let delivery = tokio::spawn(deliver(rx, handler, batch_size));
        self.subscribers.push(Subscriber { tx, delivery });
    }

    /// Registers a hook run during close, after every subscriber has
    /// drained and before `broadcast` returns.
    pub fn on_close<F, Fut>(&mut self, hook: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.close_hooks.push(Box::new(move || hook().boxed()));
    }

    /// Drives the stream until it closes and everything is flushed.
    ///
    /// Blocks reading the push channel, applies the middleware chain,
    /// and fans each surviving record out to every subscriber. Returns
    /// the terminal middleware error if one occurred, otherwise the
    /// first subscriber error, otherwise `Ok`.
    pub async fn broadcast(mut self) -> Result<(), RunError> {
        // Only emitters keep the push channel open from here on.
        drop(self.push_tx);

        let mut terminal: Option<RunError> = None;

        'recv: while let Some(record) = self.push_rx.recv().await {
            let mut current = record;
            for middleware in self.middleware.iter_mut() {
                match middleware(current).await {
                    Ok(Some(next)) => current = next,
                    Ok(None) => continue 'recv,
                    Err(err) => {
                        terminal = Some(err);
                        break 'recv;
                    }
                }
            }

            for subscriber in &self.subscribers {
                if subscriber.tx.send(current.clone()).await.is_err() {
                    // The delivery task bailed out; its error is
                    // collected below during the drain.
                    break 'recv;
                }
            }
        }

        // Unblock any emitter still pushing.
        self.push_rx.close();

        for Subscriber { tx, delivery } in self.subscribers {
            drop(tx);
            match delivery.await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    if terminal.is_none() {
                        terminal = Some(err);
                    }
                }
                Err(join_err) if join_err.is_panic() => {
                    if terminal.is_none() {
                        terminal = Some(RunError::Panicked {
                            context: "subscriber".into(),
                            message: panic_message(join_err.into_panic()),
                        });
                    }
                }
                Err(_) => {}
            }
        }

        for hook in self.close_hooks {
            hook().await;
        }

        match terminal {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Default for Stream {
    fn default() -> Self {
        Self::new()
    }
}

async fn deliver<F, Fut>(
    mut rx: mpsc::Receiver<Record>,
    mut handler: F,
    batch_size: usize,
) -> Result<(), RunError>
where
    F: FnMut(Vec<Record>) -> Fut + Send,
    Fut: Future<Output = Result<(), RunError>> + Send,
{
    let mut batch = Vec::with_capacity(batch_size);
    while let Some(record) = rx.recv().await {
        batch.push(record);
        if batch.len() >= batch_size {
            let full = std::mem::replace(&mut batch, Vec::with_capacity(batch_size));
            handler(full).await?;
        }
    }
    if !batch.is_empty() {
        handler(batch).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{Arc, Mutex};

    use crate::errors::PluginError;
    use crate::models::{Asset, Record, Resource, Table};

    fn record(urn: &str) -> Record {
        Record::new(Asset::Table(Table {
            resource: Resource {
                urn: urn.into(),
                name: urn.into(),
                ..Resource::default()
            },
            ..Table::default()
        }))
    }

    fn rename(record: Record, suffix: &str) -> Record {
        let mut asset = record.into_data();
        if let Asset::Table(table) = &mut asset {
            table.resource.urn.push_str(suffix);
        }
        Record::new(asset)
    }

    fn collecting_subscriber(
        stream: &mut Stream,
        batch_size: usize,
    ) -> Arc<Mutex<Vec<Vec<String>>>> {
        let batches: Arc<Mutex<Vec<Vec<String>>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&batches);
        stream.subscribe(
            move |batch: Vec<Record>| {
                let sink = Arc::clone(&sink);
                async move {
                    let urns = batch.iter().map(|r| r.urn().to_string()).collect();
                    sink.lock().unwrap().push(urns);
                    Ok(())
                }
            },
            batch_size,
        );
        batches
    }

    async fn push_all(stream: &Stream, count: usize) {
        let emitter = stream.emitter();
        let records: Vec<Record> = (0..count).map(|i| record(&format!("r{i}"))).collect();
        tokio::spawn(async move {
            for r in records {
                if emitter.emit(r).await.is_err() {
                    break;
                }
            }
        });
    }

    #[tokio::test]
    async fn preserves_push_order_per_subscriber() {
        let mut stream = Stream::new();
        let batches = collecting_subscriber(&mut stream, 1);

        push_all(&stream, 10).await;
        stream.broadcast().await.unwrap();

        let seen: Vec<String> = batches.lock().unwrap().concat();
        let expected: Vec<String> = (0..10).map(|i| format!("r{i}")).collect();
        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn batches_records_with_short_final_flush() {
        let mut stream = Stream::new();
        let batches = collecting_subscriber(&mut stream, 2);

        push_all(&stream, 5).await;
        stream.broadcast().await.unwrap();

        let sizes: Vec<usize> = batches.lock().unwrap().iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[tokio::test]
    async fn exact_multiple_has_no_partial_batch() {
        let mut stream = Stream::new();
        let batches = collecting_subscriber(&mut stream, 2);

        push_all(&stream, 4).await;
        stream.broadcast().await.unwrap();

        let sizes: Vec<usize> = batches.lock().unwrap().iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![2, 2]);
    }

    #[tokio::test]
    async fn middleware_runs_in_insertion_order() {
        let mut stream = Stream::new();
        stream.set_middleware(|r| async move { Ok(Some(rename(r, "-a"))) });
        stream.set_middleware(|r| async move { Ok(Some(rename(r, "-b"))) });
        let batches = collecting_subscriber(&mut stream, 1);

        push_all(&stream, 1).await;
        stream.broadcast().await.unwrap();

        assert_eq!(batches.lock().unwrap().concat(), vec!["r0-a-b"]);
    }

    #[tokio::test]
    async fn middleware_can_drop_records() {
        let mut stream = Stream::new();
        stream.set_middleware(|r: Record| async move {
            if r.urn().ends_with('1') {
                Ok(None)
            } else {
                Ok(Some(r))
            }
        });
        let batches = collecting_subscriber(&mut stream, 1);

        push_all(&stream, 3).await;
        stream.broadcast().await.unwrap();

        assert_eq!(batches.lock().unwrap().concat(), vec!["r0", "r2"]);
    }

    #[tokio::test]
    async fn middleware_error_is_terminal() {
        let mut stream = Stream::new();
        stream.set_middleware(|r: Record| async move {
            if r.urn() == "r1" {
                Err(RunError::Processor {
                    name: "broken".into(),
                    source: PluginError::failure("bad record"),
                })
            } else {
                Ok(Some(r))
            }
        });
        let batches = collecting_subscriber(&mut stream, 1);
        let closed = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&closed);
        stream.on_close(move || async move {
            *flag.lock().unwrap() = true;
        });

        push_all(&stream, 3).await;
        let err = stream.broadcast().await.unwrap_err();

        assert!(matches!(err, RunError::Processor { ref name, .. } if name == "broken"));
        // No record after the failure point was delivered.
        let seen = batches.lock().unwrap().concat();
        assert!(seen.len() <= 1);
        assert!(!seen.contains(&"r2".to_string()));
        assert!(*closed.lock().unwrap());
    }

    #[tokio::test]
    async fn fans_out_to_every_subscriber() {
        let mut stream = Stream::new();
        let first = collecting_subscriber(&mut stream, 1);
        let second = collecting_subscriber(&mut stream, 3);

        push_all(&stream, 6).await;
        stream.broadcast().await.unwrap();

        let expected: Vec<String> = (0..6).map(|i| format!("r{i}")).collect();
        assert_eq!(first.lock().unwrap().concat(), expected);
        assert_eq!(second.lock().unwrap().concat(), expected);
    }

    #[tokio::test]
    async fn subscriber_error_surfaces_from_broadcast() {
        let mut stream = Stream::new();
        stream.subscribe(
            |_batch: Vec<Record>| async move {
                Err(RunError::Sink {
                    name: "flaky".into(),
                    source: PluginError::failure("disk full"),
                })
            },
            1,
        );

        push_all(&stream, 2).await;
        let err = stream.broadcast().await.unwrap_err();
        assert!(matches!(err, RunError::Sink { ref name, .. } if name == "flaky"));
    }

    #[tokio::test]
    async fn close_hooks_run_after_drain() {
        let mut stream = Stream::new();
        let events: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

        let log = Arc::clone(&events);
        stream.subscribe(
            move |batch: Vec<Record>| {
                let log = Arc::clone(&log);
                async move {
                    for r in &batch {
                        log.lock().unwrap().push(format!("deliver:{}", r.urn()));
                    }
                    Ok(())
                }
            },
            1,
        );
        let log = Arc::clone(&events);
        stream.on_close(move || async move {
            log.lock().unwrap().push("close".into());
        });

        push_all(&stream, 2).await;
        stream.broadcast().await.unwrap();

        assert_eq!(
            *events.lock().unwrap(),
            vec!["deliver:r0", "deliver:r1", "close"]
        );
    }

    #[tokio::test]
    async fn emit_fails_once_the_stream_shut_down() {
        let mut stream = Stream::new();
        stream.set_middleware(|_r: Record| async move {
            Err(RunError::Processor {
                name: "kill".into(),
                source: PluginError::failure("stop"),
            })
        });
        let emitter = stream.emitter();
        let broadcast = tokio::spawn(stream.broadcast());

        emitter.emit(record("r0")).await.unwrap();
        let err = broadcast.await.unwrap().unwrap_err();
        assert!(matches!(err, RunError::Processor { .. }));

        let err = emitter.emit(record("late")).await.unwrap_err();
        assert!(err.to_string().contains("closed"));
    }
}
