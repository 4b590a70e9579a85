//! Isolated, stateless task execution.
//!
//! [`handle`] turns one [`Request`] into one [`Response`] on the calling
//! thread. [`Engine::dispatch`] runs the same handler on a fresh thread, moving
//! the request in and streaming [`Message`]s back over a channel, so several
//! tasks can run side by side without sharing anything mutable.
//!
//! ```
//! use tabstat::worker::{Engine, Request};
//!
//! let request = Request::from_json(r#"{
//!     "operation": "ingest-paste",
//!     "payload": {"text": "a,b\n1,2\n"}
//! }"#)?;
//! let response = Engine::default().dispatch(request).wait();
//! assert!(response.ok);
//! assert_eq!(response.data.unwrap()["count"], 1);
//! # Ok::<(), tabstat::error::EngineError>(())
//! ```

pub mod message;

pub use message::{Message, Request, Response};

use crate::config::EngineConfig;
use crate::error::Result;
use crate::ingest::{self, Progress};
use crate::profiling::{self, ProfileOptions};
use crate::{hypothesis, pipeline};
use crossbeam_channel::Receiver;
use serde_json::Value;
use std::sync::Arc;

/// Error text of a task whose thread died before answering.
pub const PANIC_MESSAGE: &str = "worker task panicked";

/// Runs `request` to completion on the current thread.
pub fn handle(request: Request, config: &EngineConfig, on_progress: &mut dyn FnMut(Progress)) -> Response {
    let operation = request.operation();
    let start = std::time::Instant::now();

    match execute(request, config, on_progress) {
        Ok(data) => {
            tracing::info!("{operation} finished in {:.3}s", start.elapsed().as_secs_f64());
            Response::success(data)
        }
        Err(e) => {
            tracing::warn!("{operation} failed: {e}");
            Response::failure(e)
        }
    }
}

fn execute(request: Request, config: &EngineConfig, on_progress: &mut dyn FnMut(Progress)) -> Result<Value> {
    let data = match request {
        Request::IngestFile(p) => {
            let ds = ingest::ingest_file(
                &p.name,
                p.content_type.as_deref(),
                &p.bytes,
                config.csv_chunk_bytes,
                on_progress,
            )?;
            serde_json::to_value(ds)?
        }
        Request::IngestPaste(p) => serde_json::to_value(ingest::ingest_paste(&p.text, p.html.as_deref())?)?,
        Request::TransformApply(p) => {
            let (out, _report) = pipeline::run(&p.rows, &p.recipe);
            serde_json::to_value(out)?
        }
        Request::TransformExport(p) => serde_json::to_value(pipeline::to_csv(&p.rows, p.name.as_deref())?)?,
        Request::Profile(p) => {
            let options = ProfileOptions {
                sample_size: p.sample_size.unwrap_or(config.sample_size),
                numeric_hint: p.numeric_hint,
            };
            serde_json::to_value(profiling::profile(&p.rows, &options))?
        }
        Request::TestTtest(p) => serde_json::to_value(hypothesis::ttest(&p.rows, &p.test)?)?,
        Request::TestNormality(p) => serde_json::to_value(hypothesis::jarque_bera(&p.rows, &p.test)?)?,
        Request::TestLevene(p) => serde_json::to_value(hypothesis::levene(&p.rows, &p.test)?)?,
    };
    Ok(data)
}

/// Spawns one thread per task.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: Arc<EngineConfig>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Moves `request` to a new worker thread and returns immediately.
    pub fn dispatch(&self, request: Request) -> TaskHandle {
        let operation = request.operation();
        self.spawn_task(operation, move |config, on_progress| {
            handle(request, config, on_progress)
        })
    }

    fn spawn_task<F>(&self, operation: &'static str, task: F) -> TaskHandle
    where
        F: FnOnce(&EngineConfig, &mut dyn FnMut(Progress)) -> Response + Send + 'static,
    {
        let (tx, rx) = crossbeam_channel::unbounded();
        let config = Arc::clone(&self.config);
        let fallback = tx.clone();

        let spawned = std::thread::Builder::new()
            .name(format!("tabstat-{operation}"))
            .spawn(move || {
                let progress_tx = tx.clone();
                let response = task(&config, &mut |progress| {
                    // a closed channel means the caller abandoned the task
                    let _ = progress_tx.send(Message::Progress(progress));
                });
                if tx.send(Message::Done(response)).is_err() {
                    tracing::debug!("{operation} result discarded; task was abandoned");
                }
            });

        if let Err(e) = spawned {
            tracing::error!("Failed to spawn worker for {operation}: {e}");
            let _ = fallback.send(Message::Done(Response::failure(format!(
                "failed to start worker: {e}"
            ))));
        }

        TaskHandle {
            operation,
            receiver: rx,
        }
    }
}

/// Receiving end of a dispatched task.
#[derive(Debug)]
pub struct TaskHandle {
    operation: &'static str,
    receiver: Receiver<Message>,
}

impl TaskHandle {
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// Raw message stream: zero or more `Progress`, then one `Done`.
    pub fn receiver(&self) -> &Receiver<Message> {
        &self.receiver
    }

    /// Blocks until the task answers.
    pub fn wait(self) -> Response {
        self.wait_with(|_| {})
    }

    /// Blocks until the task answers, passing progress along on the way.
    pub fn wait_with(self, mut on_progress: impl FnMut(Progress)) -> Response {
        for message in self.receiver.iter() {
            match message {
                Message::Progress(progress) => on_progress(progress),
                Message::Done(response) => return response,
            }
        }
        // every sender is gone without a final message: the thread unwound
        tracing::error!("{} worker exited without a response", self.operation);
        Response::failure(PANIC_MESSAGE)
    }

    /// Stops listening. The thread runs to completion and its result is dropped.
    pub fn abandon(self) {
        tracing::debug!("Abandoning {}", self.operation);
        drop(self.receiver);
    }
}
