//! Single admission point for the completion engine.
//!
//! Requests go through a bounded queue drained by dedicated workers. Each worker owns
//! one engine instance outright, so no engine is ever called from two places at once.
//! With one worker, every generation in the process is serialized.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{Mutex, mpsc, oneshot};
use tracing::{debug, error, info, warn};

use chatforge_core::{CompletionEngine, EngineFailure, GenerationRequest, TokenId};

/// Default number of requests that may wait for a worker.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

struct EngineJob {
    request: GenerationRequest,
    reply: oneshot::Sender<anyhow::Result<Vec<TokenId>>>,
}

#[derive(Clone)]
pub struct EngineQueue {
    tx: mpsc::Sender<EngineJob>,
    live_workers: Arc<AtomicUsize>,
}

impl EngineQueue {
    /// Start one worker task per engine. Must be called inside a Tokio runtime.
    pub fn spawn(engines: Vec<Box<dyn CompletionEngine>>, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));
        let live_workers = Arc::new(AtomicUsize::new(engines.len()));

        for (worker_id, engine) in engines.into_iter().enumerate() {
            let rx = Arc::clone(&rx);
            let live = Arc::clone(&live_workers);
            tokio::spawn(async move {
                let _alive = LiveWorker(live);
                run_worker(worker_id, engine, rx).await;
            });
        }

        info!(
            workers = live_workers.load(Ordering::SeqCst),
            capacity, "Engine queue started"
        );

        Self { tx, live_workers }
    }

    /// Whether at least one worker is alive to serve requests.
    pub fn is_running(&self) -> bool {
        !self.tx.is_closed() && self.live_workers.load(Ordering::SeqCst) > 0
    }

    pub fn worker_count(&self) -> usize {
        self.live_workers.load(Ordering::SeqCst)
    }

    /// Queue a request and wait for its result.
    ///
    /// Waits for queue space when all workers are busy and the queue is full.
    pub async fn submit(&self, request: GenerationRequest) -> Result<Vec<TokenId>, EngineFailure> {
        if self.live_workers.load(Ordering::SeqCst) == 0 {
            return Err(EngineFailure::Unavailable);
        }

        let (reply, response) = oneshot::channel();
        self.tx
            .send(EngineJob { request, reply })
            .await
            .map_err(|_| EngineFailure::Unavailable)?;

        match response.await {
            Ok(Ok(tokens)) => Ok(tokens),
            Ok(Err(e)) => Err(EngineFailure::Failed(format!("{e:#}"))),
            Err(_) => Err(EngineFailure::Unavailable),
        }
    }
}

/// Decrements the live-worker count when the worker task ends, panics included.
struct LiveWorker(Arc<AtomicUsize>);

impl Drop for LiveWorker {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

async fn run_worker(
    worker_id: usize,
    mut engine: Box<dyn CompletionEngine>,
    rx: Arc<Mutex<mpsc::Receiver<EngineJob>>>,
) {
    info!(worker_id, engine = engine.name(), "Engine worker started");

    loop {
        // Only idle workers wait on the lock, so holding it across recv is fine.
        let job = { rx.lock().await.recv().await };
        let Some(job) = job else { break };

        if job.reply.is_closed() {
            // Caller gave up (timeout) while the job was queued.
            debug!(worker_id, session_id = %job.request.session_id, "Skipping abandoned request");
            continue;
        }

        debug!(
            worker_id,
            session_id = %job.request.session_id,
            prompt_len = job.request.prompt_len(),
            "Running generation"
        );

        let result = engine.generate(&job.request).await;
        if let Err(e) = &result {
            error!(worker_id, engine = engine.name(), error = %e, "Generation failed");
        }
        if job.reply.send(result).is_err() {
            warn!(worker_id, "Caller dropped before generation finished");
        }
    }

    info!(worker_id, "Engine worker stopped");
}
