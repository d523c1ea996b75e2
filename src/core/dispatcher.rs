//! Work dispatcher
//!
//! A fixed pool of worker threads pulling from a bounded task channel.
//! Results come back on a second channel in completion order. The stream
//! ends once the task source is exhausted and every worker has exited.

use crate::config::{resolve_threads, MAX_WORKERS};
use crate::error::{ManifestError, Result};
use crossbeam::channel::{bounded, Receiver};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Default capacity of the task and result channels, per worker
const QUEUE_SLOTS_PER_WORKER: usize = 64;

/// Bounded channels allocate every slot up front
const MAX_QUEUE_SIZE: usize = MAX_WORKERS * QUEUE_SLOTS_PER_WORKER;

/// Bounded worker pool configuration
#[derive(Debug, Clone)]
pub struct Dispatcher {
    /// Number of worker threads
    workers: usize,
    /// Channel capacity
    queue_size: usize,
    /// Shutdown flag shared with the feeder and workers
    shutdown: Arc<AtomicBool>,
}

impl Dispatcher {
    /// Create a dispatcher with `worker_count` workers (0 = hardware concurrency).
    ///
    /// Callers validate the count against `MAX_WORKERS`; this only keeps the
    /// channel capacity bounded.
    pub fn new(worker_count: usize) -> Self {
        let workers = resolve_threads(worker_count);
        Self {
            workers,
            queue_size: workers
                .saturating_mul(QUEUE_SLOTS_PER_WORKER)
                .min(MAX_QUEUE_SIZE),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Override the channel capacity
    pub fn with_queue_size(mut self, queue_size: usize) -> Self {
        self.queue_size = queue_size.clamp(1, MAX_QUEUE_SIZE);
        self
    }

    /// Number of workers that will be spawned
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Get the shutdown flag for external control
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Stop handing out tasks; in-flight results are still delivered.
    ///
    /// The flag is shared by every dispatch on this instance and stays set:
    /// later dispatches yield nothing until [`Dispatcher::reset`] is called.
    pub fn cancel(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Clear a previous cancellation so the dispatcher can be reused
    pub fn reset(&self) {
        self.shutdown.store(false, Ordering::SeqCst);
    }

    /// Check if shutdown was signaled
    pub fn is_cancelled(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Run `job` over every task on the worker pool.
    ///
    /// Each task is received by exactly one worker. Results are yielded as
    /// they complete, not in submission order.
    pub fn dispatch<T, R, I, F>(&self, tasks: I, job: F) -> Result<ResultStream<R>>
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> R + Send + Sync + 'static,
    {
        let (task_tx, task_rx) = bounded::<T>(self.queue_size);
        let (result_tx, result_rx) = bounded::<R>(self.queue_size);
        let job = Arc::new(job);
        let mut handles = Vec::new();

        for worker_id in 0..self.workers {
            let task_rx = task_rx.clone();
            let result_tx = result_tx.clone();
            let job = Arc::clone(&job);
            let shutdown = Arc::clone(&self.shutdown);

            let handle = thread::Builder::new()
                .name(format!("xxmanifest-worker-{}", worker_id))
                .spawn(move || {
                    tracing::debug!("Worker {} started", worker_id);
                    let mut processed = 0u64;

                    for task in task_rx.iter() {
                        if shutdown.load(Ordering::SeqCst) {
                            break;
                        }
                        processed += 1;
                        if result_tx.send(job(task)).is_err() {
                            // Consumer went away
                            break;
                        }
                    }

                    tracing::debug!("Worker {} shutting down after {} tasks", worker_id, processed);
                })
                .map_err(|e| ManifestError::ThreadPoolError(e.to_string()))?;

            handles.push(handle);
        }

        // Only workers hold these now; the stream ends when the last one exits
        drop(task_rx);
        drop(result_tx);

        let shutdown = Arc::clone(&self.shutdown);
        let tasks = tasks.into_iter();
        let feeder = thread::Builder::new()
            .name("xxmanifest-feeder".to_string())
            .spawn(move || {
                let mut submitted = 0u64;
                for task in tasks {
                    if shutdown.load(Ordering::SeqCst) || task_tx.send(task).is_err() {
                        break;
                    }
                    submitted += 1;
                }
                tracing::debug!("Feeder done after {} tasks", submitted);
            })
            .map_err(|e| ManifestError::ThreadPoolError(e.to_string()))?;

        handles.push(feeder);

        Ok(ResultStream {
            results: Some(result_rx),
            handles,
        })
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(0)
    }
}

/// Results of a dispatch, in completion order.
///
/// Dropping the stream early disconnects the workers and joins every thread.
pub struct ResultStream<R> {
    results: Option<Receiver<R>>,
    handles: Vec<JoinHandle<()>>,
}

impl<R> ResultStream<R> {
    /// Results ready right now, without blocking
    pub fn pending(&self) -> usize {
        self.results.as_ref().map(|rx| rx.len()).unwrap_or(0)
    }

    fn shutdown(&mut self) {
        // Disconnect first so workers blocked on send can exit
        self.results.take();
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                tracing::error!("dispatcher thread panicked");
            }
        }
    }
}

impl<R> Iterator for ResultStream<R> {
    type Item = R;

    fn next(&mut self) -> Option<R> {
        let next = self.results.as_ref()?.recv().ok();
        if next.is_none() {
            self.shutdown();
        }
        next
    }
}

impl<R> Drop for ResultStream<R> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
