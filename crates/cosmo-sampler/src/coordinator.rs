//! Master/worker evaluation pool.
//!
//! The master owns sampler state and the output sink and hands parameter
//! vectors to workers over channels. Each worker builds its own pipeline,
//! serves evaluation jobs until told to stop and never sees anything else.
//! Batches are blocking: the master waits for every reply before returning
//! and results come back in submission order.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use cosmo_core::{evaluate_checked, CosmoError, ErrorInfo, Evaluation, Pipeline};
use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Builds an independent pipeline instance; called once on every worker.
pub type PipelineFactory = Arc<dyn Fn() -> Result<Box<dyn Pipeline>, CosmoError> + Send + Sync>;

/// Aggregate evaluation counters kept on the master.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationStats {
    pub evaluations: u64,
    pub failures: u64,
    pub panics: u64,
    pub batches: u64,
}

enum Job {
    Evaluate {
        batch: u64,
        index: usize,
        vector: Vec<f64>,
    },
    Stop,
}

enum Reply {
    Ready {
        rank: usize,
    },
    Done {
        batch: u64,
        index: usize,
        result: Result<Evaluation, CosmoError>,
        panicked: bool,
    },
    Exited {
        rank: usize,
        error: Option<CosmoError>,
    },
}

struct WorkerPool {
    jobs: Sender<Job>,
    replies: Receiver<Reply>,
    handles: Vec<JoinHandle<()>>,
}

/// Single entry point for posterior evaluations.
pub struct Coordinator {
    pipeline: Box<dyn Pipeline>,
    pool: Option<WorkerPool>,
    workers: usize,
    stats: EvaluationStats,
    next_batch: u64,
}

impl Coordinator {
    /// Inline evaluation on the calling thread.
    pub fn serial(pipeline: Box<dyn Pipeline>) -> Self {
        Self {
            pipeline,
            pool: None,
            workers: 0,
            stats: EvaluationStats::default(),
            next_batch: 0,
        }
    }

    /// Starts `workers` worker threads, each building its own pipeline.
    ///
    /// Zero workers falls back to [`serial`](Self::serial). Fails if any
    /// worker cannot build its pipeline.
    pub fn pooled(factory: PipelineFactory, workers: usize) -> Result<Self, CosmoError> {
        let pipeline = factory()?;
        if workers == 0 {
            return Ok(Self::serial(pipeline));
        }
        let (job_tx, job_rx) = unbounded::<Job>();
        let (reply_tx, reply_rx) = unbounded::<Reply>();
        let mut handles = Vec::with_capacity(workers);
        for rank in 0..workers {
            let jobs = job_rx.clone();
            let replies = reply_tx.clone();
            let factory = Arc::clone(&factory);
            let handle = thread::Builder::new()
                .name(format!("cosmo-worker-{rank}"))
                .spawn(move || worker_loop(rank, factory, jobs, replies))
                .map_err(|err| {
                    CosmoError::Worker(
                        ErrorInfo::new("worker-spawn", "failed to start worker thread")
                            .with_context("rank", rank.to_string())
                            .with_hint(err.to_string()),
                    )
                })?;
            handles.push(handle);
        }
        drop(reply_tx);
        let mut coordinator = Self {
            pipeline,
            pool: Some(WorkerPool {
                jobs: job_tx,
                replies: reply_rx,
                handles,
            }),
            workers,
            stats: EvaluationStats::default(),
            next_batch: 0,
        };
        coordinator.await_ready()?;
        info!(workers, "worker pool started");
        Ok(coordinator)
    }

    /// Number of pooled workers, zero when serial.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// The master's own pipeline instance, used for metadata and inline calls.
    pub fn pipeline(&self) -> &dyn Pipeline {
        self.pipeline.as_ref()
    }

    pub fn stats(&self) -> EvaluationStats {
        self.stats
    }

    /// Evaluates one vector inline on the master.
    pub fn evaluate(&mut self, vector: &[f64]) -> Result<Evaluation, CosmoError> {
        let evaluation = evaluate_checked(self.pipeline.as_ref(), vector)?;
        self.tally(&evaluation, false);
        Ok(evaluation)
    }

    /// Evaluates every vector and returns results in submission order.
    pub fn evaluate_batch(&mut self, vectors: &[Vec<f64>]) -> Result<Vec<Evaluation>, CosmoError> {
        self.stats.batches += 1;
        if self.pool.is_none() {
            let mut results = Vec::with_capacity(vectors.len());
            for vector in vectors {
                results.push(self.evaluate(vector)?);
            }
            return Ok(results);
        }
        let batch = self.next_batch;
        self.next_batch += 1;
        let outcome = self.run_pooled_batch(batch, vectors);
        if let Err(CosmoError::Worker(_)) = &outcome {
            self.shutdown();
        }
        outcome
    }

    fn run_pooled_batch(
        &mut self,
        batch: u64,
        vectors: &[Vec<f64>],
    ) -> Result<Vec<Evaluation>, CosmoError> {
        let Some(pool) = &self.pool else {
            return Err(pool_closed());
        };
        for (index, vector) in vectors.iter().enumerate() {
            pool.jobs
                .send(Job::Evaluate {
                    batch,
                    index,
                    vector: vector.clone(),
                })
                .map_err(|_| pool_closed())?;
        }
        debug!(batch, size = vectors.len(), "batch dispatched");
        let mut results: Vec<Option<Evaluation>> = vec![None; vectors.len()];
        let mut outcomes = Vec::with_capacity(vectors.len());
        let mut first_error = None;
        let mut pending = vectors.len();
        while pending > 0 {
            let reply = pool.replies.recv().map_err(|_| pool_closed())?;
            match reply {
                Reply::Done {
                    batch: done_batch,
                    index,
                    result,
                    panicked,
                } if done_batch == batch => {
                    pending -= 1;
                    match result {
                        Ok(evaluation) => {
                            outcomes.push((evaluation.failed, panicked));
                            results[index] = Some(evaluation);
                        }
                        Err(err) => {
                            first_error.get_or_insert(err);
                        }
                    }
                }
                Reply::Done { .. } | Reply::Ready { .. } => {}
                Reply::Exited { rank, error } => {
                    let mut info = ErrorInfo::new("worker-exited", "worker exited during a batch")
                        .with_context("rank", rank.to_string())
                        .with_context("batch", batch.to_string());
                    if let Some(error) = error {
                        info = info.with_hint(error.to_string());
                    }
                    return Err(CosmoError::Worker(info));
                }
            }
        }
        for (failed, panicked) in outcomes {
            self.stats.evaluations += 1;
            self.stats.failures += u64::from(failed);
            self.stats.panics += u64::from(panicked);
        }
        if let Some(err) = first_error {
            return Err(err);
        }
        results
            .into_iter()
            .map(|slot| slot.ok_or_else(pool_closed))
            .collect()
    }

    fn await_ready(&mut self) -> Result<(), CosmoError> {
        let Some(pool) = &self.pool else {
            return Ok(());
        };
        let mut ready = 0;
        let mut failure = None;
        while ready < self.workers {
            match pool.replies.recv() {
                Ok(Reply::Ready { rank }) => {
                    ready += 1;
                    debug!(rank, "worker ready");
                }
                Ok(Reply::Exited { rank, error }) => {
                    let info = ErrorInfo::new("worker-startup", "worker failed to start")
                        .with_context("rank", rank.to_string());
                    failure = Some(match error {
                        Some(error) => CosmoError::Worker(info.with_hint(error.to_string())),
                        None => CosmoError::Worker(info),
                    });
                    break;
                }
                Ok(Reply::Done { .. }) => {}
                Err(_) => {
                    failure = Some(pool_closed());
                    break;
                }
            }
        }
        match failure {
            Some(err) => {
                self.shutdown();
                Err(err)
            }
            None => Ok(()),
        }
    }

    fn tally(&mut self, evaluation: &Evaluation, panicked: bool) {
        self.stats.evaluations += 1;
        self.stats.failures += u64::from(evaluation.failed);
        self.stats.panics += u64::from(panicked);
    }

    /// Stops and joins every worker. Later calls do nothing.
    pub fn shutdown(&mut self) {
        let Some(pool) = self.pool.take() else {
            return;
        };
        for _ in 0..pool.handles.len() {
            // workers that already exited have dropped their receiver
            let _ = pool.jobs.send(Job::Stop);
        }
        drop(pool.jobs);
        for handle in pool.handles {
            if handle.join().is_err() {
                warn!("worker thread ended with a panic");
            }
        }
        if self.stats.failures > 0 {
            warn!(
                failures = self.stats.failures,
                panics = self.stats.panics,
                evaluations = self.stats.evaluations,
                "pipeline evaluations failed during the run"
            );
        }
        info!(workers = self.workers, "worker pool stopped");
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Sends `Exited` when the worker's service loop ends for any reason.
struct ExitNotice {
    rank: usize,
    replies: Sender<Reply>,
    error: Option<CosmoError>,
}

impl Drop for ExitNotice {
    fn drop(&mut self) {
        let _ = self.replies.send(Reply::Exited {
            rank: self.rank,
            error: self.error.take(),
        });
    }
}

/// Service loop of worker `rank`; the rank is fixed at spawn.
fn worker_loop(rank: usize, factory: PipelineFactory, jobs: Receiver<Job>, replies: Sender<Reply>) {
    let mut notice = ExitNotice {
        rank,
        replies: replies.clone(),
        error: None,
    };
    let pipeline = match factory() {
        Ok(pipeline) => pipeline,
        Err(err) => {
            notice.error = Some(err);
            return;
        }
    };
    let extra_count = pipeline.extra_outputs().len();
    if replies.send(Reply::Ready { rank }).is_err() {
        return;
    }
    while let Ok(job) = jobs.recv() {
        let (batch, index, vector) = match job {
            Job::Evaluate {
                batch,
                index,
                vector,
            } => (batch, index, vector),
            Job::Stop => break,
        };
        let attempt = panic::catch_unwind(AssertUnwindSafe(|| {
            evaluate_checked(pipeline.as_ref(), &vector)
        }));
        let (result, panicked) = match attempt {
            Ok(result) => (result, false),
            Err(_) => (Ok(Evaluation::rejected(extra_count)), true),
        };
        let reply = Reply::Done {
            batch,
            index,
            result,
            panicked,
        };
        if replies.send(reply).is_err() {
            break;
        }
    }
    drop(notice);
}

fn pool_closed() -> CosmoError {
    CosmoError::Worker(ErrorInfo::new(
        "pool-closed",
        "worker pool is no longer available",
    ))
}
