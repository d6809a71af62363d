//! Convergence-driven run loop.

use cosmo_core::{CosmoError, ErrorInfo};
use cosmo_output::OutputSink;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::coordinator::{Coordinator, EvaluationStats};
use crate::options::SamplerOptions;
use crate::registry::{ChainShape, SamplerRegistry};
use crate::sampler::{Sampler, SamplerContext};

/// Lifecycle of a sampler run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Configuring,
    Iterating,
    Converged,
    Failed,
}

/// What a finished run reports back to its caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub sampler: String,
    pub shape: ChainShape,
    pub state: RunState,
    pub chunks: usize,
    pub rows: usize,
    pub stats: EvaluationStats,
}

/// Drives one sampler against a coordinator and a sink.
///
/// The pool is torn down on every exit path: convergence, failure and drop.
pub struct SamplerRun {
    sampler: Box<dyn Sampler>,
    shape: ChainShape,
    options: SamplerOptions,
    coordinator: Coordinator,
    seed: u64,
    state: RunState,
    chunks: usize,
}

impl SamplerRun {
    /// Looks `name` up in `registry` and prepares an unconfigured run.
    pub fn new(
        registry: &SamplerRegistry,
        name: &str,
        options: SamplerOptions,
        coordinator: Coordinator,
        seed: u64,
    ) -> Result<Self, CosmoError> {
        let entry = registry.lookup(name)?;
        Ok(Self {
            sampler: entry.create(),
            shape: entry.shape,
            options,
            coordinator,
            seed,
            state: RunState::Configuring,
            chunks: 0,
        })
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    /// Configures the sampler; moves to `Iterating` or `Failed`.
    pub fn configure(&mut self, output: &mut dyn OutputSink) -> Result<(), CosmoError> {
        if self.state != RunState::Configuring {
            return Err(self.wrong_state("configure"));
        }
        output.set_metadata("sampler", self.sampler.name().to_owned())?;
        let mut ctx = SamplerContext {
            options: &self.options,
            coordinator: &mut self.coordinator,
            output,
            seed: self.seed,
        };
        let outcome = self.sampler.configure(&mut ctx);
        self.settle(outcome)?;
        self.state = RunState::Iterating;
        info!(sampler = self.sampler.name(), "sampler configured");
        Ok(())
    }

    /// Runs one chunk and flushes the sink.
    pub fn step(&mut self, output: &mut dyn OutputSink) -> Result<RunState, CosmoError> {
        if self.state != RunState::Iterating {
            return Err(self.wrong_state("execute_one_chunk"));
        }
        let failures_before = self.coordinator.stats().failures;
        let mut ctx = SamplerContext {
            options: &self.options,
            coordinator: &mut self.coordinator,
            output: &mut *output,
            seed: self.seed,
        };
        let outcome = self.sampler.execute_one_chunk(&mut ctx);
        self.settle(outcome)?;
        self.settle(output.flush())?;
        self.chunks += 1;
        let stats = self.coordinator.stats();
        if stats.failures > failures_before {
            warn!(
                chunk = self.chunks,
                failures = stats.failures - failures_before,
                "evaluations failed in chunk; recorded as rejected samples"
            );
        }
        info!(
            sampler = self.sampler.name(),
            chunk = self.chunks,
            rows = output.len(),
            evaluations = stats.evaluations,
            "chunk complete"
        );
        if self.sampler.has_converged() {
            self.state = RunState::Converged;
            self.coordinator.shutdown();
            info!(sampler = self.sampler.name(), chunks = self.chunks, "sampler converged");
        }
        Ok(self.state)
    }

    /// Configures if needed, then steps until convergence and finalizes the sink.
    pub fn run(&mut self, output: &mut dyn OutputSink) -> Result<RunSummary, CosmoError> {
        if self.state == RunState::Configuring {
            self.configure(output)?;
        }
        while self.state == RunState::Iterating {
            self.step(output)?;
        }
        let finalized = output.finalize();
        self.settle(finalized)?;
        Ok(self.summary(output))
    }

    pub fn summary(&self, output: &dyn OutputSink) -> RunSummary {
        RunSummary {
            sampler: self.sampler.name().to_owned(),
            shape: self.shape,
            state: self.state,
            chunks: self.chunks,
            rows: output.len(),
            stats: self.coordinator.stats(),
        }
    }

    fn settle<T>(&mut self, outcome: Result<T, CosmoError>) -> Result<T, CosmoError> {
        if outcome.is_err() {
            self.state = RunState::Failed;
            self.coordinator.shutdown();
        }
        outcome
    }

    fn wrong_state(&mut self, operation: &str) -> CosmoError {
        let err = CosmoError::Contract(
            ErrorInfo::new("run-state", "operation not allowed in the current run state")
                .with_context("operation", operation)
                .with_context("state", format!("{:?}", self.state)),
        );
        if self.state != RunState::Failed && self.state != RunState::Converged {
            self.state = RunState::Failed;
            self.coordinator.shutdown();
        }
        err
    }
}
