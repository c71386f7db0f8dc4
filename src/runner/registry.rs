use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

use super::{AgentRunner, GenerateOptions, ReportSource, RunState, RunStep};
use crate::gate::{DependencyGraph, Gate};
use crate::models::{AgentKind, Outcome, ResultKey};

/// Hands out one runner per [`ResultKey`] so every caller in the process
/// shares the same state machine, and with it the same in-flight call.
pub struct RunnerRegistry {
    source: Arc<dyn ReportSource>,
    graph: DependencyGraph,
    runners: Mutex<HashMap<ResultKey, Arc<AgentRunner>>>,
    shutdown: CancellationToken,
}

impl RunnerRegistry {
    pub fn new(source: Arc<dyn ReportSource>) -> Self {
        Self::with_graph(source, DependencyGraph::standard())
    }

    pub fn with_graph(source: Arc<dyn ReportSource>, graph: DependencyGraph) -> Self {
        Self {
            source,
            graph,
            runners: Mutex::new(HashMap::new()),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn runner(&self, key: ResultKey) -> Arc<AgentRunner> {
        self.runner_with_options(key, GenerateOptions::default())
    }

    /// Options only apply when the runner is first created.
    pub fn runner_with_options(&self, key: ResultKey, options: GenerateOptions) -> Arc<AgentRunner> {
        let mut runners = self.runners.lock().expect("registry lock poisoned");
        runners
            .entry(key.clone())
            .or_insert_with(|| {
                Arc::new(AgentRunner::with_parent(
                    self.source.clone(),
                    key,
                    options,
                    self.shutdown.clone(),
                ))
            })
            .clone()
    }

    /// Drop the runner for `key`; the next [`runner`](Self::runner) call
    /// starts from `Idle`. Handles already given out keep working.
    pub fn forget(&self, key: &ResultKey) -> Option<Arc<AgentRunner>> {
        let removed = self
            .runners
            .lock()
            .expect("registry lock poisoned")
            .remove(key);
        if removed.is_some() {
            tracing::debug!(key = %key, "Forgot runner");
        }
        removed
    }

    /// Drop every runner for an idea, e.g. once it is no longer on screen.
    /// Returns how many were removed.
    pub fn forget_idea(&self, idea_id: &str) -> usize {
        let mut runners = self.runners.lock().expect("registry lock poisoned");
        let before = runners.len();
        runners.retain(|key, _| key.idea_id != idea_id);
        let removed = before - runners.len();
        tracing::debug!(idea_id, removed, "Forgot runners for idea");
        removed
    }

    /// Outcomes this process has observed for an idea.
    ///
    /// A runner that is still loading, or whose read failed, says nothing
    /// about the stored result and is left out.
    pub fn statuses(&self, idea_id: &str) -> HashMap<AgentKind, Outcome> {
        let runners = self.runners.lock().expect("registry lock poisoned");
        let mut statuses: HashMap<AgentKind, Outcome> = HashMap::new();

        for runner in runners.values().filter(|r| r.key().idea_id == idea_id) {
            let outcome = match runner.state() {
                RunState::Success(result) => result.status,
                RunState::Generating => Outcome::Pending,
                RunState::Error(f) if f.step == RunStep::Generate => Outcome::Failed,
                _ => continue,
            };
            // Several legal documents share one kind; the best one wins.
            statuses
                .entry(runner.key().kind)
                .and_modify(|current| {
                    if outcome.rank() > current.rank() {
                        *current = outcome;
                    }
                })
                .or_insert(outcome);
        }
        statuses
    }

    /// Gate decisions from `known` outcomes (e.g. the dashboard), overlaid
    /// with what this process has observed since.
    pub fn gates(
        &self,
        idea_id: &str,
        known: &HashMap<AgentKind, Outcome>,
    ) -> BTreeMap<AgentKind, Gate> {
        let mut statuses = known.clone();
        statuses.extend(self.statuses(idea_id));
        self.graph.gate(&statuses)
    }

    /// Abort every in-flight call started through this registry.
    pub fn shutdown(&self) {
        tracing::debug!("Cancelling all runners");
        self.shutdown.cancel();
    }
}
