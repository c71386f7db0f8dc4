//! Fetch-or-generate state machine for one stored agent result.
//!
//! ```text
//! Idle -> Loading -> Success
//!                 -> Error                      (read failed, not 404)
//!                 -> Generating -> Success      (read found nothing)
//!                               -> Error
//! Success | Error -> Generating                 (regenerate)
//! ```
//!
//! The read always precedes any generate for a key, and a key never has
//! more than one call in flight: entering `Loading` or `Generating` is a
//! compare-and-set on the state, so a second caller becomes a no-op.

mod registry;
mod source;

pub use registry::*;
pub use source::*;

use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::client::ClientError;
use crate::models::{AgentResult, ResultKey};

/// Which call a failure came from, so a retry repeats the right step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStep {
    Read,
    Generate,
}

/// A failed run as presented to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunFailure {
    pub message: String,
    pub retryable: bool,
    pub step: RunStep,
    pub status: Option<u16>,
}

impl RunFailure {
    fn from_error(error: &ClientError, step: RunStep) -> Self {
        Self {
            message: error.user_message(),
            retryable: error.is_retryable(),
            step,
            status: error.status().map(|s| s.as_u16()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum RunState {
    #[default]
    Idle,
    Loading,
    Generating,
    Success(AgentResult),
    Error(RunFailure),
}

impl RunState {
    /// A call is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Loading | Self::Generating)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Generating => "generating",
            Self::Success(_) => "success",
            Self::Error(_) => "error",
        }
    }

    pub fn result(&self) -> Option<&AgentResult> {
        match self {
            Self::Success(result) => Some(result),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&RunFailure> {
        match self {
            Self::Error(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Drives one [`ResultKey`] through fetch-or-generate.
pub struct AgentRunner {
    key: ResultKey,
    source: Arc<dyn ReportSource>,
    options: GenerateOptions,
    state: watch::Sender<RunState>,
    parent: CancellationToken,
    cancel: Mutex<CancellationToken>,
}

impl AgentRunner {
    pub fn new(source: Arc<dyn ReportSource>, key: ResultKey) -> Self {
        Self::with_parent(source, key, GenerateOptions::default(), CancellationToken::new())
    }

    /// Runner whose calls are also cancelled when `parent` is.
    pub fn with_parent(
        source: Arc<dyn ReportSource>,
        key: ResultKey,
        options: GenerateOptions,
        parent: CancellationToken,
    ) -> Self {
        let (state, _) = watch::channel(RunState::Idle);
        let cancel = Mutex::new(parent.child_token());
        Self {
            key,
            source,
            options,
            state,
            parent,
            cancel,
        }
    }

    pub fn key(&self) -> &ResultKey {
        &self.key
    }

    pub fn state(&self) -> RunState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RunState> {
        self.state.subscribe()
    }

    /// Load the stored result, generating it when none exists.
    ///
    /// Starts from `Idle` or `Error`; in any other state this returns the
    /// current state without issuing a call.
    pub async fn load(&self) -> RunState {
        if !self.enter(|s| matches!(s, RunState::Idle | RunState::Error(_)), RunState::Loading) {
            tracing::debug!(key = %self.key, state = self.state.borrow().name(), "Load ignored");
            return self.state();
        }
        tracing::debug!(key = %self.key, "Loading stored result");

        let token = self.token();
        self.until_cancelled(&token, self.read_then_generate(&token, false))
            .await
    }

    /// Read, then replace whatever is stored with a newly generated result.
    ///
    /// Issues exactly one generate call whether or not a result was stored;
    /// a failed read still stops before generating. Starts from `Idle` or
    /// `Error`, like [`load`](Self::load).
    pub async fn load_fresh(&self) -> RunState {
        if !self.enter(|s| matches!(s, RunState::Idle | RunState::Error(_)), RunState::Loading) {
            tracing::debug!(key = %self.key, state = self.state.borrow().name(), "Fresh load ignored");
            return self.state();
        }
        tracing::debug!(key = %self.key, "Loading before regenerating");

        let token = self.token();
        self.until_cancelled(&token, self.read_then_generate(&token, true))
            .await
    }

    /// Replace the stored result with a freshly generated one.
    ///
    /// Starts from `Success` or `Error`; otherwise a no-op.
    pub async fn regenerate(&self) -> RunState {
        if !self.enter(
            |s| matches!(s, RunState::Success(_) | RunState::Error(_)),
            RunState::Generating,
        ) {
            tracing::debug!(key = %self.key, state = self.state.borrow().name(), "Regenerate ignored");
            return self.state();
        }
        tracing::info!(key = %self.key, "Regenerating");

        let token = self.token();
        self.until_cancelled(&token, self.generate(&token)).await
    }

    /// Repeat whichever step last failed.
    pub async fn retry(&self) -> RunState {
        let step = self.state.borrow().failure().map(|f| f.step);
        match step {
            Some(RunStep::Read) => self.load().await,
            Some(RunStep::Generate) => self.regenerate().await,
            None => self.state(),
        }
    }

    /// Abort any in-flight call and return to `Idle`.
    pub fn cancel(&self) {
        {
            let mut current = self.cancel.lock().expect("runner lock poisoned");
            current.cancel();
            *current = self.parent.child_token();
        }
        self.state.send_replace(RunState::Idle);
        tracing::debug!(key = %self.key, "Runner cancelled");
    }

    /// With `replace`, a stored result is generated over instead of returned.
    async fn read_then_generate(&self, token: &CancellationToken, replace: bool) {
        match self.source.fetch(&self.key, token).await {
            Ok(Some(result)) if !replace => {
                tracing::debug!(key = %self.key, status = %result.status, "Found stored result");
                self.settle(token, RunState::Success(result));
            }
            Ok(found) => {
                if found.is_some() {
                    tracing::info!(key = %self.key, "Replacing stored result");
                } else {
                    tracing::info!(key = %self.key, "Nothing stored, generating");
                }
                if !token.is_cancelled() {
                    self.state.send_replace(RunState::Generating);
                }
                self.generate(token).await;
            }
            Err(e) => {
                self.settle(token, RunState::Error(RunFailure::from_error(&e, RunStep::Read)));
            }
        }
    }

    async fn generate(&self, token: &CancellationToken) {
        let next = match self.source.generate(&self.key, &self.options, token).await {
            Ok(result) => {
                tracing::info!(key = %self.key, status = %result.status, "Generated result");
                RunState::Success(result)
            }
            Err(e) => {
                tracing::warn!(key = %self.key, "Generation failed: {}", e);
                RunState::Error(RunFailure::from_error(&e, RunStep::Generate))
            }
        };
        self.settle(token, next);
    }

    async fn until_cancelled(
        &self,
        token: &CancellationToken,
        work: impl Future<Output = ()>,
    ) -> RunState {
        tokio::select! {
            _ = work => self.state(),
            _ = token.cancelled() => {
                // A still-cancelled current token means the parent fired and
                // no `cancel()` has reset the state.
                if self.token().is_cancelled() {
                    self.state.send_if_modified(|s| {
                        let busy = s.is_busy();
                        if busy {
                            *s = RunState::Idle;
                        }
                        busy
                    });
                }
                RunState::Idle
            }
        }
    }

    /// Compare-and-set into a busy state.
    fn enter(&self, allowed: impl Fn(&RunState) -> bool, next: RunState) -> bool {
        self.state.send_if_modified(|state| {
            if allowed(state) {
                *state = next;
                true
            } else {
                false
            }
        })
    }

    /// Publish a terminal state unless the run was cancelled meanwhile.
    fn settle(&self, token: &CancellationToken, next: RunState) {
        if token.is_cancelled() {
            return;
        }
        self.state.send_replace(next);
    }

    fn token(&self) -> CancellationToken {
        self.cancel.lock().expect("runner lock poisoned").clone()
    }
}
