//! Readiness polling for remote voice clones.
//!
//! Both lifecycle paths wait through [`await_readiness`]: the anonymous path
//! runs it on a spawned task behind a [`PollHandle`], the authenticated path
//! awaits it inline. Cancellation is cooperative: once the token fires no
//! further status query is issued.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::voice::{RemoteStatus, VoiceCloneProvider, VoiceId};

/// A state from which no automatic transition follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalState {
    Ready,
    Error,
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Settled(TerminalState),
    Cancelled,
}

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Clone, Debug)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once `cancel` has been called on any clone of this token.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        // The sender lives in `self`, so `wait_for` can only fail after we
        // are gone.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// Poll `voice_id` every `interval` until it settles or `cancel` fires.
pub async fn await_readiness(
    provider: &dyn VoiceCloneProvider,
    voice_id: &VoiceId,
    interval: Duration,
    cancel: &CancelToken,
) -> PollOutcome {
    let mut ticks: u32 = 0;
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(voice_id = %voice_id, ticks, "readiness poll cancelled");
                return PollOutcome::Cancelled;
            }
            _ = tokio::time::sleep(interval) => {}
        }

        ticks += 1;
        let status = provider.voice_status(voice_id).await;
        if cancel.is_cancelled() {
            debug!(voice_id = %voice_id, ticks, "discarding status from cancelled poll");
            return PollOutcome::Cancelled;
        }

        let terminal = match status {
            RemoteStatus::Processing => {
                debug!(voice_id = %voice_id, ticks, "voice clone still processing");
                continue;
            }
            RemoteStatus::Ready => TerminalState::Ready,
            RemoteStatus::NotFound => TerminalState::NotFound,
            RemoteStatus::Failed(reason) => {
                warn!(voice_id = %voice_id, %reason, "voice clone status check failed");
                TerminalState::Error
            }
        };

        info!(voice_id = %voice_id, ticks, ?terminal, "voice clone settled");
        return PollOutcome::Settled(terminal);
    }
}

/// A readiness poll running on its own task. Dropping the handle cancels it.
pub struct PollHandle {
    cancel: CancelToken,
    task: Option<JoinHandle<PollOutcome>>,
}

impl PollHandle {
    /// Spawn a poll. `on_settled` runs on the poll task with the terminal
    /// state unless the poll was cancelled first.
    pub fn spawn<F, Fut>(
        provider: Arc<dyn VoiceCloneProvider>,
        voice_id: VoiceId,
        interval: Duration,
        on_settled: F,
    ) -> Self
    where
        F: FnOnce(TerminalState) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let cancel = CancelToken::new();
        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            let outcome =
                await_readiness(provider.as_ref(), &voice_id, interval, &task_cancel).await;
            if let PollOutcome::Settled(terminal) = outcome {
                on_settled(terminal).await;
            }
            outcome
        });

        Self {
            cancel,
            task: Some(task),
        }
    }

    pub fn token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Wait for the poll task to finish.
    pub async fn join(mut self) -> PollOutcome {
        let Some(task) = self.task.take() else {
            return PollOutcome::Cancelled;
        };
        task.await.unwrap_or(PollOutcome::Cancelled)
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
