use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::provider::VoiceCloneProvider;
use super::types::{CloneRequest, RemoteStatus, SpeechRequest, VoiceId};
use crate::error::VoiceError;

/// How the mock answers clone submissions
#[derive(Debug, Clone)]
pub enum MockCloneBehavior {
    /// Return the given id
    Succeed(String),
    /// Fail with the given error
    Fail(VoiceError),
}

/// How the mock answers status queries
#[derive(Debug, Clone)]
pub enum MockStatusBehavior {
    /// Report processing for N queries, then ready
    ReadyAfter { remaining_processing: usize },
    /// Play back a fixed sequence of statuses; the last one repeats
    Sequence(Vec<RemoteStatus>),
    /// Keep reporting processing forever
    AlwaysProcessing,
}

/// How the mock answers synthesis requests
#[derive(Debug, Clone)]
pub enum MockSpeechBehavior {
    Succeed(Vec<u8>),
    Fail(VoiceError),
}

/// Mock voice provider for testing
#[derive(Clone)]
pub struct MockVoiceProvider {
    clone_behavior: Arc<Mutex<MockCloneBehavior>>,
    status_behavior: Arc<Mutex<MockStatusBehavior>>,
    speech_behavior: Arc<Mutex<MockSpeechBehavior>>,
    clone_calls: Arc<Mutex<usize>>,
    status_calls: Arc<Mutex<usize>>,
    captured_speech: Arc<Mutex<Vec<SpeechRequest>>>,
    latency: Arc<Mutex<Duration>>,
}

impl Default for MockVoiceProvider {
    fn default() -> Self {
        Self::new(
            MockCloneBehavior::Succeed("abc123".to_string()),
            MockStatusBehavior::ReadyAfter {
                remaining_processing: 0,
            },
        )
    }
}

impl MockVoiceProvider {
    pub fn new(clone: MockCloneBehavior, status: MockStatusBehavior) -> Self {
        Self {
            clone_behavior: Arc::new(Mutex::new(clone)),
            status_behavior: Arc::new(Mutex::new(status)),
            speech_behavior: Arc::new(Mutex::new(MockSpeechBehavior::Succeed(
                b"RIFF mock audio".to_vec(),
            ))),
            clone_calls: Arc::new(Mutex::new(0)),
            status_calls: Arc::new(Mutex::new(0)),
            captured_speech: Arc::new(Mutex::new(Vec::new())),
            latency: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    pub fn set_clone_behavior(&self, behavior: MockCloneBehavior) {
        *self.clone_behavior.lock().unwrap() = behavior;
    }

    pub fn set_status_behavior(&self, behavior: MockStatusBehavior) {
        *self.status_behavior.lock().unwrap() = behavior;
    }

    pub fn set_speech_behavior(&self, behavior: MockSpeechBehavior) {
        *self.speech_behavior.lock().unwrap() = behavior;
    }

    /// Delay every clone and status response by `latency`. Calls are counted
    /// when they start.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = latency;
    }

    async fn respond_later(&self) {
        let latency = *self.latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }

    pub fn clone_calls(&self) -> usize {
        *self.clone_calls.lock().unwrap()
    }

    pub fn status_calls(&self) -> usize {
        *self.status_calls.lock().unwrap()
    }

    pub fn speech_calls(&self) -> usize {
        self.captured_speech.lock().unwrap().len()
    }

    /// Every network-bound call the mock has seen.
    pub fn total_calls(&self) -> usize {
        self.clone_calls() + self.status_calls() + self.speech_calls()
    }

    pub fn captured_speech(&self) -> Vec<SpeechRequest> {
        self.captured_speech.lock().unwrap().clone()
    }

    fn next_status(behavior: &mut MockStatusBehavior) -> RemoteStatus {
        match behavior {
            MockStatusBehavior::ReadyAfter {
                remaining_processing,
            } => {
                if *remaining_processing == 0 {
                    RemoteStatus::Ready
                } else {
                    *remaining_processing -= 1;
                    RemoteStatus::Processing
                }
            }
            MockStatusBehavior::Sequence(statuses) => {
                let mut queue: VecDeque<RemoteStatus> = statuses.drain(..).collect();
                let status = if queue.len() > 1 {
                    queue.pop_front()
                } else {
                    queue.front().cloned()
                };
                *statuses = queue.into();
                status.unwrap_or(RemoteStatus::Processing)
            }
            MockStatusBehavior::AlwaysProcessing => RemoteStatus::Processing,
        }
    }
}

#[async_trait]
impl VoiceCloneProvider for MockVoiceProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn clone_voice(&self, _request: CloneRequest) -> Result<VoiceId, VoiceError> {
        *self.clone_calls.lock().unwrap() += 1;
        self.respond_later().await;
        match self.clone_behavior.lock().unwrap().clone() {
            MockCloneBehavior::Succeed(id) => Ok(VoiceId::new(id)),
            MockCloneBehavior::Fail(err) => Err(err),
        }
    }

    async fn voice_status(&self, _voice_id: &VoiceId) -> RemoteStatus {
        *self.status_calls.lock().unwrap() += 1;
        self.respond_later().await;
        let mut behavior = self.status_behavior.lock().unwrap();
        Self::next_status(&mut behavior)
    }

    async fn synthesize(&self, request: SpeechRequest) -> Result<Vec<u8>, VoiceError> {
        self.captured_speech.lock().unwrap().push(request);
        match self.speech_behavior.lock().unwrap().clone() {
            MockSpeechBehavior::Succeed(bytes) => Ok(bytes),
            MockSpeechBehavior::Fail(err) => Err(err),
        }
    }
}
