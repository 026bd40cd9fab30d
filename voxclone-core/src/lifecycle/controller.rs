use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::events::{EventSender, LifecycleEvent};
use super::state::CloneState;
use crate::auth::Identity;
use crate::capture::{AudioCapture, RECOMMENDED_SAMPLE_SECS};
use crate::error::VoiceError;
use crate::persistence::{CloneStore, VoiceCloneRecord};
use crate::poller::{await_readiness, CancelToken, PollHandle, PollOutcome, TerminalState};
use crate::settings::Settings;
use crate::speech::{GeneratedSpeech, SpeechGenerator};
use crate::voice::{CloneClient, RemoteStatus, VoiceCloneProvider, VoiceId};

#[derive(Default)]
struct Inner {
    state: CloneState,
    /// Bumped whenever a new instance starts or the current one is reset.
    /// Async work captures the value it started under and only applies its
    /// result if it is still current.
    generation: u64,
    name: Option<String>,
    voice_id: Option<VoiceId>,
    record_id: Option<String>,
    identity: Option<Identity>,
    cancel: Option<CancelToken>,
    poll: Option<PollHandle>,
    suggested_signup: bool,
}

impl Inner {
    /// Stop outstanding readiness work and start a fresh instance.
    fn begin_instance(&mut self) -> u64 {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        self.poll = None;
        self.generation += 1;
        self.name = None;
        self.voice_id = None;
        self.record_id = None;
        self.identity = None;
        self.generation
    }
}

/// Orchestrates record -> clone -> speak for one voice-clone instance at a
/// time.
///
/// Anonymous submissions return while `Processing` and settle on a spawned
/// poll task. Authenticated submissions wait for readiness inline and then
/// persist the clone. Either way the result is reported through
/// [`LifecycleEvent`]s as well as return values.
#[derive(Clone)]
pub struct CloneLifecycle {
    provider: Arc<dyn VoiceCloneProvider>,
    store: Arc<dyn CloneStore>,
    client: CloneClient,
    speech: SpeechGenerator,
    poll_interval: Duration,
    welcome_text: Option<String>,
    events: EventSender,
    inner: Arc<Mutex<Inner>>,
}

impl CloneLifecycle {
    pub fn new(
        provider: Arc<dyn VoiceCloneProvider>,
        store: Arc<dyn CloneStore>,
        settings: &Settings,
        events: EventSender,
    ) -> Self {
        Self {
            client: CloneClient::new(provider.clone(), settings.clone.clone()),
            speech: SpeechGenerator::new(provider.clone(), settings.speech.clone()),
            poll_interval: settings.clone.poll_interval(),
            welcome_text: settings.speech.welcome_text().map(str::to_string),
            provider,
            store,
            events,
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    pub fn state(&self) -> CloneState {
        self.inner.lock().unwrap().state
    }

    pub fn voice_id(&self) -> Option<VoiceId> {
        self.inner.lock().unwrap().voice_id.clone()
    }

    /// Id of the persisted record, for clones owned by a signed-in user.
    pub fn record_id(&self) -> Option<String> {
        self.inner.lock().unwrap().record_id.clone()
    }

    pub fn name(&self) -> Option<String> {
        self.inner.lock().unwrap().name.clone()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.inner.lock().unwrap().identity.clone()
    }

    pub fn events(&self) -> &EventSender {
        &self.events
    }

    /// A handle that does not keep the instance state alive. Work that
    /// outlives the caller (the anonymous poll task) holds one of these, so
    /// dropping the last `CloneLifecycle` drops the poll handle and cancels it.
    fn downgrade(&self) -> WeakLifecycle {
        WeakLifecycle {
            provider: self.provider.clone(),
            store: self.store.clone(),
            client: self.client.clone(),
            speech: self.speech.clone(),
            poll_interval: self.poll_interval,
            welcome_text: self.welcome_text.clone(),
            events: self.events.clone(),
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Submit `audio` for cloning under `name`.
    ///
    /// `identity` is bound to the new instance; signing in later does not
    /// change where this clone is saved. Returns the state reached when the
    /// call finishes: `Processing` for anonymous submissions, a terminal
    /// state for authenticated ones.
    pub async fn submit(
        &self,
        audio: Option<&AudioCapture>,
        name: &str,
        identity: Option<Identity>,
    ) -> Result<CloneState, VoiceError> {
        let state = self.state();
        if !state.accepts_submit() {
            return Err(self.report(VoiceError::InvalidState(format!(
                "cannot submit a new clone while {state}"
            ))));
        }

        let name = name.trim();
        if name.is_empty() {
            return Err(self.report(VoiceError::MissingName));
        }
        let audio = audio.ok_or_else(|| self.report(VoiceError::MissingAudio))?;
        self.client.validate(audio).map_err(|e| self.report(e))?;

        if audio.is_shorter_than_recommended() {
            self.events.warning(format!(
                "Recordings of at least {RECOMMENDED_SAMPLE_SECS} seconds give better results"
            ));
        }

        let generation = {
            let mut inner = self.lock_if(CloneState::accepts_submit, "submit a new clone")?;
            let generation = inner.begin_instance();
            inner.name = Some(name.to_string());
            inner.identity = identity.clone();
            self.apply(&mut inner, CloneState::Submitting);
            generation
        };

        let voice_id = match self.client.submit_clone(audio, name).await {
            Ok(id) => id,
            Err(e) => {
                self.transition(generation, CloneState::Error, |_| {});
                return Err(self.report(e));
            }
        };

        let cancel = CancelToken::new();
        let moved_on = !self.transition(generation, CloneState::Processing, |inner| {
            inner.voice_id = Some(voice_id.clone());
            inner.cancel = Some(cancel.clone());
        });
        if moved_on {
            debug!(voice_id = %voice_id, "submission finished after reset, ignoring");
            return Ok(self.state());
        }

        match identity {
            None => {
                self.spawn_poll(generation, voice_id);
                Ok(CloneState::Processing)
            }
            Some(identity) => {
                self.await_and_persist(generation, voice_id, name, &identity, &cancel)
                    .await
            }
        }
    }

    fn spawn_poll(&self, generation: u64, voice_id: VoiceId) {
        let weak = self.downgrade();
        let settled_id = voice_id.clone();
        let handle = PollHandle::spawn(
            self.provider.clone(),
            voice_id,
            self.poll_interval,
            move |terminal| async move {
                if let Some(this) = weak.upgrade() {
                    this.settle(generation, terminal, settled_id).await;
                }
            },
        );

        let mut inner = self.inner.lock().unwrap();
        if inner.generation == generation {
            inner.cancel = Some(handle.token());
            inner.poll = Some(handle);
        }
        // Otherwise the handle drops here and cancels itself.
    }

    async fn await_and_persist(
        &self,
        generation: u64,
        voice_id: VoiceId,
        name: &str,
        identity: &Identity,
        cancel: &CancelToken,
    ) -> Result<CloneState, VoiceError> {
        let outcome =
            await_readiness(self.provider.as_ref(), &voice_id, self.poll_interval, cancel).await;

        match outcome {
            PollOutcome::Cancelled => return Ok(self.state()),
            PollOutcome::Settled(TerminalState::Ready) => {}
            PollOutcome::Settled(other) => {
                self.settle(generation, other, voice_id).await;
                return Ok(self.state());
            }
        }

        if !self.is_current(generation) {
            return Ok(self.state());
        }

        let record = match self.store.save_clone(name, &voice_id, &identity.id).await {
            Ok(record) => record,
            Err(e) => {
                warn!(voice_id = %voice_id, error = %e, "failed to save voice clone");
                self.transition(generation, CloneState::Error, |_| {});
                return Err(self.report(e));
            }
        };

        let record_id = record.id.clone();
        if self.transition(generation, CloneState::Ready, |inner| {
            inner.record_id = Some(record_id);
        }) {
            self.events.send(LifecycleEvent::CloneSaved(record));
            self.welcome(generation, &voice_id).await;
        }
        Ok(self.state())
    }

    async fn settle(&self, generation: u64, terminal: TerminalState, voice_id: VoiceId) {
        if !self.transition(generation, CloneState::from(terminal), |_| {}) {
            return;
        }
        match terminal {
            TerminalState::Ready => self.welcome(generation, &voice_id).await,
            TerminalState::Error => {
                self.events.error("Voice cloning failed. Please try again.");
            }
            TerminalState::NotFound => {
                self.events
                    .error(VoiceError::NotFound(voice_id.to_string()).user_message());
            }
        }
    }

    async fn welcome(&self, generation: u64, voice_id: &VoiceId) {
        let Some(text) = self.welcome_text.as_deref() else {
            return;
        };
        match self.speech.generate(voice_id, text).await {
            Ok(speech) if self.is_current(generation) => {
                self.events.send(LifecycleEvent::WelcomeSpeech(speech));
            }
            Ok(_) => {}
            Err(e) => {
                warn!(voice_id = %voice_id, error = %e, "welcome speech failed");
                self.events.warning(
                    "Your voice clone is ready, but the welcome message could not be generated",
                );
            }
        }
    }

    /// Speak `text` in the current clone. Only valid while `Ready`.
    pub async fn generate(&self, text: &str) -> Result<GeneratedSpeech, VoiceError> {
        let (state, voice_id, record_id, identity) = {
            let inner = self.inner.lock().unwrap();
            (
                inner.state,
                inner.voice_id.clone(),
                inner.record_id.clone(),
                inner.identity.clone(),
            )
        };
        let voice_id = match (state, voice_id) {
            (CloneState::Ready, Some(voice_id)) => voice_id,
            (state, _) => return Err(self.report(VoiceError::NotReady { state })),
        };

        let speech = self
            .speech
            .generate(&voice_id, text)
            .await
            .map_err(|e| self.report(e))?;

        if speech.truncated {
            self.events.info(format!(
                "Text was shortened to {} characters",
                self.speech.max_text_chars()
            ));
        }

        match (identity, record_id) {
            (Some(_), Some(record_id)) => self.save_speech_in_background(record_id, &speech.text),
            (None, _) => {
                let first = {
                    let mut inner = self.inner.lock().unwrap();
                    !std::mem::replace(&mut inner.suggested_signup, true)
                };
                if first {
                    self.events.send(LifecycleEvent::SignUpSuggested);
                }
            }
            (Some(_), None) => {}
        }

        Ok(speech)
    }

    fn save_speech_in_background(&self, record_id: String, text: &str) {
        let store = self.store.clone();
        let events = self.events.clone();
        let text = text.to_string();
        tokio::spawn(async move {
            match store.save_speech(&record_id, &text).await {
                Ok(record) => events.send(LifecycleEvent::SpeechSaved(record)),
                Err(e) => {
                    warn!(record_id = %record_id, error = %e, "failed to save speech history")
                }
            }
        });
    }

    /// Return to `Idle`, cancelling any outstanding poll. Persisted records
    /// are left alone. Calling it again is a no-op.
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.begin_instance();
        if inner.state != CloneState::Idle {
            self.apply(&mut inner, CloneState::Idle);
        }
    }

    /// Use an existing remote clone by id, after checking it is ready.
    pub async fn attach(&self, voice_id: VoiceId) -> Result<CloneState, VoiceError> {
        let state = self.state();
        if state.is_busy() {
            return Err(self.report(VoiceError::InvalidState(format!(
                "cannot switch clones while {state}"
            ))));
        }

        match self.provider.voice_status(&voice_id).await {
            RemoteStatus::Ready => {
                // A submit may have started while the status query was out.
                let mut inner = self.lock_if(|state| !state.is_busy(), "switch clones")?;
                inner.begin_instance();
                inner.voice_id = Some(voice_id);
                self.apply(&mut inner, CloneState::Ready);
                Ok(CloneState::Ready)
            }
            RemoteStatus::NotFound => {
                Err(self.report(VoiceError::NotFound(voice_id.to_string())))
            }
            RemoteStatus::Processing => Err(self.report(VoiceError::InvalidState(format!(
                "voice clone {voice_id} is still processing"
            )))),
            RemoteStatus::Failed(reason) => Err(self.report(VoiceError::remote(None, reason))),
        }
    }

    /// Continue with a clone saved by `identity`.
    pub fn resume(&self, record: &VoiceCloneRecord, identity: Identity) -> Result<(), VoiceError> {
        if record.user_id != identity.id {
            return Err(self.report(VoiceError::Unauthorized(
                "voice clone belongs to another user".to_string(),
            )));
        }
        let mut inner = self.lock_if(|state| !state.is_busy(), "switch clones")?;
        inner.begin_instance();
        inner.name = Some(record.name.clone());
        inner.voice_id = Some(record.voice_id.clone());
        inner.record_id = Some(record.id.clone());
        inner.identity = Some(identity);
        self.apply(&mut inner, CloneState::Ready);
        Ok(())
    }

    /// Lock the instance state if `accepts` allows the current state. The
    /// caller acts under the same guard, so the check cannot go stale.
    fn lock_if(
        &self,
        accepts: impl Fn(CloneState) -> bool,
        action: &str,
    ) -> Result<MutexGuard<'_, Inner>, VoiceError> {
        let inner = self.inner.lock().unwrap();
        if accepts(inner.state) {
            return Ok(inner);
        }
        let state = inner.state;
        drop(inner);
        Err(self.report(VoiceError::InvalidState(format!(
            "cannot {action} while {state}"
        ))))
    }

    fn is_current(&self, generation: u64) -> bool {
        self.inner.lock().unwrap().generation == generation
    }

    /// Apply `to` if `generation` is still current. Returns whether it was.
    fn transition(
        &self,
        generation: u64,
        to: CloneState,
        update: impl FnOnce(&mut Inner),
    ) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.generation != generation {
            debug!(
                stale = generation,
                current = inner.generation,
                %to,
                "discarding stale transition"
            );
            return false;
        }
        update(&mut inner);
        self.apply(&mut inner, to);
        true
    }

    fn apply(&self, inner: &mut Inner, to: CloneState) {
        let from = inner.state;
        inner.state = to;
        info!(%from, %to, voice_id = ?inner.voice_id, "clone state changed");
        self.events.send(LifecycleEvent::StateChanged {
            from,
            to,
            voice_id: inner.voice_id.clone(),
        });
    }

    fn report(&self, error: VoiceError) -> VoiceError {
        warn!(error = %error, "voice clone operation failed");
        self.events.error(error.user_message());
        error
    }
}

/// [`CloneLifecycle`] without ownership of the instance state.
struct WeakLifecycle {
    provider: Arc<dyn VoiceCloneProvider>,
    store: Arc<dyn CloneStore>,
    client: CloneClient,
    speech: SpeechGenerator,
    poll_interval: Duration,
    welcome_text: Option<String>,
    events: EventSender,
    inner: Weak<Mutex<Inner>>,
}

impl WeakLifecycle {
    fn upgrade(self) -> Option<CloneLifecycle> {
        Some(CloneLifecycle {
            inner: self.inner.upgrade()?,
            provider: self.provider,
            store: self.store,
            client: self.client,
            speech: self.speech,
            poll_interval: self.poll_interval,
            welcome_text: self.welcome_text,
            events: self.events,
        })
    }
}
