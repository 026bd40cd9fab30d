use anyhow::{bail, Context, Result};
use std::path::Path;
use tokio::sync::mpsc;
use voxclone_core::auth::{AuthProvider, Identity};
use voxclone_core::capture::{format_duration, load_from_path, AudioCapture};
use voxclone_core::history::{find_saved_clone, load_history};
use voxclone_core::lifecycle::{CloneLifecycle, CloneState, LifecycleEvent, NotificationLevel};
use voxclone_core::settings::SettingsManager;
use voxclone_core::speech::GeneratedSpeech;
use voxclone_core::voice::VoiceId;

use crate::app::App;
use crate::output;

pub struct CloneOutcome {
    pub state: CloneState,
    pub welcome: Option<GeneratedSpeech>,
}

/// Submit a clone and render its progress until it settles. When
/// `expect_welcome` is set, also waits for the welcome greeting (or its
/// failure) after the clone becomes ready.
pub async fn submit_and_wait(
    lifecycle: &CloneLifecycle,
    event_rx: &mut mpsc::UnboundedReceiver<LifecycleEvent>,
    audio: &AudioCapture,
    name: &str,
    identity: Option<Identity>,
    expect_welcome: bool,
) -> CloneOutcome {
    let spinner = output::processing_spinner(name);
    let submit = lifecycle.submit(Some(audio), name, identity);
    tokio::pin!(submit);

    let mut submit_done = false;
    let mut terminal: Option<CloneState> = None;
    let mut welcome = None;
    let mut welcome_pending = expect_welcome;

    loop {
        let settled = match terminal {
            Some(CloneState::Ready) => !welcome_pending,
            Some(_) => true,
            None => false,
        };
        if submit_done && settled {
            break;
        }

        tokio::select! {
            result = &mut submit, if !submit_done => {
                submit_done = true;
                if result.is_err() {
                    // Already reported through a notification.
                    terminal = Some(lifecycle.state());
                    welcome_pending = false;
                }
            }
            event = event_rx.recv() => {
                let Some(event) = event else { break };
                match &event {
                    LifecycleEvent::StateChanged { to, .. }
                        if matches!(
                            to,
                            CloneState::Ready | CloneState::Error | CloneState::NotFound
                        ) =>
                    {
                        terminal = Some(*to);
                    }
                    LifecycleEvent::WelcomeSpeech(speech) => {
                        welcome = Some(speech.clone());
                        welcome_pending = false;
                    }
                    LifecycleEvent::Notification { level: NotificationLevel::Warning, .. }
                        if terminal == Some(CloneState::Ready) =>
                    {
                        welcome_pending = false;
                    }
                    _ => {}
                }
                spinner.suspend(|| output::print_event(&event));
            }
        }
    }

    spinner.finish_and_clear();
    while let Ok(event) = event_rx.try_recv() {
        output::print_event(&event);
    }

    CloneOutcome {
        state: terminal.unwrap_or_else(|| lifecycle.state()),
        welcome,
    }
}

pub fn drain_events(event_rx: &mut mpsc::UnboundedReceiver<LifecycleEvent>) {
    while let Ok(event) = event_rx.try_recv() {
        output::print_event(&event);
    }
}

pub async fn clone(
    app: &App,
    name: &str,
    audio: &Path,
    welcome_output: Option<&Path>,
) -> Result<()> {
    let capture = load_from_path(audio)?;
    if let Some(duration) = capture.duration() {
        output::print_system(&format!("Loaded {} of audio", format_duration(duration)));
    }

    let identity = app.identity().await;
    let (lifecycle, mut event_rx) = app.lifecycle()?;
    let expect_welcome = app.settings.speech.welcome_text().is_some();

    let outcome = submit_and_wait(
        &lifecycle,
        &mut event_rx,
        &capture,
        name,
        identity,
        expect_welcome,
    )
    .await;

    if outcome.state != CloneState::Ready {
        bail!("voice clone did not become ready (state: {})", outcome.state);
    }

    if let Some(voice_id) = lifecycle.voice_id() {
        println!("{voice_id}");
    }
    if let (Some(path), Some(welcome)) = (welcome_output, outcome.welcome) {
        std::fs::write(path, &welcome.audio.data)
            .with_context(|| format!("Failed to write welcome audio to {path:?}"))?;
        output::print_system(&format!("Welcome greeting written to {}", path.display()));
    }
    Ok(())
}

pub async fn speak(
    app: &App,
    voice_id: &str,
    text: &str,
    output_path: &Path,
    play: bool,
) -> Result<()> {
    let (lifecycle, mut event_rx) = app.lifecycle()?;
    let voice_id = VoiceId::new(voice_id);

    // A signed-in user's own clone keeps its speech history.
    let saved = match app.identity().await {
        Some(identity) => find_saved_clone(app.store.as_ref(), &identity, &voice_id)
            .await
            .context("Failed to look up your saved clones")?
            .map(|record| (record, identity)),
        None => None,
    };
    let result = match saved {
        Some((record, identity)) => lifecycle.resume(&record, identity),
        None => lifecycle.attach(voice_id).await.map(|_| ()),
    };
    if let Err(e) = result {
        drain_events(&mut event_rx);
        return Err(e.into());
    }

    let speech = lifecycle.generate(text).await;
    drain_events(&mut event_rx);
    let speech = speech?;

    std::fs::write(output_path, &speech.audio.data)
        .with_context(|| format!("Failed to write audio to {output_path:?}"))?;
    output::print_success(&format!("Wrote {}", output_path.display()));

    if play {
        play_audio(&speech.audio.data).await?;
    }

    // Let the background history write land before the runtime exits.
    tokio::task::yield_now().await;
    drain_events(&mut event_rx);
    Ok(())
}

pub async fn history(app: &App) -> Result<()> {
    let identity = app.identity().await;
    let history = load_history(app.store.as_ref(), identity.as_ref()).await?;
    output::print_history(&history);
    Ok(())
}

pub fn config_show(manager: &SettingsManager) -> Result<()> {
    let mut settings = manager.settings().clone();
    if !settings.provider.api_key.is_empty() {
        settings.provider.api_key = "********".to_string();
    }
    output::print_system(&format!("# {}", manager.path().display()));
    print!("{}", toml::to_string_pretty(&settings).context("Failed to render settings")?);
    Ok(())
}

pub fn config_get(manager: &SettingsManager, key: &str) -> Result<()> {
    println!("{}", manager.get(key)?);
    Ok(())
}

pub fn config_set(manager: &mut SettingsManager, key: &str, value: &str) -> Result<()> {
    manager.set(key, value)?;
    output::print_success(&format!("Set {key} in {}", manager.path().display()));
    Ok(())
}

pub async fn sign_up(app: &App, email: &str, password: &str) -> Result<()> {
    let identity = app.auth.sign_up(email, password).await?;
    output::print_success(&format!(
        "Account created, signed in as {}",
        identity.email.as_deref().unwrap_or(&identity.id)
    ));
    Ok(())
}

pub async fn sign_in(app: &App, email: &str, password: &str) -> Result<()> {
    let identity = app.auth.sign_in(email, password).await?;
    output::print_success(&format!(
        "Signed in as {}",
        identity.email.as_deref().unwrap_or(&identity.id)
    ));
    Ok(())
}

pub async fn sign_out(app: &App) -> Result<()> {
    app.auth.sign_out().await?;
    output::print_success("Signed out");
    Ok(())
}

pub async fn whoami(app: &App) -> Result<()> {
    match app.identity().await {
        Some(identity) => println!("{}", identity.email.as_deref().unwrap_or(&identity.id)),
        None => output::print_system("Not signed in"),
    }
    Ok(())
}

#[cfg(feature = "audio")]
pub async fn record(seconds: u64, output_path: &Path) -> Result<()> {
    let capture = record_sample(seconds).await?;
    std::fs::write(output_path, capture.data())
        .with_context(|| format!("Failed to write recording to {output_path:?}"))?;
    output::print_success(&format!("Wrote {}", output_path.display()));
    Ok(())
}

/// Record from the default microphone for up to `seconds`; Ctrl+C stops early.
#[cfg(feature = "audio")]
pub async fn record_sample(seconds: u64) -> Result<AudioCapture> {
    use voxclone_core::capture::microphone::MicrophoneDevice;
    use voxclone_core::capture::recorder::Recorder;
    use voxclone_core::capture::RECOMMENDED_SAMPLE_SECS;

    let mut recorder = Recorder::new(MicrophoneDevice::new());
    recorder.start_capture()?;
    output::print_system(&format!(
        "Recording for up to {seconds}s, press Ctrl+C to stop early..."
    ));

    tokio::select! {
        _ = tokio::time::sleep(std::time::Duration::from_secs(seconds)) => {}
        _ = tokio::signal::ctrl_c() => {}
    }

    let capture = recorder.stop_capture()?;
    if let Some(duration) = capture.duration() {
        output::print_system(&format!("Recorded {}", format_duration(duration)));
    }
    if capture.is_shorter_than_recommended() {
        output::print_system(&format!(
            "⚠ Record at least {RECOMMENDED_SAMPLE_SECS} seconds for better results"
        ));
    }
    Ok(capture)
}

#[cfg(feature = "audio")]
pub async fn play_audio(wav: &[u8]) -> Result<()> {
    use indicatif::{ProgressBar, ProgressStyle};
    use voxclone_core::playback::{AudioPlayer, PlaybackProgress};

    let player = AudioPlayer::new()?;
    let progress = PlaybackProgress::new();
    let playback = player.play(wav, progress.clone())?;

    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::with_template("{bar:30.green} {pos}%")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    while !playback.is_finished() {
        pb.set_position(progress.percent() as u64);
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
    playback.wait().await;
    pb.finish_and_clear();
    Ok(())
}

#[cfg(not(feature = "audio"))]
pub async fn play_audio(_wav: &[u8]) -> Result<()> {
    output::print_system("Playback needs voxclone built with the `audio` feature");
    Ok(())
}
