use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use voxclone_core::history::CloneHistory;
use voxclone_core::lifecycle::{CloneState, LifecycleEvent, NotificationLevel};

pub fn print_system(msg: &str) {
    println!("\x1b[33m{msg}\x1b[0m");
}

pub fn print_error(msg: &str) {
    eprintln!("\x1b[31m✗ {msg}\x1b[0m");
}

pub fn print_success(msg: &str) {
    println!("\x1b[32m✓ {msg}\x1b[0m");
}

/// Spinner shown for as long as a clone is processing.
pub fn processing_spinner(name: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(format!("Processing voice clone \"{name}\"..."));
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Print an event. Welcome audio is handled by the caller.
pub fn print_event(event: &LifecycleEvent) {
    match event {
        LifecycleEvent::StateChanged { to, voice_id, .. } => match (to, voice_id) {
            (CloneState::Ready, Some(id)) => print_success(&format!("Voice clone ready ({id})")),
            (CloneState::Error, _) | (CloneState::NotFound, _) => {}
            (state, _) => tracing::debug!(%state, "state change not rendered"),
        },
        LifecycleEvent::Notification { level, message } => match level {
            NotificationLevel::Info => print_system(message),
            NotificationLevel::Warning => print_system(&format!("⚠ {message}")),
            NotificationLevel::Error => print_error(message),
        },
        LifecycleEvent::WelcomeSpeech(speech) => {
            print_system(&format!("🔊 \"{}\"", speech.text));
        }
        LifecycleEvent::CloneSaved(record) => {
            print_system(&format!("Saved \"{}\" to your clones", record.name));
        }
        LifecycleEvent::SpeechSaved(_) => {}
        LifecycleEvent::SignUpSuggested => print_system(
            "Sign up with `voxclone auth signup` to save your voice clones and speech history",
        ),
    }
}

pub fn print_history(history: &[CloneHistory]) {
    if history.is_empty() {
        print_system("No saved voice clones yet.");
        return;
    }
    for (index, entry) in history.iter().enumerate() {
        println!(
            "{}. {} ({}) created {}",
            index + 1,
            entry.clone.name,
            entry.clone.voice_id,
            entry.clone.created_at.format("%Y-%m-%d %H:%M")
        );
        for speech in &entry.speeches {
            println!(
                "     {}  {}",
                speech.created_at.format("%Y-%m-%d %H:%M"),
                speech.text
            );
        }
    }
}
