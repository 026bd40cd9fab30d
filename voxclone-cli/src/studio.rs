use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::PathBuf;
use tokio::sync::mpsc;
use voxclone_core::capture::{format_duration, load_from_path, AudioCapture};
use voxclone_core::history::load_history;
use voxclone_core::lifecycle::{CloneLifecycle, CloneState, LifecycleEvent};
use voxclone_core::persistence::CloneStore;
use voxclone_core::speech::GeneratedSpeech;
use voxclone_core::voice::VoiceId;

use crate::app::App;
use crate::commands::{drain_events, play_audio, submit_and_wait};
use crate::output;

const HELP: &str = "\
Commands:
  /load <file>      use an audio file as the voice sample
  /record [secs]    record a sample from the microphone
  /clone <name>     clone the loaded sample
  /use <n>          continue with clone n from /history
  /attach <id>      continue with an existing voice id
  /history          list your saved clones
  /play             replay the last speech
  /save <file>      write the last speech to a file
  /reset            start over with a new clone
  /quit             exit
Once a clone is ready, anything else you type is spoken.";

#[derive(Debug, PartialEq, Eq)]
enum StudioCommand {
    Help,
    Load(PathBuf),
    Record(u64),
    Clone(String),
    Use(usize),
    Attach(String),
    History,
    Play,
    Save(PathBuf),
    Reset,
    Quit,
    Speak(String),
    Invalid(String),
}

fn parse_command(input: &str) -> StudioCommand {
    let input = input.trim();
    if !input.starts_with('/') {
        return StudioCommand::Speak(input.to_string());
    }

    let (command, arg) = match input.split_once(char::is_whitespace) {
        Some((command, arg)) => (command, arg.trim()),
        None => (input, ""),
    };

    match (command, arg) {
        ("/help", _) => StudioCommand::Help,
        ("/load", "") => StudioCommand::Invalid("usage: /load <file>".to_string()),
        ("/load", path) => StudioCommand::Load(PathBuf::from(path)),
        ("/record", "") => StudioCommand::Record(30),
        ("/record", secs) => match secs.parse() {
            Ok(secs) => StudioCommand::Record(secs),
            Err(_) => StudioCommand::Invalid("usage: /record [seconds]".to_string()),
        },
        ("/clone", "") => StudioCommand::Invalid("usage: /clone <name>".to_string()),
        ("/clone", name) => StudioCommand::Clone(name.to_string()),
        ("/use", n) => match n.parse::<usize>() {
            Ok(n) if n > 0 => StudioCommand::Use(n),
            _ => StudioCommand::Invalid("usage: /use <n>".to_string()),
        },
        ("/attach", "") => StudioCommand::Invalid("usage: /attach <voice id>".to_string()),
        ("/attach", id) => StudioCommand::Attach(id.to_string()),
        ("/history", _) => StudioCommand::History,
        ("/play", _) => StudioCommand::Play,
        ("/save", "") => StudioCommand::Invalid("usage: /save <file>".to_string()),
        ("/save", path) => StudioCommand::Save(PathBuf::from(path)),
        ("/reset", _) => StudioCommand::Reset,
        ("/quit", _) | ("/exit", _) => StudioCommand::Quit,
        (other, _) => StudioCommand::Invalid(format!("unknown command {other}, try /help")),
    }
}

pub struct Studio {
    app: App,
    lifecycle: CloneLifecycle,
    event_rx: mpsc::UnboundedReceiver<LifecycleEvent>,
    sample: Option<AudioCapture>,
    last_speech: Option<GeneratedSpeech>,
}

impl Studio {
    pub fn new(app: App) -> Result<Self> {
        let (lifecycle, event_rx) = app.lifecycle()?;
        Ok(Self {
            app,
            lifecycle,
            event_rx,
            sample: None,
            last_speech: None,
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut rl = DefaultEditor::new()?;

        match self.app.identity().await {
            Some(identity) => output::print_system(&format!(
                "Signed in as {}",
                identity.email.as_deref().unwrap_or(&identity.id)
            )),
            None => output::print_system("Not signed in; clones will not be saved"),
        }
        output::print_system("💡 Type /help for commands, /quit to exit");

        loop {
            let prompt = match self.lifecycle.state() {
                CloneState::Ready => "\x1b[35mspeak>\x1b[0m ",
                _ => "\x1b[35m>\x1b[0m ",
            };
            let line = match rl.readline(prompt) {
                Ok(line) => line,
                Err(ReadlineError::Interrupted) => continue,
                Err(_) => break,
            };
            if line.trim().is_empty() {
                continue;
            }
            rl.add_history_entry(&line)?;

            match parse_command(&line) {
                StudioCommand::Quit => break,
                command => {
                    if let Err(e) = self.handle(command).await {
                        output::print_error(&format!("{e:#}"));
                    }
                }
            }
            drain_events(&mut self.event_rx);
        }

        self.lifecycle.reset();
        println!("\nGoodbye!");
        Ok(())
    }

    async fn handle(&mut self, command: StudioCommand) -> Result<()> {
        match command {
            StudioCommand::Help => output::print_system(HELP),
            StudioCommand::Invalid(msg) => output::print_error(&msg),
            StudioCommand::Load(path) => {
                let sample = load_from_path(&path)?;
                self.set_sample(sample);
            }
            StudioCommand::Record(secs) => self.record(secs).await?,
            StudioCommand::Clone(name) => self.clone_sample(&name).await?,
            StudioCommand::Use(n) => self.use_saved(n).await?,
            StudioCommand::Attach(id) => {
                if self.lifecycle.attach(VoiceId::new(id)).await.is_ok() {
                    output::print_system("Type something to hear it in this voice");
                }
            }
            StudioCommand::History => {
                let identity = self.app.identity().await;
                let history = load_history(self.app.store.as_ref(), identity.as_ref()).await?;
                output::print_history(&history);
            }
            StudioCommand::Play => match &self.last_speech {
                Some(speech) => play_audio(&speech.audio.data).await?,
                None => output::print_system("Nothing to play yet"),
            },
            StudioCommand::Save(path) => match &self.last_speech {
                Some(speech) => {
                    std::fs::write(&path, &speech.audio.data)?;
                    output::print_success(&format!("Wrote {}", path.display()));
                }
                None => output::print_system("Nothing to save yet"),
            },
            StudioCommand::Reset => {
                self.lifecycle.reset();
                self.sample = None;
                self.last_speech = None;
                output::print_system("Ready for a new recording");
            }
            StudioCommand::Speak(text) => self.speak(&text).await?,
            StudioCommand::Quit => {}
        }
        Ok(())
    }

    fn set_sample(&mut self, sample: AudioCapture) {
        match sample.duration() {
            Some(duration) => output::print_system(&format!(
                "Sample ready ({}); now /clone <name>",
                format_duration(duration)
            )),
            None => output::print_system("Sample ready; now /clone <name>"),
        }
        self.sample = Some(sample);
    }

    #[cfg(feature = "audio")]
    async fn record(&mut self, secs: u64) -> Result<()> {
        let sample = crate::commands::record_sample(secs).await?;
        self.set_sample(sample);
        Ok(())
    }

    #[cfg(not(feature = "audio"))]
    async fn record(&mut self, _secs: u64) -> Result<()> {
        output::print_system("Recording needs voxclone built with the `audio` feature; use /load");
        Ok(())
    }

    async fn clone_sample(&mut self, name: &str) -> Result<()> {
        let Some(sample) = self.sample.clone() else {
            output::print_system("Load or record a sample first");
            return Ok(());
        };

        let identity = self.app.identity().await;
        let expect_welcome = self.app.settings.speech.welcome_text().is_some();
        let outcome = submit_and_wait(
            &self.lifecycle,
            &mut self.event_rx,
            &sample,
            name,
            identity,
            expect_welcome,
        )
        .await;

        if outcome.state == CloneState::Ready {
            if let Some(welcome) = outcome.welcome {
                play_audio(&welcome.audio.data).await?;
                self.last_speech = Some(welcome);
            }
            output::print_system("Type something to hear it in your cloned voice");
        }
        Ok(())
    }

    async fn use_saved(&mut self, n: usize) -> Result<()> {
        let Some(identity) = self.app.identity().await else {
            output::print_system("Sign in with `voxclone auth signin` to use saved clones");
            return Ok(());
        };
        let clones = self.app.store.list_clones(&identity.id).await?;
        let Some(record) = clones.into_iter().nth(n - 1) else {
            output::print_error(&format!("No saved clone #{n}"));
            return Ok(());
        };
        self.lifecycle.resume(&record, identity)?;
        output::print_system(&format!("Using \"{}\"", record.name));
        Ok(())
    }

    async fn speak(&mut self, text: &str) -> Result<()> {
        if self.lifecycle.state() != CloneState::Ready {
            output::print_system(
                "No voice clone yet: /load or /record a sample, then /clone <name>",
            );
            return Ok(());
        }
        // Failures are reported through events.
        let Ok(speech) = self.lifecycle.generate(text).await else {
            return Ok(());
        };
        drain_events(&mut self.event_rx);
        play_audio(&speech.audio.data).await?;
        self.last_speech = Some(speech);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(
            parse_command("/clone  My Voice "),
            StudioCommand::Clone("My Voice".to_string())
        );
        assert_eq!(parse_command("/record"), StudioCommand::Record(30));
        assert_eq!(parse_command("/record 45"), StudioCommand::Record(45));
        assert_eq!(parse_command("/use 2"), StudioCommand::Use(2));
        assert_eq!(parse_command("/exit"), StudioCommand::Quit);
        assert_eq!(
            parse_command("Hello there"),
            StudioCommand::Speak("Hello there".to_string())
        );
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(matches!(parse_command("/use 0"), StudioCommand::Invalid(_)));
        assert!(matches!(parse_command("/record soon"), StudioCommand::Invalid(_)));
        assert!(matches!(parse_command("/clone"), StudioCommand::Invalid(_)));
        assert!(matches!(parse_command("/bogus"), StudioCommand::Invalid(_)));
    }
}
