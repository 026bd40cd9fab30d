use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use voxclone_core::settings::SettingsManager;

mod app;
mod commands;
mod output;
mod studio;

use crate::app::App;

#[derive(Parser, Debug)]
#[command(name = "voxclone")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Clone your voice from a recording and make it say things")]
struct Args {
    /// Load settings from a specific file instead of ~/.voxclone/settings.toml
    #[arg(long, global = true, value_name = "PATH")]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record a voice sample from the default microphone
    #[cfg(feature = "audio")]
    Record {
        #[arg(long, default_value_t = 30)]
        seconds: u64,
        #[arg(long, short)]
        output: PathBuf,
    },

    /// Clone a voice from an audio file and wait until it is ready
    Clone {
        #[arg(long)]
        name: String,
        #[arg(long)]
        audio: PathBuf,
        /// Write the welcome greeting in the new voice to this file
        #[arg(long)]
        welcome_output: Option<PathBuf>,
    },

    /// Speak text in an existing cloned voice
    Speak {
        #[arg(long)]
        voice_id: String,
        #[arg(long)]
        text: String,
        #[arg(long, short)]
        output: PathBuf,
        /// Also play the result on the default output device
        #[arg(long)]
        play: bool,
    },

    /// List your saved clones and what they said
    History,

    /// Manage the local account
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },

    /// Show or change settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Interactive record -> clone -> speak session (the default)
    Studio,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the settings file, with the API key masked
    Show,
    /// Print one setting, e.g. `clone.poll_interval_ms`
    Get { key: String },
    /// Change one setting and save the file
    Set { key: String, value: String },
}

#[derive(Subcommand, Debug)]
enum AuthAction {
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Signin {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Signout,
    Whoami,
}

fn main() -> Result<()> {
    setup_tracing()?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let local = tokio::task::LocalSet::new();
        local.run_until(async_main()).await
    })
}

async fn async_main() -> Result<()> {
    let args = Args::parse();
    info!("CLI startup: command={:?}, settings={:?}", args.command, args.settings);

    let app = App::load(args.settings)?;

    match args.command.unwrap_or(Command::Studio) {
        #[cfg(feature = "audio")]
        Command::Record { seconds, output } => commands::record(seconds, &output).await,
        Command::Clone {
            name,
            audio,
            welcome_output,
        } => commands::clone(&app, &name, &audio, welcome_output.as_deref()).await,
        Command::Speak {
            voice_id,
            text,
            output,
            play,
        } => commands::speak(&app, &voice_id, &text, &output, play).await,
        Command::History => commands::history(&app).await,
        Command::Auth { action } => match action {
            AuthAction::Signup { email, password } => {
                commands::sign_up(&app, &email, &password).await
            }
            AuthAction::Signin { email, password } => {
                commands::sign_in(&app, &email, &password).await
            }
            AuthAction::Signout => commands::sign_out(&app).await,
            AuthAction::Whoami => commands::whoami(&app).await,
        },
        Command::Studio => studio::Studio::new(app)?.run().await,
        Command::Config { action } => {
            let mut manager = SettingsManager::from_path(app.settings_path().to_path_buf())?;
            match action {
                ConfigAction::Show => commands::config_show(&manager),
                ConfigAction::Get { key } => commands::config_get(&manager, &key),
                ConfigAction::Set { key, value } => {
                    commands::config_set(&mut manager, &key, &value)
                }
            }
        }
    }
}

fn setup_tracing() -> Result<()> {
    use std::fs;
    use tracing_subscriber::fmt;

    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    let trace_dir = PathBuf::from(home).join(".voxclone").join("trace");
    fs::create_dir_all(&trace_dir)?;

    let log_file = trace_dir.join("voxclone.log");
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file)?;

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(file)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Tracing initialized to {:?}", log_file);
    Ok(())
}
