use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use voxclone_core::auth::{AuthProvider, Identity, LocalAuth};
use voxclone_core::lifecycle::{CloneLifecycle, EventSender, LifecycleEvent};
use voxclone_core::persistence::{CloneStore, JsonFileStore};
use voxclone_core::settings::{Settings, SettingsManager, API_KEY_ENV};
use voxclone_core::voice::cartesia::Cartesia;
use voxclone_core::voice::VoiceCloneProvider;

/// Everything a command needs, built once from the settings file.
pub struct App {
    pub settings: Settings,
    pub data_dir: PathBuf,
    pub store: Arc<dyn CloneStore>,
    pub auth: LocalAuth,
    settings_path: PathBuf,
}

impl App {
    pub fn load(settings_path: Option<PathBuf>) -> Result<Self> {
        let manager = match settings_path {
            Some(path) => SettingsManager::from_path(path)?,
            None => SettingsManager::new()?,
        };
        let settings = manager.settings().clone();
        let data_dir = settings
            .data_dir()
            .context("could not determine a data directory; set storage.data_dir")?;

        Ok(Self {
            store: Arc::new(JsonFileStore::new(&data_dir)),
            auth: LocalAuth::new(&data_dir),
            settings_path: manager.path().to_path_buf(),
            data_dir,
            settings,
        })
    }

    pub fn provider(&self) -> Result<Arc<dyn VoiceCloneProvider>> {
        let config = self.settings.cartesia_config().with_context(|| {
            format!(
                "no Cartesia API key: set provider.api_key in {} or export {API_KEY_ENV}",
                self.settings_path.display()
            )
        })?;
        Ok(Arc::new(Cartesia::new(config)))
    }

    pub fn lifecycle(&self) -> Result<(CloneLifecycle, mpsc::UnboundedReceiver<LifecycleEvent>)> {
        let (events, event_rx) = EventSender::new();
        let lifecycle =
            CloneLifecycle::new(self.provider()?, self.store.clone(), &self.settings, events);
        Ok((lifecycle, event_rx))
    }

    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    pub async fn identity(&self) -> Option<Identity> {
        self.auth.current_identity().await
    }
}
