use crate::settings::config::Settings;
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use toml::Value;

/// The settings file and what was read from it.
///
/// A missing file is created with defaults. A file that no longer parses is
/// moved aside to `settings.toml.backup` and replaced with defaults, so a bad
/// edit never stops voxclone from starting.
pub struct SettingsManager {
    settings_path: PathBuf,
    settings: Settings,
}

impl SettingsManager {
    /// Open `~/.voxclone/settings.toml`.
    pub fn new() -> Result<Self> {
        let home = dirs::home_dir().context("Failed to get home directory")?;
        Self::from_path(home.join(".voxclone").join("settings.toml"))
    }

    pub fn from_path(path: PathBuf) -> Result<Self> {
        let settings = if path.exists() {
            read_or_restore(&path)?
        } else {
            let defaults = Settings::default();
            write_settings(&path, &defaults)?;
            defaults
        };

        if let Err(e) = settings.validate() {
            tracing::warn!(error = %e, path = ?path, "settings out of range, using safe values");
        }

        Ok(Self {
            settings_path: path,
            settings,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn path(&self) -> &Path {
        &self.settings_path
    }

    /// Current value of a `section.field` key, as it would be written.
    pub fn get(&self, key: &str) -> Result<String> {
        let document = Value::try_from(&self.settings).context("Failed to serialize settings")?;
        match lookup(&document, key) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => Ok(other.to_string()),
            None if is_known_optional(key) => Ok(String::new()),
            None => bail!("Unknown setting {key}"),
        }
    }

    /// Change one `section.field` key and write the file.
    ///
    /// `value` is read as a bool or number where the field expects one,
    /// otherwise as a string. The result must deserialize and validate
    /// before anything is written.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let (section, field) = key
            .split_once('.')
            .with_context(|| format!("Setting keys look like section.field, got {key}"))?;

        let mut document =
            Value::try_from(&self.settings).context("Failed to serialize settings")?;
        if document.get(section).and_then(Value::as_table).is_none() {
            bail!("Unknown settings section {section}");
        }

        let mut last_error = None;
        let mut updated = None;
        for candidate in candidates(value) {
            if let Some(table) = document.get_mut(section).and_then(Value::as_table_mut) {
                table.insert(field.to_string(), candidate);
            }
            match document.clone().try_into::<Settings>() {
                Ok(settings) => {
                    updated = Some(settings);
                    break;
                }
                Err(e) => last_error = Some(e),
            }
        }
        let updated = match (updated, last_error) {
            (Some(settings), _) => settings,
            (None, Some(e)) => bail!("Invalid value for {key}: {e}"),
            (None, None) => bail!("Invalid value for {key}"),
        };

        // Unknown fields are ignored on deserialize; catch them here.
        let written = Value::try_from(&updated).context("Failed to serialize settings")?;
        if lookup(&written, key).is_none() {
            bail!("Unknown setting {key}");
        }
        updated.validate()?;

        write_settings(&self.settings_path, &updated)?;
        tracing::info!(key, path = ?self.settings_path, "setting updated");
        self.settings = updated;
        Ok(())
    }
}

fn is_known_optional(key: &str) -> bool {
    key == "storage.data_dir"
}

fn lookup<'a>(document: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.').try_fold(document, |value, part| value.get(part))
}

fn candidates(raw: &str) -> Vec<Value> {
    let mut values = Vec::new();
    if let Ok(b) = raw.parse::<bool>() {
        values.push(Value::Boolean(b));
    }
    if let Ok(i) = raw.parse::<i64>() {
        values.push(Value::Integer(i));
    }
    if let Ok(f) = raw.parse::<f64>() {
        values.push(Value::Float(f));
    }
    values.push(Value::String(raw.to_string()));
    values
}

fn read_or_restore(path: &Path) -> Result<Settings> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("Failed to read settings from {path:?}"))?;

    match toml::from_str(&contents) {
        Ok(settings) => Ok(settings),
        Err(e) => {
            tracing::warn!(error = %e, ?path, "settings file is corrupt, restoring defaults");
            let backup_path = path.with_extension("toml.backup");
            fs::rename(path, &backup_path).with_context(|| {
                format!("Failed to backup corrupted settings to {backup_path:?}")
            })?;
            let defaults = Settings::default();
            write_settings(path, &defaults)?;
            Ok(defaults)
        }
    }
}

fn write_settings(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {parent:?}"))?;
    }
    let contents = toml::to_string_pretty(settings).context("Failed to serialize settings")?;
    fs::write(path, contents).with_context(|| format!("Failed to write settings to {path:?}"))
}
