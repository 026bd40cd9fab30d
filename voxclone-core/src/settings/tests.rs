use crate::settings::manager::SettingsManager;
use crate::settings::{Settings, MIN_POLL_INTERVAL_MS};
use crate::voice::CloneMode;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_missing_file_is_created_with_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let settings_path = temp_dir.path().join("nested").join("settings.toml");

    let manager = SettingsManager::from_path(settings_path.clone()).unwrap();

    assert!(settings_path.exists());
    assert_eq!(manager.settings(), &Settings::default());
    assert_eq!(manager.settings().clone.min_audio_bytes, 5 * 1024);
    assert_eq!(manager.settings().speech.max_text_chars, 500);
}

#[test]
fn test_corrupt_file_is_backed_up() {
    let temp_dir = TempDir::new().unwrap();
    let settings_path = temp_dir.path().join("settings.toml");
    std::fs::write(&settings_path, "this is [not toml").unwrap();

    let manager = SettingsManager::from_path(settings_path.clone()).unwrap();

    assert_eq!(manager.settings(), &Settings::default());
    let backup = temp_dir.path().join("settings.toml.backup");
    assert_eq!(std::fs::read_to_string(backup).unwrap(), "this is [not toml");
}

#[test]
fn test_partial_file_fills_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let settings_path = temp_dir.path().join("settings.toml");
    std::fs::write(
        &settings_path,
        "[clone]\nmode = \"similarity\"\npoll_interval_ms = 250\n\n[speech]\nwelcome_enabled = false\n",
    )
    .unwrap();

    let manager = SettingsManager::from_path(settings_path).unwrap();
    let settings = manager.settings();

    assert_eq!(settings.clone.mode, CloneMode::Similarity);
    assert_eq!(settings.clone.poll_interval_ms, 250);
    assert_eq!(settings.clone.language, "en");
    assert_eq!(settings.speech.model_id, "sonic-2");
    assert_eq!(settings.speech.welcome_text(), None);
}

#[test]
fn test_zero_poll_interval_is_floored() {
    let temp_dir = TempDir::new().unwrap();
    let settings_path = temp_dir.path().join("settings.toml");
    std::fs::write(&settings_path, "[clone]\npoll_interval_ms = 0\n").unwrap();

    let manager = SettingsManager::from_path(settings_path).unwrap();

    assert!(manager.settings().validate().is_err());
    assert_eq!(
        manager.settings().clone.poll_interval(),
        Duration::from_millis(MIN_POLL_INTERVAL_MS)
    );
}

#[test]
fn test_set_writes_typed_values() {
    let temp_dir = TempDir::new().unwrap();
    let settings_path = temp_dir.path().join("settings.toml");
    let mut manager = SettingsManager::from_path(settings_path.clone()).unwrap();

    manager.set("provider.api_key", "12345").unwrap();
    manager.set("clone.poll_interval_ms", "2000").unwrap();
    manager.set("clone.mode", "similarity").unwrap();
    manager.set("speech.welcome_enabled", "false").unwrap();
    let data_dir = temp_dir.path().join("data");
    manager
        .set("storage.data_dir", &data_dir.display().to_string())
        .unwrap();

    let reloaded = SettingsManager::from_path(settings_path).unwrap();
    let settings = reloaded.settings();
    assert_eq!(settings.api_key().as_deref(), Some("12345"));
    assert_eq!(settings.clone.poll_interval_ms, 2000);
    assert_eq!(settings.clone.mode, CloneMode::Similarity);
    assert_eq!(settings.speech.welcome_text(), None);
    assert_eq!(settings.data_dir(), Some(data_dir));
    assert_eq!(reloaded.get("clone.poll_interval_ms").unwrap(), "2000");
    assert_eq!(reloaded.get("clone.mode").unwrap(), "similarity");
}

#[test]
fn test_set_rejects_bad_input_without_writing() {
    let temp_dir = TempDir::new().unwrap();
    let settings_path = temp_dir.path().join("settings.toml");
    let mut manager = SettingsManager::from_path(settings_path.clone()).unwrap();
    let before = std::fs::read_to_string(&settings_path).unwrap();

    assert!(manager.set("clone.poll_interval_ms", "0").is_err());
    assert!(manager.set("clone.poll_interval_ms", "soon").is_err());
    assert!(manager.set("clone.mode", "loud").is_err());
    assert!(manager.set("clone.colour", "blue").is_err());
    assert!(manager.set("nonsense.key", "1").is_err());
    assert!(manager.set("nodot", "1").is_err());

    assert_eq!(std::fs::read_to_string(&settings_path).unwrap(), before);
    assert_eq!(manager.settings(), &Settings::default());
    assert!(manager.get("clone.colour").is_err());
    assert_eq!(manager.get("storage.data_dir").unwrap(), "");
}
