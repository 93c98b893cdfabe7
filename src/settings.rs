use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, SettingsError};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AccessibilitySettings {
    pub high_contrast: bool,
    pub reduced_motion: bool,
    pub text_to_speech: bool,
    pub voice_commands: bool,
    pub speech_rate: f32,
    pub speech_pitch: f32,
    pub speech_volume: f32,
}

impl Default for AccessibilitySettings {
    fn default() -> Self {
        Self {
            high_contrast: false,
            reduced_motion: false,
            text_to_speech: true,
            voice_commands: true,
            speech_rate: 1.0,
            speech_pitch: 1.0,
            speech_volume: 1.0,
        }
    }
}

impl AccessibilitySettings {
    fn validate(&self) -> std::result::Result<(), SettingsError> {
        let ranges = [
            ("accessibility.speechRate", self.speech_rate, 0.1, 10.0),
            ("accessibility.speechPitch", self.speech_pitch, 0.0, 2.0),
            ("accessibility.speechVolume", self.speech_volume, 0.0, 1.0),
        ];
        for (key, value, min, max) in ranges {
            if !(min..=max).contains(&value) {
                return Err(SettingsError::InvalidValue {
                    key: key.to_string(),
                    reason: format!("must be between {min} and {max}"),
                });
            }
        }
        Ok(())
    }
}

/// Persistent user preferences. Missing fields in a stored file fall back to
/// their defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub user_name: String,
    pub accessibility: AccessibilitySettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            user_name: "You".to_string(),
            accessibility: AccessibilitySettings::default(),
        }
    }
}

impl Settings {
    /// Look up a dotted key such as `accessibility.speechRate`.
    pub fn get(&self, key: &str) -> Result<Value> {
        let tree = serde_json::to_value(self)?;
        lookup(&tree, key)
            .cloned()
            .ok_or_else(|| SettingsError::UnknownKey(key.to_string()).into())
    }

    /// Set a dotted key from its textual value. The result must still
    /// deserialize into `Settings`, otherwise nothing changes.
    pub fn set(&mut self, key: &str, raw: &str) -> Result<()> {
        let mut tree = serde_json::to_value(&*self)?;
        let slot = lookup_mut(&mut tree, key)
            .ok_or_else(|| SettingsError::UnknownKey(key.to_string()))?;

        *slot = if slot.is_string() {
            Value::String(raw.to_string())
        } else {
            serde_json::from_str(raw).map_err(|e| SettingsError::InvalidValue {
                key: key.to_string(),
                reason: e.to_string(),
            })?
        };

        let updated: Settings =
            serde_json::from_value(tree).map_err(|e| SettingsError::InvalidValue {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
        if updated.user_name.trim().is_empty() {
            return Err(SettingsError::InvalidValue {
                key: key.to_string(),
                reason: "user name must not be blank".to_string(),
            }
            .into());
        }
        updated.accessibility.validate()?;

        *self = updated;
        Ok(())
    }

    pub fn apply(&mut self, assignment: &str) -> Result<()> {
        let (key, value) = parse_assignment(assignment)?;
        self.set(key, value)
    }

    /// Every leaf key with its current value, in document order.
    pub fn entries(&self) -> Result<Vec<(String, Value)>> {
        let tree = serde_json::to_value(self)?;
        let mut out = Vec::new();
        flatten("", &tree, &mut out);
        Ok(out)
    }
}

/// Split `KEY=VALUE`.
pub fn parse_assignment(assignment: &str) -> std::result::Result<(&str, &str), SettingsError> {
    match assignment.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value.trim())),
        _ => Err(SettingsError::MalformedAssignment(assignment.to_string())),
    }
}

fn lookup<'a>(tree: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.')
        .try_fold(tree, |node, part| node.get(part))
        .filter(|v| !v.is_object())
}

fn lookup_mut<'a>(tree: &'a mut Value, key: &str) -> Option<&'a mut Value> {
    key.split('.')
        .try_fold(tree, |node, part| node.get_mut(part))
        .filter(|v| !v.is_object())
}

fn flatten(prefix: &str, node: &Value, out: &mut Vec<(String, Value)>) {
    match node {
        Value::Object(map) => {
            for (k, v) in map {
                let key = if prefix.is_empty() {
                    k.clone()
                } else {
                    format!("{prefix}.{k}")
                };
                flatten(&key, v, out);
            }
        }
        leaf => out.push((prefix.to_string(), leaf.clone())),
    }
}

pub trait SettingsStore {
    fn load(&self) -> Settings;
    fn save(&self, settings: &Settings) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "limber") {
            pd.config_dir().join("settings.json")
        } else {
            PathBuf::from("limber_settings.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileSettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsStore for FileSettingsStore {
    fn load(&self) -> Settings {
        if let Ok(bytes) = fs::read(&self.path) {
            match serde_json::from_slice::<Settings>(&bytes) {
                Ok(settings) => return settings,
                Err(e) => tracing::warn!(path = %self.path.display(), "ignoring unreadable settings: {e}"),
            }
        }
        Settings::default()
    }

    fn save(&self, settings: &Settings) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(settings)?;
        fs::write(&self.path, data)
    }
}
