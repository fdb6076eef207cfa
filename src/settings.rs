//! Local preference store: API key, selected model and theme.
//!
//! Preferences are loaded once and handed around as an explicit
//! [`ClientContext`]. Writes go straight to disk, last write wins.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::{
    error::{ImageGenError, Result},
    models::{Credential, ModelId},
};

pub const PREFERENCES_FILE: &str = "preferences.json";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl FromStr for Theme {
    type Err = ImageGenError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(ImageGenError::validation(
                "Unknown theme.",
                format!("'{}' is not a theme; use light or dark.", other),
            )),
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Theme::Light => f.write_str("light"),
            Theme::Dark => f.write_str("dark"),
        }
    }
}

#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelId>,
    #[serde(default)]
    pub theme: Theme,
}

impl fmt::Debug for Preferences {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Preferences")
            .field(
                "api_key",
                &self
                    .api_key
                    .as_deref()
                    .and_then(Credential::new)
                    .map(|c| c.redacted()),
            )
            .field("model", &self.model)
            .field("theme", &self.theme)
            .finish()
    }
}

/// What the encoder and upstream client need from the user's settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientContext {
    pub credential: Option<Credential>,
    pub model: ModelId,
}

impl ClientContext {
    pub fn new(credential: Option<Credential>, model: ModelId) -> Self {
        Self { credential, model }
    }

    /// Builds a context from loosely typed request fields. Blank values fall
    /// back to "missing" and to `default_model`.
    pub fn from_request(api_key: Option<&str>, model: Option<&str>, default_model: &ModelId) -> Self {
        Self {
            credential: api_key.and_then(Credential::new),
            model: model
                .and_then(ModelId::parse)
                .unwrap_or_else(|| default_model.clone()),
        }
    }
}

#[derive(Debug)]
pub struct PreferenceStore {
    path: PathBuf,
    preferences: Preferences,
}

impl PreferenceStore {
    pub fn default_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("ai", "S-Image", "s-image").ok_or_else(|| {
            ImageGenError::Storage("Could not determine a configuration directory".into())
        })?;
        Ok(dirs.config_dir().join(PREFERENCES_FILE))
    }

    /// Reads the store once. A missing file yields defaults.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let preferences = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                ImageGenError::Storage(format!(
                    "Preferences file {} is corrupt: {}",
                    path.display(),
                    e
                ))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Preferences::default(),
            Err(e) => {
                return Err(ImageGenError::Storage(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };
        log::debug!("Loaded preferences from {}", path.display());
        Ok(Self { path, preferences })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn set_api_key(&mut self, api_key: &str) -> Result<()> {
        let credential = Credential::new(api_key).ok_or_else(|| {
            ImageGenError::validation("API Key is missing.", "Refusing to store an empty API key.")
        })?;
        self.preferences.api_key = Some(credential.expose().to_string());
        self.save()
    }

    pub fn clear_api_key(&mut self) -> Result<()> {
        self.preferences.api_key = None;
        self.save()
    }

    pub fn set_model(&mut self, model: ModelId) -> Result<()> {
        self.preferences.model = Some(model);
        self.save()
    }

    pub fn set_theme(&mut self, theme: Theme) -> Result<()> {
        self.preferences.theme = theme;
        self.save()
    }

    pub fn context(&self, default_model: &ModelId) -> ClientContext {
        ClientContext {
            credential: self.preferences.api_key.as_deref().and_then(Credential::new),
            model: self
                .preferences
                .model
                .clone()
                .unwrap_or_else(|| default_model.clone()),
        }
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ImageGenError::Storage(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }
        let contents = serde_json::to_string_pretty(&self.preferences)?;
        fs::write(&self.path, contents).map_err(|e| {
            ImageGenError::Storage(format!("Failed to write {}: {}", self.path.display(), e))
        })?;
        restrict_permissions(&self.path);
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
        log::warn!("Could not restrict permissions on {}: {}", path.display(), e);
    }
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) {}
