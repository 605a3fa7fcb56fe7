//! Per-vault settings for the media core.
//!
//! Loaded from a TOML file with serde defaults, so a missing or partial
//! file always yields a usable configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Settings load failures.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse settings file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Which video-host providers resolve in-app.
///
/// A disabled provider's links fall through classification to the general
/// webview (or fail closed if that is disabled too).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderToggles {
    pub youtube: bool,
    pub bilibili: bool,
    pub vimeo: bool,
    pub general: bool,
}

impl Default for ProviderToggles {
    fn default() -> Self {
        Self {
            youtube: true,
            bilibili: true,
            vimeo: true,
            general: true,
        }
    }
}

/// Media core settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Seconds subtracted from a taken timestamp, to compensate for
    /// reaction time.
    pub timestamp_offset: f64,
    /// How long a view waits for provider injection readiness.
    pub readiness_timeout_ms: u64,
    pub providers: ProviderToggles,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timestamp_offset: 0.0,
            readiness_timeout_ms: 5_000,
            providers: ProviderToggles::default(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    pub fn readiness_timeout(&self) -> Duration {
        Duration::from_millis(self.readiness_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_are_usable() {
        let settings = Settings::default();
        assert_eq!(settings.readiness_timeout(), Duration::from_millis(5_000));
        assert!(settings.providers.youtube);
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "timestamp_offset = 2.5").unwrap();
        writeln!(file, "[providers]").unwrap();
        writeln!(file, "bilibili = false").unwrap();
        let settings = Settings::load(file.path()).unwrap();
        assert_eq!(settings.timestamp_offset, 2.5);
        assert!(!settings.providers.bilibili);
        assert!(settings.providers.youtube);
        assert_eq!(settings.readiness_timeout_ms, 5_000);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(matches!(
            Settings::load("/nonexistent/cinder.toml"),
            Err(SettingsError::Io(_))
        ));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "timestamp_offset = [not a number").unwrap();
        assert!(matches!(
            Settings::load(file.path()),
            Err(SettingsError::Parse(_))
        ));
    }
}
