//! Host view-state snapshots.
//!
//! The surrounding application persists a small snapshot per view and
//! hands it back on restore. Exactly one of `file` / `url` must be set;
//! anything else indicates a logic bug upstream and is refused loudly.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

use crate::error::{ClassificationError, StateInvariantError};
use crate::fragment::Fragment;
use crate::settings::ProviderToggles;
use crate::source::Source;
use crate::store::{Intent, PlaybackState, Store};

/// Snapshot restore failures.
#[derive(Debug, Error)]
pub enum RestoreError {
    #[error(transparent)]
    Invariant(#[from] StateInvariantError),
    #[error(transparent)]
    Classification(#[from] ClassificationError),
}

/// Persisted view state, produced on every state read and consumed on
/// view restore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewStateSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub fragment: Option<Fragment>,
    #[serde(default)]
    pub current_time: f64,
    #[serde(default)]
    pub duration: Option<f64>,
}

impl ViewStateSnapshot {
    /// Enforce the exactly-one-of-file/url invariant.
    pub fn validate(&self) -> Result<(), StateInvariantError> {
        match (&self.file, &self.url) {
            (Some(_), Some(_)) => Err(StateInvariantError::BothFileAndUrl),
            (None, None) => Err(StateInvariantError::NeitherFileNorUrl),
            _ => Ok(()),
        }
    }

    /// Capture a snapshot from live state.
    pub fn capture(state: &PlaybackState) -> Result<Self, StateInvariantError> {
        let source = state
            .source
            .as_ref()
            .ok_or(StateInvariantError::NeitherFileNorUrl)?;
        let (file, url) = match source {
            Source::Vault { path, .. } => (Some(path.clone()), None),
            Source::DirectLink { url, .. } | Source::VideoHost { url, .. } => {
                (None, Some(url.clone()))
            }
        };
        Ok(Self {
            file,
            url,
            fragment: state.fragment,
            current_time: state.current_time,
            duration: state.duration,
        })
    }

    /// Replay this snapshot into a store.
    ///
    /// Order matters and mirrors the view's restore path: source first
    /// (which resets per-media state), then fragment, then seek, then the
    /// persisted duration as a fallback value.
    pub fn restore(&self, store: &Store, providers: &ProviderToggles) -> Result<(), RestoreError> {
        if let Err(invariant) = self.validate() {
            error!(%invariant, snapshot = ?self, "refusing invalid view state snapshot");
            return Err(invariant.into());
        }
        let source = match (&self.file, &self.url) {
            (Some(file), None) => Source::from_vault_path(file),
            (None, Some(url)) => Source::from_url_with(url, providers)?,
            _ => unreachable!("validated above"),
        };
        store.dispatch(Intent::SetSource(source));
        store.dispatch(Intent::SetFragment(self.fragment));
        if self.current_time > 0.0 {
            store.dispatch(Intent::Seek(self.current_time));
        }
        if let Some(duration) = self.duration {
            store.dispatch(Intent::RevertDuration(duration));
        }
        Ok(())
    }
}
