//! Capability interfaces supplied by the embedding environment.
//!
//! The privileged host process is environment-specific; the bridge only
//! sees these traits. [`FsStager`] is the common staging building block:
//! scripts land on disk under unique names so a stale artifact from a
//! crashed run never collides with a fresh one.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use crate::error::InjectionError;

/// Handle to a staged script artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedScript {
    pub path: PathBuf,
}

/// Stages and runs scripts inside the privileged host process.
#[async_trait]
pub trait HostInjector: Send + Sync {
    /// Persist `script` where the host can load it; returns the handle.
    async fn stage(&self, name: &str, script: &str) -> Result<StagedScript, InjectionError>;

    /// Execute a staged script with host privileges.
    async fn run(&self, script: &StagedScript) -> Result<(), InjectionError>;

    /// Remove a staged artifact. Must succeed on already-removed files.
    async fn cleanup(&self, script: StagedScript) -> Result<(), InjectionError>;
}

/// The provider request-rewrite control surface.
///
/// Both operations are fire-and-forget for the caller, but each must be
/// acknowledged (return `Ok`) before the bridge declares readiness.
#[async_trait]
pub trait ControlChannel: Send + Sync {
    /// Activate request rewriting with the staged payload script.
    async fn enable(&self, script: &Path) -> Result<(), InjectionError>;

    /// Deactivate request rewriting.
    async fn disable(&self) -> Result<(), InjectionError>;
}

/// Filesystem staging into a designated directory.
#[derive(Debug, Clone)]
pub struct FsStager {
    dir: PathBuf,
}

impl FsStager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Write `contents` under a unique name derived from `name`.
    pub async fn stage(&self, name: &str, contents: &str) -> Result<StagedScript, InjectionError> {
        let path = self.dir.join(format!("{name}.{}.js", Uuid::new_v4()));
        tokio::fs::write(&path, contents).await?;
        debug!(path = %path.display(), "staged script");
        Ok(StagedScript { path })
    }

    /// Remove a staged artifact; a missing file is not an error.
    pub async fn remove(&self, script: StagedScript) -> Result<(), InjectionError> {
        match tokio::fs::remove_file(&script.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
