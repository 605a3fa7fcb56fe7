//! The injection bridge: stage, run, enable, declare ready.
//!
//! Mirrors the provider request-rewrite setup: a loader script is run
//! once in the privileged host (and always removed again, success or
//! not), then the payload script is handed to the `enable` control
//! operation. Only after both acks does the bridge declare `Ready`.
//! The staged payload outlives `enable` (it is the host's to load) and
//! is released by [`InjectionBridge::disable`], which is safe to call in
//! any state, any number of times.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{InjectionError, ReadinessError};
use crate::host::{ControlChannel, HostInjector, StagedScript};
use crate::readiness::{Readiness, ReadinessCell};

/// Default wait for readiness, matching the view-side default.
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_millis(5_000);

/// Readiness-gated script injection for one provider.
pub struct InjectionBridge {
    readiness: ReadinessCell,
    injector: Arc<dyn HostInjector>,
    control: Arc<dyn ControlChannel>,
    staged_payload: Mutex<Option<StagedScript>>,
}

impl InjectionBridge {
    pub fn new(injector: Arc<dyn HostInjector>, control: Arc<dyn ControlChannel>) -> Self {
        Self {
            readiness: ReadinessCell::new(),
            injector,
            control,
            staged_payload: Mutex::new(None),
        }
    }

    pub fn readiness(&self) -> Readiness {
        self.readiness.current()
    }

    /// Run the full enable flow and transition the shared readiness.
    ///
    /// One-shot: once the bridge is terminal this returns the terminal
    /// outcome without re-triggering injection, so late callers cannot
    /// double-inject.
    pub async fn enable(
        &self,
        loader_script: &str,
        payload_script: &str,
    ) -> Result<(), ReadinessError> {
        match self.readiness.current() {
            Readiness::Ready => return Ok(()),
            Readiness::Failed(reason) => return Err(ReadinessError::Failed(reason)),
            Readiness::Pending => {}
        }
        match self.try_enable(loader_script, payload_script).await {
            Ok(()) => {
                self.readiness.mark_ready();
                Ok(())
            }
            Err(err) => {
                warn!(%err, "provider injection failed");
                self.readiness.mark_failed(err.to_string());
                Err(ReadinessError::Failed(err.to_string()))
            }
        }
    }

    async fn try_enable(
        &self,
        loader_script: &str,
        payload_script: &str,
    ) -> Result<(), InjectionError> {
        let payload = self.injector.stage("payload", payload_script).await?;
        // park the handle first: disable() must be able to release it even
        // if anything below fails partway
        *self.staged_payload.lock() = Some(payload.clone());

        let loader = self.injector.stage("loader", loader_script).await?;
        let run_result = self.injector.run(&loader).await;
        if let Err(err) = self.injector.cleanup(loader).await {
            warn!(%err, "failed to remove loader script");
        }
        run_result?;
        debug!("loader ran, enabling request rewrite");

        self.control.enable(&payload.path).await?;
        Ok(())
    }

    /// Tear down: disable request rewriting and release the staged
    /// payload. Idempotent, safe after a failed or never-run enable.
    pub async fn disable(&self) {
        if let Err(err) = self.control.disable().await {
            warn!(%err, "disable control op failed");
        }
        let staged = self.staged_payload.lock().take();
        if let Some(script) = staged {
            if let Err(err) = self.injector.cleanup(script).await {
                warn!(%err, "failed to remove staged payload");
            }
        }
    }

    /// Wait for the terminal readiness transition; see
    /// [`ReadinessCell::until_ready`] for the per-waiter timeout rule.
    pub async fn until_ready(&self, timeout: Duration) -> Result<(), ReadinessError> {
        self.readiness.until_ready(timeout).await
    }
}
