//! Script injection bridge for provider request rewriting.
//!
//! Some providers (bilibili today) only load inside a webview after the
//! privileged host process starts rewriting their network requests. This
//! crate owns that setup as a one-shot readiness machine: stage the
//! scripts, run the loader, get the `enable` control op acknowledged,
//! declare `Ready` (or `Failed`, terminally). Views gate on
//! [`InjectionBridge::until_ready`] and degrade to refusing the
//! provider's media when it fails; other sources keep playing.
//!
//! Everything host-specific hides behind the [`HostInjector`] and
//! [`ControlChannel`] capability traits.

mod bridge;
mod error;
mod host;
mod readiness;

pub use bridge::{InjectionBridge, DEFAULT_READY_TIMEOUT};
pub use error::{InjectionError, ReadinessError};
pub use host::{ControlChannel, FsStager, HostInjector, StagedScript};
pub use readiness::{Readiness, ReadinessCell};
