//! Media element abstraction and `loadedmetadata` fixups.

use crate::source::PlayerKind;

/// Seek target used to force the browser to materialize a real duration
/// for streams that report none (notably some webm files). The element is
/// seeked here once, then reset to 0 on the next `timeupdate`.
pub const DURATION_PROBE_TIME: f64 = 1e101;

/// Minimal surface of a playable element.
///
/// The timeline controller and metadata fixups are written against this
/// trait so they stay pure and testable; the embedding layer adapts the
/// real element (audio/video/iframe/webview) behind it.
pub trait MediaSurface {
    fn current_time(&self) -> f64;
    fn seek(&mut self, time: f64);
    /// Known duration, if the element has reported one.
    fn duration(&self) -> Option<f64>;
    fn paused(&self) -> bool;
    fn pause(&mut self);
    fn play(&mut self);
}

/// Corrective actions decided on `loadedmetadata`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataFix {
    /// A video element decoded with zero dimensions is audio-only.
    SwitchToAudio,
    /// An `Unknown` player kind has proven to be a regular video.
    KindDetermined,
    /// Duration is missing or infinite; seek to [`DURATION_PROBE_TIME`],
    /// then reset to 0 on the next `timeupdate` once the real duration is
    /// known.
    ProbeDuration,
}

/// Decide fixups for a freshly loaded element.
///
/// `dimensions` is the decoded video size, `None` for audio elements.
pub fn on_loaded_metadata(
    kind: PlayerKind,
    dimensions: Option<(u32, u32)>,
    duration: Option<f64>,
) -> Vec<MetadataFix> {
    let mut fixes = Vec::new();
    match dimensions {
        Some((width, height)) if width == 0 || height == 0 => {
            fixes.push(MetadataFix::SwitchToAudio);
        }
        _ => {
            if kind == PlayerKind::Unknown {
                fixes.push(MetadataFix::KindDetermined);
            }
        }
    }
    match duration {
        Some(d) if d.is_finite() && d > 0.0 => {}
        _ => fixes.push(MetadataFix::ProbeDuration),
    }
    fixes
}

/// Kick off a duration probe on the element.
pub fn apply_duration_probe(media: &mut dyn MediaSurface) {
    media.seek(DURATION_PROBE_TIME);
}
