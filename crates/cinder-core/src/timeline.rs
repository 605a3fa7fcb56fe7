//! Fragment controller: pure seek/pause decisions for clip ranges.
//!
//! Each function maps `(fragment, media, looping)` onto at most one seek
//! or pause. None of them touch the store; they react to media events and
//! the store's fragment slice, and the element's own events feed any
//! resulting position change back through the normal dispatch path.

use tracing::debug;

use crate::fragment::Fragment;
use crate::media::MediaSurface;

/// React to the fragment slice changing.
///
/// Seeks to the fragment start only when the media is paused and outside
/// the range. While playing, correction is deferred to the next
/// `timeupdate` tick, since seeking under an active dispatch causes visible
/// jitter when a fragment is set mid-scrub.
pub fn on_fragment_change(fragment: Option<&Fragment>, media: &mut dyn MediaSurface) {
    let Some(fragment) = fragment else { return };
    if !media.paused() {
        return;
    }
    let (start, end) = fragment.clamped_to(media.duration());
    let position = media.current_time();
    if position < start || position > end {
        debug!(position, start, "fragment set outside position, seeking to start");
        media.seek(start);
    }
}

/// Gate a `play` event: playback starting outside the range snaps to the
/// fragment start before proceeding.
pub fn on_play(fragment: Option<&Fragment>, media: &mut dyn MediaSurface) {
    let Some(fragment) = fragment else { return };
    let (start, end) = fragment.clamped_to(media.duration());
    let position = media.current_time();
    if position < start || position >= end {
        media.seek(start);
    }
}

/// React to a `timeupdate` tick.
///
/// Reaching the fragment end either loops back to the start (`looping`,
/// non-degenerate range) or pauses once and clamps to the end. A paused
/// element already sitting at the end is left alone, so redelivered ticks
/// never re-trigger a seek.
pub fn on_time_update(fragment: Option<&Fragment>, media: &mut dyn MediaSurface, looping: bool) {
    let Some(fragment) = fragment else { return };
    let (start, end) = fragment.clamped_to(media.duration());
    let position = media.current_time();
    if position < end {
        return;
    }
    if looping && start < end {
        media.seek(start);
    } else {
        if !media.paused() {
            debug!(end, "fragment end reached, pausing");
            media.pause();
        }
        if position > end {
            media.seek(end);
        }
    }
}
