//! Per-view playback state store.
//!
//! A [`Store`] is the single mutation authority for one view's
//! [`PlaybackState`]. Every change goes through [`Store::dispatch`] as an
//! [`Intent`]; the reducer computes the next state synchronously, and
//! subscribers observe selected slices with value-equality gating. A
//! sync channel can claim the store's single forwarder slot to mirror
//! locally-originated intents to a remote peer; remotely-applied intents
//! carry the remote origin and are never re-forwarded.
//!
//! Resolved open question (recorded in DESIGN.md): an intent whose
//! resulting state is value-equal to the prior state neither notifies
//! subscribers nor forwards to the peer.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::trace;
use uuid::Uuid;

use crate::fragment::{Fragment, HashProps};
use crate::source::{MediaTitle, PlayerKind, Source};

/// Identity of a dispatch origin (one per store instance).
///
/// Carried on every forwarded message so the receiving pipeline can tell
/// local intents from mirrored ones. Uuid-backed rather than a process
/// counter: origins must stay distinct across isolated contexts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OriginId(Uuid);

impl OriginId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OriginId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OriginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "origin-{}", self.0)
    }
}

/// Playback speed ladder used by the speed-stepping intents.
pub const SPEED_OPTIONS: &[f64] = &[0.25, 0.5, 0.75, 1.0, 1.25, 1.5, 2.0, 3.0, 4.0];

/// Complete playback state of one view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackState {
    pub source: Option<Source>,
    pub current_time: f64,
    /// `None` until the element reports a usable duration.
    pub duration: Option<f64>,
    pub fragment: Option<Fragment>,
    pub looping: bool,
    pub playback_rate: f64,
    pub paused: bool,
    pub muted: bool,
    pub fullscreen: bool,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            source: None,
            current_time: 0.0,
            duration: None,
            fragment: None,
            looping: false,
            playback_rate: 1.0,
            paused: true,
            muted: false,
            fullscreen: false,
        }
    }
}

/// A state-changing intent.
///
/// Intents are plain serializable data so the sync channel can mirror
/// them across context boundaries verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum Intent {
    SetSource(Source),
    SetFragment(Option<Fragment>),
    /// Apply parsed deep-link hash props atomically.
    ApplyHash(HashProps),
    Seek(f64),
    /// Relative seek in seconds (forward positive, rewind negative).
    SkipBy(f64),
    /// Duration reported by the element on `loadedmetadata`.
    SetDuration(f64),
    /// Duration restored from a persisted snapshot.
    RevertDuration(f64),
    Play,
    Pause,
    TogglePlay,
    SetPlaybackRate(f64),
    SpeedUp,
    SpeedDown,
    ResetSpeed,
    SetMuted(bool),
    ToggleMuted,
    SetFullscreen(bool),
    SetLooping(bool),
    /// A video element proved to be audio-only (webm fix).
    SwitchToAudio,
    /// An unknown player kind proved to be a regular video.
    KindDetermined,
    /// Async title resolution finished; `None` means no title exists.
    TitleResolved(Option<String>),
}

fn clamp_time(time: f64, duration: Option<f64>) -> f64 {
    let time = time.max(0.0);
    match duration {
        Some(d) if d.is_finite() && d > 0.0 => time.min(d),
        _ => time,
    }
}

fn next_speed(rate: f64) -> f64 {
    SPEED_OPTIONS
        .iter()
        .copied()
        .find(|option| *option > rate)
        .unwrap_or_else(|| *SPEED_OPTIONS.last().expect("ladder not empty"))
}

fn prev_speed(rate: f64) -> f64 {
    SPEED_OPTIONS
        .iter()
        .rev()
        .copied()
        .find(|option| *option < rate)
        .unwrap_or_else(|| *SPEED_OPTIONS.first().expect("ladder not empty"))
}

/// Pure state transition. Unrecognized or out-of-domain values leave the
/// state untouched, which the dispatch pipeline treats as a no-op.
fn reduce(state: &PlaybackState, intent: &Intent) -> PlaybackState {
    let mut next = state.clone();
    match intent {
        Intent::SetSource(source) => {
            next.source = Some(source.clone());
            // per-media state resets; user prefs (rate, muted, loop) stay
            next.current_time = 0.0;
            next.duration = None;
            next.fragment = None;
            next.paused = true;
        }
        Intent::SetFragment(fragment) => next.fragment = *fragment,
        Intent::ApplyHash(props) => {
            next.fragment = props.fragment;
            next.looping = props.looping;
            if let Some(autoplay) = props.autoplay {
                next.paused = !autoplay;
            }
            if let Some(muted) = props.muted {
                next.muted = muted;
            }
        }
        Intent::Seek(time) => next.current_time = clamp_time(*time, state.duration),
        Intent::SkipBy(delta) => {
            next.current_time = clamp_time(state.current_time + delta, state.duration);
        }
        Intent::SetDuration(duration) => {
            if duration.is_finite() && *duration > 0.0 {
                next.duration = Some(*duration);
            }
        }
        Intent::RevertDuration(duration) => {
            if duration.is_finite() && *duration > 0.0 && state.duration.is_none() {
                next.duration = Some(*duration);
            }
        }
        Intent::Play => next.paused = false,
        Intent::Pause => next.paused = true,
        Intent::TogglePlay => next.paused = !state.paused,
        Intent::SetPlaybackRate(rate) => {
            if rate.is_finite() && *rate > 0.0 {
                next.playback_rate = *rate;
            }
        }
        Intent::SpeedUp => next.playback_rate = next_speed(state.playback_rate),
        Intent::SpeedDown => next.playback_rate = prev_speed(state.playback_rate),
        Intent::ResetSpeed => next.playback_rate = 1.0,
        Intent::SetMuted(muted) => next.muted = *muted,
        Intent::ToggleMuted => next.muted = !state.muted,
        Intent::SetFullscreen(fullscreen) => next.fullscreen = *fullscreen,
        Intent::SetLooping(looping) => next.looping = *looping,
        Intent::SwitchToAudio => {
            if let Some(
                Source::Vault { kind, .. } | Source::DirectLink { kind, .. },
            ) = next.source.as_mut()
            {
                *kind = PlayerKind::Audio;
            }
        }
        Intent::KindDetermined => {
            if let Some(
                Source::Vault { kind, .. } | Source::DirectLink { kind, .. },
            ) = next.source.as_mut()
            {
                if *kind == PlayerKind::Unknown {
                    *kind = PlayerKind::Video;
                }
            }
        }
        Intent::TitleResolved(resolved) => {
            if let Some(
                Source::DirectLink { title, .. } | Source::VideoHost { title, .. },
            ) = next.source.as_mut()
            {
                *title = match resolved {
                    Some(text) => MediaTitle::Known(text.clone()),
                    None => MediaTitle::Unavailable,
                };
            }
        }
    }
    next
}

static SUBSCRIPTION_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Handle for removing a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    fn next() -> Self {
        Self(SUBSCRIPTION_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Mirrors a locally-originated intent to the bound peer.
pub type Forwarder = Arc<dyn Fn(&Intent) + Send + Sync>;

struct SubscriberSlot {
    id: SubscriptionId,
    notify: Box<dyn FnMut(&PlaybackState) + Send>,
}

struct Inner {
    state: PlaybackState,
    subscribers: Vec<SubscriberSlot>,
    /// Ids unsubscribed while a notification pass had the slots checked
    /// out; filtered when the pass returns them.
    removed: HashSet<SubscriptionId>,
    forwarder: Option<Forwarder>,
    /// Bumped on every peer (re)bind; stale peers compare against it.
    peer_epoch: u64,
}

/// Single-writer reactive state container for one view.
pub struct Store {
    origin: OriginId,
    inner: Mutex<Inner>,
}

impl Store {
    pub fn new() -> Self {
        Self::with_state(PlaybackState::default())
    }

    /// Store seeded with an existing state (snapshot restore).
    pub fn with_state(state: PlaybackState) -> Self {
        Self {
            origin: OriginId::new(),
            inner: Mutex::new(Inner {
                state,
                subscribers: Vec::new(),
                removed: HashSet::new(),
                forwarder: None,
                peer_epoch: 0,
            }),
        }
    }

    pub fn origin(&self) -> OriginId {
        self.origin
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> PlaybackState {
        self.inner.lock().state.clone()
    }

    /// Apply a locally-originated intent.
    pub fn dispatch(&self, intent: Intent) {
        self.dispatch_from(intent, self.origin);
    }

    /// Apply an intent on behalf of `origin`.
    ///
    /// The sync channel uses this to apply mirrored intents under the
    /// remote peer's origin; such intents are not re-forwarded.
    pub fn dispatch_from(&self, intent: Intent, origin: OriginId) {
        let (new_state, forwarder, slots) = {
            let mut inner = self.inner.lock();
            let next = reduce(&inner.state, &intent);
            if next == inner.state {
                trace!(%origin, ?intent, "dispatch is a value-level no-op, skipping");
                return;
            }
            inner.state = next.clone();
            let forwarder = (origin == self.origin)
                .then(|| inner.forwarder.clone())
                .flatten();
            (next, forwarder, std::mem::take(&mut inner.subscribers))
        };
        if let Some(forward) = forwarder {
            forward(&intent);
        }
        self.run_notification_pass(slots, &new_state);
    }

    /// Replace the whole state (snapshot application).
    ///
    /// Goes through the same gated notification path as dispatch but is
    /// never forwarded: snapshots are a channel-level exchange, not an
    /// intent.
    pub fn hydrate(&self, state: PlaybackState) {
        let (new_state, slots) = {
            let mut inner = self.inner.lock();
            if state == inner.state {
                return;
            }
            inner.state = state.clone();
            (state, std::mem::take(&mut inner.subscribers))
        };
        self.run_notification_pass(slots, &new_state);
    }

    fn run_notification_pass(&self, mut slots: Vec<SubscriberSlot>, state: &PlaybackState) {
        for slot in &mut slots {
            (slot.notify)(state);
        }
        // merge back, dropping anything unsubscribed mid-pass and keeping
        // subscribers added by callbacks
        let mut inner = self.inner.lock();
        slots.retain(|slot| !inner.removed.contains(&slot.id));
        slots.append(&mut inner.subscribers);
        inner.subscribers = slots;
        inner.removed.clear();
    }

    /// Observe a selected slice of state.
    ///
    /// `selector` runs on every committed state; `callback` fires only
    /// when the selected value changes (compared by value), receiving the
    /// new slice and the previous one. With `immediate`, the callback
    /// additionally fires once, synchronously, with the current value and
    /// no previous one.
    pub fn subscribe<S, F>(
        &self,
        selector: impl Fn(&PlaybackState) -> S + Send + 'static,
        mut callback: F,
        immediate: bool,
    ) -> SubscriptionId
    where
        S: Clone + PartialEq + Send + 'static,
        F: FnMut(&S, Option<&S>) + Send + 'static,
    {
        let id = SubscriptionId::next();
        let initial = selector(&self.inner.lock().state);
        if immediate {
            callback(&initial, None);
        }
        let mut last = initial;
        let notify = Box::new(move |state: &PlaybackState| {
            let next = selector(state);
            if next != last {
                let previous = std::mem::replace(&mut last, next);
                callback(&last, Some(&previous));
            }
        });
        self.inner.lock().subscribers.push(SubscriberSlot { id, notify });
        id
    }

    /// Remove a subscription. Safe to call for an already-removed id.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        let mut inner = self.inner.lock();
        inner.subscribers.retain(|slot| slot.id != id);
        inner.removed.insert(id);
    }

    /// Claim the store's single peer slot, replacing any previous binding.
    ///
    /// Returns the binding epoch; the previous peer (if any) is detached
    /// by the bump and must stop applying messages.
    pub fn bind_peer(&self, forwarder: Forwarder) -> u64 {
        let mut inner = self.inner.lock();
        inner.forwarder = Some(forwarder);
        inner.peer_epoch += 1;
        inner.peer_epoch
    }

    /// Release the peer slot if `epoch` is still the active binding.
    pub fn unbind_peer(&self, epoch: u64) -> bool {
        let mut inner = self.inner.lock();
        if inner.peer_epoch == epoch {
            inner.forwarder = None;
            true
        } else {
            false
        }
    }

    /// Epoch of the active peer binding (0 = never bound).
    pub fn peer_epoch(&self) -> u64 {
        self.inner.lock().peer_epoch
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::parse_hash;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn youtube_source() -> Source {
        Source::from_url("https://youtu.be/dQw4w9WgXcQ").unwrap()
    }

    #[test]
    fn dispatch_commits_synchronously() {
        let store = Store::new();
        store.dispatch(Intent::Seek(42.0));
        assert_eq!(store.state().current_time, 42.0);
    }

    #[test]
    fn seek_clamps_into_known_duration() {
        let store = Store::new();
        store.dispatch(Intent::SetDuration(100.0));
        store.dispatch(Intent::Seek(250.0));
        assert_eq!(store.state().current_time, 100.0);
        store.dispatch(Intent::SkipBy(-500.0));
        assert_eq!(store.state().current_time, 0.0);
    }

    #[test]
    fn seek_unclamped_while_duration_unknown() {
        let store = Store::new();
        store.dispatch(Intent::Seek(250.0));
        assert_eq!(store.state().current_time, 250.0);
    }

    #[test]
    fn set_source_resets_per_media_state() {
        let store = Store::new();
        store.dispatch(Intent::SetDuration(100.0));
        store.dispatch(Intent::Seek(50.0));
        store.dispatch(Intent::SetLooping(true));
        store.dispatch(Intent::SetSource(youtube_source()));
        let state = store.state();
        assert_eq!(state.current_time, 0.0);
        assert_eq!(state.duration, None);
        assert_eq!(state.fragment, None);
        assert!(state.paused);
        // user prefs survive a source switch
        assert!(state.looping);
    }

    #[test]
    fn revert_duration_never_overrides_live_value() {
        let store = Store::new();
        store.dispatch(Intent::SetDuration(100.0));
        store.dispatch(Intent::RevertDuration(55.0));
        assert_eq!(store.state().duration, Some(100.0));
    }

    #[test]
    fn speed_stepping_walks_the_ladder() {
        let store = Store::new();
        store.dispatch(Intent::SpeedUp);
        assert_eq!(store.state().playback_rate, 1.25);
        store.dispatch(Intent::SetPlaybackRate(1.1));
        store.dispatch(Intent::SpeedUp);
        assert_eq!(store.state().playback_rate, 1.25);
        store.dispatch(Intent::SpeedDown);
        assert_eq!(store.state().playback_rate, 1.0);
        store.dispatch(Intent::SetPlaybackRate(4.0));
        store.dispatch(Intent::SpeedUp);
        assert_eq!(store.state().playback_rate, 4.0);
        store.dispatch(Intent::ResetSpeed);
        assert_eq!(store.state().playback_rate, 1.0);
    }

    #[test]
    fn apply_hash_sets_fragment_and_flags_atomically() {
        let store = Store::new();
        let observed = Arc::new(AtomicU32::new(0));
        let observed_in_cb = observed.clone();
        store.subscribe(
            |state| (state.fragment, state.looping),
            move |(fragment, looping), _| {
                assert!(fragment.is_some());
                assert!(looping);
                observed_in_cb.fetch_add(1, Ordering::SeqCst);
            },
            false,
        );
        store.dispatch(Intent::ApplyHash(parse_hash("#t=10,20&loop")));
        assert_eq!(observed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn subscriber_fires_only_on_selected_slice_change() {
        let store = Store::new();
        let fires = Arc::new(AtomicU32::new(0));
        let fires_in_cb = fires.clone();
        store.subscribe(
            |state| state.fragment,
            move |_, _| {
                fires_in_cb.fetch_add(1, Ordering::SeqCst);
            },
            false,
        );
        store.dispatch(Intent::Seek(10.0));
        store.dispatch(Intent::Play);
        assert_eq!(fires.load(Ordering::SeqCst), 0);
        store.dispatch(Intent::SetFragment(Some(
            Fragment::new(1.0, 2.0).unwrap(),
        )));
        assert_eq!(fires.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn immediate_subscription_fires_synchronously_with_no_previous() {
        let store = Store::new();
        store.dispatch(Intent::Seek(7.0));
        let fired = Arc::new(AtomicU32::new(0));
        let fired_in_cb = fired.clone();
        store.subscribe(
            |state| state.current_time,
            move |current, previous| {
                assert_eq!(*current, 7.0);
                assert!(previous.is_none());
                fired_in_cb.fetch_add(1, Ordering::SeqCst);
            },
            true,
        );
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn subscriber_receives_new_and_old_slice() {
        let store = Store::new();
        store.dispatch(Intent::Seek(1.0));
        let checked = Arc::new(AtomicU32::new(0));
        let checked_in_cb = checked.clone();
        store.subscribe(
            |state| state.current_time,
            move |current, previous| {
                assert_eq!(*current, 2.0);
                assert_eq!(previous.copied(), Some(1.0));
                checked_in_cb.fetch_add(1, Ordering::SeqCst);
            },
            false,
        );
        store.dispatch(Intent::Seek(2.0));
        assert_eq!(checked.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn value_equal_dispatch_is_silent() {
        let store = Store::new();
        store.dispatch(Intent::Seek(5.0));
        let fires = Arc::new(AtomicU32::new(0));
        let fires_in_cb = fires.clone();
        store.subscribe(
            |state| state.clone(),
            move |_, _| {
                fires_in_cb.fetch_add(1, Ordering::SeqCst);
            },
            false,
        );
        store.dispatch(Intent::Seek(5.0));
        store.dispatch(Intent::Pause); // already paused
        assert_eq!(fires.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let store = Store::new();
        let fires = Arc::new(AtomicU32::new(0));
        let fires_in_cb = fires.clone();
        let id = store.subscribe(
            |state| state.paused,
            move |_, _| {
                fires_in_cb.fetch_add(1, Ordering::SeqCst);
            },
            false,
        );
        store.dispatch(Intent::Play);
        store.unsubscribe(id);
        store.dispatch(Intent::Pause);
        assert_eq!(fires.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn local_dispatch_reaches_forwarder_remote_does_not() {
        let store = Store::new();
        let forwarded = Arc::new(AtomicU32::new(0));
        let forwarded_in_cb = forwarded.clone();
        store.bind_peer(Arc::new(move |_| {
            forwarded_in_cb.fetch_add(1, Ordering::SeqCst);
        }));
        store.dispatch(Intent::Seek(10.0));
        assert_eq!(forwarded.load(Ordering::SeqCst), 1);
        store.dispatch_from(Intent::Seek(20.0), OriginId::new());
        assert_eq!(forwarded.load(Ordering::SeqCst), 1);
        assert_eq!(store.state().current_time, 20.0);
    }

    #[test]
    fn redelivered_intent_is_idempotent() {
        let store = Store::new();
        let remote = OriginId::new();
        let intent = Intent::SetFragment(Some(Fragment::new(10.0, 20.0).unwrap()));
        store.dispatch_from(intent.clone(), remote);
        let once = store.state();
        store.dispatch_from(intent, remote);
        assert_eq!(store.state(), once);
    }

    #[test]
    fn rebinding_replaces_previous_peer() {
        let store = Store::new();
        let first = Arc::new(AtomicU32::new(0));
        let first_in_cb = first.clone();
        let epoch_one = store.bind_peer(Arc::new(move |_| {
            first_in_cb.fetch_add(1, Ordering::SeqCst);
        }));
        let second = Arc::new(AtomicU32::new(0));
        let second_in_cb = second.clone();
        let epoch_two = store.bind_peer(Arc::new(move |_| {
            second_in_cb.fetch_add(1, Ordering::SeqCst);
        }));
        assert!(epoch_two > epoch_one);
        store.dispatch(Intent::Play);
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
        // a stale unbind must not detach the new peer
        assert!(!store.unbind_peer(epoch_one));
        assert!(store.unbind_peer(epoch_two));
    }

    #[test]
    fn hydrate_notifies_without_forwarding() {
        let store = Store::new();
        let forwarded = Arc::new(AtomicU32::new(0));
        let forwarded_in_cb = forwarded.clone();
        store.bind_peer(Arc::new(move |_| {
            forwarded_in_cb.fetch_add(1, Ordering::SeqCst);
        }));
        let fires = Arc::new(AtomicU32::new(0));
        let fires_in_cb = fires.clone();
        store.subscribe(
            |state| state.current_time,
            move |_, _| {
                fires_in_cb.fetch_add(1, Ordering::SeqCst);
            },
            false,
        );
        let mut snapshot = PlaybackState::default();
        snapshot.current_time = 42.0;
        store.hydrate(snapshot);
        assert_eq!(fires.load(Ordering::SeqCst), 1);
        assert_eq!(forwarded.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn title_resolution_updates_remote_source() {
        let store = Store::new();
        store.dispatch(Intent::SetSource(youtube_source()));
        store.dispatch(Intent::TitleResolved(Some("Never Gonna Give You Up".into())));
        match store.state().source.unwrap() {
            Source::VideoHost { title, .. } => {
                assert_eq!(title, MediaTitle::Known("Never Gonna Give You Up".into()));
            }
            other => panic!("expected host source, got {other:?}"),
        }
        store.dispatch(Intent::TitleResolved(None));
        match store.state().source.unwrap() {
            Source::VideoHost { title, .. } => assert_eq!(title, MediaTitle::Unavailable),
            other => panic!("expected host source, got {other:?}"),
        }
    }

    #[test]
    fn switch_to_audio_rewrites_player_kind() {
        let store = Store::new();
        store.dispatch(Intent::SetSource(Source::from_url(
            "https://example.com/cast.webm",
        )
        .unwrap()));
        store.dispatch(Intent::SwitchToAudio);
        assert_eq!(store.state().source.unwrap().kind(), PlayerKind::Audio);
    }

    #[test]
    fn intents_survive_the_json_boundary() {
        let intents = vec![
            Intent::SetSource(youtube_source()),
            Intent::SetFragment(Some(Fragment::new(10.0, 20.0).unwrap())),
            Intent::ApplyHash(parse_hash("#t=5&loop")),
            Intent::Seek(12.5),
            Intent::TogglePlay,
            Intent::TitleResolved(None),
        ];
        for intent in intents {
            let json = serde_json::to_string(&intent).unwrap();
            let back: Intent = serde_json::from_str(&json).unwrap();
            assert_eq!(back, intent);
        }
    }
}
