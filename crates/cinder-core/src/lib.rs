//! Playback state core for Cinder media views.
//!
//! One [`Store`](store::Store) per view owns the complete
//! [`PlaybackState`](store::PlaybackState); every mutation is a dispatched
//! [`Intent`](store::Intent), so state changes are observable, replayable
//! and mirrorable across execution contexts. On top of the store sit the
//! source classifier ([`source`]), the fragment/timeline controller
//! ([`timeline`]), deep-link hash handling ([`fragment`]) and the host
//! view-state snapshot exchange ([`view_state`]).
//!
//! Cross-context mirroring itself lives in `cinder-sync`; this crate only
//! exposes the origin-tagged dispatch pipeline it plugs into.

pub mod error;
pub mod fragment;
pub mod media;
pub mod settings;
pub mod source;
pub mod store;
pub mod timecode;
pub mod timeline;
pub mod title;
pub mod view_state;

pub use error::{ClassificationError, StateInvariantError};
pub use fragment::{parse_hash, Fragment, HashProps};
pub use media::{MediaSurface, MetadataFix};
pub use settings::{ProviderToggles, Settings};
pub use source::{MediaTitle, PlayerKind, Provider, Source};
pub use store::{Intent, OriginId, PlaybackState, Store, SubscriptionId};
pub use view_state::ViewStateSnapshot;
