//! Cross-context state mirroring for Cinder view stores.
//!
//! A [`SyncChannel`] makes two stores (one per execution context)
//! observably equivalent: every locally-originated dispatch is forwarded
//! to the peer, every peer dispatch is applied locally, and origin tags
//! keep mirrored intents from echoing back. A late-attaching peer sends
//! `hello` and converges from the full-state snapshot reply.
//!
//! The channel is transport-agnostic: see [`transport`] for the sink/
//! receiver pair it is written against and the in-process implementation.

mod channel;
mod error;
pub mod transport;

pub use channel::SyncChannel;
pub use error::{SyncError, SyncResult};
pub use transport::{in_process_pair, MessageSink, PortEnd};
