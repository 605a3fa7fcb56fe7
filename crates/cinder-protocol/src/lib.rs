//! Wire contract between a view store and its remote peer.
//!
//! Everything crossing the context boundary is plain serde data, never
//! ports, handles or host object references. Origin tags come from
//! `cinder-core` since the store's own dispatch pipeline checks them.

mod message;

pub use cinder_core::store::OriginId;
pub use message::SyncMessage;
