//! The sync channel: one store, one peer, observable equivalence.
//!
//! Binding claims the store's single peer slot and starts a reader task
//! over the port's inbound half. Locally-originated dispatches are
//! mirrored out through the store's forwarder hook; inbound `dispatch`
//! messages are applied under the remote origin, which the forwarder
//! check recognizes and never sends back. That is the loop-prevention
//! invariant.
//!
//! Detachment (a `bye`, an explicit [`SyncChannel::unbind`], or a failed
//! post) is always local and never fatal: forwarding stops, in-flight
//! inbound messages are dropped, and the store keeps working unbound. A
//! peer that rebinds must send a fresh `hello`; the channel makes no
//! delivery promise across a detach/reattach boundary.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use cinder_core::store::Store;
use cinder_protocol::SyncMessage;

use crate::error::{SyncError, SyncResult};
use crate::transport::{MessageSink, PortEnd};

/// A store bound to a remote peer over an abstract port.
pub struct SyncChannel {
    store: Arc<Store>,
    sink: Arc<dyn MessageSink>,
    epoch: u64,
    detached: Arc<AtomicBool>,
    reader: JoinHandle<()>,
}

fn post(sink: &Arc<dyn MessageSink>, message: &SyncMessage) -> SyncResult<()> {
    sink.post(message.to_json_line()?)
}

impl SyncChannel {
    /// Bind `store` to the peer behind `port`, replacing any previous
    /// binding (the stale peer stops forwarding and applying).
    ///
    /// Must run inside a tokio runtime; the reader task lives until
    /// detach.
    pub fn bind(store: Arc<Store>, port: PortEnd) -> Self {
        let PortEnd { sink, incoming } = port;
        let detached = Arc::new(AtomicBool::new(false));

        let epoch = {
            let sink = sink.clone();
            let detached = detached.clone();
            let origin = store.origin();
            store.bind_peer(Arc::new(move |intent| {
                if detached.load(Ordering::SeqCst) {
                    return;
                }
                let message = SyncMessage::Dispatch {
                    intent: intent.clone(),
                    origin,
                };
                if let Err(err) = post(&sink, &message) {
                    warn!(%origin, %err, "peer unreachable, dropping forwarding");
                    detached.store(true, Ordering::SeqCst);
                }
            }))
        };

        let reader = tokio::spawn(read_loop(
            store.clone(),
            sink.clone(),
            incoming,
            epoch,
            detached.clone(),
        ));

        debug!(epoch, origin = %store.origin(), "sync peer attached");
        Self {
            store,
            sink,
            epoch,
            detached,
            reader,
        }
    }

    /// Announce this side to the peer and request its state snapshot.
    ///
    /// Required after every (re)bind: convergence comes from the snapshot
    /// reply, never from partial history.
    pub fn hello(&self) -> SyncResult<()> {
        if self.is_detached() {
            return Err(SyncError::Detached);
        }
        let result = post(&self.sink, &SyncMessage::Hello);
        if result.is_err() {
            self.mark_detached();
        }
        result
    }

    /// Orderly detach: tell the peer goodbye (best effort) and release
    /// the store's peer slot. Idempotent.
    pub fn unbind(&self) {
        if self.detached.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(err) = post(&self.sink, &SyncMessage::Bye) {
            debug!(%err, "peer already gone during unbind");
        }
        self.store.unbind_peer(self.epoch);
        self.reader.abort();
        debug!(epoch = self.epoch, "sync peer detached");
    }

    /// Whether forwarding has stopped (bye, unbind, or send failure).
    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::SeqCst)
    }

    fn mark_detached(&self) {
        self.detached.store(true, Ordering::SeqCst);
    }
}

impl Drop for SyncChannel {
    fn drop(&mut self) {
        self.reader.abort();
        if !self.detached.swap(true, Ordering::SeqCst) {
            self.store.unbind_peer(self.epoch);
        }
    }
}

async fn read_loop(
    store: Arc<Store>,
    sink: Arc<dyn MessageSink>,
    mut incoming: mpsc::UnboundedReceiver<String>,
    epoch: u64,
    detached: Arc<AtomicBool>,
) {
    while let Some(raw) = incoming.recv().await {
        if detached.load(Ordering::SeqCst) || store.peer_epoch() != epoch {
            // stale binding: drop the message, a newer peer owns the slot
            break;
        }
        let message = match SyncMessage::from_json(&raw) {
            Ok(message) => message,
            Err(err) => {
                warn!(%err, "dropping malformed sync message");
                continue;
            }
        };
        match message {
            SyncMessage::Hello => {
                let snapshot = SyncMessage::Snapshot {
                    state: store.state(),
                };
                if let Err(err) = post(&sink, &snapshot) {
                    warn!(%err, "failed to answer hello, detaching");
                    break;
                }
            }
            SyncMessage::Snapshot { state } => store.hydrate(state),
            SyncMessage::Dispatch { intent, origin } => store.dispatch_from(intent, origin),
            SyncMessage::Bye => {
                debug!(epoch, "peer said bye");
                break;
            }
        }
    }
    detached.store(true, Ordering::SeqCst);
    store.unbind_peer(epoch);
}
