//! Abstract message transport.
//!
//! The channel never touches a concrete port type: it posts serialized
//! JSON lines into a [`MessageSink`] and reads inbound lines from an mpsc
//! receiver. Any bidirectional byte transport that preserves per-port
//! order can back it: the in-process pair here, a socket, or a pipe.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::{SyncError, SyncResult};

/// Outbound half of a port: accepts serialized messages.
///
/// Implementations must preserve posting order. A failed post means the
/// peer is unreachable; the channel reacts by detaching, so `post` should
/// fail fast rather than retry.
pub trait MessageSink: Send + Sync {
    fn post(&self, raw: String) -> SyncResult<()>;
}

/// One end of a bidirectional port.
pub struct PortEnd {
    pub sink: Arc<dyn MessageSink>,
    pub incoming: mpsc::UnboundedReceiver<String>,
}

struct MpscSink {
    tx: mpsc::UnboundedSender<String>,
}

impl MessageSink for MpscSink {
    fn post(&self, raw: String) -> SyncResult<()> {
        self.tx.send(raw).map_err(|_| SyncError::Closed)
    }
}

/// Connected in-process port pair.
///
/// Messages pass through their JSON form even in-process, so anything not
/// serializable is caught in tests, not in production against a real
/// boundary.
pub fn in_process_pair() -> (PortEnd, PortEnd) {
    let (a_tx, a_rx) = mpsc::unbounded_channel();
    let (b_tx, b_rx) = mpsc::unbounded_channel();
    (
        PortEnd {
            sink: Arc::new(MpscSink { tx: b_tx }),
            incoming: a_rx,
        },
        PortEnd {
            sink: Arc::new(MpscSink { tx: a_tx }),
            incoming: b_rx,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pair_is_cross_wired() {
        let (a, mut b) = in_process_pair();
        a.sink.post("ping".into()).unwrap();
        assert_eq!(b.incoming.recv().await.unwrap(), "ping");
    }

    #[tokio::test]
    async fn preserves_send_order() {
        let (a, mut b) = in_process_pair();
        for i in 0..10 {
            a.sink.post(format!("msg-{i}")).unwrap();
        }
        for i in 0..10 {
            assert_eq!(b.incoming.recv().await.unwrap(), format!("msg-{i}"));
        }
    }

    #[tokio::test]
    async fn post_fails_once_peer_is_dropped() {
        let (a, b) = in_process_pair();
        drop(b);
        assert!(matches!(a.sink.post("ping".into()), Err(SyncError::Closed)));
    }
}
