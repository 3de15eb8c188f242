// LogScope - app/transport.rs
//
// The transport contract: the collaborator that reports connectivity,
// delivers individual push records, and serves asynchronous snapshot
// pulls for a host.
//
// The engine never blocks on the transport. A reload is request/completion:
// the engine calls `request_snapshot` and the embedding later feeds the
// outcome back via `LogEngine::on_snapshot_result`. Concrete transports
// (such as the file feed) deliver their traffic to the embedding as
// `TransportEvent` values over a channel; the embedding pumps them into
// the engine in delivery order.

use crate::core::model::{RawRecord, SnapshotItem};
use crate::util::error::TransportError;

/// Collaborator-facing pull contract.
///
/// `request_snapshot` fires an asynchronous pull of the last `limit`
/// records for `host`. The transport answers — successfully or not — by
/// causing `on_snapshot_result(host, ...)` to be invoked on the engine.
/// The engine issues at most one outstanding request per host at a time.
pub trait Transport {
    /// Current connectivity state of the transport.
    fn is_connected(&self) -> bool;

    /// Begin an asynchronous pull of the last `limit` records for `host`.
    fn request_snapshot(&mut self, host: &str, limit: usize);
}

/// Event vocabulary a concrete transport delivers to its embedding.
///
/// The embedding maps these onto engine calls one-to-one:
/// `Connectivity` → `on_connectivity_change`, `Record` → `on_raw_record`,
/// `Snapshot` → `on_snapshot_result`.
#[derive(Debug)]
pub enum TransportEvent {
    /// Connectivity state transition.
    Connectivity(bool),

    /// One pushed record, with the transport's byte-size indicator for it
    /// (passed through to batch observers opaquely).
    Record {
        record: RawRecord,
        size_hint: Option<u64>,
    },

    /// Completion of a snapshot pull previously requested for `host`.
    Snapshot {
        host: String,
        result: Result<Vec<SnapshotItem>, TransportError>,
    },
}
