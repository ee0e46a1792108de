pub mod channel;

use thiserror::Error;

pub type Rank = usize;

/// The distinguished rank that owns the task list and drives scheduling.
pub const COORDINATOR_RANK: Rank = 0;

/// Source selector for a receive: one specific rank or whichever rank has a
/// message pending first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Rank(Rank),
    Any,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Rank {0} does not exist in this process group")]
    UnknownRank(Rank),
    #[error("The process group has shut down")]
    Disconnected,
}

/// Point-to-point message passing between a fixed set of cooperating
/// processes. Delivery is reliable and ordered per sender/receiver pair;
/// messages from different senders may interleave in any order, which is why
/// the scheduler and barrier keep per-rank state instead of assuming a
/// global sequence.
///
/// Identity is written once when the group comes up and read-only afterward,
/// so `rank`/`process_count` need no synchronization.
pub trait Transport {
    /// Rank of the calling process, stable for the whole run. The
    /// coordinator is always rank 0.
    fn rank(&self) -> Rank;

    /// Total number of processes in the group, fixed for the run.
    fn process_count(&self) -> usize;

    /// Blocking, reliable send of `bytes` to `destination`.
    fn send(&self, destination: Rank, bytes: &[u8]) -> Result<(), TransportError>;

    /// Blocking receive of at most `capacity` bytes from `source`. Returns
    /// the actual sender (meaningful for [`Source::Any`]) and the received
    /// bytes, truncated to `capacity`.
    fn receive(&self, source: Source, capacity: usize) -> Result<(Rank, Vec<u8>), TransportError>;

    /// Non-blocking probe: the rank of a pending message from any source, if
    /// one is available. The message itself is not consumed.
    fn probe(&self) -> Result<Option<Rank>, TransportError>;

    fn is_coordinator(&self) -> bool {
        self.rank() == COORDINATOR_RANK
    }
}
