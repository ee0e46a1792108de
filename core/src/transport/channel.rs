use super::{Rank, Source, Transport, TransportError};
use parking_lot::{Condvar, Mutex};
use std::{collections::VecDeque, sync::Arc};
use tracing::trace;

#[derive(Default)]
struct Mailbox {
    queue: Mutex<VecDeque<(Rank, Vec<u8>)>>,
    arrival: Condvar,
}

/// In-process stand-in for an MPI-style process group. Every rank gets one
/// [`ChannelTransport`] endpoint, usually moved onto its own thread. One
/// mailbox per rank keeps per-sender FIFO order while messages from
/// different senders interleave however the threads are scheduled, matching
/// the ordering contract of [`Transport`].
pub struct ChannelGroup;

impl ChannelGroup {
    /// Stand up a group of `process_count` endpoints; the vector index is
    /// the rank. Dropping every endpoint tears the group down.
    pub fn create(process_count: usize) -> Vec<ChannelTransport> {
        assert!(process_count >= 1, "A process group needs at least one rank");

        let mailboxes: Arc<[Mailbox]> = (0..process_count).map(|_| Mailbox::default()).collect();

        (0..process_count)
            .map(|rank| ChannelTransport {
                rank,
                mailboxes: Arc::clone(&mailboxes),
            })
            .collect()
    }
}

pub struct ChannelTransport {
    rank: Rank,
    mailboxes: Arc<[Mailbox]>,
}

impl Transport for ChannelTransport {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn process_count(&self) -> usize {
        self.mailboxes.len()
    }

    fn send(&self, destination: Rank, bytes: &[u8]) -> Result<(), TransportError> {
        let mailbox = self
            .mailboxes
            .get(destination)
            .ok_or(TransportError::UnknownRank(destination))?;

        mailbox.queue.lock().push_back((self.rank, bytes.to_vec()));
        mailbox.arrival.notify_all();

        trace!(from = self.rank, to = destination, bytes = bytes.len(), "Message delivered");
        Ok(())
    }

    fn receive(&self, source: Source, capacity: usize) -> Result<(Rank, Vec<u8>), TransportError> {
        if let Source::Rank(rank) = source {
            if rank >= self.mailboxes.len() {
                return Err(TransportError::UnknownRank(rank));
            }
        }

        let mailbox = &self.mailboxes[self.rank];
        let mut queue = mailbox.queue.lock();

        loop {
            let position = match source {
                Source::Any => (!queue.is_empty()).then_some(0),
                Source::Rank(rank) => queue.iter().position(|(sender, _)| *sender == rank),
            };

            match position.and_then(|index| queue.remove(index)) {
                Some((sender, mut bytes)) => {
                    bytes.truncate(capacity);
                    return Ok((sender, bytes));
                }
                None => mailbox.arrival.wait(&mut queue),
            }
        }
    }

    fn probe(&self) -> Result<Option<Rank>, TransportError> {
        let queue = self.mailboxes[self.rank].queue.lock();

        Ok(queue.front().map(|(sender, _)| *sender))
    }
}

#[cfg(test)]
#[path = "channel_test.rs"]
mod channel_test;
