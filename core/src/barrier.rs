use crate::frame::MAX_MESSAGE_SIZE;
use crate::transport::{Source, Transport, TransportError, COORDINATOR_RANK};
use thiserror::Error;
use tracing::{debug, trace, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarkerError {
    #[error("Barrier markers must not be empty")]
    Empty,
    #[error("Marker of {0} bytes cannot fit the frame capacity of {MAX_MESSAGE_SIZE}")]
    TooLong(usize),
}

#[derive(Error, Debug)]
pub enum BarrierError {
    #[error("Transport failure during rendezvous")]
    Transport(#[from] TransportError),
}

/// Application-chosen payload identifying one side of a rendezvous. Length
/// is checked here so a marker that could never cross the wire fails at
/// construction instead of stalling a barrier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker(String);

impl Marker {
    pub fn new(value: impl Into<String>) -> Result<Self, MarkerError> {
        let value = value.into();

        if value.is_empty() {
            Err(MarkerError::Empty)
        } else if value.len() > MAX_MESSAGE_SIZE {
            Err(MarkerError::TooLong(value.len()))
        } else {
            Ok(Self(value))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Two-phase rendezvous between the coordinator and every worker, called
/// identically by all ranks. The coordinator collects one `arrival` marker
/// per worker, in whatever order they happen to land, then sends `release`
/// to every worker in ascending rank order. Nobody passes the barrier until
/// everybody reached it.
pub fn barrier<T: Transport>(
    transport: &T,
    arrival: &Marker,
    release: &Marker,
) -> Result<(), BarrierError> {
    if transport.is_coordinator() {
        gather_arrivals(transport, arrival)?;
        release_workers(transport, release)?;
    } else {
        debug!(
            rank = transport.rank(),
            marker = arrival.as_str(),
            "Sending arrival to the coordinator"
        );
        transport.send(COORDINATOR_RANK, arrival.as_bytes())?;
        await_release(transport, release)?;
    }

    debug!(rank = transport.rank(), "Rendezvous passed");
    Ok(())
}

/// Rendezvous every process runs right before tearing the group down, so no
/// rank exits while another still expects it to answer.
pub fn final_rendezvous<T: Transport>(transport: &T) -> Result<(), BarrierError> {
    // fixed values, both trivially valid markers
    let arrival = Marker("FINAL1".into());
    let release = Marker("FINAL2".into());

    barrier(transport, &arrival, &release)
}

fn gather_arrivals<T: Transport>(transport: &T, arrival: &Marker) -> Result<(), BarrierError> {
    // sized to the group at hand, there is no fixed rank ceiling
    let mut arrived = vec![false; transport.process_count()];
    arrived[COORDINATOR_RANK] = true;

    while arrived.iter().any(|flag| !flag) {
        // non-blocking probe keeps the coordinator responsive to arrivals
        // from any source instead of committing to one rank
        let Some(source) = transport.probe()? else {
            continue;
        };

        let (sender, bytes) = transport.receive(Source::Rank(source), arrival.len())?;
        if bytes == arrival.as_bytes() {
            trace!(rank = sender, "Arrival marker received");
            arrived[sender] = true;
        } else {
            // stray or retried message that happens to be pending, not ours
            warn!(rank = sender, "Discarding non-arrival message during rendezvous");
        }
    }

    Ok(())
}

fn release_workers<T: Transport>(transport: &T, release: &Marker) -> Result<(), BarrierError> {
    for rank in 1..transport.process_count() {
        trace!(rank, "Releasing worker");
        transport.send(rank, release.as_bytes())?;
    }

    Ok(())
}

fn await_release<T: Transport>(transport: &T, release: &Marker) -> Result<(), BarrierError> {
    loop {
        let (_, bytes) = transport.receive(Source::Rank(COORDINATOR_RANK), release.len())?;
        if bytes == release.as_bytes() {
            return Ok(());
        }

        // byte-exact comparison: a stale message sharing the length must not
        // release this worker early
        warn!(
            rank = transport.rank(),
            "Discarding unexpected message while waiting for release"
        );
    }
}
