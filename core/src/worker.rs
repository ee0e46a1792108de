use crate::frame::{self, FrameError, Task, MAX_MESSAGE_SIZE};
use crate::transport::{Source, Transport, TransportError, COORDINATOR_RANK};
use thiserror::Error;
use tracing::{debug, trace};

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Received an undecodable frame from the coordinator")]
    Decode(#[from] FrameError),
    #[error("Transport failure in the worker loop")]
    Transport(#[from] TransportError),
}

/// Block until the coordinator hands this process a task. Returns `None` in
/// a single-process group, where there is no coordinator to wait on and the
/// caller drives whatever local queue it has itself.
///
/// The termination sentinel comes back like any other task; the dispatch
/// loop is expected to test it with [`Task::is_termination`] and stop.
pub fn wait_for_task<T: Transport>(transport: &T) -> Result<Option<Task>, WorkerError> {
    if transport.process_count() <= 1 {
        return Ok(None);
    }

    loop {
        let (_, bytes) = transport.receive(Source::Rank(COORDINATOR_RANK), MAX_MESSAGE_SIZE)?;
        let task = frame::decode(&bytes)?;

        if task.is_empty() {
            // stray empty sentinel, not work; wait for the next frame
            trace!(rank = transport.rank(), "Skipping empty task frame");
            continue;
        }

        debug!(
            rank = transport.rank(),
            command = task.command.as_str(),
            "Task received"
        );
        return Ok(Some(task));
    }
}

/// Tell the coordinator the current task is done. Must be sent exactly once
/// per received task: the completion carries no identifier, the coordinator
/// correlates it to this rank's single outstanding assignment. No-op in a
/// single-process group.
pub fn report_finished<T: Transport>(transport: &T) -> Result<(), WorkerError> {
    if transport.process_count() <= 1 {
        return Ok(());
    }

    let completion = frame::encode(&Task::finished())?;
    transport.send(COORDINATOR_RANK, completion.as_bytes())?;
    trace!(rank = transport.rank(), "Completion reported");

    Ok(())
}
