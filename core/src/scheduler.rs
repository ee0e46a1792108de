use crate::frame::{self, FrameError, Task, MAX_MESSAGE_SIZE, TASK_FINISHED_COMMAND};
use crate::transport::{Rank, Source, Transport, TransportError};
use std::collections::{BTreeMap, VecDeque};
use thiserror::Error;
use tracing::{debug, error, info, trace, warn};

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("Failed to encode a task for dispatch")]
    Encode(#[from] FrameError),
    #[error("Transport failure while scheduling")]
    Transport(#[from] TransportError),
    #[error("Completion from rank {0} which has no task in flight")]
    UnknownAssignment(Rank),
}

/// Book-keeping for one `schedule_tasks` call. A task index lives in exactly
/// one of `pending`, `assigned` (as a value) or `finished[index] == true`; a
/// worker rank is either in `idle` or holds exactly one `assigned` entry.
struct SchedulingState {
    finished: Vec<bool>,
    assigned: BTreeMap<Rank, usize>,
    pending: VecDeque<usize>,
    idle: VecDeque<Rank>,
}

impl SchedulingState {
    fn new(task_count: usize, process_count: usize) -> Self {
        Self {
            finished: vec![false; task_count],
            assigned: BTreeMap::new(),
            pending: (0..task_count).collect(),
            idle: (1..process_count).collect(),
        }
    }

    fn all_finished(&self) -> bool {
        self.finished.iter().all(|done| *done)
    }
}

/// Hand `tasks` out to the workers of the group in list order as they become
/// available, wait until every task reported completion, then broadcast the
/// termination sentinel. Runs on the coordinator only; every worker must be
/// sitting in [`crate::worker::wait_for_task`] /
/// [`crate::worker::report_finished`] cycles.
///
/// A completion carries no task identifier, so it is correlated purely by
/// the sender's single outstanding assignment. A worker that reports more
/// than once per task breaks that invariant and surfaces as
/// [`ScheduleError::UnknownAssignment`].
#[tracing::instrument(skip(transport, tasks), fields(task_count = tasks.len()), level = "info")]
pub fn schedule_tasks<T: Transport>(transport: &T, tasks: &[Task]) -> Result<(), ScheduleError> {
    if transport.process_count() <= 1 {
        // the master/worker split needs at least one worker; callers are
        // expected to branch around the single-process case themselves
        error!("Cannot schedule tasks in a single-process group, nothing was dispatched");
        return Ok(());
    }

    if !tasks.is_empty() {
        let mut state = SchedulingState::new(tasks.len(), transport.process_count());

        // seed phase: one task per idle worker up front
        while !state.idle.is_empty() && !state.pending.is_empty() {
            assign_next(transport, tasks, &mut state)?;
        }

        drain_completions(transport, tasks, &mut state)?;
    }

    // every worker gets the termination sentinel, even when there was
    // nothing to schedule
    let termination = frame::encode(&Task::terminate())?;
    for rank in 1..transport.process_count() {
        debug!(rank, "Sending termination");
        transport.send(rank, termination.as_bytes())?;
    }

    info!("All tasks finished, workers released");
    Ok(())
}

/// Pop the next idle worker and pending task and dispatch one to the other.
fn assign_next<T: Transport>(
    transport: &T,
    tasks: &[Task],
    state: &mut SchedulingState,
) -> Result<(), ScheduleError> {
    let (Some(rank), Some(index)) = (state.idle.pop_front(), state.pending.pop_front()) else {
        return Ok(());
    };

    let task = &tasks[index];
    debug!(rank, index, command = task.command.as_str(), "Assigning task");

    transport.send(rank, frame::encode(task)?.as_bytes())?;
    state.assigned.insert(rank, index);

    Ok(())
}

fn drain_completions<T: Transport>(
    transport: &T,
    tasks: &[Task],
    state: &mut SchedulingState,
) -> Result<(), ScheduleError> {
    loop {
        let Some(source) = transport.probe()? else {
            continue;
        };

        let (sender, bytes) = transport.receive(Source::Rank(source), MAX_MESSAGE_SIZE)?;
        let completion = match frame::decode(&bytes) {
            Ok(task) => task,
            Err(decode_error) => {
                // dropped for liveness; this is not proof the sender held up
                // its end of the protocol
                warn!(rank = sender, error = ?decode_error, "Discarding malformed frame");
                continue;
            }
        };

        if completion.command != TASK_FINISHED_COMMAND {
            warn!(
                rank = sender,
                command = completion.command.as_str(),
                "Ignoring frame that is not a completion"
            );
            continue;
        }

        let index = state
            .assigned
            .remove(&sender)
            .ok_or(ScheduleError::UnknownAssignment(sender))?;
        state.finished[index] = true;
        state.idle.push_back(sender);
        trace!(rank = sender, index, "Task finished");

        if !state.pending.is_empty() {
            // re-feed immediately; FIFO across all idle workers, not
            // necessarily the rank that just reported
            assign_next(transport, tasks, state)?;
        } else if state.all_finished() {
            return Ok(());
        }
    }
}
