use std::fmt;
use thiserror::Error;

/// Fixed capacity of every frame on the wire. Shared by all participants,
/// changing it breaks wire compatibility with running peers.
pub const MAX_MESSAGE_SIZE: usize = 256;

pub const OPEN_MARKER: u8 = b'<';
pub const CLOSE_MARKER: u8 = b'>';
pub const FIELD_DELIMITER: char = ';';
pub const FILLER: u8 = b'#';

/// Reserved command a worker sends once its current task is done.
pub const TASK_FINISHED_COMMAND: &str = "TASKDONE";
/// Reserved command the coordinator broadcasts to release all workers.
pub const TERMINATE_COMMAND: &str = "TERMINATE";

// 3 size digits + open marker + field delimiter + close marker
const FRAME_OVERHEAD: usize = 6;
const SIZE_DIGITS: usize = 3;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("Command or parameters contain the reserved delimiter '{FIELD_DELIMITER}'")]
    InvalidPayload,
    #[error("Encoded payload of {0} bytes exceeds the frame capacity of {MAX_MESSAGE_SIZE}")]
    FrameTooLarge(usize),
    #[error("Frame is malformed: {0}")]
    MalformedFrame(&'static str),
}

/// One unit of dispatchable work: an opaque (command, parameters) pair.
/// The coordinator never interprets either field beyond the reserved
/// sentinel commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub command: String,
    pub parameters: String,
}

impl Task {
    pub fn new(command: impl Into<String>, parameters: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            parameters: parameters.into(),
        }
    }

    /// Completion sentinel sent by [`crate::worker::report_finished`].
    pub fn finished() -> Self {
        Self::new(TASK_FINISHED_COMMAND, "")
    }

    /// Termination sentinel broadcast by [`crate::scheduler::schedule_tasks`].
    pub fn terminate() -> Self {
        Self::new(TERMINATE_COMMAND, "")
    }

    /// Sentinel check: a task is empty only when both fields are empty.
    /// A task with an empty command but non-empty parameters still counts
    /// as real work (the upstream predicate had this inverted).
    pub fn is_empty(&self) -> bool {
        self.command.is_empty() && self.parameters.is_empty()
    }

    /// Whether this task is the termination sentinel. Dispatch loops must
    /// test for this and break out of their receive loop.
    pub fn is_termination(&self) -> bool {
        self.command == TERMINATE_COMMAND
    }
}

/// Fixed-size wire representation of a [`Task`], built right before a send
/// and discarded right after decode.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame([u8; MAX_MESSAGE_SIZE]);

impl Frame {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        // only the payload is interesting, drop the trailing filler
        let end = self
            .0
            .iter()
            .rposition(|byte| *byte != FILLER)
            .map_or(0, |position| position + 1);

        write!(
            formatter,
            "Frame({:?})",
            String::from_utf8_lossy(&self.0[..end])
        )
    }
}

/// Render a task into a padded fixed-size frame:
/// `NNN<command;parameters>` followed by filler up to [`MAX_MESSAGE_SIZE`],
/// where `NNN` is the zero-padded decimal length of everything up to and
/// including the close marker.
pub fn encode(task: &Task) -> Result<Frame, FrameError> {
    if task.command.contains(FIELD_DELIMITER) || task.parameters.contains(FIELD_DELIMITER) {
        return Err(FrameError::InvalidPayload);
    }

    let payload_len = FRAME_OVERHEAD + task.command.len() + task.parameters.len();
    if payload_len > MAX_MESSAGE_SIZE {
        return Err(FrameError::FrameTooLarge(payload_len));
    }

    let mut buffer = [FILLER; MAX_MESSAGE_SIZE];
    let digits = format!("{payload_len:03}");
    buffer[..SIZE_DIGITS].copy_from_slice(digits.as_bytes());
    buffer[SIZE_DIGITS] = OPEN_MARKER;

    let mut at = SIZE_DIGITS + 1;
    buffer[at..at + task.command.len()].copy_from_slice(task.command.as_bytes());
    at += task.command.len();
    buffer[at] = FIELD_DELIMITER as u8;
    at += 1;
    buffer[at..at + task.parameters.len()].copy_from_slice(task.parameters.as_bytes());
    buffer[payload_len - 1] = CLOSE_MARKER;

    Ok(Frame(buffer))
}

/// Decode a received frame back into a task. Trailing filler beyond the
/// declared payload length is never inspected, so a partially reused buffer
/// decodes fine. A payload without a field delimiter yields empty parameters.
pub fn decode(bytes: &[u8]) -> Result<Task, FrameError> {
    if bytes.len() < FRAME_OVERHEAD {
        return Err(FrameError::MalformedFrame("shorter than the fixed header"));
    }

    let digits = std::str::from_utf8(&bytes[..SIZE_DIGITS])
        .map_err(|_| FrameError::MalformedFrame("length field is not ASCII"))?;
    let payload_len = digits
        .parse::<usize>()
        .map_err(|_| FrameError::MalformedFrame("length field is not decimal"))?;

    if payload_len < FRAME_OVERHEAD || payload_len > bytes.len() {
        return Err(FrameError::MalformedFrame("length field out of range"));
    }
    if bytes[SIZE_DIGITS] != OPEN_MARKER {
        return Err(FrameError::MalformedFrame("missing open marker"));
    }
    if bytes[payload_len - 1] != CLOSE_MARKER {
        return Err(FrameError::MalformedFrame("missing close marker"));
    }

    let body = std::str::from_utf8(&bytes[SIZE_DIGITS + 1..payload_len - 1])
        .map_err(|_| FrameError::MalformedFrame("payload is not valid UTF-8"))?;

    let (command, parameters) = match body.split_once(FIELD_DELIMITER) {
        Some(fields) => fields,
        None => (body, ""),
    };

    Ok(Task::new(command, parameters))
}

#[cfg(test)]
mod codec_test;
