use serde::{Deserialize, Serialize};
use taskfarm_core::frame::{FIELD_DELIMITER, TASK_FINISHED_COMMAND, TERMINATE_COMMAND};
use tracing::error;

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(deny_unknown_fields)]
pub struct FarmConfig {
    // total group size, including the coordinator rank
    #[serde(default = "default_processes")]
    pub processes: usize,

    // per-task wall clock limit in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    pub tasks: Vec<TaskSpec>,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(deny_unknown_fields)]
pub struct TaskSpec {
    /// Executable to run on the receiving worker
    pub command: String,

    /// Whitespace-separated arguments, passed through the frame untouched
    #[serde(default)]
    pub params: String,
}

impl FarmConfig {
    /// Catch all config mistakes in one pass instead of piece-by-piece to
    /// make debugging easier for users. Returns whether any error was hit.
    pub fn preflight_checks(&self) -> bool {
        let mut contains_error = false;

        if self.processes == 0 {
            error!("processes must be at least 1");
            contains_error = true;
        }

        if self.timeout == 0 {
            error!("timeout cannot be 0, every task would be killed immediately");
            contains_error = true;
        }

        for (index, task) in self.tasks.iter().enumerate() {
            if task.command.is_empty() {
                error!("tasks[{index}].command must not be empty");
                contains_error = true;
            }

            if task.command.contains(FIELD_DELIMITER) || task.params.contains(FIELD_DELIMITER) {
                error!(
                    "tasks[{index}] contains the reserved delimiter '{FIELD_DELIMITER}' and can never be framed"
                );
                contains_error = true;
            }

            if task.command == TASK_FINISHED_COMMAND || task.command == TERMINATE_COMMAND {
                error!(
                    "tasks[{index}].command collides with the reserved command {:?}",
                    task.command
                );
                contains_error = true;
            }
        }

        contains_error
    }
}

fn default_processes() -> usize {
    4
}

fn default_timeout() -> u64 {
    30
}

#[cfg(test)]
mod preflight_test;
