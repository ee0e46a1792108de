mod config;

use clap::Parser;
use config::FarmConfig;
use itertools::Itertools;
use std::{
    path::PathBuf,
    process::{exit, Command, Stdio},
    thread,
    time::{Duration, Instant},
};
use taskfarm_core::{
    barrier::{final_rendezvous, BarrierError},
    frame::Task,
    scheduler::{schedule_tasks, ScheduleError},
    transport::{
        channel::{ChannelGroup, ChannelTransport},
        Transport,
    },
    worker::{report_finished, wait_for_task, WorkerError},
};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use wait_timeout::ChildExt;

#[derive(Error, Debug)]
enum DemoError {
    #[error("Failed to read the farm config")]
    ReadConfig(#[from] std::io::Error),
    #[error("Failed to parse the farm config")]
    ParseConfig(#[from] serde_yaml::Error),
    #[error("Scheduling failed")]
    Schedule(#[from] ScheduleError),
    #[error("Worker loop failed")]
    Worker(#[from] WorkerError),
    #[error("Final rendezvous failed")]
    Rendezvous(#[from] BarrierError),
}

#[derive(Parser, Debug)]
#[command(about = "Run a YAML task list over an in-process master/worker farm")]
struct Arguments {
    /// Path to the farm config
    config: PathBuf,

    /// Override the process count from the config
    #[arg(long)]
    processes: Option<usize>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let arguments = Arguments::parse();

    if let Err(error) = run(arguments) {
        error!(error = ?error, "Farm run failed: {error}");
        exit(1);
    }
}

fn run(arguments: Arguments) -> Result<(), DemoError> {
    let mut config: FarmConfig =
        serde_yaml::from_str(&std::fs::read_to_string(&arguments.config)?)?;
    if let Some(processes) = arguments.processes {
        config.processes = processes;
    }

    if config.preflight_checks() {
        error!("Farm config failed the preflight checks");
        exit(1);
    }

    let tasks = config
        .tasks
        .iter()
        .map(|spec| Task::new(&spec.command, &spec.params))
        .collect_vec();
    let timeout = Duration::from_secs(config.timeout);

    if config.processes == 1 {
        // the scheduler refuses a group without workers; run the list
        // locally instead
        warn!("Single-process group, executing tasks locally");
        for task in &tasks {
            execute_task(task, timeout);
        }

        return Ok(());
    }

    let mut group = ChannelGroup::create(config.processes);
    let coordinator = group.remove(0);

    let workers = group
        .into_iter()
        .map(|endpoint| thread::spawn(move || worker_loop(endpoint, timeout)))
        .collect_vec();

    info!(
        processes = config.processes,
        tasks = tasks.len(),
        "Farm started"
    );

    schedule_tasks(&coordinator, &tasks)?;
    final_rendezvous(&coordinator)?;

    for handle in workers {
        match handle.join() {
            Ok(Ok(())) => {}
            Ok(Err(error)) => error!(error = ?error, "Worker rank failed"),
            Err(_) => error!("Worker thread panicked"),
        }
    }

    info!("Farm finished");
    Ok(())
}

/// Dispatch loop for one worker rank: take tasks until the termination
/// sentinel arrives, run each as a child process, report it done.
fn worker_loop(transport: ChannelTransport, timeout: Duration) -> Result<(), DemoError> {
    while let Some(task) = wait_for_task(&transport)? {
        if task.is_termination() {
            debug!(rank = transport.rank(), "Termination received");
            break;
        }

        execute_task(&task, timeout);
        report_finished(&transport)?;
    }

    final_rendezvous(&transport)?;
    Ok(())
}

/// Run a single task as a child process. Failures are logged and swallowed,
/// the farm keeps draining either way.
fn execute_task(task: &Task, timeout: Duration) {
    let arguments = task.parameters.split_whitespace().collect_vec();
    info!(
        command = task.command.as_str(),
        params = task.parameters.as_str(),
        "Running task"
    );

    let start = Instant::now();
    match Command::new(&task.command)
        .args(&arguments)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(mut child) => match child.wait_timeout(timeout) {
            Ok(Some(status)) => {
                debug!(
                    "Finished in {} ms | status: {}",
                    start.elapsed().as_millis(),
                    status.success()
                );
            }
            Ok(None) => {
                // child hasn't exited yet
                warn!(command = task.command.as_str(), "Task hit its timeout, killing it");
                if let Err(kill_error) = child.kill() {
                    warn!(error = ?kill_error, "Failed to kill the timed out task");
                }
            }
            Err(wait_error) => {
                warn!(error = ?wait_error, "Failed to wait for the task child");
            }
        },
        Err(spawn_error) => {
            warn!(error = ?spawn_error, "Failed to spawn task: {spawn_error}");
        }
    };
}
