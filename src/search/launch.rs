//! `solve`: run the supervisor with its own generator processes
//!
//! Creates the channel, spawns `generators` copies of the current executable
//! in `generator` mode, runs the supervisor, then waits for every child to
//! see termination and exit before the channel is torn down.

use crate::channel::Consumer;
use crate::error::Error;
use crate::graph::Graph;
use crate::search::config::LaunchConfig;
use crate::search::result::SupervisorReport;
use crate::search::supervisor::run_supervisor;
use crate::signal::StopFlag;
use log::{debug, warn};
use std::io::Write;
use std::path::Path;
use std::process::{Child, Command, Stdio};

/// Build the command line that starts generator `index`.
pub fn generator_command(
    exe: &Path,
    graph: &Graph,
    config: &LaunchConfig,
    index: usize,
) -> Command {
    let mut cmd = Command::new(exe);
    cmd.arg("generator")
        .arg("--namespace")
        .arg(config.names.namespace());
    if let Some(seed) = config.generator_seed(index) {
        cmd.arg("--seed").arg(seed.to_string());
    }
    cmd.args(graph.edges().iter().map(|e| e.to_string()))
        .stdin(Stdio::null())
        .stdout(Stdio::null());
    cmd
}

pub fn run_solve<W: Write>(
    exe: &Path,
    graph: &Graph,
    config: &LaunchConfig,
    stop: &StopFlag,
    out: &mut W,
) -> Result<SupervisorReport, Error> {
    let mut consumer = Consumer::create(&config.names)?;

    let mut children: Vec<Child> = Vec::with_capacity(config.generators);
    let mut spawn_error = None;
    for index in 0..config.generators {
        match generator_command(exe, graph, config, index).spawn() {
            Ok(child) => {
                debug!("spawned generator {} (pid {})", index, child.id());
                children.push(child);
            }
            Err(source) => {
                spawn_error = Some(Error::Spawn { index, source });
                break;
            }
        }
    }

    let result = match spawn_error {
        Some(e) => Err(e),
        None => run_supervisor(&mut consumer, &config.supervisor, stop, out),
    };

    // Children can only exit once they have seen termination.
    if let Err(e) = consumer.terminate() {
        warn!("{}", e);
    }
    reap(children);

    consumer.close()?;
    result
}

fn reap(children: Vec<Child>) {
    for (index, mut child) in children.into_iter().enumerate() {
        match child.wait() {
            Ok(status) if status.success() => {}
            Ok(status) => warn!("generator {} exited with {}", index, status),
            Err(e) => warn!("waiting for generator {} failed: {}", index, e),
        }
    }
}
