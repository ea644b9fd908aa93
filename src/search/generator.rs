//! Generator role: propose random colorings and push their conflicts
//!
//! Each iteration colors every vertex at random, collects the conflicting
//! edges (capped at `SLOT_EDGES`) and writes them into the ring. The loop
//! runs until the supervisor terminates the ring, a stop is requested, or
//! the optional limit is reached. A generator knows nothing about its
//! siblings.

use crate::channel::{ChannelError, Producer, Push};
use crate::graph::Graph;
use crate::search::config::GeneratorConfig;
use crate::search::result::{GeneratorExit, GeneratorReport};
use crate::signal::StopFlag;
use log::{debug, info, trace};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::Instant;

/// Run the generator loop against an attached producer.
pub fn run_generator(
    producer: &Producer,
    graph: &Graph,
    config: &GeneratorConfig,
    stop: &StopFlag,
) -> Result<GeneratorReport, ChannelError> {
    let start_time = Instant::now();
    let mut rng: ChaCha8Rng = match config.seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_os_rng(),
    };

    debug!(
        "generating colorings for {} vertices, {} edges",
        graph.vertices().len(),
        graph.edges().len()
    );

    let mut emitted = 0u64;
    let mut fewest: Option<usize> = None;

    let exit = loop {
        if config.limit.is_some_and(|limit| emitted >= limit) {
            break GeneratorExit::LimitReached;
        }
        if stop.is_raised() {
            break GeneratorExit::Interrupted;
        }
        if producer.is_terminated() {
            break GeneratorExit::Terminated;
        }

        let coloring = graph.random_coloring(&mut rng);
        let conflicts = graph.conflicts(&coloring);
        if conflicts.truncated() {
            trace!(
                "{} conflicts, reporting first {}",
                conflicts.total,
                conflicts.reported.len()
            );
        }

        match producer.push(&conflicts.reported, stop)? {
            Push::Written { index } => {
                trace!("candidate {} written to slot {}", emitted, index);
                emitted += 1;
                fewest = Some(fewest.map_or(conflicts.total, |f| f.min(conflicts.total)));
            }
            Push::Terminated => break GeneratorExit::Terminated,
            Push::Cancelled => break GeneratorExit::Interrupted,
        }
    };

    info!("generator stopped ({:?}) after {} candidates", exit, emitted);
    Ok(GeneratorReport {
        exit,
        candidates_emitted: emitted,
        fewest_conflicts: fewest,
        elapsed_time: start_time.elapsed(),
    })
}
