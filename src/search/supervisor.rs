//! Supervisor role: drain the ring and keep the best candidate
//!
//! Prints one line per strictly better candidate and a final line once a
//! zero-conflict coloring arrives. Whatever ends the loop, the ring is
//! terminated before returning so blocked generators can exit.

use crate::channel::Consumer;
use crate::error::Error;
use crate::search::config::SupervisorConfig;
use crate::search::result::{BestTracker, Outcome, SupervisorReport};
use crate::signal::StopFlag;
use log::{debug, info};
use std::io::Write;
use std::time::Instant;

/// Final line written when a valid coloring is found.
pub const SOLVED_MESSAGE: &str = "The graph is 3-colorable!";

/// Read candidates until solved, stopped, or the limit is reached, then run
/// the termination handshake.
///
/// The caller still owns `consumer` and closes it afterwards.
pub fn run_supervisor<W: Write>(
    consumer: &mut Consumer,
    config: &SupervisorConfig,
    stop: &StopFlag,
    out: &mut W,
) -> Result<SupervisorReport, Error> {
    let start_time = Instant::now();
    let mut tracker = BestTracker::new();
    let mut consumed = 0u64;
    let mut improvements = 0u64;

    let outcome = loop {
        if stop.is_raised() {
            break Outcome::Interrupted;
        }
        if config.limit.is_some_and(|limit| consumed >= limit) {
            break Outcome::LimitReached;
        }

        let Some(candidate) = consumer.pop(stop)? else {
            break Outcome::Interrupted;
        };
        consumed += 1;

        if !tracker.offer(&candidate) {
            continue;
        }
        improvements += 1;
        if candidate.is_valid_coloring() {
            writeln!(out, "{}", SOLVED_MESSAGE).map_err(Error::Output)?;
            break Outcome::Solved;
        }
        writeln!(out, "{}", candidate).map_err(Error::Output)?;
        debug!("new best after {} candidates: {}", consumed, candidate.len());
    };

    out.flush().map_err(Error::Output)?;
    consumer.terminate()?;
    if let Ok(unread) = consumer.outstanding() {
        debug!("{} candidates left unread", unread);
    }
    info!("supervisor stopped ({}) after {} candidates", outcome, consumed);

    Ok(SupervisorReport {
        outcome,
        best: tracker.into_best(),
        candidates_consumed: consumed,
        improvements,
        elapsed_time: start_time.elapsed(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{ChannelNames, Producer};
    use crate::graph::{CandidateSolution, Edge};
    use std::time::Duration;

    fn names(tag: &str) -> ChannelNames {
        ChannelNames::new(&format!("/threecolor_suptest_{}_{}", std::process::id(), tag)).unwrap()
    }

    fn candidate(edges: &[(i32, i32)]) -> CandidateSolution {
        let edges: Vec<Edge> = edges.iter().map(|&(a, b)| Edge::new(a, b)).collect();
        CandidateSolution::from_edges(&edges).unwrap()
    }

    fn feed(producer: &Producer, candidates: &[CandidateSolution]) {
        let stop = StopFlag::new();
        for c in candidates {
            producer.push(c, &stop).unwrap();
        }
    }

    #[test]
    fn test_reports_improvements_then_solution() {
        let names = names("improve");
        let mut consumer = Consumer::create(&names).unwrap();
        let producer = Producer::attach(&names).unwrap();
        feed(
            &producer,
            &[
                candidate(&[(0, 1), (1, 2), (2, 0)]),
                candidate(&[(1, 2), (2, 0), (0, 1)]),
                candidate(&[(0, 1)]),
                candidate(&[(1, 2), (2, 0)]),
                candidate(&[]),
                candidate(&[(2, 0)]),
            ],
        );

        let mut out = Vec::new();
        let report = run_supervisor(
            &mut consumer,
            &SupervisorConfig::default(),
            &StopFlag::new(),
            &mut out,
        )
        .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "Solution with 3 edges: 0-1 1-2 2-0\n\
             Solution with 1 edge: 0-1\n\
             The graph is 3-colorable!\n"
        );
        assert_eq!(report.outcome, Outcome::Solved);
        assert_eq!(report.candidates_consumed, 5);
        assert_eq!(report.improvements, 3);
        assert!(report.best.unwrap().is_valid_coloring());

        // Handshake ran: producers see termination and write nothing more.
        assert!(producer.is_terminated());
        assert_eq!(consumer.outstanding().unwrap(), 1);

        producer.close().unwrap();
        consumer.close().unwrap();
    }

    #[test]
    fn test_immediate_valid_coloring() {
        let names = names("immediate");
        let mut consumer = Consumer::create(&names).unwrap();
        let producer = Producer::attach(&names).unwrap();
        feed(&producer, &[candidate(&[])]);

        let mut out = Vec::new();
        let report = run_supervisor(
            &mut consumer,
            &SupervisorConfig::default(),
            &StopFlag::new(),
            &mut out,
        )
        .unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "The graph is 3-colorable!\n");
        assert_eq!(report.candidates_consumed, 1);
        producer.close().unwrap();
        consumer.close().unwrap();
    }

    #[test]
    fn test_limit_stops_without_solution() {
        let names = names("limit");
        let mut consumer = Consumer::create(&names).unwrap();
        let producer = Producer::attach(&names).unwrap();
        feed(
            &producer,
            &[
                candidate(&[(0, 1), (2, 3)]),
                candidate(&[(0, 1), (2, 3)]),
                candidate(&[(4, 5)]),
                candidate(&[]),
            ],
        );

        let mut out = Vec::new();
        let report = run_supervisor(
            &mut consumer,
            &SupervisorConfig::default().with_limit_option(Some(3)),
            &StopFlag::new(),
            &mut out,
        )
        .unwrap();

        assert_eq!(report.outcome, Outcome::LimitReached);
        assert_eq!(report.candidates_consumed, 3);
        assert_eq!(report.best.unwrap().edges(), &[Edge::new(4, 5)]);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Solution with 2 edges: 0-1 2-3\nSolution with 1 edge: 4-5\n"
        );
        producer.close().unwrap();
        consumer.close().unwrap();
    }

    #[test]
    fn test_stop_while_waiting_for_candidates() {
        let names = names("stop_waiting");
        let mut consumer = Consumer::create(&names).unwrap();
        let stop = StopFlag::new();
        let (tx, rx) = crossbeam_channel::bounded(1);

        let supervisor = {
            let stop = stop.clone();
            std::thread::spawn(move || {
                let report = run_supervisor(
                    &mut consumer,
                    &SupervisorConfig::default(),
                    &stop,
                    &mut Vec::<u8>::new(),
                )
                .unwrap();
                tx.send(report.outcome).unwrap();
                consumer.close().unwrap();
            })
        };

        // Nobody writes, so the supervisor sits in its wait; raising the flag
        // without any signal must still end it.
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
        stop.raise();
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(5)).unwrap(),
            Outcome::Interrupted
        );
        supervisor.join().unwrap();
    }

    #[test]
    fn test_stop_before_reading() {
        let names = names("stopped");
        let mut consumer = Consumer::create(&names).unwrap();
        let stop = StopFlag::new();
        stop.raise();

        let mut out = Vec::new();
        let report =
            run_supervisor(&mut consumer, &SupervisorConfig::default(), &stop, &mut out).unwrap();

        assert_eq!(report.outcome, Outcome::Interrupted);
        assert!(report.best.is_none());
        assert!(out.is_empty());
        assert!(consumer.ring().is_terminated());
        consumer.close().unwrap();
    }
}
