//! Producer and consumer sides of the shared ring
//!
//! Three named semaphores guard the ring:
//! - `free_slots` counts empty slots (starts at [`RING_CAPACITY`])
//! - `used_slots` counts filled slots (starts at 0)
//! - `writer_turn` serializes producers (starts at 1)
//!
//! A producer takes `writer_turn` first and `free_slots` second, never the
//! other way round. The consumer is the only reader and needs no turn.
//!
//! Shutdown: the consumer sets the termination flag and posts `free_slots`
//! once. Whichever producer wakes sees the flag, posts `free_slots` and then
//! `writer_turn` back, which wakes the next one in line, so every blocked
//! producer gets to observe termination.

use crate::channel::codec;
use crate::channel::error::{ChannelError, TeardownError};
use crate::channel::layout::{RING_CAPACITY, RingLayout, SharedSegment};
use crate::channel::names::ChannelNames;
use crate::channel::semaphore::NamedSemaphore;
use crate::graph::CandidateSolution;
use crate::signal::StopFlag;
use log::{debug, info, trace, warn};
use std::ffi::CStr;

/// Outcome of one producer write attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Push {
    /// Written into the slot at `index`.
    Written { index: usize },
    /// The consumer has shut the ring down; nothing was written.
    Terminated,
    /// A signal arrived while `stop` was raised; nothing was written.
    Cancelled,
}

/// Handles this process holds on the shared objects.
struct Endpoints {
    segment: SharedSegment,
    free_slots: NamedSemaphore,
    used_slots: NamedSemaphore,
    writer_turn: NamedSemaphore,
}

impl Endpoints {
    fn close_into(&mut self, failures: &mut Vec<ChannelError>) {
        let results = [
            self.free_slots.close(),
            self.used_slots.close(),
            self.writer_turn.close(),
            self.segment.close(),
        ];
        failures.extend(results.into_iter().filter_map(Result::err));
    }
}

/// Names created so far during setup; unlinked again if setup fails.
struct CreatedNames<'a> {
    shm: Option<&'a CStr>,
    semaphores: Vec<&'a CStr>,
    armed: bool,
}

impl CreatedNames<'_> {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for CreatedNames<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let shm = self.shm.map(SharedSegment::unlink);
        let sems = self.semaphores.iter().map(|name| NamedSemaphore::unlink(name));
        for err in shm.into_iter().chain(sems).filter_map(Result::err) {
            warn!("cleanup after failed setup: {}", err);
        }
    }
}

/// The supervisor side: creates, reads from, and tears down the ring.
pub struct Consumer {
    names: ChannelNames,
    endpoints: Endpoints,
    terminated: bool,
    torn_down: bool,
}

impl Consumer {
    /// Create and zero-initialize the segment and all three semaphores.
    ///
    /// Fails if any of the names already exists; objects created before the
    /// failure are removed again.
    pub fn create(names: &ChannelNames) -> Result<Self, ChannelError> {
        let mut created = CreatedNames {
            shm: None,
            semaphores: Vec::new(),
            armed: true,
        };

        let segment = SharedSegment::create(names.shm())?;
        created.shm = Some(names.shm());
        let free_slots = NamedSemaphore::create(names.free_slots(), RING_CAPACITY as u32)?;
        created.semaphores.push(names.free_slots());
        let used_slots = NamedSemaphore::create(names.used_slots(), 0)?;
        created.semaphores.push(names.used_slots());
        // Created last: its presence means the channel is ready to attach to.
        let writer_turn = NamedSemaphore::create(names.writer_turn(), 1)?;
        created.semaphores.push(names.writer_turn());

        created.disarm();
        debug!("channel {} created", names.namespace());

        Ok(Self {
            names: names.clone(),
            endpoints: Endpoints {
                segment,
                free_slots,
                used_slots,
                writer_turn,
            },
            terminated: false,
            torn_down: false,
        })
    }

    pub(crate) fn ring(&self) -> &RingLayout {
        self.endpoints.segment.ring()
    }

    /// Block until a candidate is available and take it out of the ring.
    ///
    /// Returns `Ok(None)` if the wait was interrupted with `stop` raised.
    pub fn pop(&mut self, stop: &StopFlag) -> Result<Option<CandidateSolution>, ChannelError> {
        let endpoints = &self.endpoints;
        let Some(used) = endpoints.used_slots.acquire(stop)? else {
            return Ok(None);
        };

        let ring = endpoints.segment.ring();
        let index = ring.read_pos();
        // SAFETY: we are the only reader and hold a used-slot unit for
        // `index`, so no producer writes this slot until we post free_slots.
        let slot = unsafe { ring.load_slot(index) };
        ring.advance_read();
        used.transfer(&endpoints.free_slots)?;

        trace!("read slot {}", index);
        Ok(Some(codec::decode(&slot)))
    }

    /// Number of filled slots waiting to be read.
    pub fn outstanding(&self) -> Result<usize, ChannelError> {
        Ok(self.endpoints.used_slots.value()?.max(0) as usize)
    }

    /// Set the termination flag and wake one producer blocked on a full
    /// ring. Producers pass the wake-up along as they exit.
    pub fn terminate(&mut self) -> Result<(), ChannelError> {
        if self.terminated {
            return Ok(());
        }
        self.terminated = true;
        self.ring().set_terminated();
        self.endpoints.free_slots.post()?;
        info!("channel {} terminated", self.names.namespace());
        Ok(())
    }

    /// Terminate if not done yet, then close and unlink every object.
    ///
    /// Unlinking only removes the names: producers still holding handles keep
    /// working objects until they close them.
    pub fn close(mut self) -> Result<(), TeardownError> {
        self.teardown()
    }

    fn teardown(&mut self) -> Result<(), TeardownError> {
        if self.torn_down {
            return Ok(());
        }
        self.torn_down = true;

        let mut failures = Vec::new();
        if let Err(e) = self.terminate() {
            failures.push(e);
        }
        self.endpoints.close_into(&mut failures);

        let names = &self.names;
        let unlinked = [
            SharedSegment::unlink(names.shm()),
            NamedSemaphore::unlink(names.free_slots()),
            NamedSemaphore::unlink(names.used_slots()),
            NamedSemaphore::unlink(names.writer_turn()),
        ];
        failures.extend(unlinked.into_iter().filter_map(Result::err));

        debug!(
            "channel {} torn down ({} failures)",
            names.namespace(),
            failures.len()
        );
        TeardownError::check(failures)
    }
}

impl Drop for Consumer {
    fn drop(&mut self) {
        if let Err(e) = self.teardown() {
            warn!("{}", e);
        }
    }
}

/// The generator side: attaches to an existing ring and writes into it.
pub struct Producer {
    endpoints: Endpoints,
    closed: bool,
}

impl Producer {
    /// Open the objects a consumer created. Never creates anything.
    pub fn attach(names: &ChannelNames) -> Result<Self, ChannelError> {
        let segment = SharedSegment::open(names.shm())?;
        let free_slots = NamedSemaphore::open(names.free_slots())?;
        let used_slots = NamedSemaphore::open(names.used_slots())?;
        let writer_turn = NamedSemaphore::open(names.writer_turn())?;
        debug!("attached to channel {}", names.namespace());

        Ok(Self {
            endpoints: Endpoints {
                segment,
                free_slots,
                used_slots,
                writer_turn,
            },
            closed: false,
        })
    }

    pub fn is_terminated(&self) -> bool {
        self.endpoints.segment.ring().is_terminated()
    }

    /// Write one candidate, blocking while the ring is full.
    pub fn push(&self, candidate: &CandidateSolution, stop: &StopFlag) -> Result<Push, ChannelError> {
        let endpoints = &self.endpoints;
        let ring = endpoints.segment.ring();

        let Some(turn) = endpoints.writer_turn.acquire(stop)? else {
            return Ok(Push::Cancelled);
        };
        if ring.is_terminated() {
            turn.release()?;
            return Ok(Push::Terminated);
        }

        let Some(free) = endpoints.free_slots.acquire(stop)? else {
            turn.release()?;
            return Ok(Push::Cancelled);
        };
        if ring.is_terminated() {
            free.release()?;
            turn.release()?;
            return Ok(Push::Terminated);
        }

        let index = ring.write_pos();
        // SAFETY: holding the writer turn makes us the only writer, and the
        // free-slot unit guarantees the consumer has finished with `index`.
        unsafe { ring.store_slot(index, &codec::encode(candidate)) };
        ring.advance_write();

        free.transfer(&endpoints.used_slots)?;
        turn.release()?;

        trace!("wrote slot {}", index);
        Ok(Push::Written { index })
    }

    /// Close this process's handles. Names are left for the consumer.
    pub fn close(mut self) -> Result<(), TeardownError> {
        self.close_handles()
    }

    fn close_handles(&mut self) -> Result<(), TeardownError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let mut failures = Vec::new();
        self.endpoints.close_into(&mut failures);
        TeardownError::check(failures)
    }
}

impl Drop for Producer {
    fn drop(&mut self) {
        if let Err(e) = self.close_handles() {
            warn!("{}", e);
        }
    }
}
