//! Named POSIX semaphores with scoped permits
//!
//! Waits retry on `EINTR` until the semaphore is acquired. The only way out
//! of a blocked wait without acquiring is a raised [`StopFlag`]: the wait
//! then reports [`None`] and nothing has been taken.
//!
//! A blocked wait wakes every [`STOP_POLL_INTERVAL`] to look at the flag, so
//! a signal that lands just before `sem_timedwait` is entered still ends the
//! wait.

use crate::channel::error::ChannelError;
use crate::signal::StopFlag;
use log::{trace, warn};
use std::ffi::{CStr, CString};
use std::io;
use std::time::Duration;

/// Longest a blocked wait goes without checking its stop flag.
pub const STOP_POLL_INTERVAL: Duration = Duration::from_millis(100);

const NANOS_PER_SEC: i64 = 1_000_000_000;

pub struct NamedSemaphore {
    sem: *mut libc::sem_t,
    name: CString,
    closed: bool,
}

// sem_wait/sem_post may be called from any thread.
unsafe impl Send for NamedSemaphore {}
unsafe impl Sync for NamedSemaphore {}

impl NamedSemaphore {
    /// Create a new semaphore; fails if the name is already taken.
    pub fn create(name: &CStr, value: u32) -> Result<Self, ChannelError> {
        // SAFETY: `name` is NUL-terminated; the variadic mode and value
        // arguments are passed as `c_uint` as sem_open expects.
        let sem = unsafe {
            libc::sem_open(
                name.as_ptr(),
                libc::O_CREAT | libc::O_EXCL,
                0o600 as libc::c_uint,
                value as libc::c_uint,
            )
        };
        Self::from_raw(sem, name, "sem_open(create)")
    }

    /// Open a semaphore that must already exist.
    pub fn open(name: &CStr) -> Result<Self, ChannelError> {
        // SAFETY: `name` is NUL-terminated; without O_CREAT no variadic
        // arguments are read.
        let sem = unsafe { libc::sem_open(name.as_ptr(), 0) };
        Self::from_raw(sem, name, "sem_open")
    }

    fn from_raw(
        sem: *mut libc::sem_t,
        name: &CStr,
        op: &'static str,
    ) -> Result<Self, ChannelError> {
        if sem == libc::SEM_FAILED {
            return Err(ChannelError::last_os(op, &name.to_string_lossy()));
        }
        Ok(Self {
            sem,
            name: name.to_owned(),
            closed: false,
        })
    }

    pub fn name(&self) -> String {
        self.name.to_string_lossy().into_owned()
    }

    /// Block until the semaphore is decremented.
    ///
    /// Interruptions and poll timeouts are retried. Returns `Ok(false)` only
    /// once `stop` is raised, without having taken anything.
    pub fn wait(&self, stop: &StopFlag) -> Result<bool, ChannelError> {
        loop {
            let deadline = deadline_after(STOP_POLL_INTERVAL);
            // SAFETY: `sem` is a live handle until `close`, which needs
            // `&mut self`; `deadline` is a valid timespec.
            if unsafe { libc::sem_timedwait(self.sem, &deadline) } == 0 {
                return Ok(true);
            }
            let err = io::Error::last_os_error();
            match err.raw_os_error() {
                Some(libc::EINTR) | Some(libc::ETIMEDOUT) => {}
                _ => return Err(ChannelError::from_io("sem_timedwait", &self.name(), err)),
            }
            if stop.is_raised() {
                trace!("wait on {} cancelled", self.name());
                return Ok(false);
            }
        }
    }

    /// Wait and wrap the acquired unit in a [`Permit`] that posts it back on
    /// drop unless handed on.
    pub fn acquire(&self, stop: &StopFlag) -> Result<Option<Permit<'_>>, ChannelError> {
        Ok(self.wait(stop)?.then(|| Permit {
            sem: self,
            armed: true,
        }))
    }

    pub fn post(&self) -> Result<(), ChannelError> {
        // SAFETY: see `wait`.
        if unsafe { libc::sem_post(self.sem) } == 0 {
            Ok(())
        } else {
            Err(ChannelError::last_os("sem_post", &self.name()))
        }
    }

    /// Current counter value.
    pub fn value(&self) -> Result<i32, ChannelError> {
        let mut value: libc::c_int = 0;
        // SAFETY: see `wait`; `value` is a valid out pointer.
        if unsafe { libc::sem_getvalue(self.sem, &mut value) } == 0 {
            Ok(value)
        } else {
            Err(ChannelError::last_os("sem_getvalue", &self.name()))
        }
    }

    /// Close this process's handle. The semaphore itself lives on until it is
    /// unlinked and every handle is closed.
    pub fn close(&mut self) -> Result<(), ChannelError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        // SAFETY: the handle is open and never used again.
        if unsafe { libc::sem_close(self.sem) } == 0 {
            Ok(())
        } else {
            Err(ChannelError::last_os("sem_close", &self.name()))
        }
    }

    /// Remove a semaphore name.
    pub fn unlink(name: &CStr) -> Result<(), ChannelError> {
        // SAFETY: `name` is NUL-terminated.
        if unsafe { libc::sem_unlink(name.as_ptr()) } == 0 {
            Ok(())
        } else {
            Err(ChannelError::last_os("sem_unlink", &name.to_string_lossy()))
        }
    }
}

impl Drop for NamedSemaphore {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("{}", e);
        }
    }
}

/// Absolute `CLOCK_REALTIME` deadline `delay` from now, as sem_timedwait
/// expects.
fn deadline_after(delay: Duration) -> libc::timespec {
    let mut now = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    // SAFETY: `now` is a valid out pointer; CLOCK_REALTIME always exists.
    unsafe { libc::clock_gettime(libc::CLOCK_REALTIME, &mut now) };

    let nanos = now.tv_nsec as i64 + i64::from(delay.subsec_nanos());
    libc::timespec {
        tv_sec: now.tv_sec + delay.as_secs() as libc::time_t + (nanos / NANOS_PER_SEC) as libc::time_t,
        tv_nsec: (nanos % NANOS_PER_SEC) as libc::c_long,
    }
}

/// One unit taken from a [`NamedSemaphore`].
///
/// Dropping the permit posts the unit back, so every early return releases
/// what was acquired.
#[must_use = "dropping a permit releases it immediately"]
pub struct Permit<'a> {
    sem: &'a NamedSemaphore,
    armed: bool,
}

impl Permit<'_> {
    /// Post the unit back to the semaphore it came from.
    pub fn release(mut self) -> Result<(), ChannelError> {
        self.armed = false;
        self.sem.post()
    }

    /// Consume the unit here and post one on `other` instead.
    pub fn transfer(mut self, other: &NamedSemaphore) -> Result<(), ChannelError> {
        self.armed = false;
        other.post()
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = self.sem.post() {
                warn!("releasing permit: {}", e);
            }
        }
    }
}
