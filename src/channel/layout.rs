//! Memory layout of the shared ring and the mapped segment holding it
//!
//! The segment is a single `#[repr(C)]` struct: termination flag, write
//! cursor, read cursor, then `RING_CAPACITY` slots of `SLOT_EDGES` edges.
//! Producers and the consumer map the same struct, so the layout must not
//! depend on anything but these constants.
//!
//! The struct itself enforces nothing. Exclusive access to a slot or cursor
//! comes from the semaphore protocol in [`crate::channel::ring`].

use crate::channel::error::ChannelError;
use crate::graph::{Edge, SLOT_EDGES};
use log::{debug, warn};
use std::cell::UnsafeCell;
use std::ffi::{CStr, CString};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicI32, AtomicU32, Ordering};

/// Number of slots in the ring.
pub const RING_CAPACITY: usize = 50;

/// One ring entry: a sentinel-padded candidate.
pub type Slot = [Edge; SLOT_EDGES];

#[repr(C)]
pub struct RingLayout {
    terminate: AtomicI32,
    write_pos: AtomicU32,
    read_pos: AtomicU32,
    slots: UnsafeCell<[Slot; RING_CAPACITY]>,
}

// Shared between processes by construction; slot access is serialized by
// the semaphores.
unsafe impl Sync for RingLayout {}

/// Size of the mapped segment in bytes.
pub const SEGMENT_SIZE: usize = std::mem::size_of::<RingLayout>();

const _: () = assert!(SEGMENT_SIZE == 12 + RING_CAPACITY * SLOT_EDGES * 8);

impl RingLayout {
    pub fn is_terminated(&self) -> bool {
        self.terminate.load(Ordering::Acquire) != 0
    }

    pub fn set_terminated(&self) {
        self.terminate.store(1, Ordering::Release);
    }

    pub fn write_pos(&self) -> usize {
        self.write_pos.load(Ordering::Relaxed) as usize % RING_CAPACITY
    }

    pub fn read_pos(&self) -> usize {
        self.read_pos.load(Ordering::Relaxed) as usize % RING_CAPACITY
    }

    /// Advance the write cursor, returning the new position.
    ///
    /// Only the producer holding the writer turn may call this.
    pub fn advance_write(&self) -> usize {
        let next = (self.write_pos() + 1) % RING_CAPACITY;
        self.write_pos.store(next as u32, Ordering::Relaxed);
        next
    }

    /// Advance the read cursor, returning the new position.
    ///
    /// Only the consumer may call this.
    pub fn advance_read(&self) -> usize {
        let next = (self.read_pos() + 1) % RING_CAPACITY;
        self.read_pos.store(next as u32, Ordering::Relaxed);
        next
    }

    /// # Safety
    ///
    /// The caller must hold the writer turn and a free-slot unit, and
    /// `index` must be the current write position.
    pub unsafe fn store_slot(&self, index: usize, slot: &Slot) {
        // SAFETY: bounds are checked by indexing; exclusivity is the caller's
        // contract.
        unsafe { (*self.slots.get())[index] = *slot };
    }

    /// # Safety
    ///
    /// The caller must be the consumer holding a used-slot unit, and `index`
    /// must be the current read position.
    pub unsafe fn load_slot(&self, index: usize) -> Slot {
        // SAFETY: as for `store_slot`.
        unsafe { (*self.slots.get())[index] }
    }

    /// Reset to the freshly created state: cursors at zero, every slot empty.
    fn reset(&self) {
        self.terminate.store(0, Ordering::Relaxed);
        self.write_pos.store(0, Ordering::Relaxed);
        self.read_pos.store(0, Ordering::Relaxed);
        // SAFETY: only called from `SharedSegment::create` before the names
        // of the semaphores exist, so nobody else can be using the ring.
        unsafe { *self.slots.get() = [[Edge::SENTINEL; SLOT_EDGES]; RING_CAPACITY] };
    }
}

/// A mapping of the ring segment in this process.
pub struct SharedSegment {
    ring: NonNull<RingLayout>,
    name: CString,
    mapped: bool,
}

unsafe impl Send for SharedSegment {}
unsafe impl Sync for SharedSegment {}

impl SharedSegment {
    /// Create, size and map a new segment. Fails if the name exists.
    pub fn create(name: &CStr) -> Result<Self, ChannelError> {
        let fd = shm_open(name, libc::O_CREAT | libc::O_EXCL | libc::O_RDWR, "shm_open(create)")?;
        let display = name.to_string_lossy();

        // SAFETY: `fd` is a valid shared memory descriptor.
        if unsafe { libc::ftruncate(fd.as_raw_fd(), SEGMENT_SIZE as libc::off_t) } != 0 {
            let err = ChannelError::last_os("ftruncate", &display);
            unlink_quietly(name);
            return Err(err);
        }

        let segment = match Self::map(&fd, name) {
            Ok(segment) => segment,
            Err(e) => {
                unlink_quietly(name);
                return Err(e);
            }
        };
        segment.ring().reset();
        debug!("created shared memory {} ({} bytes)", display, SEGMENT_SIZE);
        Ok(segment)
    }

    /// Map an existing segment created by the consumer.
    pub fn open(name: &CStr) -> Result<Self, ChannelError> {
        let fd = shm_open(name, libc::O_RDWR, "shm_open")?;
        let display = name.to_string_lossy();

        // SAFETY: zeroed `stat` is a valid out parameter for fstat.
        let mut stat: libc::stat = unsafe { std::mem::zeroed() };
        if unsafe { libc::fstat(fd.as_raw_fd(), &mut stat) } != 0 {
            return Err(ChannelError::last_os("fstat", &display));
        }
        if (stat.st_size as u64) < SEGMENT_SIZE as u64 {
            return Err(ChannelError::LayoutMismatch {
                name: display.into_owned(),
                actual: stat.st_size as u64,
                expected: SEGMENT_SIZE,
            });
        }

        Self::map(&fd, name)
    }

    fn map(fd: &OwnedFd, name: &CStr) -> Result<Self, ChannelError> {
        // SAFETY: mapping a descriptor we own with a size that fits the
        // object; the result is checked against MAP_FAILED.
        let addr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                SEGMENT_SIZE,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd.as_raw_fd(),
                0,
            )
        };
        if addr == libc::MAP_FAILED {
            return Err(ChannelError::last_os("mmap", &name.to_string_lossy()));
        }
        let ring = NonNull::new(addr.cast::<RingLayout>())
            .ok_or_else(|| ChannelError::last_os("mmap", &name.to_string_lossy()))?;

        // The descriptor is no longer needed once mapped; `fd` closes on drop.
        Ok(Self {
            ring,
            name: name.to_owned(),
            mapped: true,
        })
    }

    pub fn ring(&self) -> &RingLayout {
        // SAFETY: the mapping stays valid until `close`, which takes
        // `&mut self`; mmap returns page-aligned memory.
        unsafe { self.ring.as_ref() }
    }

    pub fn name(&self) -> String {
        self.name.to_string_lossy().into_owned()
    }

    /// Unmap the segment from this process.
    pub fn close(&mut self) -> Result<(), ChannelError> {
        if !self.mapped {
            return Ok(());
        }
        self.mapped = false;
        // SAFETY: the mapping was created by `map` with this size and is not
        // referenced after this point.
        if unsafe { libc::munmap(self.ring.as_ptr().cast(), SEGMENT_SIZE) } == 0 {
            Ok(())
        } else {
            Err(ChannelError::last_os("munmap", &self.name()))
        }
    }

    /// Remove a segment name. Existing mappings stay valid.
    pub fn unlink(name: &CStr) -> Result<(), ChannelError> {
        // SAFETY: `name` is NUL-terminated.
        if unsafe { libc::shm_unlink(name.as_ptr()) } == 0 {
            Ok(())
        } else {
            Err(ChannelError::last_os("shm_unlink", &name.to_string_lossy()))
        }
    }
}

impl Drop for SharedSegment {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("{}", e);
        }
    }
}

fn shm_open(name: &CStr, flags: libc::c_int, op: &'static str) -> Result<OwnedFd, ChannelError> {
    // SAFETY: `name` is NUL-terminated.
    let fd = unsafe { libc::shm_open(name.as_ptr(), flags, 0o600 as libc::mode_t) };
    if fd < 0 {
        return Err(ChannelError::last_os(op, &name.to_string_lossy()));
    }
    // SAFETY: `fd` was just returned by shm_open and is owned by nobody else.
    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

fn unlink_quietly(name: &CStr) {
    if let Err(e) = SharedSegment::unlink(name) {
        warn!("{}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique(tag: &str) -> CString {
        CString::new(format!("/threecolor_shmtest_{}_{}", std::process::id(), tag)).unwrap()
    }

    #[test]
    fn test_layout_size() {
        assert_eq!(SEGMENT_SIZE, 3212);
        assert_eq!(std::mem::align_of::<RingLayout>(), 4);
    }

    #[test]
    fn test_created_segment_is_empty() {
        let name = unique("fresh");
        let segment = SharedSegment::create(&name).unwrap();
        let ring = segment.ring();

        assert!(!ring.is_terminated());
        assert_eq!(ring.write_pos(), 0);
        assert_eq!(ring.read_pos(), 0);
        let slot = unsafe { ring.load_slot(RING_CAPACITY - 1) };
        assert!(slot.iter().all(|e| !e.is_real()));

        SharedSegment::unlink(&name).unwrap();
    }

    #[test]
    fn test_two_mappings_share_memory() {
        let name = unique("shared");
        let owner = SharedSegment::create(&name).unwrap();
        let other = SharedSegment::open(&name).unwrap();

        let mut slot = [Edge::SENTINEL; SLOT_EDGES];
        slot[0] = Edge::new(4, 5);
        unsafe { owner.ring().store_slot(3, &slot) };
        owner.ring().set_terminated();

        assert_eq!(unsafe { other.ring().load_slot(3) }[0], Edge::new(4, 5));
        assert!(other.ring().is_terminated());

        SharedSegment::unlink(&name).unwrap();
    }

    #[test]
    fn test_cursors_wrap() {
        let name = unique("wrap");
        let segment = SharedSegment::create(&name).unwrap();
        let ring = segment.ring();

        for _ in 0..RING_CAPACITY - 1 {
            ring.advance_write();
        }
        assert_eq!(ring.write_pos(), RING_CAPACITY - 1);
        assert_eq!(ring.advance_write(), 0);
        assert_eq!(ring.advance_read(), 1);

        SharedSegment::unlink(&name).unwrap();
    }

    #[test]
    fn test_create_twice_and_open_missing() {
        let name = unique("twice");
        let _segment = SharedSegment::create(&name).unwrap();
        assert!(matches!(
            SharedSegment::create(&name),
            Err(ChannelError::AlreadyExists { .. })
        ));
        SharedSegment::unlink(&name).unwrap();

        assert!(matches!(
            SharedSegment::open(&name),
            Err(ChannelError::NotFound { .. })
        ));
    }
}
