//! Names of the shared memory segment and the three semaphores

use crate::channel::error::ChannelError;
use std::ffi::{CStr, CString};

pub const DEFAULT_NAMESPACE: &str = "/threecolor";

/// Longest accepted namespace. Leaves room for the longest suffix and the
/// `sem.` prefix Linux adds under `/dev/shm` within `NAME_MAX`.
pub const MAX_NAMESPACE_LEN: usize = 200;

/// The four POSIX object names derived from one namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelNames {
    namespace: String,
    shm: CString,
    free_slots: CString,
    used_slots: CString,
    writer_turn: CString,
}

impl ChannelNames {
    pub fn new(namespace: &str) -> Result<Self, ChannelError> {
        let valid = namespace.len() > 1
            && namespace.len() <= MAX_NAMESPACE_LEN
            && namespace.starts_with('/')
            && !namespace[1..].contains('/')
            && !namespace.contains('\0');
        if !valid {
            return Err(ChannelError::InvalidName(namespace.to_string()));
        }

        let derive = |suffix: &str| {
            CString::new(format!("{}_{}", namespace, suffix))
                .map_err(|_| ChannelError::InvalidName(namespace.to_string()))
        };

        Ok(Self {
            namespace: namespace.to_string(),
            shm: derive("shm")?,
            free_slots: derive("sem_free")?,
            used_slots: derive("sem_used")?,
            writer_turn: derive("sem_write")?,
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn shm(&self) -> &CStr {
        &self.shm
    }

    pub fn free_slots(&self) -> &CStr {
        &self.free_slots
    }

    pub fn used_slots(&self) -> &CStr {
        &self.used_slots
    }

    pub fn writer_turn(&self) -> &CStr {
        &self.writer_turn
    }
}

impl Default for ChannelNames {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            shm: c"/threecolor_shm".to_owned(),
            free_slots: c"/threecolor_sem_free".to_owned(),
            used_slots: c"/threecolor_sem_used".to_owned(),
            writer_turn: c"/threecolor_sem_write".to_owned(),
        }
    }
}
