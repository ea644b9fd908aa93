//! Error types for the shared ring and its named primitives

use std::fmt;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error(
        "invalid namespace '{0}': must start with '/', contain no other '/' or NUL, and be at most {max} bytes",
        max = crate::channel::names::MAX_NAMESPACE_LEN
    )]
    InvalidName(String),

    /// The consumer found a named object left behind by another run.
    #[error("{name} already exists (another supervisor running, or stale after a crash?)")]
    AlreadyExists { name: String },

    /// A producer tried to attach before the consumer created the channel.
    #[error("{name} does not exist (is the supervisor running?)")]
    NotFound { name: String },

    #[error("shared memory {name} has size {actual}, expected at least {expected}")]
    LayoutMismatch {
        name: String,
        actual: u64,
        expected: usize,
    },

    #[error("{op} on {name} failed: {source}")]
    Os {
        op: &'static str,
        name: String,
        #[source]
        source: io::Error,
    },
}

impl ChannelError {
    /// Wrap the current `errno` for a failed call.
    pub(crate) fn last_os(op: &'static str, name: &str) -> Self {
        Self::from_io(op, name, io::Error::last_os_error())
    }

    /// Classify an OS error, singling out the setup cases callers report
    /// differently.
    pub(crate) fn from_io(op: &'static str, name: &str, source: io::Error) -> Self {
        match source.raw_os_error() {
            Some(libc::EEXIST) => ChannelError::AlreadyExists {
                name: name.to_string(),
            },
            Some(libc::ENOENT) if !op.ends_with("unlink") => ChannelError::NotFound {
                name: name.to_string(),
            },
            _ => ChannelError::Os {
                op,
                name: name.to_string(),
                source,
            },
        }
    }
}

/// Every failure hit while closing and unlinking the channel.
///
/// Teardown keeps going after a failure, so there can be several.
#[derive(Debug)]
pub struct TeardownError {
    pub failures: Vec<ChannelError>,
}

impl fmt::Display for TeardownError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "teardown finished with {} error(s)", self.failures.len())?;
        for (i, failure) in self.failures.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{}{}", sep, failure)?;
        }
        Ok(())
    }
}

impl std::error::Error for TeardownError {}

impl TeardownError {
    /// `Ok` if nothing failed, otherwise all collected failures.
    pub fn check(failures: Vec<ChannelError>) -> Result<(), TeardownError> {
        if failures.is_empty() {
            Ok(())
        } else {
            Err(TeardownError { failures })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_setup_errors() {
        let exists = ChannelError::from_io("shm_open", "/x", io::Error::from_raw_os_error(libc::EEXIST));
        assert!(matches!(exists, ChannelError::AlreadyExists { .. }));

        let missing = ChannelError::from_io("sem_open", "/x", io::Error::from_raw_os_error(libc::ENOENT));
        assert!(matches!(missing, ChannelError::NotFound { .. }));

        let other = ChannelError::from_io("sem_wait", "/x", io::Error::from_raw_os_error(libc::EINVAL));
        assert!(other.to_string().starts_with("sem_wait on /x failed"));
    }

    #[test]
    fn test_teardown_error_lists_every_failure() {
        assert!(TeardownError::check(vec![]).is_ok());

        let err = TeardownError::check(vec![
            ChannelError::from_io("sem_unlink", "/a", io::Error::from_raw_os_error(libc::ENOENT)),
            ChannelError::from_io("shm_unlink", "/b", io::Error::from_raw_os_error(libc::EACCES)),
        ])
        .unwrap_err();
        let text = err.to_string();
        assert!(text.contains("2 error(s)"));
        assert!(text.contains("sem_unlink on /a"));
        assert!(text.contains("shm_unlink on /b"));
        assert!(!text.contains('\n'));
    }
}
