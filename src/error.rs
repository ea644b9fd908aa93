//! Top-level error type for the command-line entry points

use crate::channel::{ChannelError, TeardownError};
use crate::parser::ParseError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid edge list: {0}")]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Teardown(#[from] TeardownError),

    #[error("writing progress failed: {0}")]
    Output(#[source] io::Error),

    #[error("installing signal handlers failed: {0}")]
    Signal(#[source] io::Error),

    #[error("locating the current executable failed: {0}")]
    CurrentExe(#[source] io::Error),

    #[error("spawning generator {index} failed: {source}")]
    Spawn {
        index: usize,
        #[source]
        source: io::Error,
    },
}
