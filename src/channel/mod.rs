//! Shared-memory ring between generator processes and the supervisor
//!
//! # Architecture
//!
//! The channel consists of:
//! - A **segment** holding the ring, its two cursors and a termination flag
//! - Three **named semaphores** (free slots, used slots, writer turn)
//! - A **codec** mapping candidates to fixed-width slots
//! - The **protocol**: [`Producer::push`], [`Consumer::pop`] and the
//!   [`Consumer::terminate`] handshake
//!
//! The consumer creates every object and removes them again; producers only
//! ever open what already exists.
//!
//! # Example
//!
//! ```ignore
//! let names = ChannelNames::new("/demo")?;
//! let mut consumer = Consumer::create(&names)?;
//!
//! // In another process:
//! let producer = Producer::attach(&names)?;
//! producer.push(&candidate, &stop)?;
//!
//! let received = consumer.pop(&stop)?;
//! consumer.close()?;
//! ```

pub mod codec;
pub mod error;
pub mod layout;
pub mod names;
pub mod ring;
pub mod semaphore;

pub use error::{ChannelError, TeardownError};
pub use names::{ChannelNames, DEFAULT_NAMESPACE};
pub use ring::{Consumer, Producer, Push};
