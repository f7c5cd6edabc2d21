#![doc = include_str!("../README.md")]

mod error;
mod pool;
mod processor;
mod shutdown;
mod source;
mod tracker;

pub use crate::error::*;
pub use crate::pool::*;
pub use crate::processor::*;
pub use crate::shutdown::*;
pub use crate::source::*;
pub use crate::tracker::*;

// Re-exported so callers can build cancel tokens without depending on
// `tokio-util` directly.
pub use tokio_util::sync::CancellationToken;
