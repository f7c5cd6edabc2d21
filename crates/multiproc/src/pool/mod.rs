//! Fixed-size worker pool over a shared message source.
//!
//! ## Structure
//!
//! - `config` - [`PoolConfig`] and the [`SourceClosed`] policy.
//! - `worker` - the per-slot receive/process loop.
//! - `coordinator` - fan-out, outcome selection and drained shutdown.

mod config;
mod coordinator;
mod worker;


pub use config::{PoolConfig, SourceClosed};
pub use coordinator::{Coordinator, process_concurrent};
