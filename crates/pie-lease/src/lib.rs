//! Engine subprocess lifecycle: cache-root resolution, the on-disk
//! pidfile/refs/lock protocol, spawn-and-wait-for-readiness, and signal
//! escalation for shutdown.

pub mod cache_dir;
pub mod engine;
pub mod error;
pub mod lease;
pub mod lockfile;
pub mod pidstate;
pub mod shutdown;

pub use cache_dir::cache_root;
pub use error::LeaseError;
pub use lease::{LeaseConfig, LeaseManager};
