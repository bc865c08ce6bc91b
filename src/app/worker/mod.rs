//! Fetch worker pool
//!
//! - `core`: the per-worker loop (take unit, fetch under a permit, normalize, merge)
//! - `pool`: spawning and joining workers
//! - `types`: outcomes reported to the coordinator

pub mod core;
pub mod pool;
pub mod types;

pub use self::core::{FetchWorker, WorkerContext};
pub use pool::{PoolState, WorkerPool};
pub use types::{UnitOutcome, UnitStatus};
