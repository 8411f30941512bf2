//! Infrastructure shared across the monitoring core

pub mod pool;

pub use pool::WorkerPool;
