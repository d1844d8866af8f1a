//! Worker pool and job queue.
//!
//! [`JobQueue`] is a mutex and condition variable guarded FIFO that can be
//! closed and drained. [`TaskPool`] runs fire-and-forget closures on a fixed
//! number of threads pulling from one such queue.
//!
//! # Example
//!
//! ```rust,ignore
//! use hashvault_pool::TaskPool;
//!
//! let pool = TaskPool::new(4)?;
//! for record in records {
//!     pool.submit(move || hash(record));
//! }
//! pool.join(); // every submitted task has run
//! ```

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

mod error;
mod pool;
mod queue;

pub use error::PoolError;
pub use pool::TaskPool;
pub use queue::JobQueue;
