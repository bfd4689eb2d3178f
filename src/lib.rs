//! Request-scoped region allocator.
//!
//! A [`Pool`] serves many small allocations by bumping a cursor through a
//! chain of fixed-size blocks and reclaims everything at once when it drops.
//! Oversized requests go straight to the system heap and are tracked so they
//! can be released early ([`Pool::free`]) or at destruction. Callers can
//! register [`cleanup`] handlers that run when the pool is destroyed, in
//! reverse registration order.
//!
//! Built for workloads where allocation vastly outnumbers deallocation and
//! object lifetimes coincide with a unit of work: a request, a connection, a
//! parse.
//!
//! ```
//! let mut pool = repool::Pool::new(4096)?;
//!
//! let n = pool.alloc_val(7u64)?;
//! assert_eq!(*n, 7);
//!
//! let greeting = pool.alloc_slice(b"hello")?;
//! assert_eq!(greeting, b"hello");
//!
//! pool.reset(); // everything above is gone; the block stays
//! # Ok::<(), repool::AllocError>(())
//! ```

pub mod cleanup;
pub(crate) mod heap;
pub mod pool;
pub mod stats;

pub use cleanup::{Cleanup, CleanupHandler};
#[cfg(unix)]
pub use cleanup::{FileCleanup, close_file, delete_file};
pub use heap::AllocError;
pub use pool::{MIN_BLOCK_SIZE, POOL_ALIGNMENT, Pool, WORD_ALIGNMENT};
pub use stats::{PoolStats, snapshot};

// Serializes tests against the process-wide gauges in `stats`: tests that
// assert gauge deltas take the write lock, everything else reads.
#[cfg(test)]
pub(crate) static TEST_MUTEX: std::sync::RwLock<()> = std::sync::RwLock::new(());
