//! # regionpool
//!
//! Region-based bump allocator pools for request-scoped allocation
//! lifetimes, in the spirit of nginx's `ngx_pool_t`.
//!
//! A [`Pool`](pool::Pool) serves many small allocations out of a chain of
//! fixed-size blocks with a simple bump cursor, routes oversized requests to
//! individual system allocations tracked on a side list, and runs a
//! caller-registered stack of cleanup handlers when the pool is destroyed.
//! There is no per-object free for small allocations: the pool is freed (or
//! reset) as a unit, which is what makes it cheap to use for the lifetime of
//! a single request or task.
//!
//! ## Quick start
//!
//! ```rust
//! use regionpool::Pool;
//!
//! let mut pool = Pool::new(4096).unwrap();
//! let buf = pool.palloc(128).unwrap();
//! let zeroed = pool.pcalloc(64).unwrap();
//! let big = pool.palloc(1 << 20).unwrap(); // routed to the large list
//! pool.pfree(big).unwrap();
//! // all remaining allocations are released when `pool` drops
//! # let _ = (buf, zeroed);
//! ```
//!
//! ## Features
//!
//! - `logging` (default): structured diagnostic events via `tracing` at
//!   construction, block growth, large-allocation failure, cleanup-handler
//!   failure, and destruction.
//!
//! ## Architecture
//!
//! - [`error`] — the two-variant error taxonomy the pool surfaces.
//! - [`core`] — tuning constants shared by the small-path and large-path
//!   dispatch logic.
//! - [`sys`] — system allocation, page-size query, and file primitives used
//!   by the bundled cleanup handlers. Kept separate from the allocation
//!   engine itself.
//! - [`pool`] — the `Pool` type and its block chain, large list, and
//!   cleanup registry.

#![warn(clippy::all)]
#![warn(clippy::perf)]
#![warn(rust_2018_idioms)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
// Pointer alignment casts and truncation in the pool allocator are reviewed per-site.
#![allow(clippy::cast_ptr_alignment)]
#![allow(clippy::cast_possible_truncation)]

pub mod core;
pub mod error;
pub mod pool;
pub mod sys;

pub use crate::error::{PoolError, PoolResult};
pub use crate::pool::{CleanupHandle, Pool, PoolConfig};

/// Convenient re-exports of commonly used types.
pub mod prelude {
    pub use crate::error::{PoolError, PoolResult};
    pub use crate::pool::{CleanupHandle, Pool, PoolConfig};
}
