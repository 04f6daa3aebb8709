//! Error types for the pool allocator.
//!
//! Uses `thiserror` for clean, idiomatic error definitions, the same way
//! the wider ecosystem's memory-management crates define their error type.
//! The taxonomy is intentionally small: a pool can fail an allocation
//! (`OutOfMemory`) or fail to locate a tracked large allocation on free
//! (`NotFound`). There is no broader error surface — preconditions such as
//! passing an invalid pool handle are trusted, not checked.

use core::alloc::Layout;
use thiserror::Error;

#[cfg(feature = "logging")]
use tracing::error;

/// Errors produced by pool operations.
#[must_use = "errors should be handled"]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    /// The underlying system allocator could not satisfy a request, or an
    /// arithmetic overflow made the request unrepresentable.
    #[error("pool allocation failed: {size} bytes at {align}-byte alignment")]
    OutOfMemory {
        /// Requested allocation size in bytes.
        size: usize,
        /// Requested alignment in bytes.
        align: usize,
    },

    /// `pfree` was called with a pointer that is not tracked by this pool's
    /// large-allocation list (or was already freed).
    #[error("pointer is not a tracked large allocation of this pool")]
    NotFound,
}

impl PoolError {
    /// Builds a [`PoolError::OutOfMemory`] for the given request.
    pub fn out_of_memory(size: usize, align: usize) -> Self {
        #[cfg(feature = "logging")]
        error!(size, align, "pool allocation failed");

        Self::OutOfMemory { size, align }
    }

    /// Builds a [`PoolError::OutOfMemory`] from a failed allocation layout.
    #[must_use]
    pub fn out_of_memory_with_layout(layout: Layout) -> Self {
        Self::OutOfMemory {
            size: layout.size(),
            align: layout.align(),
        }
    }

    /// True if this error represents an allocation failure.
    #[must_use]
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, Self::OutOfMemory { .. })
    }

    /// True if this error represents a failed large-allocation lookup.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// Result type for pool operations.
pub type PoolResult<T> = core::result::Result<T, PoolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_memory_message_contains_size() {
        let err = PoolError::out_of_memory(1024, 8);
        assert!(err.to_string().contains("1024"));
        assert!(err.is_out_of_memory());
        assert!(!err.is_not_found());
    }

    #[test]
    fn out_of_memory_from_layout() {
        let layout = Layout::new::<u64>();
        let err = PoolError::out_of_memory_with_layout(layout);
        assert!(err.to_string().contains(&layout.size().to_string()));
    }

    #[test]
    fn not_found_message() {
        let err = PoolError::NotFound;
        assert!(!err.to_string().is_empty());
        assert!(err.is_not_found());
    }
}
