//! Core building blocks shared by the pool allocator: tuning constants used
//! by the small-path and large-path dispatch logic.

pub mod types;

pub use types::{
    DEFAULT_PAGE_SIZE, FAILURE_THRESHOLD, LARGE_SCAN_CAP, POOL_ALIGNMENT, WORD_ALIGNMENT, align_up,
};
