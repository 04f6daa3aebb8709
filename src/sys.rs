//! System collaborators used by the pool allocator.
//!
//! The allocation engine in [`crate::pool`] never talks to the operating
//! system directly: every system allocation, the page-size query used to
//! size the small/large split, and the file primitives behind the bundled
//! cleanup handlers go through this module, keeping allocation policy
//! separate from the raw platform calls it rests on.

use std::alloc::{self, Layout};
use std::ffi::CString;
use std::ptr::NonNull;

use crate::core::DEFAULT_PAGE_SIZE;
use crate::error::PoolError;

/// Allocates `layout` from the system allocator.
///
/// Used for both pool blocks (`POOL_ALIGNMENT`) and large allocations
/// (caller-supplied alignment).
pub fn alloc_block(layout: Layout) -> Result<NonNull<u8>, PoolError> {
    if layout.size() == 0 {
        return Err(PoolError::out_of_memory(layout.size(), layout.align()));
    }

    // SAFETY: layout has non-zero size, checked above.
    let ptr = unsafe { alloc::alloc(layout) };
    NonNull::new(ptr).ok_or_else(|| PoolError::out_of_memory_with_layout(layout))
}

/// Frees memory previously returned by [`alloc_block`] with the same layout.
///
/// # Safety
///
/// `ptr` must have been allocated by [`alloc_block`] with exactly `layout`.
pub unsafe fn dealloc_block(ptr: NonNull<u8>, layout: Layout) {
    unsafe { alloc::dealloc(ptr.as_ptr(), layout) }
}

/// Queries the system page size, falling back to [`DEFAULT_PAGE_SIZE`] if the
/// platform query fails or returns a nonsensical value.
#[must_use]
pub fn page_size() -> usize {
    #[cfg(unix)]
    {
        // SAFETY: sysconf with a valid name is always safe to call.
        let n = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if n > 0 {
            return n as usize;
        }
    }
    DEFAULT_PAGE_SIZE
}

/// Closes a raw file descriptor, logging (but never propagating) a failure.
///
/// Used by the bundled close-file and delete-file cleanup handlers.
pub fn close_fd(fd: std::os::unix::io::RawFd) {
    // SAFETY: fd is caller-supplied and assumed open; close is safe to call
    // on any descriptor value, including already-closed ones (it just errors).
    let rc = unsafe { libc::close(fd) };
    if rc != 0 {
        #[cfg(feature = "logging")]
        tracing::warn!(fd, error = %std::io::Error::last_os_error(), "failed to close file descriptor");
    }
}

/// Removes the file at `path`, swallowing a missing-file error. Other
/// failures are logged but never propagated: cleanup handlers have no
/// return channel.
pub fn remove_file(path: &CString) {
    let path_str = path.to_string_lossy();
    if let Err(e) = std::fs::remove_file(path_str.as_ref()) {
        if e.kind() != std::io::ErrorKind::NotFound {
            #[cfg(feature = "logging")]
            tracing::warn!(path = %path_str, error = %e, "failed to delete file");
            #[cfg(not(feature = "logging"))]
            let _ = e;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_is_plausible() {
        let size = page_size();
        assert!(size >= 4096);
        assert!(size.is_power_of_two());
    }

    #[test]
    fn alloc_and_dealloc_block_roundtrip() {
        let layout = Layout::from_size_align(4096, 16).unwrap();
        let ptr = alloc_block(layout).unwrap();
        unsafe {
            ptr.as_ptr().write_bytes(0xAB, layout.size());
            dealloc_block(ptr, layout);
        }
    }

    #[test]
    fn zero_size_alloc_is_out_of_memory() {
        let layout = Layout::from_size_align(0, 16).unwrap();
        assert!(alloc_block(layout).is_err());
    }
}
