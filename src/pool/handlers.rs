//! Bundled cleanup handlers: close-file and delete-file.
//!
//! Mirrors nginx's `ngx_pool_cleanup_file`/`ngx_pool_delete_file`: each
//! registers its own cleanup node (sized correctly for its private data
//! layout) and arms it, so callers only need a pool and a descriptor.

use std::ffi::CString;
use std::os::unix::io::RawFd;

use super::{CleanupHandle, Pool};
use crate::error::PoolResult;
use crate::sys;

/// Data attached to a close-file cleanup.
#[repr(C)]
pub(crate) struct CloseFileData {
    pub(crate) fd: RawFd,
}

/// Data attached to a delete-file cleanup.
#[repr(C)]
pub(crate) struct DeleteFileData {
    pub(crate) fd: RawFd,
    pub(crate) path: CString,
}

/// Registers a cleanup that closes `fd` at pool destruction (or earlier,
/// via [`crate::pool::Pool::run_cleanup_file`], which specifically targets
/// nodes armed through this function).
pub fn close_file(pool: &mut Pool, fd: RawFd) -> PoolResult<()> {
    let mut handle: CleanupHandle<'_> = pool.cleanup_add(std::mem::size_of::<CloseFileData>())?;
    unsafe {
        (handle.data() as *mut CloseFileData).write(CloseFileData { fd });
    }
    handle.set_handler(run_close_file);
    Ok(())
}

/// Registers a cleanup that deletes `path` and then closes `fd` at pool
/// destruction. A missing `path` at invocation time is not an error.
pub fn delete_file(pool: &mut Pool, fd: RawFd, path: CString) -> PoolResult<()> {
    let mut handle: CleanupHandle<'_> = pool.cleanup_add(std::mem::size_of::<DeleteFileData>())?;
    unsafe {
        (handle.data() as *mut DeleteFileData).write(DeleteFileData { fd, path });
    }
    handle.set_handler(run_delete_file);
    Ok(())
}

/// The bundled close-file handler. Identity matters: [`Pool::run_cleanup_file`]
/// compares against this function pointer to find targeted nodes.
///
/// [`Pool::run_cleanup_file`]: crate::pool::Pool::run_cleanup_file
pub(crate) unsafe fn run_close_file(data: *mut u8) {
    let data = &*(data as *const CloseFileData);
    sys::close_fd(data.fd);
}

unsafe fn run_delete_file(data: *mut u8) {
    let ptr = data as *mut DeleteFileData;
    sys::remove_file(&(*ptr).path);
    sys::close_fd((*ptr).fd);
    // The descriptor struct lives in pool memory and is reclaimed with
    // the block that holds it, but the CString's own heap buffer is a
    // separate allocation that must be dropped explicitly.
    std::ptr::drop_in_place(&mut (*ptr).path);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_file_handler_matches_run_cleanup_file() {
        let mut pool = Pool::new(4096).unwrap();
        close_file(&mut pool, 99).unwrap();

        // fd 99 isn't a real descriptor; closing it just fails a syscall,
        // which close_fd logs and swallows.
        pool.run_cleanup_file(99);
    }
}
