//! Block header and small-path (bump) allocation.

use std::alloc::Layout;
use std::ptr::NonNull;

use crate::core::{align_up, FAILURE_THRESHOLD, POOL_ALIGNMENT, WORD_ALIGNMENT};
use crate::error::PoolError;
use crate::sys;

/// Header at the start of every block in the chain, including the first.
#[repr(C)]
pub(crate) struct Block {
    pub(crate) last: *mut u8,
    pub(crate) end: *mut u8,
    pub(crate) next: *mut Block,
    pub(crate) failed: u32,
}

fn align_ptr(ptr: *mut u8, align: usize) -> *mut u8 {
    align_up(ptr as usize, align).expect("pointer arithmetic overflow") as *mut u8
}

/// Allocates and initializes a fresh block of `block_size` bytes, consuming
/// `size` bytes of it immediately — the new block's first allocation is
/// folded into its construction rather than requiring a separate search.
/// Returns the new block header and a pointer to the consumed region.
pub(crate) fn new_block(
    block_size: usize,
    size: usize,
    aligned: bool,
) -> Result<(NonNull<Block>, NonNull<u8>), PoolError> {
    let layout = Layout::from_size_align(block_size, POOL_ALIGNMENT)
        .map_err(|_| PoolError::out_of_memory(block_size, POOL_ALIGNMENT))?;
    let raw = sys::alloc_block(layout)?;

    let header_end = unsafe { raw.as_ptr().add(std::mem::size_of::<Block>()) };
    let m = if aligned {
        align_ptr(header_end, WORD_ALIGNMENT)
    } else {
        header_end
    };
    let last = unsafe { m.add(size) };
    let end = unsafe { raw.as_ptr().add(block_size) };

    let block_ptr = raw.cast::<Block>();
    unsafe {
        block_ptr.as_ptr().write(Block {
            last,
            end,
            next: std::ptr::null_mut(),
            failed: 0,
        });
    }

    Ok((block_ptr, unsafe { NonNull::new_unchecked(m) }))
}

/// Walks the chain starting at `current` for a block with enough room for
/// `size` bytes, bumping its `last` pointer on success. Returns `None` if
/// the whole chain was exhausted; callers fall back to block-grow.
pub(crate) unsafe fn search(current: *mut Block, size: usize, aligned: bool) -> Option<NonNull<u8>> {
    let mut b = current;
    while !b.is_null() {
        let block = &mut *b;
        let m = if aligned {
            align_ptr(block.last, WORD_ALIGNMENT)
        } else {
            block.last
        };
        let end_addr = block.end as usize;
        let m_addr = m as usize;
        if m_addr <= end_addr && end_addr - m_addr >= size {
            block.last = m.add(size);
            return Some(NonNull::new_unchecked(m));
        }
        b = block.next;
    }
    None
}

/// Links `new_block` as the current tail's `next`. While walking from
/// `current` to the tail, every traversed block's `failed` counter is
/// post-incremented; a block whose count crosses [`FAILURE_THRESHOLD`]
/// retires, and `current` advances past it. This is the only place a
/// block transitions from open to retired.
pub(crate) unsafe fn link_tail_and_advance_current(current: &mut *mut Block, new_block: NonNull<Block>) {
    let mut p = *current;
    while !(*p).next.is_null() {
        let failed_before = (*p).failed;
        (*p).failed += 1;
        if failed_before > FAILURE_THRESHOLD {
            *current = (*p).next;
        }
        p = (*p).next;
    }
    (*p).next = new_block.as_ptr();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_block_consumes_initial_allocation() {
        let (block, ptr) = new_block(256, 32, true).unwrap();
        unsafe {
            let b = block.as_ref();
            assert!(b.last > b as *const Block as *mut u8);
            assert!((ptr.as_ptr() as usize) % WORD_ALIGNMENT == 0);
            assert!(b.last as usize - ptr.as_ptr() as usize == 32);
            sys::dealloc_block(
                NonNull::new_unchecked(block.as_ptr() as *mut u8),
                Layout::from_size_align(256, POOL_ALIGNMENT).unwrap(),
            );
        }
    }

    #[test]
    fn search_fails_past_capacity() {
        let (block, _) = new_block(128, 0, true).unwrap();
        unsafe {
            let found = search(block.as_ptr(), 1024, true);
            assert!(found.is_none());
            sys::dealloc_block(
                NonNull::new_unchecked(block.as_ptr() as *mut u8),
                Layout::from_size_align(128, POOL_ALIGNMENT).unwrap(),
            );
        }
    }
}
