//! The pool allocator: construction, allocation dispatch, reset, and
//! destruction.
//!
//! A [`Pool`] owns a chain of fixed-size [`Block`]s serving small bump
//! allocations, a side list of [`LargeDescriptor`]s for oversized
//! allocations routed straight to the system heap, and a LIFO
//! [`CleanupNode`] stack run at destruction. All three lists are intrusive
//! raw-pointer lists rather than `Box`-owned chains: descriptor and cleanup
//! nodes are themselves allocated inside the block chain via the small
//! path, so they cannot be independently `Box`-owned without contradicting
//! that requirement.

mod block;
mod cleanup;
pub mod handlers;
mod large;

use std::alloc::Layout;
use std::marker::PhantomData;
use std::os::unix::io::RawFd;
use std::ptr::NonNull;

use block::Block;
pub use cleanup::CleanupHandle;
use cleanup::CleanupNode;
use large::LargeDescriptor;

use crate::core::POOL_ALIGNMENT;
use crate::error::{PoolError, PoolResult};
use crate::sys;

/// Default block size, matching the conventional 16 KiB request-scoped
/// pool size.
pub const DEFAULT_BLOCK_SIZE: usize = 16 * 1024;

/// Construction parameters for a [`Pool`].
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Size in bytes of every block in the chain, including the first.
    pub block_size: usize,
    /// Name attached to diagnostic events. Purely cosmetic.
    pub name: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            name: "pool".to_string(),
        }
    }
}

/// A region-based bump allocator for request-scoped allocation lifetimes.
///
/// Not [`Send`] or [`Sync`]: a pool is owned by exactly one logical task at
/// a time. That rule is enforced at compile time here rather than left as
/// documentation.
pub struct Pool {
    block_size: usize,
    max_small: usize,
    current: *mut Block,
    blocks_head: *mut Block,
    large_head: *mut LargeDescriptor,
    cleanup_head: *mut CleanupNode,
    chain_link: Option<NonNull<u8>>,
    #[cfg(feature = "logging")]
    span: tracing::Span,
    _not_send_sync: PhantomData<*mut ()>,
}

impl Pool {
    /// Creates a pool whose blocks are `block_size` bytes each.
    pub fn new(block_size: usize) -> PoolResult<Self> {
        Self::with_config(PoolConfig {
            block_size,
            ..PoolConfig::default()
        })
    }

    /// Creates a pool from an explicit [`PoolConfig`].
    pub fn with_config(config: PoolConfig) -> PoolResult<Self> {
        let (block, _) = block::new_block(config.block_size, 0, false)?;

        let ceiling = sys::page_size().saturating_sub(1);
        let max_small = config
            .block_size
            .saturating_sub(std::mem::size_of::<Block>())
            .min(ceiling);

        #[cfg(feature = "logging")]
        let span = tracing::info_span!("pool", name = %config.name, block_size = config.block_size);
        #[cfg(feature = "logging")]
        {
            let _enter = span.enter();
            tracing::debug!(max_small, "pool created");
        }

        Ok(Self {
            block_size: config.block_size,
            max_small,
            current: block.as_ptr(),
            blocks_head: block.as_ptr(),
            large_head: std::ptr::null_mut(),
            cleanup_head: std::ptr::null_mut(),
            chain_link: None,
            #[cfg(feature = "logging")]
            span,
            _not_send_sync: PhantomData,
        })
    }

    fn small_alloc(&mut self, size: usize, aligned: bool) -> PoolResult<NonNull<u8>> {
        if let Some(ptr) = unsafe { block::search(self.current, size, aligned) } {
            return Ok(ptr);
        }
        self.grow(size)
    }

    fn grow(&mut self, size: usize) -> PoolResult<NonNull<u8>> {
        // The new block's first chunk is always word-aligned, even when the
        // search that triggered growth came from the unaligned (`pnalloc`)
        // path: block-grow has no `aligned` parameter of its own.
        let (new_block, ptr) = block::new_block(self.block_size, size, true)?;
        unsafe {
            block::link_tail_and_advance_current(&mut self.current, new_block);
        }
        #[cfg(feature = "logging")]
        {
            let _enter = self.span.enter();
            tracing::trace!("block chain grew");
        }
        Ok(ptr)
    }

    fn attach_large_descriptor(&mut self, ptr: NonNull<u8>, layout: Layout) -> PoolResult<NonNull<u8>> {
        match self.small_alloc(std::mem::size_of::<LargeDescriptor>(), true) {
            Ok(desc_ptr) => {
                let desc = desc_ptr.cast::<LargeDescriptor>();
                unsafe {
                    desc.as_ptr().write(LargeDescriptor {
                        alloc: ptr.as_ptr(),
                        layout,
                        next: self.large_head,
                    });
                }
                self.large_head = desc.as_ptr();
                Ok(ptr)
            }
            Err(e) => {
                unsafe { sys::dealloc_block(ptr, layout) };
                Err(e)
            }
        }
    }

    fn large_alloc(&mut self, size: usize) -> PoolResult<NonNull<u8>> {
        let layout = Layout::from_size_align(size, 1).map_err(|_| PoolError::out_of_memory(size, 1))?;
        let ptr = sys::alloc_block(layout)?;

        if unsafe { large::reuse_vacant_slot(self.large_head, ptr.as_ptr(), layout) } {
            return Ok(ptr);
        }
        self.attach_large_descriptor(ptr, layout)
    }

    /// Allocates `size` bytes, word-aligned. Routed to the block chain when
    /// `size` fits within the pool's small-allocation ceiling, otherwise to
    /// the large list.
    pub fn palloc(&mut self, size: usize) -> PoolResult<NonNull<u8>> {
        if size <= self.max_small {
            self.small_alloc(size, true)
        } else {
            self.large_alloc(size)
        }
    }

    /// Identical to [`Pool::palloc`] except the small path does not align
    /// its bump cursor. Large allocations behave the same either way.
    pub fn pnalloc(&mut self, size: usize) -> PoolResult<NonNull<u8>> {
        if size <= self.max_small {
            self.small_alloc(size, false)
        } else {
            self.large_alloc(size)
        }
    }

    /// Allocates `size` zero-filled bytes via the usual dispatch. Zeroing
    /// is unconditional on success.
    pub fn pcalloc(&mut self, size: usize) -> PoolResult<NonNull<u8>> {
        let ptr = self.palloc(size)?;
        unsafe {
            ptr.as_ptr().write_bytes(0, size);
        }
        Ok(ptr)
    }

    /// Allocates `size` bytes aligned to `align`, always via the large
    /// path and always with a fresh descriptor — unlike `palloc`'s large
    /// path, this never scans for a vacant slot to reuse.
    pub fn pmemalign(&mut self, size: usize, align: usize) -> PoolResult<NonNull<u8>> {
        let layout = Layout::from_size_align(size, align).map_err(|_| PoolError::out_of_memory(size, align))?;
        let ptr = sys::alloc_block(layout)?;
        self.attach_large_descriptor(ptr, layout)
    }

    /// Frees a large allocation previously returned by `palloc`, `pnalloc`,
    /// or `pmemalign`. Scans the entire large list; the descriptor slot is
    /// left in place, never unlinked, so it may be reused by a future
    /// large-path allocation if it lies within the scan window.
    pub fn pfree(&mut self, ptr: NonNull<u8>) -> PoolResult<()> {
        if unsafe { large::free_matching(self.large_head, ptr) } {
            Ok(())
        } else {
            Err(PoolError::NotFound)
        }
    }

    /// Registers a new cleanup node with `data_size` bytes of attached,
    /// word-aligned storage, returning a handle the caller arms with a
    /// handler (and populates the data through) before it goes out of
    /// scope. The node is prepended to the cleanup stack immediately, but
    /// stays inert (skipped at destruction) until armed.
    pub fn cleanup_add(&mut self, data_size: usize) -> PoolResult<CleanupHandle<'_>> {
        let node_ptr = self.small_alloc(std::mem::size_of::<CleanupNode>(), true)?;
        let data = if data_size > 0 {
            self.small_alloc(data_size, true)?.as_ptr()
        } else {
            std::ptr::null_mut()
        };

        let node = node_ptr.cast::<CleanupNode>();
        unsafe {
            node.as_ptr().write(CleanupNode {
                handler: None,
                data,
                next: self.cleanup_head,
            });
        }
        self.cleanup_head = node.as_ptr();

        Ok(CleanupHandle {
            node,
            _marker: PhantomData,
        })
    }

    /// Walks the cleanup list for the first node armed through
    /// [`handlers::close_file`] whose file descriptor equals `fd`, runs it
    /// immediately, and clears its handler so destruction skips it. Other
    /// nodes, including ones armed through [`handlers::delete_file`], are
    /// not matched. Returns after the first match.
    pub fn run_cleanup_file(&mut self, fd: RawFd) {
        let mut n = self.cleanup_head;
        unsafe {
            while !n.is_null() {
                let node = &mut *n;
                if node.handler == Some(handlers::run_close_file) {
                    let data = &*(node.data as *const handlers::CloseFileData);
                    if data.fd == fd {
                        let handler = node.handler.take().expect("checked Some above");
                        handler(node.data);
                        return;
                    }
                }
                n = node.next;
            }
        }
    }

    /// Takes the caller-attached chain-link scratch value, if any, leaving
    /// the slot empty. Opaque to the allocator; exists purely so
    /// higher-level buffer-chain code can cache one reusable link across
    /// requests.
    pub fn take_chain_link(&mut self) -> Option<NonNull<u8>> {
        self.chain_link.take()
    }

    /// Stores a caller-attached chain-link scratch value, overwriting any
    /// previous one.
    pub fn set_chain_link(&mut self, link: NonNull<u8>) {
        self.chain_link = Some(link);
    }

    /// Frees every large allocation and rewinds each block's bump cursor
    /// to just past its header, without invoking cleanup handlers. This
    /// matches nginx's reset, which also leaves the cleanup list pointer
    /// untouched: already-registered nodes remain valid (their backing
    /// bytes are not rezeroed) until new allocations overwrite them.
    pub fn reset(&mut self) {
        unsafe {
            let mut d = self.large_head;
            while !d.is_null() {
                let desc = &mut *d;
                if !desc.alloc.is_null() {
                    sys::dealloc_block(NonNull::new_unchecked(desc.alloc), desc.layout);
                    desc.alloc = std::ptr::null_mut();
                }
                d = desc.next;
            }

            let mut b = self.blocks_head;
            while !b.is_null() {
                let block = &mut *b;
                block.last = (b as *mut u8).add(std::mem::size_of::<Block>());
                block.failed = 0;
                b = block.next;
            }
        }

        self.current = self.blocks_head;
        self.large_head = std::ptr::null_mut();
        self.chain_link = None;

        #[cfg(feature = "logging")]
        {
            let _enter = self.span.enter();
            tracing::debug!("pool reset");
        }
    }

    /// Consumes the pool, running its destruction sequence: cleanups in
    /// reverse-registration order, then large allocations, then blocks
    /// head to tail. Equivalent to letting the pool drop; spelled out as
    /// an explicit method for callers who want destruction visible at the
    /// call site.
    pub fn destroy(self) {}
}

impl Drop for Pool {
    fn drop(&mut self) {
        unsafe {
            let mut n = self.cleanup_head;
            while !n.is_null() {
                let node = &mut *n;
                if let Some(handler) = node.handler.take() {
                    handler(node.data);
                }
                n = node.next;
            }

            let mut d = self.large_head;
            while !d.is_null() {
                let desc = &mut *d;
                if !desc.alloc.is_null() {
                    sys::dealloc_block(NonNull::new_unchecked(desc.alloc), desc.layout);
                }
                d = desc.next;
            }

            let layout =
                Layout::from_size_align(self.block_size, POOL_ALIGNMENT).expect("validated at construction");
            let mut b = self.blocks_head;
            while !b.is_null() {
                let next = (*b).next;
                sys::dealloc_block(NonNull::new_unchecked(b as *mut u8), layout);
                b = next;
            }
        }

        #[cfg(feature = "logging")]
        {
            let _enter = self.span.enter();
            tracing::debug!("pool destroyed");
        }
    }
}
