//! Cleanup-handler registry: a LIFO stack of (handler, data) pairs run at
//! pool destruction in reverse-registration order.

use std::marker::PhantomData;
use std::ptr::NonNull;

/// One entry in the cleanup stack. A `None` handler means the node is
/// inert and is skipped both by destruction and by
/// [`crate::pool::Pool::run_cleanup_file`].
#[repr(C)]
pub(crate) struct CleanupNode {
    pub(crate) handler: Option<unsafe fn(*mut u8)>,
    pub(crate) data: *mut u8,
    pub(crate) next: *mut CleanupNode,
}

/// A freshly registered cleanup node, returned by
/// [`crate::pool::Pool::cleanup_add`] so the caller can arm it with a
/// handler and populate its data before it goes out of scope.
pub struct CleanupHandle<'a> {
    pub(crate) node: NonNull<CleanupNode>,
    pub(crate) _marker: PhantomData<&'a mut ()>,
}

impl<'a> CleanupHandle<'a> {
    /// Arms the node with `handler`. Until this is called the node stays
    /// inert and is skipped at destruction.
    pub fn set_handler(&mut self, handler: unsafe fn(*mut u8)) {
        unsafe {
            self.node.as_mut().handler = Some(handler);
        }
    }

    /// The data pointer allocated alongside this node (null if
    /// `data_size` was zero when the node was registered).
    #[must_use]
    pub fn data(&self) -> *mut u8 {
        unsafe { self.node.as_ref().data }
    }
}
