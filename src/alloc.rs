//! Backing storage for the transposition table bucket array.
//!
//! On Linux the allocation is aligned to 2 MB and advised to back itself
//! with huge pages; elsewhere it is an ordinary zeroed heap allocation.
//! Allocation failure is fatal: a partially initialized table is unsafe to
//! search against, so we abort through `handle_alloc_error` rather than
//! return a degraded table.

use std::alloc::{alloc_zeroed, dealloc, handle_alloc_error, Layout};
use std::ptr::NonNull;

pub(crate) struct Allocation {
    ptr: NonNull<u8>,
    layout: Layout,
}

impl Allocation {
    /// Allocate `size` zeroed bytes with at least `align` alignment.
    pub(crate) fn zeroed(size: usize, align: usize) -> Self {
        #[cfg(target_os = "linux")]
        let align = align.max(2 * 1024 * 1024);
        #[cfg(not(target_os = "linux"))]
        let align = align.max(4096);

        let layout = Layout::from_size_align(size, align)
            .expect("invalid table layout")
            .pad_to_align();

        let Some(ptr) = NonNull::new(unsafe { alloc_zeroed(layout) }) else {
            handle_alloc_error(layout);
        };

        #[cfg(target_os = "linux")]
        unsafe {
            // A refused madvise only costs performance, never correctness.
            let _ = libc::madvise(ptr.as_ptr().cast(), layout.size(), libc::MADV_HUGEPAGE);
        }

        Allocation { ptr, layout }
    }

    pub(crate) fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }
}

impl Drop for Allocation {
    fn drop(&mut self) {
        unsafe {
            dealloc(self.ptr.as_ptr(), self.layout);
        }
    }
}

// SAFETY: Allocation owns raw memory; the table layered on top mediates all
// shared access through atomics.
unsafe impl Send for Allocation {}
unsafe impl Sync for Allocation {}
