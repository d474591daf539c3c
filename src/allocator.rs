use std::alloc::{self, Layout};
use std::fmt;
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::usize;

/// A source of raw memory for an engine.
///
/// A matcher borrows its allocator for its whole lifetime and routes every
/// allocation the engine makes on its behalf through it: contexts, compiled
/// patterns, capture output buffers and any scratch space used while
/// matching.
///
/// Implementations must be safe to send and share between threads, since a
/// matcher may be moved to another thread while still borrowing its
/// allocator.
pub trait Allocator: Send + Sync {
    /// Allocate a block of at least `size` bytes, aligned for any primitive
    /// type.
    ///
    /// Returns a null pointer when the request cannot be satisfied. This
    /// must never panic, since it is called from inside the engine.
    fn allocate(&self, size: usize) -> *mut u8;

    /// Release a block previously returned by `allocate` on this same
    /// allocator. A null pointer is ignored.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a live block obtained from `self.allocate`.
    unsafe fn deallocate(&self, ptr: *mut u8);
}

// Engines free memory without telling us how big it was, so every block
// carries its size in a header. The header is as big as the alignment we
// promise, which keeps the block that follows it aligned too.
const HEADER: usize = 16;

/// An allocator backed by the global Rust allocator.
///
/// This is what a matcher uses when no other allocator is given.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemAllocator;

impl SystemAllocator {
    /// Return the size that was requested for the given block.
    ///
    /// # Safety
    ///
    /// `ptr` must be a live, non-null block from `SystemAllocator`.
    unsafe fn block_size(ptr: *mut u8) -> usize {
        *(ptr.sub(HEADER) as *const usize)
    }
}

impl Allocator for SystemAllocator {
    fn allocate(&self, size: usize) -> *mut u8 {
        let total = match size.checked_add(HEADER) {
            None => return ptr::null_mut(),
            Some(total) => total,
        };
        let layout = match Layout::from_size_align(total, HEADER) {
            Err(_) => return ptr::null_mut(),
            Ok(layout) => layout,
        };
        unsafe {
            let base = alloc::alloc(layout);
            if base.is_null() {
                return ptr::null_mut();
            }
            *(base as *mut usize) = size;
            base.add(HEADER)
        }
    }

    unsafe fn deallocate(&self, ptr: *mut u8) {
        if ptr.is_null() {
            return;
        }
        let size = SystemAllocator::block_size(ptr);
        let layout = Layout::from_size_align_unchecked(size + HEADER, HEADER);
        alloc::dealloc(ptr.sub(HEADER), layout);
    }
}

/// An allocator that keeps count of what it hands out.
///
/// Memory comes from `SystemAllocator`. Besides bookkeeping, a
/// `CountingAllocator` can be told to refuse allocations once a given number
/// of them have been made, which makes it possible to observe how a matcher
/// behaves when memory runs out.
pub struct CountingAllocator {
    inner: SystemAllocator,
    blocks_in_use: AtomicUsize,
    bytes_in_use: AtomicUsize,
    total_allocations: AtomicUsize,
    allocation_limit: AtomicUsize,
}

impl CountingAllocator {
    /// Create a new counting allocator with no allocation limit.
    pub fn new() -> CountingAllocator {
        CountingAllocator {
            inner: SystemAllocator,
            blocks_in_use: AtomicUsize::new(0),
            bytes_in_use: AtomicUsize::new(0),
            total_allocations: AtomicUsize::new(0),
            allocation_limit: AtomicUsize::new(usize::MAX),
        }
    }

    /// The number of blocks allocated and not yet released.
    pub fn blocks_in_use(&self) -> usize {
        self.blocks_in_use.load(Ordering::SeqCst)
    }

    /// The number of bytes allocated and not yet released.
    pub fn bytes_in_use(&self) -> usize {
        self.bytes_in_use.load(Ordering::SeqCst)
    }

    /// The number of successful allocations made so far.
    pub fn total_allocations(&self) -> usize {
        self.total_allocations.load(Ordering::SeqCst)
    }

    /// Refuse every allocation once `total_allocations` reaches `limit`.
    ///
    /// Passing `None` removes the limit.
    pub fn set_allocation_limit(&self, limit: Option<usize>) {
        let limit = limit.unwrap_or(usize::MAX);
        self.allocation_limit.store(limit, Ordering::SeqCst);
    }
}

impl Default for CountingAllocator {
    fn default() -> CountingAllocator {
        CountingAllocator::new()
    }
}

impl fmt::Debug for CountingAllocator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("CountingAllocator")
            .field("blocks_in_use", &self.blocks_in_use())
            .field("bytes_in_use", &self.bytes_in_use())
            .field("total_allocations", &self.total_allocations())
            .finish()
    }
}

impl Allocator for CountingAllocator {
    fn allocate(&self, size: usize) -> *mut u8 {
        let limit = self.allocation_limit.load(Ordering::SeqCst);
        if self.total_allocations() >= limit {
            return ptr::null_mut();
        }
        let ptr = self.inner.allocate(size);
        if !ptr.is_null() {
            self.total_allocations.fetch_add(1, Ordering::SeqCst);
            self.blocks_in_use.fetch_add(1, Ordering::SeqCst);
            self.bytes_in_use.fetch_add(size, Ordering::SeqCst);
        }
        ptr
    }

    unsafe fn deallocate(&self, ptr: *mut u8) {
        if ptr.is_null() {
            return;
        }
        let size = SystemAllocator::block_size(ptr);
        self.blocks_in_use.fetch_sub(1, Ordering::SeqCst);
        self.bytes_in_use.fetch_sub(size, Ordering::SeqCst);
        self.inner.deallocate(ptr);
    }
}

#[cfg(test)]
mod tests {
    use super::{Allocator, CountingAllocator, SystemAllocator, HEADER};

    #[test]
    fn system_blocks_are_aligned_and_writable() {
        let alloc = SystemAllocator;
        for &size in &[0, 1, 7, 64, 4096] {
            let ptr = alloc.allocate(size);
            assert!(!ptr.is_null());
            assert_eq!(ptr as usize % HEADER, 0);
            unsafe {
                for i in 0..size {
                    *ptr.add(i) = i as u8;
                }
                alloc.deallocate(ptr);
            }
        }
    }

    #[test]
    fn system_refuses_absurd_sizes() {
        assert!(SystemAllocator.allocate(::std::usize::MAX).is_null());
    }

    #[test]
    fn counting() {
        let alloc = CountingAllocator::new();
        let a = alloc.allocate(10);
        let b = alloc.allocate(22);
        assert_eq!(alloc.blocks_in_use(), 2);
        assert_eq!(alloc.bytes_in_use(), 32);
        assert_eq!(alloc.total_allocations(), 2);

        unsafe {
            alloc.deallocate(a);
        }
        assert_eq!(alloc.blocks_in_use(), 1);
        assert_eq!(alloc.bytes_in_use(), 22);

        unsafe {
            alloc.deallocate(b);
            alloc.deallocate(::std::ptr::null_mut());
        }
        assert_eq!(alloc.blocks_in_use(), 0);
        assert_eq!(alloc.bytes_in_use(), 0);
        assert_eq!(alloc.total_allocations(), 2);
    }

    #[test]
    fn counting_limit() {
        let alloc = CountingAllocator::new();
        alloc.set_allocation_limit(Some(1));
        let a = alloc.allocate(8);
        assert!(!a.is_null());
        assert!(alloc.allocate(8).is_null());
        assert_eq!(alloc.total_allocations(), 1);

        alloc.set_allocation_limit(None);
        let b = alloc.allocate(8);
        assert!(!b.is_null());
        unsafe {
            alloc.deallocate(a);
            alloc.deallocate(b);
        }
        assert_eq!(alloc.blocks_in_use(), 0);
    }

    #[test]
    fn allocators_cross_threads() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<SystemAllocator>();
        assert_send_sync::<CountingAllocator>();
        assert_send_sync::<dyn Allocator>();

        let alloc = CountingAllocator::new();
        let shared: &dyn Allocator = &alloc;
        ::std::thread::scope(|s| {
            s.spawn(|| unsafe { shared.deallocate(shared.allocate(8)) });
        });
        assert_eq!(alloc.total_allocations(), 1);
        assert_eq!(alloc.blocks_in_use(), 0);
    }
}
