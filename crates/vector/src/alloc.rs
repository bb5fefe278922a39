// Copyright 2026 The Keel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Allocation
//!
//! The three primitives a vector needs from its host: allocate, reallocate, release.  Anything
//! that can honor them (the process heap, an arena, a pool) can back a `SboVector`.
//!
//! `Tracked` is the live-allocation counter every debug build of the engine wanted.  Wrap an
//! allocator in it and hand the stats handle to whoever wants to watch.

use std::{
    alloc::Layout,
    ptr::{self, NonNull},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("out of memory requesting {bytes} bytes")]
pub struct AllocError {
    pub bytes: usize,
}

/// Raw memory for vector storage.
///
/// # Safety
///
/// Implementors must return blocks valid for reads and writes of `layout.size()` bytes at
/// `layout.align()`, exclusively owned by the caller until released.  `reallocate` must preserve
/// the first `min(old.size(), new_size)` bytes and must leave the old block untouched and valid
/// when it fails.  Zero-sized requests may be answered with a dangling, aligned pointer.
pub unsafe trait RawAllocator: Clone {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError>;

    /// # Safety
    ///
    /// `ptr` must have been returned by this allocator for `old`, and `new_size` rounded up to
    /// `old.align()` must not overflow `isize`.
    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old: Layout,
        new_size: usize,
    ) -> Result<NonNull<u8>, AllocError>;

    /// # Safety
    ///
    /// `ptr` must have been returned by this allocator for `layout` and not released since.
    unsafe fn release(&self, ptr: NonNull<u8>, layout: Layout);
}

fn dangling(align: usize) -> NonNull<u8> {
    // NOTE alignment is never zero
    unsafe { NonNull::new_unchecked(ptr::without_provenance_mut(align)) }
}

/// The process heap.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Heap;

unsafe impl RawAllocator for Heap {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        if layout.size() == 0 {
            return Ok(dangling(layout.align()));
        }
        let raw = unsafe { std::alloc::alloc(layout) };
        NonNull::new(raw).ok_or(AllocError {
            bytes: layout.size(),
        })
    }

    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old: Layout,
        new_size: usize,
    ) -> Result<NonNull<u8>, AllocError> {
        if old.size() == 0 {
            let new = Layout::from_size_align(new_size, old.align())
                .map_err(|_| AllocError { bytes: new_size })?;
            return self.allocate(new);
        }
        if new_size == 0 {
            unsafe { self.release(ptr, old) };
            return Ok(dangling(old.align()));
        }
        let raw = unsafe { std::alloc::realloc(ptr.as_ptr(), old, new_size) };
        NonNull::new(raw).ok_or(AllocError { bytes: new_size })
    }

    unsafe fn release(&self, ptr: NonNull<u8>, layout: Layout) {
        if layout.size() != 0 {
            unsafe { std::alloc::dealloc(ptr.as_ptr(), layout) };
        }
    }
}

/// Counters shared by every clone of a `Tracked` allocator.  Zero-sized requests are not counted
/// because they never reach the heap.
#[derive(Debug, Default)]
pub struct AllocStats {
    live: AtomicUsize,
    allocations: AtomicUsize,
    reallocations: AtomicUsize,
    releases: AtomicUsize,
    live_bytes: AtomicUsize,
}

impl AllocStats {
    /// Blocks allocated and not yet released.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::Relaxed)
    }

    pub fn allocations(&self) -> usize {
        self.allocations.load(Ordering::Relaxed)
    }

    pub fn reallocations(&self) -> usize {
        self.reallocations.load(Ordering::Relaxed)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::Relaxed)
    }

    pub fn live_bytes(&self) -> usize {
        self.live_bytes.load(Ordering::Relaxed)
    }

    fn on_allocate(&self, bytes: usize) {
        self.live.fetch_add(1, Ordering::Relaxed);
        self.allocations.fetch_add(1, Ordering::Relaxed);
        self.live_bytes.fetch_add(bytes, Ordering::Relaxed);
        log::trace!("alloc {bytes} bytes, {} live", self.live());
    }

    fn on_reallocate(&self, old: usize, new: usize) {
        self.reallocations.fetch_add(1, Ordering::Relaxed);
        self.live_bytes.fetch_add(new, Ordering::Relaxed);
        self.live_bytes.fetch_sub(old, Ordering::Relaxed);
        log::trace!("realloc {old} -> {new} bytes");
    }

    fn on_release(&self, bytes: usize) {
        self.live.fetch_sub(1, Ordering::Relaxed);
        self.releases.fetch_add(1, Ordering::Relaxed);
        self.live_bytes.fetch_sub(bytes, Ordering::Relaxed);
        log::trace!("free {bytes} bytes, {} live", self.live());
    }
}

/// Counts the traffic going through another allocator.  Clones share one `AllocStats`.
#[derive(Clone, Debug)]
pub struct Tracked<A: RawAllocator = Heap> {
    inner: A,
    stats: Arc<AllocStats>,
}

impl Tracked<Heap> {
    pub fn new() -> Self {
        Self::wrap(Heap)
    }
}

impl Default for Tracked<Heap> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: RawAllocator> Tracked<A> {
    pub fn wrap(inner: A) -> Self {
        Tracked {
            inner,
            stats: Arc::new(AllocStats::default()),
        }
    }

    pub fn stats(&self) -> &AllocStats {
        &self.stats
    }

    /// A handle that outlives the allocator, e.g. to check for leaks after a vector is dropped.
    pub fn shared_stats(&self) -> Arc<AllocStats> {
        self.stats.clone()
    }
}

unsafe impl<A: RawAllocator> RawAllocator for Tracked<A> {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        let ptr = self.inner.allocate(layout)?;
        if layout.size() != 0 {
            self.stats.on_allocate(layout.size());
        }
        Ok(ptr)
    }

    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old: Layout,
        new_size: usize,
    ) -> Result<NonNull<u8>, AllocError> {
        let ptr = unsafe { self.inner.reallocate(ptr, old, new_size)? };
        match (old.size(), new_size) {
            (0, 0) => {}
            (0, new) => self.stats.on_allocate(new),
            (old, 0) => self.stats.on_release(old),
            (old, new) => self.stats.on_reallocate(old, new),
        }
        Ok(ptr)
    }

    unsafe fn release(&self, ptr: NonNull<u8>, layout: Layout) {
        unsafe { self.inner.release(ptr, layout) };
        if layout.size() != 0 {
            self.stats.on_release(layout.size());
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_heap_zero_size_is_dangling() {
        let layout = Layout::from_size_align(0, 8).unwrap();
        let ptr = Heap.allocate(layout).unwrap();
        assert_eq!(ptr.as_ptr() as usize % 8, 0);
        unsafe { Heap.release(ptr, layout) };
    }

    #[test]
    fn test_heap_reallocate_preserves_prefix() {
        let layout = Layout::array::<u32>(4).unwrap();
        let ptr = Heap.allocate(layout).unwrap().cast::<u32>();
        unsafe {
            for i in 0..4 {
                ptr.as_ptr().add(i).write(i as u32 * 10);
            }
            let grown = Heap
                .reallocate(ptr.cast(), layout, 16 * size_of::<u32>())
                .unwrap()
                .cast::<u32>();
            let prefix = std::slice::from_raw_parts(grown.as_ptr(), 4);
            assert_eq!(prefix, &[0, 10, 20, 30]);
            Heap.release(grown.cast(), Layout::array::<u32>(16).unwrap());
        }
    }

    #[test]
    fn test_tracked_counts() {
        let tracked = Tracked::new();
        let layout = Layout::array::<u64>(8).unwrap();

        let ptr = tracked.allocate(layout).unwrap();
        assert_eq!(tracked.stats().live(), 1);
        assert_eq!(tracked.stats().live_bytes(), 64);

        let ptr = unsafe { tracked.reallocate(ptr, layout, 128).unwrap() };
        assert_eq!(tracked.stats().live(), 1);
        assert_eq!(tracked.stats().reallocations(), 1);
        assert_eq!(tracked.stats().live_bytes(), 128);

        let grown = Layout::from_size_align(128, layout.align()).unwrap();
        unsafe { tracked.release(ptr, grown) };
        assert_eq!(tracked.stats().live(), 0);
        assert_eq!(tracked.stats().live_bytes(), 0);
        assert_eq!(tracked.stats().allocations(), 1);
        assert_eq!(tracked.stats().releases(), 1);
    }

    #[test]
    fn test_tracked_ignores_zero_size() {
        let tracked = Tracked::new();
        let layout = Layout::from_size_align(0, 4).unwrap();
        let ptr = tracked.allocate(layout).unwrap();
        unsafe { tracked.release(ptr, layout) };
        assert_eq!(tracked.stats().allocations(), 0);
        assert_eq!(tracked.stats().releases(), 0);
    }
}
