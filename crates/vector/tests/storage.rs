// Copyright 2026 The Keel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Storage Transition Tests
//!
//! Watch the allocator while the vector moves between inline and heap storage.

use std::{
    alloc::Layout,
    cell::Cell,
    ptr::NonNull,
    rc::Rc,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use keel_vector::{AllocError, Heap, RawAllocator, SboVector, StorageMode, Tracked, VectorError};

#[test]
fn test_no_allocation_while_inline() {
    let alloc = Tracked::new();
    let mut v: SboVector<u64, 8, Tracked> = SboVector::new_in(alloc.clone());

    for i in 0..7 {
        v.push_back(i).unwrap();
    }
    assert_eq!(v.storage_mode(), StorageMode::Inline);
    assert_eq!(alloc.stats().allocations(), 0);

    v.push_back(7).unwrap();
    assert_eq!(v.storage_mode(), StorageMode::Heap);
    assert_eq!(alloc.stats().allocations(), 1);
    assert_eq!(alloc.stats().live(), 1);
    assert!(v.iter().copied().eq(0..8u64));
}

#[test]
fn test_heap_growth_reallocates() {
    let alloc = Tracked::new();
    let mut v: SboVector<u32, 4, Tracked> = SboVector::new_in(alloc.clone());
    for i in 0..100 {
        v.push_back(i).unwrap();
    }
    assert_eq!(alloc.stats().allocations(), 1);
    assert!(alloc.stats().reallocations() > 0);
    assert_eq!(alloc.stats().live(), 1);
    assert_eq!(
        alloc.stats().live_bytes(),
        v.capacity() * size_of::<u32>()
    );
}

#[test]
fn test_shrink_releases_heap() {
    let alloc = Tracked::new();
    let mut v: SboVector<u32, 8, Tracked> = SboVector::new_in(alloc.clone());
    for i in 0..30 {
        v.push_back(i).unwrap();
    }
    v.truncate(3);
    v.shrink().unwrap();
    assert!(v.is_inline());
    assert_eq!(alloc.stats().live(), 0);
    assert_eq!(alloc.stats().live_bytes(), 0);
    assert_eq!(v, [0, 1, 2]);
}

#[test]
fn test_drop_releases_heap() {
    let alloc = Tracked::new();
    let stats = alloc.shared_stats();
    {
        let mut v: SboVector<u32, 2, Tracked> = SboVector::new_in(alloc);
        v.extend_from_slice(&[1, 2, 3, 4]).unwrap();
        assert_eq!(stats.live(), 1);
    }
    assert_eq!(stats.live(), 0);
    assert_eq!(stats.releases(), 1);
}

#[test]
fn test_grab_does_not_allocate() {
    let alloc = Tracked::new();
    let mut a: SboVector<u32, 2, Tracked> = SboVector::new_in(alloc.clone());
    let mut b: SboVector<u32, 2, Tracked> = SboVector::new_in(alloc.clone());
    a.extend_from_slice(&[5, 6, 7]).unwrap();
    let before = alloc.stats().allocations();

    b.grab(&mut a);
    assert_eq!(alloc.stats().allocations(), before);
    assert_eq!(alloc.stats().live(), 1);
    assert_eq!(a.capacity(), 0);
    assert_eq!(b, [5, 6, 7]);

    drop(b);
    assert_eq!(alloc.stats().live(), 0);
}

/// Fails every request once its budget of successful allocations is spent.
#[derive(Clone)]
struct Budget {
    remaining: Arc<AtomicUsize>,
}

impl Budget {
    fn new(allowed: usize) -> Self {
        Budget {
            remaining: Arc::new(AtomicUsize::new(allowed)),
        }
    }

    fn spend(&self, bytes: usize) -> Result<(), AllocError> {
        self.remaining
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |r| r.checked_sub(1))
            .map(|_| ())
            .map_err(|_| AllocError { bytes })
    }
}

unsafe impl RawAllocator for Budget {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        self.spend(layout.size())?;
        Heap.allocate(layout)
    }

    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old: Layout,
        new_size: usize,
    ) -> Result<NonNull<u8>, AllocError> {
        self.spend(new_size)?;
        unsafe { Heap.reallocate(ptr, old, new_size) }
    }

    unsafe fn release(&self, ptr: NonNull<u8>, layout: Layout) {
        unsafe { Heap.release(ptr, layout) }
    }
}

#[test]
fn test_failed_spill_leaves_vector_unchanged() {
    let mut v: SboVector<u32, 4, Budget> = SboVector::new_in(Budget::new(0));
    v.extend_from_slice(&[1, 2, 3]).unwrap();

    let err = v.push_back(4).unwrap_err();
    assert_eq!(
        err,
        VectorError::Alloc {
            bytes: 5 * size_of::<u32>()
        }
    );
    assert_eq!(v, [1, 2, 3]);
    assert_eq!(v.capacity(), 3);
    assert!(v.is_inline());
}

#[test]
fn test_failed_copy_from_keeps_old_contents() {
    let mut src: SboVector<u32, 8> = SboVector::new();
    src.extend_from_slice(&[1, 2, 3, 4]).unwrap();

    let mut dst: SboVector<u32, 2, Budget> = SboVector::new_in(Budget::new(0));
    dst.push_back(7).unwrap();

    let err = dst.copy_from(&src).unwrap_err();
    assert_eq!(
        err,
        VectorError::Alloc {
            bytes: 4 * size_of::<u32>()
        }
    );
    assert_eq!(dst, [7]);
    assert_eq!(dst.capacity(), 1);
    assert!(dst.is_inline());
}

#[test]
fn test_failed_regrow_keeps_heap_contents() {
    let mut v: SboVector<u32, 2, Budget> = SboVector::new_in(Budget::new(1));
    v.extend_from_slice(&[1, 2, 3]).unwrap();
    let cap = v.capacity();

    assert!(v.reserve(64).is_err());
    assert_eq!(v.capacity(), cap);
    assert_eq!(v, [1, 2, 3]);

    // Shrinking back inline needs no allocation.
    v.truncate(1);
    v.shrink().unwrap();
    assert!(v.is_inline());
    assert_eq!(v, [1]);
}

/// Counts live instances so every construction can be matched with exactly one drop.
#[derive(Debug)]
struct Counted {
    id: u32,
    live: Rc<Cell<isize>>,
}

impl Counted {
    fn new(id: u32, live: &Rc<Cell<isize>>) -> Self {
        live.set(live.get() + 1);
        Counted {
            id,
            live: live.clone(),
        }
    }
}

impl Clone for Counted {
    fn clone(&self) -> Self {
        Counted::new(self.id, &self.live)
    }
}

impl PartialEq for Counted {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Drop for Counted {
    fn drop(&mut self) {
        self.live.set(self.live.get() - 1);
    }
}

#[test]
fn test_non_trivial_elements_dropped_once() {
    let live = Rc::new(Cell::new(0));
    {
        let mut v: SboVector<Counted, 4> = SboVector::new();
        for i in 0..10 {
            v.push_back(Counted::new(i, &live)).unwrap();
        }
        v.push_front(Counted::new(100, &live)).unwrap();
        assert_eq!(live.get(), 11);

        let popped = v.pop_back();
        assert_eq!(popped.id, 9);
        drop(popped);
        assert_eq!(live.get(), 10);

        let removed = v.unordered_remove_at(0);
        assert_eq!(removed.id, 100);
        drop(removed);
        assert_eq!(live.get(), 9);
        assert_eq!(v.at(0).id, 8);

        v.resize(12, Counted::new(7, &live)).unwrap();
        assert_eq!(live.get(), 12);

        v.truncate(2);
        v.shrink().unwrap();
        assert!(v.is_inline());
        assert_eq!(live.get(), 2);
        assert_eq!(v.at(1).id, 0);

        let mut other: SboVector<Counted, 4> = SboVector::new();
        other.copy_from(&v).unwrap();
        assert_eq!(live.get(), 4);

        let mut target: SboVector<Counted, 4> = SboVector::new();
        target.push_back(Counted::new(55, &live)).unwrap();
        target.grab(&mut other);
        assert_eq!(live.get(), 4);
        assert!(target.contains(&Counted::new(8, &live)));

        v.clear();
        assert_eq!(live.get(), 2);
    }
    assert_eq!(live.get(), 0);
}
