// Copyright 2026 The Keel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # SboVector
//!
//! A growable array with an inline buffer of `N` slots.  The storage is one of two states:
//!
//! - **Inline** while the capacity is below `N`.  Elements live inside the vector value and no
//!   allocation happens.
//! - **Heap** once the capacity reaches `N`.  Elements live in a buffer from the allocator `A`.
//!
//! `set_capacity` is the only place the state changes.  Elements are moved between storages with
//! a bitwise copy.  That is sound for every Rust type: a move never runs user code and the source
//! slots are treated as uninitialized afterwards, so nothing is dropped twice.
//!
//! Pushing grows the capacity by `capacity / 2 + 1`, roughly 1.5x.  An inline vector never grows
//! past its last inline slot (`N - 1`) before spilling, so the whole inline buffer gets used.
//!
//! ## Reference Invalidation
//!
//! Any operation that can move storage takes `&mut self`, so references into the vector cannot
//! survive it:
//!
//! ```compile_fail
//! # use keel_vector::SboVector;
//! let mut v: SboVector<u32, 4> = SboVector::new();
//! v.push_back(1).unwrap();
//! let first = v.at(0);
//! v.push_back(2).unwrap(); // may relocate `first`
//! assert_eq!(*first, 1);
//! ```

use std::{
    alloc::Layout,
    fmt,
    mem::{self, MaybeUninit},
    ops::{Deref, DerefMut},
    ptr::{self, NonNull},
    slice,
};

use crate::{
    VectorError,
    alloc::{Heap, RawAllocator},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    Inline,
    Heap,
}

enum Storage<T, const N: usize> {
    Inline([MaybeUninit<T>; N]),
    Heap(NonNull<T>),
}

impl<T, const N: usize> Storage<T, N> {
    const fn empty() -> Self {
        Storage::Inline([const { MaybeUninit::uninit() }; N])
    }
}

/// Growable array storing up to `N - 1` elements inline.  See the module docs.
pub struct SboVector<T, const N: usize = 16, A: RawAllocator = Heap> {
    storage: Storage<T, N>,
    len: usize,
    capacity: usize,
    alloc: A,
}

unsafe impl<T: Send, const N: usize, A: RawAllocator + Send> Send for SboVector<T, N, A> {}
unsafe impl<T: Sync, const N: usize, A: RawAllocator + Sync> Sync for SboVector<T, N, A> {}

impl<T, const N: usize> SboVector<T, N, Heap> {
    pub const fn new() -> Self {
        Self::new_in(Heap)
    }
}

impl<T, const N: usize, A: RawAllocator> SboVector<T, N, A> {
    pub const fn new_in(alloc: A) -> Self {
        SboVector {
            storage: Storage::empty(),
            len: 0,
            capacity: 0,
            alloc,
        }
    }

    /// Inline threshold.  Capacities at or above it live on the heap.
    pub const INLINE: usize = N;

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn storage_mode(&self) -> StorageMode {
        match self.storage {
            Storage::Inline(_) => StorageMode::Inline,
            Storage::Heap(_) => StorageMode::Heap,
        }
    }

    pub fn is_inline(&self) -> bool {
        matches!(self.storage, Storage::Inline(_))
    }

    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    pub fn as_ptr(&self) -> *const T {
        match &self.storage {
            Storage::Inline(buf) => buf.as_ptr().cast::<T>(),
            Storage::Heap(heap) => heap.as_ptr(),
        }
    }

    pub fn as_mut_ptr(&mut self) -> *mut T {
        match &mut self.storage {
            Storage::Inline(buf) => buf.as_mut_ptr().cast::<T>(),
            Storage::Heap(heap) => heap.as_ptr(),
        }
    }

    pub fn as_slice(&self) -> &[T] {
        unsafe { slice::from_raw_parts(self.as_ptr(), self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        let len = self.len;
        unsafe { slice::from_raw_parts_mut(self.as_mut_ptr(), len) }
    }

    /// Panics unless `index < len()`.
    #[track_caller]
    pub fn at(&self, index: usize) -> &T {
        self.check_index("at", index);
        unsafe { &*self.as_ptr().add(index) }
    }

    /// Panics unless `index < len()`.
    #[track_caller]
    pub fn at_mut(&mut self, index: usize) -> &mut T {
        self.check_index("at_mut", index);
        unsafe { &mut *self.as_mut_ptr().add(index) }
    }

    #[track_caller]
    pub fn back(&self) -> &T {
        assert!(self.len > 0, "back on an empty vector");
        self.at(self.len - 1)
    }

    #[track_caller]
    pub fn back_mut(&mut self) -> &mut T {
        assert!(self.len > 0, "back_mut on an empty vector");
        self.at_mut(self.len - 1)
    }

    /// Appends `value`.  Storage may move, including from inline to heap.
    pub fn push_back(&mut self, value: T) -> Result<(), VectorError> {
        if self.len == self.capacity {
            self.grow()?;
        }
        unsafe { self.as_mut_ptr().add(self.len).write(value) };
        self.len += 1;
        Ok(())
    }

    /// Inserts `value` at index 0, shifting everything up one slot.  O(n).
    pub fn push_front(&mut self, value: T) -> Result<(), VectorError> {
        if self.len == self.capacity {
            self.grow()?;
        }
        let len = self.len;
        let base = self.as_mut_ptr();
        unsafe {
            ptr::copy(base, base.add(1), len);
            base.write(value);
        }
        self.len += 1;
        Ok(())
    }

    /// Removes the last element.  Panics when empty.  Capacity is kept.
    #[track_caller]
    pub fn pop_back(&mut self) -> T {
        assert!(self.len > 0, "pop_back on an empty vector");
        self.len -= 1;
        unsafe { self.as_ptr().add(self.len).read() }
    }

    /// Removes the element at `index` by moving the last element into its slot.  O(1) and does
    /// not preserve order.  Panics unless `index < len()`.
    #[track_caller]
    pub fn unordered_remove_at(&mut self, index: usize) -> T {
        self.check_index("unordered_remove_at", index);
        let last = self.len - 1;
        let base = self.as_mut_ptr();
        self.len = last;
        unsafe {
            let removed = base.add(index).read();
            if index != last {
                ptr::copy_nonoverlapping(base.add(last), base.add(index), 1);
            }
            removed
        }
    }

    /// Drops the elements past `new_len`.  Does nothing if `new_len >= len()`.
    pub fn truncate(&mut self, new_len: usize) {
        if new_len >= self.len {
            return;
        }
        let tail = self.len - new_len;
        // Shorten first so a panicking destructor cannot cause a double drop.
        self.len = new_len;
        unsafe {
            let tail = ptr::slice_from_raw_parts_mut(self.as_mut_ptr().add(new_len), tail);
            ptr::drop_in_place(tail);
        }
    }

    /// Drops every element.  Capacity is kept; call `shrink` to give it back.
    pub fn clear(&mut self) {
        self.truncate(0);
    }

    /// Sets the length without initializing new slots.  Shrinking drops the excess elements.
    /// `resize_no_init(0)` is `clear()`.
    ///
    /// # Safety
    ///
    /// When growing, slots `[len(), new_len)` are counted as live but hold uninitialized memory.
    /// Every one of them must be written (e.g. through `as_mut_ptr`) before it is read, and
    /// before the vector is dropped or cleared unless `T` has no drop glue.
    pub unsafe fn resize_no_init(&mut self, new_len: usize) -> Result<(), VectorError> {
        if new_len <= self.len {
            self.truncate(new_len);
            return Ok(());
        }
        if new_len > self.capacity {
            self.set_capacity(new_len)?;
        }
        self.len = new_len;
        Ok(())
    }

    /// Reallocates to exactly `len()` slots, going back inline when the elements fit.
    pub fn shrink(&mut self) -> Result<(), VectorError> {
        if self.capacity != self.len {
            self.set_capacity(self.len)?;
        }
        Ok(())
    }

    /// Ensures room for at least `min_capacity` elements.  Never shrinks.
    pub fn reserve(&mut self, min_capacity: usize) -> Result<(), VectorError> {
        if min_capacity > self.capacity {
            self.set_capacity(min_capacity)?;
        }
        Ok(())
    }

    /// Like `reserve`, but grows by at least the push growth step so that repeated small
    /// appends stay amortized O(1).
    pub fn reserve_amortized(&mut self, min_capacity: usize) -> Result<(), VectorError> {
        if min_capacity > self.capacity {
            let target = min_capacity.max(self.grown_capacity()?);
            self.set_capacity(target)?;
        }
        Ok(())
    }

    /// Takes over the storage of `other`, leaving it empty with no capacity.  Never allocates.
    /// The previous contents of `self` are dropped.
    pub fn grab(&mut self, other: &mut Self) {
        let emptied = Self::new_in(other.alloc.clone());
        *self = mem::replace(other, emptied);
    }

    pub fn find(&self, value: &T, from: usize) -> Option<usize>
    where
        T: PartialEq,
    {
        self.as_slice()
            .get(from..)?
            .iter()
            .position(|x| x == value)
            .map(|i| i + from)
    }

    pub fn contains(&self, value: &T) -> bool
    where
        T: PartialEq,
    {
        self.as_slice().contains(value)
    }

    /// Removes the first element equal to `value` with `unordered_remove_at`.
    pub fn unordered_remove(&mut self, value: &T) -> bool
    where
        T: PartialEq,
    {
        match self.find(value, 0) {
            Some(i) => {
                self.unordered_remove_at(i);
                true
            }
            None => false,
        }
    }

    /// Resizes to `new_len`, cloning `fill` into new slots.
    pub fn resize(&mut self, new_len: usize, fill: T) -> Result<(), VectorError>
    where
        T: Clone,
    {
        if new_len <= self.len {
            self.truncate(new_len);
            return Ok(());
        }
        self.reserve(new_len)?;
        let base = self.as_mut_ptr();
        while self.len < new_len {
            unsafe { base.add(self.len).write(fill.clone()) };
            self.len += 1;
        }
        Ok(())
    }

    pub fn extend_from_slice(&mut self, items: &[T]) -> Result<(), VectorError>
    where
        T: Clone,
    {
        let needed = self
            .len
            .checked_add(items.len())
            .ok_or(VectorError::CapacityOverflow)?;
        self.reserve_amortized(needed)?;
        let base = self.as_mut_ptr();
        for item in items {
            unsafe { base.add(self.len).write(item.clone()) };
            self.len += 1;
        }
        Ok(())
    }

    /// Replaces the contents with clones of `other`'s elements.  `other` may use any inline
    /// threshold and any allocator.  On failure the old contents are kept.
    pub fn copy_from<const M: usize, B: RawAllocator>(
        &mut self,
        other: &SboVector<T, M, B>,
    ) -> Result<(), VectorError>
    where
        T: Clone,
    {
        // Allocate while the old elements are still live.
        self.reserve(other.len())?;
        self.clear();
        self.extend_from_slice(other.as_slice())
    }

    /// Pads the length with `fill` up to a multiple of `block_size_bytes`.  Used for payloads
    /// that external APIs want in whole words.
    ///
    /// Panics unless `block_size_bytes` is a positive multiple of `size_of::<T>()`.
    #[track_caller]
    pub fn align(&mut self, block_size_bytes: usize, fill: T) -> Result<(), VectorError>
    where
        T: Clone,
    {
        let elem = size_of::<T>();
        assert!(elem > 0, "align on a zero-sized element type");
        assert!(
            block_size_bytes >= elem && block_size_bytes % elem == 0,
            "align block of {block_size_bytes} bytes is not a multiple of the {elem} byte element"
        );
        let per_block = block_size_bytes / elem;
        let rem = self.len % per_block;
        if rem != 0 {
            self.resize(self.len + (per_block - rem), fill)?;
        }
        Ok(())
    }

    pub fn fill(&mut self, value: T)
    where
        T: Clone,
    {
        self.as_mut_slice().fill(value);
    }

    /// Panics if `begin + count` exceeds `len()`.
    #[track_caller]
    pub fn fill_range(&mut self, value: T, begin: usize, count: usize)
    where
        T: Clone,
    {
        let end = begin.saturating_add(count);
        assert!(
            end <= self.len,
            "fill_range {begin}..{end} out of bounds (len {})",
            self.len
        );
        self.as_mut_slice()[begin..end].fill(value);
    }

    /// The live elements as raw bytes.
    pub fn as_bytes(&self) -> &[u8]
    where
        T: bytemuck::Pod,
    {
        bytemuck::cast_slice(self.as_slice())
    }

    #[track_caller]
    fn check_index(&self, op: &str, index: usize) {
        assert!(
            index < self.len,
            "{op}: index {index} out of bounds (len {})",
            self.len
        );
    }

    /// Heap storage is used for capacities at or above the threshold.  Zero capacity is always
    /// inline so an empty vector never owns an allocation.
    const fn spills(capacity: usize) -> bool {
        capacity > 0 && capacity >= N
    }

    fn layout(capacity: usize) -> Result<Layout, VectorError> {
        Layout::array::<T>(capacity).map_err(|_| VectorError::CapacityOverflow)
    }

    fn heap_ptr(&self) -> Option<NonNull<T>> {
        match self.storage {
            Storage::Inline(_) => None,
            Storage::Heap(heap) => Some(heap),
        }
    }

    /// One growth step: `capacity * 1.5 + 1`, clamped to the last inline slot while inline.
    fn grown_capacity(&self) -> Result<usize, VectorError> {
        let new_capacity = self
            .capacity
            .checked_add(self.capacity / 2 + 1)
            .ok_or(VectorError::CapacityOverflow)?;
        if self.is_inline() && self.capacity + 1 < N {
            return Ok(new_capacity.min(N - 1));
        }
        Ok(new_capacity)
    }

    fn grow(&mut self) -> Result<(), VectorError> {
        let new_capacity = self.grown_capacity()?;
        self.set_capacity(new_capacity)
    }

    /// The storage state machine.  Callers never ask for less than `len` slots.
    fn set_capacity(&mut self, new_capacity: usize) -> Result<(), VectorError> {
        debug_assert!(new_capacity >= self.len);
        let len = self.len;

        match (self.heap_ptr(), Self::spills(new_capacity)) {
            (None, false) => {}
            (None, true) => {
                let layout = Self::layout(new_capacity)?;
                let heap = self.alloc.allocate(layout)?.cast::<T>();
                unsafe { ptr::copy_nonoverlapping(self.as_ptr(), heap.as_ptr(), len) };
                self.storage = Storage::Heap(heap);
                log::trace!("spilled {len} elements to a heap buffer of {new_capacity}");
            }
            (Some(heap), true) => {
                let old = Self::layout(self.capacity)?;
                let new = Self::layout(new_capacity)?;
                let moved = unsafe { self.alloc.reallocate(heap.cast(), old, new.size())? };
                self.storage = Storage::Heap(moved.cast());
            }
            (Some(heap), false) => {
                let old = Self::layout(self.capacity)?;
                let mut buf = [const { MaybeUninit::<T>::uninit() }; N];
                // `len <= new_capacity < N`, so the copy stays inside the inline buffer.
                let count = len.min(new_capacity);
                unsafe {
                    ptr::copy_nonoverlapping(heap.as_ptr(), buf.as_mut_ptr().cast::<T>(), count);
                    self.alloc.release(heap.cast(), old);
                }
                self.storage = Storage::Inline(buf);
                log::trace!("moved {len} elements back inline");
            }
        }

        self.capacity = new_capacity;
        Ok(())
    }
}

impl<T, const N: usize, A: RawAllocator> Drop for SboVector<T, N, A> {
    fn drop(&mut self) {
        self.clear();
        if let (Some(heap), Ok(layout)) = (self.heap_ptr(), Self::layout(self.capacity)) {
            unsafe { self.alloc.release(heap.cast(), layout) };
        }
    }
}

impl<T, const N: usize, A: RawAllocator + Default> Default for SboVector<T, N, A> {
    fn default() -> Self {
        Self::new_in(A::default())
    }
}

impl<T, const N: usize, A: RawAllocator> Deref for SboVector<T, N, A> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T, const N: usize, A: RawAllocator> DerefMut for SboVector<T, N, A> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T: Clone, const N: usize, A: RawAllocator> Clone for SboVector<T, N, A> {
    fn clone(&self) -> Self {
        let mut clone = Self::new_in(self.alloc.clone());
        if let Err(e) = clone.copy_from(self) {
            panic!("cloning a vector of {} elements: {e}", self.len);
        }
        clone
    }
}

impl<T: fmt::Debug, const N: usize, A: RawAllocator> fmt::Debug for SboVector<T, N, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T, U, const N: usize, const M: usize, A, B> PartialEq<SboVector<U, M, B>>
    for SboVector<T, N, A>
where
    T: PartialEq<U>,
    A: RawAllocator,
    B: RawAllocator,
{
    fn eq(&self, other: &SboVector<U, M, B>) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Eq, const N: usize, A: RawAllocator> Eq for SboVector<T, N, A> {}

impl<T: PartialEq<U>, U, const N: usize, A: RawAllocator> PartialEq<[U]> for SboVector<T, N, A> {
    fn eq(&self, other: &[U]) -> bool {
        self.as_slice() == other
    }
}

impl<T: PartialEq<U>, U, const N: usize, const K: usize, A: RawAllocator> PartialEq<[U; K]>
    for SboVector<T, N, A>
{
    fn eq(&self, other: &[U; K]) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<'a, T, const N: usize, A: RawAllocator> IntoIterator for &'a SboVector<T, N, A> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T, const N: usize, A: RawAllocator> IntoIterator for &'a mut SboVector<T, N, A> {
    type Item = &'a mut T;
    type IntoIter = slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}
