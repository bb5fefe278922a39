// Copyright 2026 The Keel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Vector
//!
//! `SboVector` is the growable array everything else in Keel is built on: strings, handle lists,
//! vertex streams.  Small sequences live inline inside the vector itself and never touch the
//! allocator.  Once the capacity reaches the inline threshold `N`, storage moves to the heap.
//! Shrinking below the threshold moves it back.
//!
//! ```
//! use keel_vector::{SboVector, StorageMode};
//!
//! let mut v: SboVector<u32, 4> = SboVector::new();
//! v.push_back(1).unwrap();
//! v.push_back(2).unwrap();
//! assert_eq!(v.storage_mode(), StorageMode::Inline);
//!
//! v.extend_from_slice(&[3, 4, 5]).unwrap();
//! assert_eq!(v.storage_mode(), StorageMode::Heap);
//! assert_eq!(v, [1, 2, 3, 4, 5]);
//! ```
//!
//! The allocator is a type parameter.  `Heap` is the process heap.  `Tracked` wraps any allocator
//! and counts what it does, which is how tests and the workbench observe storage transitions.
//!
//! ## Errors
//!
//! Allocation failure is the only failure a caller can recover from and it is returned as
//! `VectorError`.  Contract violations (out of bounds indices, popping an empty vector, a bad
//! `align` block size) are bugs in the caller and panic at the call site.

pub mod alloc;
pub mod vector;

pub use alloc::{AllocError, AllocStats, Heap, RawAllocator, Tracked};
pub use vector::{SboVector, StorageMode};

pub mod prelude {
    pub use super::VectorError;
    pub use crate::alloc::RawAllocator;
    pub use crate::vector::SboVector;
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorError {
    #[error("allocation of {bytes} bytes failed")]
    Alloc { bytes: usize },

    /// The requested element count does not fit in the address space.
    #[error("capacity overflow")]
    CapacityOverflow,
}

impl From<AllocError> for VectorError {
    fn from(e: AllocError) -> Self {
        VectorError::Alloc { bytes: e.bytes }
    }
}
