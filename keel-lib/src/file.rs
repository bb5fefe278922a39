// Copyright 2026 The Keel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Files
//!
//! Whole-file reads into `SboVector`.  Shader modules want `u32` words, so `read_words` pads the
//! tail with zeros instead of rejecting files whose length is not a multiple of four.

use std::{io::Read, path::Path};

use keel_vector::{SboVector, VectorError};

/// Bytes of a whole file.  Tiny files stay inline.
pub type Bytes = SboVector<u8, 16>;

/// Native-endian words.  Always on the heap once non-empty.
pub type Words = SboVector<u32, 0>;

#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("buffer: {0}")]
    Vector(#[from] VectorError),
}

pub fn read_all_bytes(path: impl AsRef<Path>) -> Result<Bytes, FileError> {
    let path = path.as_ref();
    let mut file = std::fs::File::open(path)?;
    let byte_len =
        usize::try_from(file.metadata()?.len()).map_err(|_| VectorError::CapacityOverflow)?;

    let mut bytes = Bytes::new();
    bytes.resize(byte_len, 0)?;
    file.read_exact(bytes.as_mut_slice())?;
    log::debug!("read {byte_len} bytes from {}", path.display());
    Ok(bytes)
}

/// Reads `path` as native-endian `u32` words, zero-padding a trailing partial word.
pub fn read_words(path: impl AsRef<Path>) -> Result<Words, FileError> {
    let path = path.as_ref();
    let mut bytes = read_all_bytes(path)?;
    let byte_len = bytes.len();
    bytes.align(size_of::<u32>(), 0)?;
    if bytes.len() != byte_len {
        log::debug!(
            "{} is {byte_len} bytes, padded to {}",
            path.display(),
            bytes.len()
        );
    }

    let mut words = Words::new();
    words.reserve(bytes.len() / size_of::<u32>())?;
    for chunk in bytes.chunks_exact(size_of::<u32>()) {
        words.push_back(bytemuck::pod_read_unaligned::<u32>(chunk))?;
    }
    Ok(words)
}
