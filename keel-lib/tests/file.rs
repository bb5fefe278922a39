// Copyright 2026 The Keel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # File Loading Tests

use std::path::PathBuf;

use keel_lib::{
    file::{self, FileError},
    vector::StorageMode,
};

/// Writes `contents` to a per-test file under the temp dir.
fn scratch(name: &str, contents: &[u8]) -> PathBuf {
    let path = std::env::temp_dir().join(format!("keel-{}-{name}", std::process::id()));
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_small_file_stays_inline() {
    let path = scratch("small", b"hello");
    let bytes = file::read_all_bytes(&path).unwrap();
    assert_eq!(bytes, *b"hello");
    assert_eq!(bytes.storage_mode(), StorageMode::Inline);
    std::fs::remove_file(path).unwrap();
}

#[test]
fn test_large_file_on_heap() {
    let contents: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
    let path = scratch("large", &contents);
    let bytes = file::read_all_bytes(&path).unwrap();
    assert_eq!(bytes.len(), 1000);
    assert_eq!(bytes.as_slice(), contents.as_slice());
    assert_eq!(bytes.storage_mode(), StorageMode::Heap);
    std::fs::remove_file(path).unwrap();
}

#[test]
fn test_empty_file() {
    let path = scratch("empty", b"");
    let bytes = file::read_all_bytes(&path).unwrap();
    assert!(bytes.is_empty());
    assert_eq!(bytes.capacity(), 0);
    assert!(file::read_words(&path).unwrap().is_empty());
    std::fs::remove_file(path).unwrap();
}

#[test]
fn test_words_padded() {
    let mut contents = Vec::new();
    contents.extend_from_slice(&0x0723_0203u32.to_ne_bytes());
    contents.extend_from_slice(&0x0001_0000u32.to_ne_bytes());
    contents.extend_from_slice(&[0xab, 0xcd]);
    let path = scratch("words", &contents);

    let words = file::read_words(&path).unwrap();
    assert_eq!(words.len(), 3);
    assert_eq!(words[0], 0x0723_0203);
    assert_eq!(words[1], 0x0001_0000);
    assert_eq!(words[2], u32::from_ne_bytes([0xab, 0xcd, 0, 0]));
    assert_eq!(words.storage_mode(), StorageMode::Heap);
    std::fs::remove_file(path).unwrap();
}

#[test]
fn test_missing_file() {
    let path = std::env::temp_dir().join("keel-no-such-file.bin");
    assert!(matches!(file::read_all_bytes(&path), Err(FileError::Io(_))));
    assert!(matches!(file::read_words(&path), Err(FileError::Io(_))));
}
