// Copyright 2026 The Keel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keel engine support.
//!
//! The renderer needs a handful of small services that all sit on top of `SboVector`: a wide
//! string for text that ends up in platform APIs, whole-file loading for shaders and meshes, and a
//! console logger.  They are kept out of the vector crate so that it stays a leaf.
//!
//! - `string::WideString` is a zero-terminated UTF-16 string with `%` placeholder formatting.
//! - `file` reads files into vectors, optionally padded to whole words for SPIR-V.
//! - `console` is a `log` sink with the engine's `[INFO]` style prefixes.
//! - `config` layers defaults, a TOML file and the `KEEL_LOG` environment variable.

pub mod config;
pub mod console;
pub mod file;
pub mod string;

pub use keel_vector as vector;

pub mod prelude {
    pub use super::KeelError;
    pub use crate::string::{AppendWide, WideString};
    pub use keel_vector::prelude::*;
}

#[derive(thiserror::Error, Debug)]
pub enum KeelError {
    #[error("Vector: {0}")]
    Vector(#[from] keel_vector::VectorError),

    #[error("File: {0}")]
    File(#[from] file::FileError),

    #[error("Config: {0}")]
    Config(#[from] config::ConfigError),
}
