//! Shared infrastructure utilities for Userstore crates.
//!
//! Currently this is the storage layer: a pooled SQLite backend with the
//! error types the rest of the workspace builds on.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod storage;
