//! Evalgraph file system port
//!
//! This crate provides the file system layer the resolver is built on:
//! - The `FileSystem` trait (sync and async stat, listing, realpath, read, write, remove)
//! - The immutable `File` record and its content-kind classification
//! - Lexical path utilities shared by the package loader and the workspace
//! - Disk, in-memory and directory-entry caching adapters

pub mod cached;
pub mod disk;
pub mod error;
pub mod file;
pub mod memory;
pub mod path;
pub mod port;

pub use cached::CachedFileSystem;
pub use disk::DiskFileSystem;
pub use error::{FsError, Result};
pub use file::{ContentKind, File};
pub use memory::{FsOpCounts, MemoryFileSystem};
pub use port::{Encoding, EntryKind, FileSystem, Metadata, TraversalFilter};
