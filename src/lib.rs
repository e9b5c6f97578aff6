//! This crate provides virtual filesystems stored in a SQLite database.
#![allow(dead_code)]
#![deny(missing_docs)]

pub mod backend;
pub mod blob;
pub mod cache;
pub mod errors;
/// cbindgen:ignore
pub mod file_system;
pub mod handle;
pub mod meta_table;
pub mod path;
pub mod range_reader;

pub use self::file_system::FileSystem;
pub use self::handle::{Directory, File, FileHandle, Handle, Kind};
pub use self::path::Path;

/// The concrete SQLite connection this crate's [`FileSystem`] runs on.
pub type Database = rusqlite::Connection;
