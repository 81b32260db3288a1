//! Filesystem helpers shared by Transmute crates that touch disk.
//!
//! - **`atomic_write`**: temp file + rename replacement of generated files

pub mod atomic_write;

pub use atomic_write::{AtomicWriteOptions, Replaced, atomic_write, atomic_write_with_options};
