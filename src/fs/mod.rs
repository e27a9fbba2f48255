//! Filesystem utilities for the directory-backed catalog.

pub mod atomic;

pub use atomic::{atomic_write, remove_if_exists};
