//! Local filesystem access for nisupply.
//!
//! Two halves:
//!
//! - [`Walker`] lists regular files below a root in a deterministic order,
//!   pruning excluded directory names and applying the symlink policy.
//! - [`copy_file`], [`move_file`] and [`decompress_file`] move bytes around.
//!   Every write lands in a temporary sibling first and is renamed into place
//!   on completion, so an interrupted run never leaves a truncated file at the
//!   destination.

pub mod error;
mod fs;
mod walk;

pub use crate::fs::{copy_file, decompress_file, move_file};
pub use crate::walk::Walker;
