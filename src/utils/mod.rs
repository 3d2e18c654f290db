//! Shared utility functions.
//!
//! - `filename`: file name sanitizing and label cleanup

mod filename;

pub use filename::{clean_label_filename, sanitize_filename, split_extension};
