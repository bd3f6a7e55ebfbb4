//! Resources managed by localfile
//!
//! Each declared file becomes a [`LocalFile`] implementing
//! [`declarative::Resource`]; the reconciler in `filekit` does the actual work.

pub mod local_file;

pub use local_file::LocalFile;
