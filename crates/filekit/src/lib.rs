//! # filekit
//!
//! Reconcile a single declared file against the filesystem.
//!
//! Given a desired path and content, this crate can:
//! - **Materialize**: write the content, creating missing parent directories
//! - **Verify**: detect external drift without making changes
//! - **Remove**: delete the file, best effort and idempotent
//!
//! The reconciler is stateless. Existence is signalled through an opaque
//! [`Identity`] that the caller persists and hands back on the next call; the
//! empty identity means "does not exist".
//!
//! ## Example
//!
//! ```no_run
//! use filekit::{DesiredState, FileReconciler};
//!
//! let reconciler = FileReconciler::new();
//! let desired = DesiredState::new("out/motd.txt").with_content("hello\n");
//!
//! let id = reconciler.materialize(&desired)?;
//!
//! // Later: has anyone touched it?
//! let id = reconciler.verify(&desired, &id)?;
//! if id.is_empty() {
//!     println!("drifted or missing, needs materialize");
//! }
//!
//! reconciler.remove(&desired);
//! # Ok::<(), filekit::Error>(())
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod fs;
pub mod reconciler;
pub mod types;

pub use error::{Error, ErrorCategory, Result};
pub use fs::{FileStat, FileSystem, OsFileSystem, PERMISSIVE_MODE};
pub use reconciler::FileReconciler;
pub use types::{DesiredState, FileStatus, Identity, ObservedState};
