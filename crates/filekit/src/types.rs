//! Desired state, observed state and identity for a declared file

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Marker carried by a resource that exists
const PRESENT_MARKER: &str = "-";

/// Desired state of a single file, supplied on every reconciliation call.
///
/// At most one of `content` and `sensitive_content` is expected to be set.
/// When both are set, `sensitive_content` wins.
#[derive(Clone, PartialEq, Eq)]
pub struct DesiredState {
    /// Target location of the file
    pub path: PathBuf,
    /// Plain payload
    pub content: Option<Vec<u8>>,
    /// Payload that must never appear in logs or diffs
    pub sensitive_content: Option<Vec<u8>>,
}

impl DesiredState {
    /// Declare a file at `path` with empty content.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            content: None,
            sensitive_content: None,
        }
    }

    /// Set the plain payload.
    pub fn with_content(mut self, content: impl Into<Vec<u8>>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Set the redacted payload.
    pub fn with_sensitive_content(mut self, content: impl Into<Vec<u8>>) -> Self {
        self.sensitive_content = Some(content.into());
        self
    }

    /// Bytes the file should contain.
    ///
    /// `sensitive_content` if present, else `content`, else empty. Presence is
    /// `Some`, not non-emptiness: an empty `sensitive_content` still wins over
    /// `content` and yields an empty file. Hosts that treat an empty string as
    /// unset should pass `None`.
    pub fn effective_content(&self) -> &[u8] {
        self.sensitive_content
            .as_deref()
            .or(self.content.as_deref())
            .unwrap_or_default()
    }

    /// Whether the effective content comes from `sensitive_content`.
    pub fn is_sensitive(&self) -> bool {
        self.sensitive_content.is_some()
    }
}

impl fmt::Debug for DesiredState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DesiredState")
            .field("path", &self.path)
            .field(
                "content",
                &self.content.as_deref().map(String::from_utf8_lossy),
            )
            .field(
                "sensitive_content",
                &self.sensitive_content.as_ref().map(|_| "<sensitive>"),
            )
            .finish()
    }
}

/// What is on disk at the target path, computed fresh on each read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObservedState {
    /// Nothing at the path
    Absent,
    /// A file with these bytes
    Present(Vec<u8>),
}

impl ObservedState {
    /// Whether something was found at the path.
    pub fn exists(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    /// Observed content, if present.
    pub fn bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Present(bytes) => Some(bytes),
            Self::Absent => None,
        }
    }
}

/// Classification of a declared file against the filesystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// Nothing at the target path
    Absent,
    /// Target exists with exactly the desired bytes
    Matching,
    /// Target exists with different bytes
    Drifted,
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => write!(f, "absent"),
            Self::Matching => write!(f, "present"),
            Self::Drifted => write!(f, "drifted"),
        }
    }
}

/// Opaque token marking a resource as existing.
///
/// The empty token means "does not exist". Hosts persist the token between
/// calls and only compare it against empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// The canonical "exists" token.
    pub fn present() -> Self {
        Self(PRESENT_MARKER.to_string())
    }

    /// The canonical "does not exist" token.
    pub fn empty() -> Self {
        Self(String::new())
    }

    /// Whether this is the "does not exist" token.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Raw token, for persistence.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Identity {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl From<&str> for Identity {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
