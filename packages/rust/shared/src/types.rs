//! Core domain types shared by the pipeline and its plugins.

use uuid::Uuid;

/// Lookup key addressing the root entry of a file collection.
pub const ROOT_KEY: &str = ".";

/// Status written when a request is rendered successfully.
pub const STATUS_OK: u16 = 200;

/// Status written by the generic failure response.
pub const STATUS_INTERNAL_SERVER_ERROR: u16 = 500;

// ---------------------------------------------------------------------------
// RequestId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one served request (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(pub Uuid);

impl RequestId {
    /// Generate a new time-sortable request identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// FileKey
// ---------------------------------------------------------------------------

/// Normalized key used to open a file in a collection.
///
/// Built from a request path by dropping any query/fragment and trimming
/// leading and trailing `/`. An empty result becomes [`ROOT_KEY`], so a key is
/// never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileKey(String);

impl FileKey {
    /// Normalize a raw request path into a lookup key.
    pub fn from_request_path(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let trimmed = path.trim_matches('/');
        if trimmed.is_empty() {
            Self::root()
        } else {
            Self(trimmed.to_string())
        }
    }

    /// The collection's root key (`"."`).
    pub fn root() -> Self {
        Self(ROOT_KEY.to_string())
    }

    /// Whether this key addresses the collection root.
    pub fn is_root(&self) -> bool {
        self.0 == ROOT_KEY
    }

    /// Borrow the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FileKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FileKey {
    fn from(path: &str) -> Self {
        Self::from_request_path(path)
    }
}

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// One of the three ordered steps of serving a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Source,
    Open,
    Render,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Source => "source",
            Self::Open => "open",
            Self::Render => "render",
        };
        f.write_str(name)
    }
}
