//! Capability contracts, failure descriptors, and built-in plugins.
//!
//! The serving pipeline delegates every stage to a plugin:
//! - [`Sourcer`] — produces the [`FileCollection`] backing all requests
//! - [`Renderer`] — writes one opened [`File`] to the response body
//! - [`ErrorHandler`] — offered a [`ServeFailure`], may return a substitute
//!   [`Capability`] for the failing stage
//!
//! [`builtin`] ships ready-made implementations of each.

pub mod builtin;
pub mod failure;

use std::io::{Read, Write};
use std::sync::Arc;

use folio_shared::{FileKey, Result};

pub use failure::{OpenError, RenderError, RequestContext, ServeFailure, SourceError, StageFailure};

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

/// Descriptive metadata of an opened file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Name of the file within its collection.
    pub name: String,
    /// Content length in bytes, if known.
    pub size: Option<u64>,
    /// Whether the handle is a directory listing.
    pub is_dir: bool,
}

/// A readable file opened from a [`FileCollection`].
///
/// The pipeline owns the handle exclusively and calls [`File::close`] exactly
/// once after rendering, whatever the outcome.
pub trait File: Read + Send {
    /// Metadata for diagnostics and renderers.
    fn info(&self) -> FileInfo;

    /// Reset the read position to the start of the content.
    fn rewind(&mut self) -> Result<()>;

    /// Release the underlying resource.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// A queryable set of named files.
pub trait FileCollection: Send + Sync {
    /// Open the file stored under `key`.
    ///
    /// Implementations return either a file or an error. `Ok(None)` violates
    /// the contract and is reported by the pipeline as an empty result.
    fn open(&self, key: &FileKey) -> Result<Option<Box<dyn File>>>;
}

/// Produces the file collection served by the pipeline.
pub trait Sourcer: Send + Sync {
    /// Human-readable name for tracing and failure messages.
    fn name(&self) -> &str;

    /// Build (or fetch) the file collection.
    fn source(&self) -> Result<Arc<dyn FileCollection>>;
}

/// Transforms one file into response bytes.
pub trait Renderer: Send + Sync {
    /// Human-readable name for tracing and failure messages.
    fn name(&self) -> &str;

    /// Read `file` and write the rendered output to `out`.
    fn render(&self, file: &mut dyn File, out: &mut dyn Write) -> Result<()>;
}

/// Decides how a failed stage recovers.
pub trait ErrorHandler: Send + Sync {
    /// Human-readable name for tracing and failure messages.
    fn name(&self) -> &str;

    /// Inspect a failure and optionally supply a substitute capability.
    fn handle(&self, failure: ServeFailure) -> Recovery;
}

// ---------------------------------------------------------------------------
// Recovery
// ---------------------------------------------------------------------------

/// A plugin an [`ErrorHandler`] can hand back to the pipeline.
#[derive(Clone)]
pub enum Capability {
    Sourcer(Arc<dyn Sourcer>),
    Collection(Arc<dyn FileCollection>),
    Renderer(Arc<dyn Renderer>),
}

impl Capability {
    /// Short name of the capability's shape, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Sourcer(_) => "sourcer",
            Self::Collection(_) => "collection",
            Self::Renderer(_) => "renderer",
        }
    }

    /// The substitute as a sourcer, if that is its shape.
    pub fn into_sourcer(self) -> Option<Arc<dyn Sourcer>> {
        match self {
            Self::Sourcer(sourcer) => Some(sourcer),
            _ => None,
        }
    }

    /// The substitute as a file collection, if that is its shape.
    pub fn into_collection(self) -> Option<Arc<dyn FileCollection>> {
        match self {
            Self::Collection(files) => Some(files),
            _ => None,
        }
    }

    /// The substitute as a renderer, if that is its shape.
    pub fn into_renderer(self) -> Option<Arc<dyn Renderer>> {
        match self {
            Self::Renderer(renderer) => Some(renderer),
            _ => None,
        }
    }
}

impl std::fmt::Debug for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sourcer(s) => f.debug_tuple("Sourcer").field(&s.name()).finish(),
            Self::Collection(_) => f.write_str("Collection"),
            Self::Renderer(r) => f.debug_tuple("Renderer").field(&r.name()).finish(),
        }
    }
}

/// Answer of an [`ErrorHandler`].
#[derive(Debug, Clone)]
pub enum Recovery {
    /// The failure was not recovered.
    Unhandled,
    /// Retry the failing stage once with this capability.
    Substitute(Capability),
}

impl Recovery {
    /// Offer a substitute sourcer.
    pub fn sourcer(sourcer: Arc<dyn Sourcer>) -> Self {
        Self::Substitute(Capability::Sourcer(sourcer))
    }

    /// Offer a substitute file collection.
    pub fn collection(files: Arc<dyn FileCollection>) -> Self {
        Self::Substitute(Capability::Collection(files))
    }

    /// Offer a substitute renderer.
    pub fn renderer(renderer: Arc<dyn Renderer>) -> Self {
        Self::Substitute(Capability::Renderer(renderer))
    }

    /// Whether a substitute was offered.
    pub fn is_handled(&self) -> bool {
        matches!(self, Self::Substitute(_))
    }
}
