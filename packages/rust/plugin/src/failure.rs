//! Structured descriptions of failed pipeline stages.
//!
//! A [`ServeFailure`] is built by the pipeline when a stage fails and handed
//! by value to the [`ErrorHandler`](crate::ErrorHandler). It names the stage,
//! the collaborator that failed, the request being served, and the
//! underlying error. Descriptors are cheap to clone so a handler can pass them
//! along to other handlers.

use std::sync::Arc;

use folio_shared::{FileKey, FolioError, RequestId, Stage};

use crate::{FileInfo, Renderer, Sourcer};

/// The request a failure happened in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Identifier of the request, also attached to log events.
    pub id: RequestId,
    /// Raw request path as received from the transport.
    pub path: String,
}

impl RequestContext {
    /// Create a context with a fresh request identifier.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            id: RequestId::new(),
            path: path.into(),
        }
    }
}

/// The sourcer could not produce a file collection.
#[derive(Clone, thiserror::Error)]
#[error("failed to source files with sourcer {:?}: {error}", .sourcer.name())]
pub struct SourceError {
    pub sourcer: Arc<dyn Sourcer>,
    #[source]
    pub error: Arc<FolioError>,
}

/// The file collection could not open the requested key.
#[derive(Clone, thiserror::Error)]
#[error("failed to open {key:?} from sourcer {:?}: {error}", .sourcer.name())]
pub struct OpenError {
    /// Sourcer that produced the collection.
    pub sourcer: Arc<dyn Sourcer>,
    pub key: FileKey,
    #[source]
    pub error: Arc<FolioError>,
}

/// The renderer failed on an opened file.
#[derive(Clone, thiserror::Error)]
#[error("failed to render {:?} with renderer {:?}: {error}", .file.name, .renderer.name())]
pub struct RenderError {
    pub renderer: Arc<dyn Renderer>,
    /// The file being rendered. The handle itself stays with the pipeline.
    pub file: FileInfo,
    #[source]
    pub error: Arc<FolioError>,
}

impl std::fmt::Debug for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceError")
            .field("sourcer", &self.sourcer.name())
            .field("error", &self.error)
            .finish()
    }
}

impl std::fmt::Debug for OpenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenError")
            .field("sourcer", &self.sourcer.name())
            .field("key", &self.key)
            .field("error", &self.error)
            .finish()
    }
}

impl std::fmt::Debug for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderError")
            .field("renderer", &self.renderer.name())
            .field("file", &self.file)
            .field("error", &self.error)
            .finish()
    }
}

/// Stage-tagged failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StageFailure {
    #[error(transparent)]
    Source(SourceError),
    #[error(transparent)]
    Open(OpenError),
    #[error(transparent)]
    Render(RenderError),
}

impl StageFailure {
    /// Stage that failed.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Source(_) => Stage::Source,
            Self::Open(_) => Stage::Open,
            Self::Render(_) => Stage::Render,
        }
    }

    /// Name of the collaborator that failed.
    ///
    /// Open failures are attributed to the sourcer that produced the
    /// collection.
    pub fn collaborator(&self) -> &str {
        match self {
            Self::Source(e) => e.sourcer.name(),
            Self::Open(e) => e.sourcer.name(),
            Self::Render(e) => e.renderer.name(),
        }
    }

    /// The underlying error reported by the collaborator.
    pub fn cause(&self) -> &FolioError {
        match self {
            Self::Source(e) => &e.error,
            Self::Open(e) => &e.error,
            Self::Render(e) => &e.error,
        }
    }
}

/// Everything an error handler gets to decide on a recovery.
#[derive(Debug, Clone)]
pub struct ServeFailure {
    pub request: RequestContext,
    pub error: StageFailure,
}

impl ServeFailure {
    /// Stage that failed.
    pub fn stage(&self) -> Stage {
        self.error.stage()
    }
}

impl std::fmt::Display for ServeFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (path {:?})", self.error, self.request.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::{DirSourcer, PassthroughRenderer};

    fn source_failure() -> ServeFailure {
        ServeFailure {
            request: RequestContext::new("/"),
            error: StageFailure::Source(SourceError {
                sourcer: Arc::new(DirSourcer::new("/srv/site")),
                error: Arc::new(FolioError::Source("root missing".into())),
            }),
        }
    }

    #[test]
    fn source_failure_display_names_sourcer_and_error() {
        let failure = source_failure();
        assert_eq!(failure.stage(), Stage::Source);
        assert_eq!(failure.error.collaborator(), "dir");

        let msg = failure.to_string();
        assert!(msg.contains("sourcer \"dir\""));
        assert!(msg.contains("root missing"));
        assert!(msg.contains("path \"/\""));
    }

    #[test]
    fn render_failure_names_file_and_renderer() {
        let failure = StageFailure::Render(RenderError {
            renderer: Arc::new(PassthroughRenderer),
            file: FileInfo {
                name: "index.md".into(),
                size: Some(12),
                is_dir: false,
            },
            error: Arc::new(FolioError::Render("bad frontmatter".into())),
        });

        assert_eq!(failure.stage(), Stage::Render);
        assert_eq!(failure.collaborator(), "passthrough");
        assert!(matches!(failure.cause(), FolioError::Render(_)));

        let msg = failure.to_string();
        assert!(msg.contains("\"index.md\""));
        assert!(msg.contains("bad frontmatter"));
    }

    #[test]
    fn descriptors_clone_with_shared_cause() {
        let failure = source_failure();
        let copy = failure.clone();
        assert_eq!(copy.request, failure.request);
        assert_eq!(copy.to_string(), failure.to_string());
    }
}
