//! Error handlers: log-and-decline, static fallbacks, and chaining.

use std::sync::Arc;

use tracing::{debug, error};

use folio_shared::Stage;

use crate::{ErrorHandler, FileCollection, Recovery, Renderer, ServeFailure, Sourcer};

/// Logs every failure and never recovers.
pub struct LogErrorHandler;

impl ErrorHandler for LogErrorHandler {
    fn name(&self) -> &str {
        "log"
    }

    fn handle(&self, failure: ServeFailure) -> Recovery {
        error!(
            request_id = %failure.request.id,
            path = %failure.request.path,
            stage = %failure.stage(),
            collaborator = failure.error.collaborator(),
            err = %failure.error.cause(),
            "request failed"
        );
        Recovery::Unhandled
    }
}

/// Answers each stage with a preconfigured substitute.
///
/// Source failures get the fallback sourcer, open failures the fallback
/// collection, render failures the fallback renderer. Stages without a
/// fallback are left unhandled.
#[derive(Default)]
pub struct FallbackErrorHandler {
    sourcer: Option<Arc<dyn Sourcer>>,
    files: Option<Arc<dyn FileCollection>>,
    renderer: Option<Arc<dyn Renderer>>,
}

impl FallbackErrorHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sourcer(mut self, sourcer: Arc<dyn Sourcer>) -> Self {
        self.sourcer = Some(sourcer);
        self
    }

    pub fn with_collection(mut self, files: Arc<dyn FileCollection>) -> Self {
        self.files = Some(files);
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }
}

impl ErrorHandler for FallbackErrorHandler {
    fn name(&self) -> &str {
        "fallback"
    }

    fn handle(&self, failure: ServeFailure) -> Recovery {
        let recovery = match failure.stage() {
            Stage::Source => self.sourcer.clone().map(Recovery::sourcer),
            Stage::Open => self.files.clone().map(Recovery::collection),
            Stage::Render => self.renderer.clone().map(Recovery::renderer),
        };

        debug!(
            stage = %failure.stage(),
            handled = recovery.is_some(),
            "fallback consulted"
        );
        recovery.unwrap_or(Recovery::Unhandled)
    }
}

/// Offers a failure to several handlers in order; the first substitute wins.
pub struct ChainErrorHandler {
    handlers: Vec<Box<dyn ErrorHandler>>,
}

impl ChainErrorHandler {
    pub fn new(handlers: Vec<Box<dyn ErrorHandler>>) -> Self {
        Self { handlers }
    }
}

impl ErrorHandler for ChainErrorHandler {
    fn name(&self) -> &str {
        "chain"
    }

    fn handle(&self, failure: ServeFailure) -> Recovery {
        for handler in &self.handlers {
            let recovery = handler.handle(failure.clone());
            if recovery.is_handled() {
                debug!(handler = handler.name(), "chained handler recovered");
                return recovery;
            }
        }
        Recovery::Unhandled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::{MemoryCollection, MemorySourcer, PassthroughRenderer};
    use crate::{Capability, RequestContext, SourceError, StageFailure};
    use folio_shared::FolioError;

    fn source_failure() -> ServeFailure {
        ServeFailure {
            request: RequestContext::new("/index.html"),
            error: StageFailure::Source(SourceError {
                sourcer: Arc::new(MemorySourcer::new(MemoryCollection::new())),
                error: Arc::new(FolioError::Source("offline".into())),
            }),
        }
    }

    #[test]
    fn log_handler_declines() {
        assert!(!LogErrorHandler.handle(source_failure()).is_handled());
    }

    #[test]
    fn fallback_matches_stage() {
        let handler = FallbackErrorHandler::new()
            .with_sourcer(Arc::new(MemorySourcer::new(MemoryCollection::new()).named("backup")))
            .with_renderer(Arc::new(PassthroughRenderer));

        match handler.handle(source_failure()) {
            Recovery::Substitute(Capability::Sourcer(s)) => assert_eq!(s.name(), "backup"),
            other => panic!("unexpected recovery: {other:?}"),
        }
    }

    #[test]
    fn fallback_without_matching_substitute_declines() {
        let handler = FallbackErrorHandler::new().with_renderer(Arc::new(PassthroughRenderer));
        assert!(!handler.handle(source_failure()).is_handled());
    }

    #[test]
    fn chain_returns_first_substitute() {
        let chain = ChainErrorHandler::new(vec![
            Box::new(LogErrorHandler),
            Box::new(
                FallbackErrorHandler::new()
                    .with_sourcer(Arc::new(MemorySourcer::new(MemoryCollection::new()).named("first"))),
            ),
            Box::new(
                FallbackErrorHandler::new()
                    .with_sourcer(Arc::new(MemorySourcer::new(MemoryCollection::new()).named("second"))),
            ),
        ]);

        let sourcer = match chain.handle(source_failure()) {
            Recovery::Substitute(capability) => capability.into_sourcer().unwrap(),
            Recovery::Unhandled => panic!("chain should recover"),
        };
        assert_eq!(sourcer.name(), "first");
    }

    #[test]
    fn empty_chain_declines() {
        let chain = ChainErrorHandler::new(Vec::new());
        assert!(!chain.handle(source_failure()).is_handled());
    }
}
