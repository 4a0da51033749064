//! The serving pipeline: request path → source → open → render → response.

use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use tracing::{debug, debug_span, info, info_span, warn};

use folio_plugin::{
    Capability, ErrorHandler, File, FileCollection, FileInfo, OpenError, RenderError, Renderer,
    RequestContext, SourceError, Sourcer, StageFailure,
};
use folio_shared::{FileKey, FolioError, Result, STATUS_OK, Stage};

use crate::diagnostics::{Assertions, Logger, PluginScope};
use crate::options::ServerOptions;
use crate::recovery::{Aborted, Recoverer, StageOutput};
use crate::response::{Responder, ResponseSink};

/// How a request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The file was rendered; `recovered` is set if any stage needed a substitute.
    Served { recovered: bool },
    /// The stage failed without recovery and a failure response was written.
    Failed(Stage),
}

impl Outcome {
    pub fn is_served(&self) -> bool {
        matches!(self, Self::Served { .. })
    }
}

/// Maps request paths to files of a sourced collection and renders them.
///
/// The collection is sourced once, either in [`Server::new`] or by the first
/// request, and shared by every request after that. `Server` is `Send + Sync`;
/// share it behind an `Arc` and call [`Server::serve`] from as many threads as
/// needed.
pub struct Server {
    files: OnceLock<Arc<dyn FileCollection>>,
    /// Serializes lazy sourcing so concurrent first requests source once.
    sourcing: Mutex<()>,

    sourcer: Arc<dyn Sourcer>,
    renderer: Arc<dyn Renderer>,
    onerror: Arc<dyn ErrorHandler>,

    assert: Assertions,
    log: Logger,
}

impl Server {
    /// Build a server from its plugins.
    ///
    /// With [`ServerOptions::source_on_init`] the collection is sourced here
    /// and a failure is returned as [`FolioError::Initialization`]; there is
    /// no request yet to run the error handler for.
    pub fn new(
        sourcer: Arc<dyn Sourcer>,
        renderer: Arc<dyn Renderer>,
        onerror: Arc<dyn ErrorHandler>,
        opts: ServerOptions,
    ) -> Result<Self> {
        let files = if opts.source_on_init {
            let sourced = opts.logger.scope(|plugins| {
                info!(sourcer = sourcer.name(), "sourcing files on initialization");
                plugins.call(|| sourcer.source())
            });
            let collection = sourced.map_err(|e| FolioError::Initialization {
                sourcer: sourcer.name().to_string(),
                source: Box::new(e),
            })?;
            OnceLock::from(collection)
        } else {
            OnceLock::new()
        };

        Ok(Self {
            files,
            sourcing: Mutex::new(()),
            sourcer,
            renderer,
            onerror,
            assert: opts.assertions,
            log: opts.logger,
        })
    }

    /// Whether the file collection has been sourced.
    pub fn is_sourced(&self) -> bool {
        self.files.get().is_some()
    }

    /// Serve one request, writing exactly one response to `sink`.
    pub fn serve(&self, path: &str, sink: &mut dyn ResponseSink) -> Outcome {
        self.log.scope(|plugins| {
            let request = RequestContext::new(path);
            let span = info_span!("serve", request_id = %request.id, path = %request.path);
            let _enter = span.enter();

            let mut res = Responder::new(sink);
            let outcome = self.serve_request(&request, plugins, &mut res);

            self.assert
                .check(res.is_committed(), "every request must write a response");
            outcome
        })
    }

    fn serve_request(
        &self,
        request: &RequestContext,
        plugins: &PluginScope,
        res: &mut Responder<'_>,
    ) -> Outcome {
        debug!("serving endpoint");
        let mut recovered = false;

        let files = match self.files.get() {
            Some(files) => files.clone(),
            None => match self.source_files(request, plugins, res) {
                Ok(out) => {
                    recovered |= out.recovered;
                    out.value
                }
                Err(Aborted) => return Outcome::Failed(Stage::Source),
            },
        };

        let key = FileKey::from_request_path(&request.path);
        self.assert
            .check(!key.as_str().is_empty(), "lookup key must not be empty");

        let file = match self.open_file(&files, &key, request, plugins, res) {
            Ok(out) => {
                recovered |= out.recovered;
                out.value
            }
            Err(Aborted) => return Outcome::Failed(Stage::Open),
        };

        // Closes the file once this scope ends, whatever the render outcome.
        let mut file = FileGuard {
            file,
            plugins,
            assert: &self.assert,
        };

        match self.render_file(&mut file, request, plugins, res) {
            Ok(render_recovered) => recovered |= render_recovered,
            Err(Aborted) => return Outcome::Failed(Stage::Render),
        }

        debug!(recovered, "finished serving endpoint");
        Outcome::Served { recovered }
    }

    fn recoverer<'a>(
        &'a self,
        request: &'a RequestContext,
        plugins: &'a PluginScope,
    ) -> Recoverer<'a> {
        Recoverer {
            handler: self.onerror.as_ref(),
            request,
            plugins,
            assert: &self.assert,
        }
    }

    // -----------------------------------------------------------------------
    // Stages
    // -----------------------------------------------------------------------

    fn source_files(
        &self,
        request: &RequestContext,
        plugins: &PluginScope,
        res: &mut Responder<'_>,
    ) -> std::result::Result<StageOutput<Arc<dyn FileCollection>>, Aborted> {
        let _guard = self.sourcing.lock().unwrap_or_else(PoisonError::into_inner);

        // Another request may have sourced while we waited for the guard.
        if let Some(files) = self.files.get() {
            return Ok(StageOutput {
                value: files.clone(),
                recovered: false,
            });
        }

        let span = debug_span!("source", sourcer = self.sourcer.name());
        let _enter = span.enter();
        debug!("initializing file collection");

        let out = self.recoverer(request, plugins).run(
            res,
            &self.sourcer,
            |sourcer| sourcer.source(),
            |error| {
                StageFailure::Source(SourceError {
                    sourcer: self.sourcer.clone(),
                    error: Arc::new(error),
                })
            },
            Capability::into_sourcer,
        )?;

        let files = self.files.get_or_init(|| out.value).clone();
        Ok(StageOutput {
            value: files,
            recovered: out.recovered,
        })
    }

    fn open_file(
        &self,
        files: &Arc<dyn FileCollection>,
        key: &FileKey,
        request: &RequestContext,
        plugins: &PluginScope,
        res: &mut Responder<'_>,
    ) -> std::result::Result<StageOutput<Box<dyn File>>, Aborted> {
        let span = debug_span!("open", %key, sourcer = self.sourcer.name());
        let _enter = span.enter();
        debug!("opening file");

        self.recoverer(request, plugins).run(
            res,
            files,
            |files| open_existing(files, key, self.sourcer.name()),
            |error| {
                StageFailure::Open(OpenError {
                    sourcer: self.sourcer.clone(),
                    key: key.clone(),
                    error: Arc::new(error),
                })
            },
            Capability::into_collection,
        )
    }

    /// Render into a buffer and commit it; returns whether a substitute was used.
    fn render_file(
        &self,
        file: &mut FileGuard<'_>,
        request: &RequestContext,
        plugins: &PluginScope,
        res: &mut Responder<'_>,
    ) -> std::result::Result<bool, Aborted> {
        let info = file.info();
        let span = debug_span!("render", renderer = self.renderer.name(), file = %info.name);
        let _enter = span.enter();
        debug!("rendering file");

        let mut body = Vec::new();
        let mut retry = false;

        let out = self.recoverer(request, plugins).run(
            res,
            &self.renderer,
            |renderer| {
                if retry {
                    file.get_mut().rewind()?;
                    body.clear();
                }
                retry = true;
                renderer.render(file.get_mut(), &mut body)
            },
            |error| {
                StageFailure::Render(RenderError {
                    renderer: self.renderer.clone(),
                    file: info.clone(),
                    error: Arc::new(error),
                })
            },
            Capability::into_renderer,
        )?;

        self.assert.check(
            !res.is_committed(),
            "rendered output committed after the response was written",
        );
        if let Err(e) = res.commit(STATUS_OK, &body) {
            warn!(err = %e, bytes = body.len(), "failed to write rendered response");
        }

        Ok(out.recovered)
    }
}

/// Open `key`, treating a missing file without an error as a failure.
fn open_existing(files: &dyn FileCollection, key: &FileKey, sourcer: &str) -> Result<Box<dyn File>> {
    files.open(key)?.ok_or_else(|| FolioError::EmptyResult {
        sourcer: sourcer.to_string(),
    })
}

/// Owns an opened file and closes it exactly once on drop.
struct FileGuard<'a> {
    file: Box<dyn File>,
    plugins: &'a PluginScope,
    assert: &'a Assertions,
}

impl FileGuard<'_> {
    fn info(&self) -> FileInfo {
        self.file.info()
    }

    fn get_mut(&mut self) -> &mut dyn File {
        self.file.as_mut()
    }
}

impl Drop for FileGuard<'_> {
    fn drop(&mut self) {
        let file = &mut self.file;
        let closed = self.plugins.call(|| file.close());
        if let Err(e) = &closed {
            warn!(err = %e, "failed to close file");
        }
        if !std::thread::panicking() {
            self.assert.check(closed.is_ok(), "file must close cleanly");
        }
    }
}
