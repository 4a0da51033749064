//! Stage recovery protocol.
//!
//! Every stage runs the same state machine:
//!
//! ```text
//! attempt ─ ok ──────────────────────────────────────────▶ done
//!    └─ err ─▶ describe ─▶ error handler ─ unhandled ─────▶ 500, abort
//!                              └─ substitute ─ wrong shape ▶ 500, abort
//!                                     └─ retry once ─ ok ─▶ done (recovered)
//!                                            └─ err ──────▶ 500, abort
//! ```
//!
//! A failed retry is never offered to the handler again.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use folio_plugin::{Capability, ErrorHandler, Recovery, RequestContext, ServeFailure, StageFailure};
use folio_shared::{FolioError, Result, STATUS_INTERNAL_SERVER_ERROR, Stage};

use crate::diagnostics::{Assertions, PluginScope};
use crate::response::Responder;

/// Marker for a request that was aborted after its failure response was written.
#[derive(Debug)]
pub(crate) struct Aborted;

/// Value produced by a stage, and whether a substitute produced it.
pub(crate) struct StageOutput<T> {
    pub(crate) value: T,
    pub(crate) recovered: bool,
}

/// Runs stages of one request under the recovery protocol.
pub(crate) struct Recoverer<'a> {
    pub(crate) handler: &'a dyn ErrorHandler,
    pub(crate) request: &'a RequestContext,
    pub(crate) plugins: &'a PluginScope,
    pub(crate) assert: &'a Assertions,
}

impl Recoverer<'_> {
    /// Run `attempt` with `original`, recovering once through the error handler.
    ///
    /// `describe` turns the original error into a stage failure for the
    /// handler; `accept` keeps the handler's substitute only if it has the
    /// shape this stage needs.
    pub(crate) fn run<C: ?Sized, T>(
        &self,
        res: &mut Responder<'_>,
        original: &Arc<C>,
        mut attempt: impl FnMut(&C) -> Result<T>,
        describe: impl FnOnce(FolioError) -> StageFailure,
        accept: impl FnOnce(Capability) -> Option<Arc<C>>,
    ) -> std::result::Result<StageOutput<T>, Aborted> {
        let err = match self.plugins.call(|| attempt(original.as_ref())) {
            Ok(value) => {
                return Ok(StageOutput {
                    value,
                    recovered: false,
                });
            }
            Err(err) => err,
        };

        let failure = describe(err);
        let stage = failure.stage();
        let expected = expected_capability(stage);
        let summary = failure.to_string();
        let handler = self.handler.name();

        warn!(
            %stage,
            err = %failure.cause(),
            errorhandler = handler,
            "stage failed, handing error to error handler"
        );

        let recovery = self.plugins.call(|| {
            self.handler.handle(ServeFailure {
                request: self.request.clone(),
                error: failure,
            })
        });

        let capability = match recovery {
            Recovery::Substitute(capability) => capability,
            Recovery::Unhandled => {
                error!(%stage, errorhandler = handler, "error handler did not recover");
                return Err(self.fail(
                    res,
                    format!("{summary}; error handler {handler:?} did not recover"),
                ));
            }
        };

        let kind = capability.kind();
        let Some(substitute) = accept(capability) else {
            error!(
                %stage,
                errorhandler = handler,
                substitute = kind,
                expected,
                "error handler returned a substitute of the wrong shape"
            );
            return Err(self.fail(
                res,
                format!(
                    "{summary}; error handler {handler:?} returned a {kind} substitute, expected a {expected}"
                ),
            ));
        };

        debug!(%stage, substitute = kind, "retrying stage with substitute");
        match self.plugins.call(|| attempt(substitute.as_ref())) {
            Ok(value) => {
                info!(%stage, errorhandler = handler, "stage recovered with substitute");
                Ok(StageOutput {
                    value,
                    recovered: true,
                })
            }
            Err(err) => {
                error!(%stage, err = %err, "substitute failed, giving up");
                Err(self.fail(
                    res,
                    format!(
                        "{summary}; substitute {expected} from error handler {handler:?} also failed: {err}"
                    ),
                ))
            }
        }
    }

    /// Write the generic failure response.
    fn fail(&self, res: &mut Responder<'_>, message: String) -> Aborted {
        self.assert.check(
            !res.is_committed(),
            "generic failure response written after the response was committed",
        );

        let written = res.commit(STATUS_INTERNAL_SERVER_ERROR, message.as_bytes());
        if let Err(e) = &written {
            error!(err = %e, "failed to write failure response");
        }
        self.assert
            .check(written.is_ok(), "generic failure response must be written");

        Aborted
    }
}

/// Shape of the substitute each stage accepts.
fn expected_capability(stage: Stage) -> &'static str {
    match stage {
        Stage::Source => "sourcer",
        Stage::Open => "collection",
        Stage::Render => "renderer",
    }
}
