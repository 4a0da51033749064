//! Logging scope and runtime invariant checks attached to every stage.

use folio_shared::LogTarget;
use tracing::{Dispatch, dispatcher};

/// Where the server's own log events go.
///
/// Only events emitted by the server itself are routed through this logger.
/// Plugins called while serving (sourcers, collections, files, renderers,
/// error handlers) keep logging to whatever dispatcher the caller had active.
#[derive(Debug, Clone, Default)]
pub enum Logger {
    /// Drop every event.
    #[default]
    Discard,
    /// Use the process-wide (or thread-default) subscriber.
    Global,
    /// Send events to a specific dispatcher.
    Dispatch(Dispatch),
}

impl Logger {
    /// Run `f` with this logger as the active dispatcher.
    ///
    /// `f` gets a [`PluginScope`] for routing plugin calls back to the
    /// caller's dispatcher.
    pub(crate) fn scope<R>(&self, f: impl FnOnce(&PluginScope) -> R) -> R {
        match self {
            Self::Global => f(&PluginScope::inherit()),
            Self::Discard => {
                let plugins = PluginScope::capture();
                dispatcher::with_default(&Dispatch::none(), || f(&plugins))
            }
            Self::Dispatch(dispatch) => {
                let plugins = PluginScope::capture();
                dispatcher::with_default(dispatch, || f(&plugins))
            }
        }
    }
}

/// The dispatcher plugin calls run under.
pub(crate) struct PluginScope(Option<Dispatch>);

impl PluginScope {
    /// Plugins log wherever the current thread's events already go.
    pub(crate) fn inherit() -> Self {
        Self(None)
    }

    fn capture() -> Self {
        Self(Some(dispatcher::get_default(Dispatch::clone)))
    }

    /// Run a plugin call under the caller's dispatcher.
    pub(crate) fn call<R>(&self, f: impl FnOnce() -> R) -> R {
        match &self.0 {
            Some(dispatch) => dispatcher::with_default(dispatch, f),
            None => f(),
        }
    }
}

impl From<LogTarget> for Logger {
    fn from(target: LogTarget) -> Self {
        match target {
            LogTarget::Discard => Self::Discard,
            LogTarget::Global => Self::Global,
        }
    }
}

/// Runtime invariant checks.
///
/// Disabled checks only log the violation and let the request continue;
/// enabled checks panic on the spot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Assertions {
    enabled: bool,
}

impl Assertions {
    pub fn enabled() -> Self {
        Self { enabled: true }
    }

    pub fn disabled() -> Self {
        Self { enabled: false }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Check that `cond` holds.
    ///
    /// # Panics
    ///
    /// Panics with `msg` if `cond` is false and assertions are enabled.
    #[track_caller]
    pub fn check(&self, cond: bool, msg: &str) {
        if cond {
            return;
        }
        if self.enabled {
            panic!("assertion failed: {msg}");
        }
        tracing::debug!(assertion = msg, "invariant violated, continuing");
    }
}
