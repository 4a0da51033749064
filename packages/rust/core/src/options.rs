//! Runtime options for [`Server`](crate::Server).

use folio_shared::ServerConfig;

use crate::diagnostics::{Assertions, Logger};

/// Server construction options.
///
/// Defaults: lazy sourcing, assertions disabled, logs discarded.
#[derive(Debug, Clone, Default)]
pub struct ServerOptions {
    /// Source the file collection in [`Server::new`](crate::Server::new)
    /// instead of on the first request. A failure then aborts construction.
    pub source_on_init: bool,
    /// Invariant checks applied while serving.
    pub assertions: Assertions,
    /// Destination of log events emitted while serving.
    pub logger: Logger,
}

impl From<&ServerConfig> for ServerOptions {
    fn from(config: &ServerConfig) -> Self {
        Self {
            source_on_init: config.source_on_init,
            assertions: if config.assertions {
                Assertions::enabled()
            } else {
                Assertions::disabled()
            },
            logger: config.log.into(),
        }
    }
}
