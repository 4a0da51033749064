//! Core serving pipeline for Folio.
//!
//! This crate ties a sourcer, a renderer, and an error handler together into
//! a [`Server`] that answers path-addressed requests:
//! - [`Server`] — sources the file collection, opens and renders files
//! - [`ServerOptions`] — eager/lazy sourcing, [`Assertions`], [`Logger`]
//! - [`ResponseSink`] — the transport boundary, with [`BufferedResponse`]

mod diagnostics;
mod options;
mod recovery;
mod response;
mod server;

pub use diagnostics::{Assertions, Logger};
pub use options::ServerOptions;
pub use response::{BufferedResponse, ResponseSink};
pub use server::{Outcome, Server};
