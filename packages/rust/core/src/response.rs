//! Request/response boundary between the pipeline and its transport.

use std::borrow::Cow;
use std::io;

/// Where a served request's response goes.
///
/// The server calls [`write_status`](Self::write_status) and then
/// [`write_bytes`](Self::write_bytes) exactly once per request.
pub trait ResponseSink {
    fn write_status(&mut self, status: u16);

    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()>;
}

/// An in-memory response, for tests and transports that frame the body
/// themselves.
#[derive(Debug, Clone, Default)]
pub struct BufferedResponse {
    status: Option<u16>,
    body: Vec<u8>,
    status_writes: usize,
}

impl BufferedResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Status written by the server, if any.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// How many times a status was written.
    pub fn status_writes(&self) -> usize {
        self.status_writes
    }

    pub fn into_parts(self) -> (Option<u16>, Vec<u8>) {
        (self.status, self.body)
    }
}

impl ResponseSink for BufferedResponse {
    fn write_status(&mut self, status: u16) {
        self.status_writes += 1;
        self.status = Some(status);
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.body.extend_from_slice(bytes);
        Ok(())
    }
}

/// Commits the single response of a request to its sink.
pub(crate) struct Responder<'a> {
    sink: &'a mut dyn ResponseSink,
    committed: bool,
}

impl<'a> Responder<'a> {
    pub(crate) fn new(sink: &'a mut dyn ResponseSink) -> Self {
        Self {
            sink,
            committed: false,
        }
    }

    pub(crate) fn is_committed(&self) -> bool {
        self.committed
    }

    /// Write status and body. A second commit writes nothing and fails.
    pub(crate) fn commit(&mut self, status: u16, body: &[u8]) -> io::Result<()> {
        if self.committed {
            return Err(io::Error::other("response already committed"));
        }
        self.committed = true;
        self.sink.write_status(status);
        self.sink.write_bytes(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn responder_commits_once() {
        let mut res = BufferedResponse::new();
        {
            let mut responder = Responder::new(&mut res);
            assert!(!responder.is_committed());
            responder.commit(200, b"hello").unwrap();
            assert!(responder.is_committed());
            assert!(responder.commit(500, b"again").is_err());
        }

        assert_eq!(res.status(), Some(200));
        assert_eq!(res.status_writes(), 1);
        assert_eq!(res.body_text(), "hello");
    }

    #[test]
    fn buffered_response_into_parts() {
        let mut res = BufferedResponse::new();
        res.write_status(404);
        res.write_bytes(b"gone").unwrap();
        assert_eq!(res.into_parts(), (Some(404), b"gone".to_vec()));
    }
}
