//! Renderer that copies file content unchanged.

use std::io::Write;

use folio_shared::{FolioError, Result};

use crate::{File, Renderer};

/// Writes the file's bytes to the output as-is.
pub struct PassthroughRenderer;

impl Renderer for PassthroughRenderer {
    fn name(&self) -> &str {
        "passthrough"
    }

    fn render(&self, file: &mut dyn File, out: &mut dyn Write) -> Result<()> {
        std::io::copy(file, out)
            .map_err(|e| FolioError::Render(format!("copying {:?}: {e}", file.info().name)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FileCollection;
    use crate::builtin::MemoryCollection;
    use folio_shared::FileKey;

    #[test]
    fn copies_bytes() {
        let files = MemoryCollection::new().with_file("notes.txt", "plain text");
        let mut file = files.open(&FileKey::from("notes.txt")).unwrap().unwrap();

        let mut out = Vec::new();
        PassthroughRenderer.render(file.as_mut(), &mut out).unwrap();
        assert_eq!(out, b"plain text");
    }
}
