//! In-memory sourcer and collection.

use std::collections::BTreeMap;
use std::sync::Arc;

use folio_shared::{FileKey, FolioError, Result};

use super::BytesFile;
use crate::{File, FileCollection, Sourcer};

/// A fixed map of keys to file contents.
///
/// The root key lists every entry.
#[derive(Debug, Clone, Default)]
pub struct MemoryCollection {
    files: BTreeMap<String, Vec<u8>>,
}

impl MemoryCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file, normalizing `name` the same way request paths are.
    pub fn with_file(mut self, name: &str, content: impl Into<Vec<u8>>) -> Self {
        let key = FileKey::from_request_path(name);
        self.files.insert(key.to_string(), content.into());
        self
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FileCollection for MemoryCollection {
    fn open(&self, key: &FileKey) -> Result<Option<Box<dyn File>>> {
        if let Some(content) = self.files.get(key.as_str()) {
            return Ok(Some(Box::new(BytesFile::new(
                key.as_str(),
                content.clone(),
                false,
            ))));
        }

        if key.is_root() {
            let entries = self.files.keys().cloned().collect();
            return Ok(Some(Box::new(BytesFile::listing(key.as_str(), entries))));
        }

        Err(FolioError::not_found(key.as_str()))
    }
}

/// Sources a shared [`MemoryCollection`].
pub struct MemorySourcer {
    name: String,
    files: Arc<MemoryCollection>,
}

impl MemorySourcer {
    pub fn new(files: MemoryCollection) -> Self {
        Self {
            name: "memory".into(),
            files: Arc::new(files),
        }
    }

    /// Override the name reported in logs and failures.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl Sourcer for MemorySourcer {
    fn name(&self) -> &str {
        &self.name
    }

    fn source(&self) -> Result<Arc<dyn FileCollection>> {
        Ok(self.files.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn collection() -> MemoryCollection {
        MemoryCollection::new()
            .with_file("/index.html", "<h1>Home</h1>")
            .with_file("about/", "about us")
    }

    #[test]
    fn names_are_normalized_like_request_paths() {
        let files = collection();
        assert_eq!(files.len(), 2);

        let mut file = files.open(&FileKey::from("/about")).unwrap().unwrap();
        let mut body = String::new();
        file.read_to_string(&mut body).unwrap();
        assert_eq!(body, "about us");
    }

    #[test]
    fn root_lists_entries() {
        let files = collection();
        let mut file = files.open(&FileKey::root()).unwrap().unwrap();
        assert!(file.info().is_dir);

        let mut body = String::new();
        file.read_to_string(&mut body).unwrap();
        assert_eq!(body, "about\nindex.html\n");
    }

    #[test]
    fn unknown_key_is_not_found() {
        let err = collection().open(&FileKey::from("/missing")).err().unwrap();
        assert_eq!(err.to_string(), "file not found: missing");
    }

    #[test]
    fn sourcer_hands_out_the_same_collection() {
        let sourcer = MemorySourcer::new(collection()).named("fixtures");
        assert_eq!(sourcer.name(), "fixtures");

        let a = sourcer.source().unwrap();
        let b = sourcer.source().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
