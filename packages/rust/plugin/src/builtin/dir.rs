//! Directory-backed sourcer.
//!
//! Serves the files below a root directory. Keys are relative paths; anything
//! that could escape the root is rejected before touching the filesystem.

use std::io::{Read, Seek, SeekFrom};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use folio_shared::{FileKey, FolioError, Result};

use super::BytesFile;
use crate::{File, FileCollection, FileInfo, Sourcer};

/// Sources a [`DirCollection`] rooted at a directory on disk.
pub struct DirSourcer {
    root: PathBuf,
}

impl DirSourcer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Sourcer for DirSourcer {
    fn name(&self) -> &str {
        "dir"
    }

    fn source(&self) -> Result<Arc<dyn FileCollection>> {
        let meta = std::fs::metadata(&self.root).map_err(|e| FolioError::io(&self.root, e))?;
        if !meta.is_dir() {
            return Err(FolioError::Source(format!(
                "{} is not a directory",
                self.root.display()
            )));
        }

        debug!(root = %self.root.display(), "sourced directory collection");
        Ok(Arc::new(DirCollection {
            root: self.root.clone(),
        }))
    }
}

/// Files below a root directory.
pub struct DirCollection {
    root: PathBuf,
}

impl DirCollection {
    /// Map a key to a path below the root, refusing traversal outside it.
    fn resolve(&self, key: &FileKey) -> Result<PathBuf> {
        if key.is_root() {
            return Ok(self.root.clone());
        }

        let mut path = self.root.clone();
        for component in Path::new(key.as_str()).components() {
            match component {
                Component::Normal(part) => path.push(part),
                Component::CurDir => {}
                Component::ParentDir => {
                    return Err(FolioError::invalid_key(key.as_str(), "parent segments not allowed"));
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(FolioError::invalid_key(key.as_str(), "absolute paths not allowed"));
                }
            }
        }
        Ok(path)
    }
}

impl FileCollection for DirCollection {
    fn open(&self, key: &FileKey) -> Result<Option<Box<dyn File>>> {
        let path = self.resolve(key)?;

        let meta = match std::fs::metadata(&path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FolioError::not_found(key.as_str()));
            }
            Err(e) => return Err(FolioError::io(&path, e)),
        };

        if meta.is_dir() {
            let mut entries = Vec::new();
            let dir = std::fs::read_dir(&path).map_err(|e| FolioError::io(&path, e))?;
            for entry in dir {
                let entry = entry.map_err(|e| FolioError::io(&path, e))?;
                let mut name = entry.file_name().to_string_lossy().to_string();
                if entry.file_type().is_ok_and(|t| t.is_dir()) {
                    name.push('/');
                }
                entries.push(name);
            }
            return Ok(Some(Box::new(BytesFile::listing(key.as_str(), entries))));
        }

        let file = std::fs::File::open(&path).map_err(|e| FolioError::io(&path, e))?;
        Ok(Some(Box::new(DiskFile {
            name: key.to_string(),
            path,
            size: meta.len(),
            file: Some(file),
        })))
    }
}

/// A regular file opened from disk.
struct DiskFile {
    name: String,
    path: PathBuf,
    size: u64,
    file: Option<std::fs::File>,
}

impl DiskFile {
    fn handle(&mut self) -> std::io::Result<&mut std::fs::File> {
        self.file
            .as_mut()
            .ok_or_else(|| std::io::Error::other("file already closed"))
    }
}

impl Read for DiskFile {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.handle()?.read(buf)
    }
}

impl File for DiskFile {
    fn info(&self) -> FileInfo {
        FileInfo {
            name: self.name.clone(),
            size: Some(self.size),
            is_dir: false,
        }
    }

    fn rewind(&mut self) -> Result<()> {
        let path = self.path.clone();
        self.handle()
            .and_then(|f| f.seek(SeekFrom::Start(0)))
            .map(|_| ())
            .map_err(|e| FolioError::io(path, e))
    }

    fn close(&mut self) -> Result<()> {
        // Dropping the std handle closes the descriptor.
        self.file.take();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn site() -> PathBuf {
        let root = std::env::temp_dir().join(format!("folio-dir-test-{}", Uuid::now_v7()));
        std::fs::create_dir_all(root.join("blog")).unwrap();
        std::fs::write(root.join("index.html"), "<h1>Home</h1>").unwrap();
        std::fs::write(root.join("blog/first.md"), "# First post").unwrap();
        root
    }

    fn read_all(file: &mut dyn File) -> String {
        let mut out = String::new();
        file.read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn opens_nested_file() {
        let root = site();
        let files = DirSourcer::new(&root).source().unwrap();

        let mut file = files.open(&FileKey::from("/blog/first.md")).unwrap().unwrap();
        assert_eq!(file.info().name, "blog/first.md");
        assert_eq!(file.info().size, Some(12));
        assert_eq!(read_all(file.as_mut()), "# First post");

        file.rewind().unwrap();
        assert_eq!(read_all(file.as_mut()), "# First post");

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn root_key_lists_entries() {
        let root = site();
        let files = DirSourcer::new(&root).source().unwrap();

        let mut file = files.open(&FileKey::root()).unwrap().unwrap();
        assert!(file.info().is_dir);
        assert_eq!(read_all(file.as_mut()), "blog/\nindex.html\n");

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn missing_file_is_not_found() {
        let root = site();
        let files = DirSourcer::new(&root).source().unwrap();

        let err = files.open(&FileKey::from("/nope.html")).err().unwrap();
        assert!(matches!(err, FolioError::NotFound { .. }));

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn parent_segments_are_rejected() {
        let root = site();
        let files = DirSourcer::new(&root).source().unwrap();

        let err = files.open(&FileKey::from("/../../etc/passwd")).err().unwrap();
        assert!(matches!(err, FolioError::InvalidKey { .. }));

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn closed_file_refuses_reads() {
        let root = site();
        let files = DirSourcer::new(&root).source().unwrap();

        let mut file = files.open(&FileKey::from("index.html")).unwrap().unwrap();
        file.close().unwrap();
        let mut buf = [0u8; 4];
        assert!(file.read(&mut buf).is_err());

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn missing_root_fails_to_source() {
        let root = std::env::temp_dir().join(format!("folio-missing-{}", Uuid::now_v7()));
        let err = DirSourcer::new(&root).source().err().unwrap();
        assert!(matches!(err, FolioError::Io { .. }));
    }

    #[test]
    fn file_root_fails_to_source() {
        let root = site();
        let err = DirSourcer::new(root.join("index.html")).source().err().unwrap();
        assert!(err.to_string().contains("is not a directory"));

        let _ = std::fs::remove_dir_all(&root);
    }
}
