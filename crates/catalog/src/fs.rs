//! Filesystem artifact store
//!
//! Documents and artifacts live in two separate directories (the static
//! assets directory and the content directory of the site). Directories are
//! created on first write; writes go through a temp file and a rename so the
//! site generator never sees a half-written document.

use apiscout_ports::{ArtifactStore, PersistenceError, StoreArea};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub struct FsArtifactStore {
    documents_dir: PathBuf,
    artifacts_dir: PathBuf,
}

impl FsArtifactStore {
    pub fn new(documents_dir: impl Into<PathBuf>, artifacts_dir: impl Into<PathBuf>) -> Self {
        Self {
            documents_dir: documents_dir.into(),
            artifacts_dir: artifacts_dir.into(),
        }
    }

    pub fn dir(&self, area: StoreArea) -> &Path {
        match area {
            StoreArea::Documents => &self.documents_dir,
            StoreArea::Artifacts => &self.artifacts_dir,
        }
    }

    pub fn path(&self, area: StoreArea, file_name: &str) -> PathBuf {
        self.dir(area).join(file_name)
    }
}

impl ArtifactStore for FsArtifactStore {
    fn write(&self, area: StoreArea, file_name: &str, bytes: &[u8]) -> Result<(), PersistenceError> {
        let path = self.path(area, file_name);
        log::debug!("Preparing to write {} to disk", path.display());

        fs::create_dir_all(self.dir(area)).map_err(|e| io_error(self.dir(area), e))?;

        let tmp = path.with_extension("tmp");
        {
            let mut f = fs::File::create(&tmp).map_err(|e| io_error(&tmp, e))?;
            f.write_all(bytes).map_err(|e| io_error(&tmp, e))?;
            f.sync_all().map_err(|e| io_error(&tmp, e))?;
        }
        fs::rename(&tmp, &path).map_err(|e| io_error(&path, e))
    }

    fn read(&self, area: StoreArea, file_name: &str) -> Result<Vec<u8>, PersistenceError> {
        let path = self.path(area, file_name);
        fs::read(&path).map_err(|e| io_error(&path, e))
    }

    fn delete(&self, area: StoreArea, file_name: &str) -> Result<(), PersistenceError> {
        let path = self.path(area, file_name);
        fs::remove_file(&path).map_err(|e| io_error(&path, e))
    }
}

fn io_error(path: &Path, err: io::Error) -> PersistenceError {
    if err.kind() == io::ErrorKind::NotFound {
        PersistenceError::NotFound(path.display().to_string())
    } else {
        PersistenceError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}
