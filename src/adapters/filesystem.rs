//! Filesystem Shard Store
//!
//! One directory per container, one regular file per blob. Writes go to a
//! hidden temporary file in the same directory and are renamed into place,
//! so a blob is never observed half-written.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tracing::debug;

use crate::domain::ShardStore;
use crate::error::{Error, Result};

/// Suffix of in-flight temporary files, hidden from listings
const TMP_SUFFIX: &str = ".tmp";

/// Directory-backed [`ShardStore`]
#[derive(Debug, Clone, Default)]
pub struct FsShardStore {
    root: PathBuf,
}

impl FsShardStore {
    /// Store whose container names are paths relative to `root`
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Store whose container names are used as paths unchanged
    pub fn unrooted() -> Self {
        Self::default()
    }

    /// Directory of a container
    pub fn container_path(&self, container: &str) -> PathBuf {
        self.root.join(container)
    }

    fn blob_path(&self, container: &str, name: &str) -> PathBuf {
        self.container_path(container).join(name)
    }
}

impl ShardStore for FsShardStore {
    fn create_container(&self, container: &str) -> Result<()> {
        let path = self.container_path(container);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                Error::io(format!("creating parent of {}", path.display()), e)
            })?;
        }
        match fs::create_dir(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "created container directory");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(Error::ContainerExists(path.display().to_string()))
            }
            Err(e) => Err(Error::io(format!("creating {}", path.display()), e)),
        }
    }

    fn container_exists(&self, container: &str) -> Result<bool> {
        let path = self.container_path(container);
        match fs::metadata(&path) {
            Ok(meta) => Ok(meta.is_dir()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::io(format!("inspecting {}", path.display()), e)),
        }
    }

    fn list(&self, container: &str) -> Result<Vec<String>> {
        let path = self.container_path(container);
        let context = || format!("listing {}", path.display());
        let mut names = Vec::new();
        for entry in fs::read_dir(&path).map_err(|e| Error::io(context(), e))? {
            let entry = entry.map_err(|e| Error::io(context(), e))?;
            if !entry.file_type().map_err(|e| Error::io(context(), e))?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !name.ends_with(TMP_SUFFIX) {
                    names.push(name.to_string());
                }
            }
        }
        Ok(names)
    }

    fn read(&self, container: &str, name: &str) -> Result<Option<Bytes>> {
        let path = self.blob_path(container, name);
        match fs::read(&path) {
            Ok(data) => {
                debug!(path = %path.display(), size = data.len(), "read blob");
                Ok(Some(Bytes::from(data)))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::io(format!("reading {}", path.display()), e)),
        }
    }

    fn write(&self, container: &str, name: &str, data: &[u8]) -> Result<()> {
        let path = self.blob_path(container, name);
        let tmp_path = self.blob_path(container, &format!(".{}{}", name, TMP_SUFFIX));

        fs::write(&tmp_path, data)
            .map_err(|e| Error::io(format!("writing {}", tmp_path.display()), e))?;
        fs::rename(&tmp_path, &path)
            .map_err(|e| Error::io(format!("renaming into {}", path.display()), e))?;

        debug!(path = %path.display(), size = data.len(), "stored blob");
        Ok(())
    }
}
