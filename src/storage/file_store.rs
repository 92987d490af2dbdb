use std::{
    fs::{self, File},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use anyhow::Result;
use fs4::fs_std::FileExt;
use tracing::debug;

use super::KeyValueStore;

const LOCK_FILE_NAME: &str = ".lock";

/// The main realization of [KeyValueStore]. Each key is a file inside `dir`.
///
/// Several processes may share one profile directory, so every access goes through an advisory
/// lock on `dir/.lock`: shared for reads, exclusive for writes. Writes go to a temporary file that
/// is renamed over the record, so a record is either fully replaced or left untouched.
pub struct DirectoryStore {
    dir: PathBuf,
}

impl DirectoryStore {
    pub fn new(dir: PathBuf) -> Result<Self, std::io::Error> {
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }

    fn open_lock(&self) -> Result<File, std::io::Error> {
        File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.dir.join(LOCK_FILE_NAME))
    }

    fn with_lock<T>(
        &self,
        exclusive: bool,
        action: impl FnOnce() -> Result<T, std::io::Error>,
    ) -> Result<T, std::io::Error> {
        let lock = self.open_lock()?;
        if exclusive {
            FileExt::lock_exclusive(&lock)?;
        } else {
            FileExt::lock_shared(&lock)?;
        }
        let result = action();
        FileExt::unlock(&lock)?;
        result
    }
}

impl KeyValueStore for DirectoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.record_path(key);
        let value = self.with_lock(false, || match fs::read_to_string(&path) {
            Ok(v) => Ok(Some(v)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        })?;
        debug!("Read record {key}, present: {}", value.is_some());
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.record_path(key);
        let temporary = self.dir.join(format!(".{key}.tmp"));
        self.with_lock(true, || {
            let mut file = File::create(&temporary)?;
            file.write_all(value.as_bytes())?;
            file.sync_all()?;
            fs::rename(&temporary, &path)
        })?;
        debug!("Wrote record {key}");
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.record_path(key);
        self.with_lock(true, || match fs::remove_file(&path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        })?;
        debug!("Removed record {key}");
        Ok(())
    }
}
