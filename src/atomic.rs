//! Crash-safe persistence of rewritten settings files.
//!
//! The rewritten tree is written to a temporary file in the target's
//! directory, synced, then renamed over the target while an exclusive lock
//! on the target is held. Readers never observe a half-written file.
use std::{
    fs::{File, OpenOptions},
    io::{Read, Write},
    path::{Path, PathBuf},
};

use fs2::FileExt;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::{
    error::Error,
    loader::{self, Format},
    value::Value,
};

struct FileLock {
    _file: File,
}

impl FileLock {
    fn lock(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        // Blocks until exclusive lock is acquired
        file.lock_exclusive()?;

        Ok(Self { _file: file })
    }
}

/// A settings file that is only ever replaced as a whole.
#[derive(Debug, Clone)]
pub struct AtomicFile {
    path: PathBuf,
}

impl AtomicFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the file under a shared lock. The file must exist.
    pub fn read(&self) -> Result<String, Error> {
        let file = File::open(&self.path)?;
        file.lock_shared()?;

        let mut buf = String::new();
        (&file).read_to_string(&mut buf)?;

        Ok(buf)
    }

    pub fn write(&self, contents: &str) -> Result<(), Error> {
        let _lock = FileLock::lock(&self.path)?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;

        tmp.write_all(contents.as_bytes())?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;

        tmp.persist(&self.path).map_err(|err| err.error)?;

        debug!(file = %self.path.display(), bytes = contents.len(), "Persisted settings file");
        Ok(())
    }

    /// Parses the file in the format its extension names.
    pub fn read_settings(&self) -> Result<Value, Error> {
        let format = Format::from_path(&self.path)?;
        loader::parse_settings(&self.read()?, format)
    }

    /// Renders `settings` in the format the extension names and replaces
    /// the file with it.
    pub fn write_settings(&self, settings: &Value) -> Result<(), Error> {
        let format = Format::from_path(&self.path)?;
        self.write(&loader::render_settings(settings, format)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    #[test]
    fn test_write_replaces_contents() {
        let dir = tempfile::tempdir().unwrap();
        let file = AtomicFile::new(dir.path().join("kibana.yml"));

        file.write("server:\n  port: 1\n").unwrap();
        file.write("server:\n  port: 2\n").unwrap();

        assert_eq!(file.read().unwrap(), "server:\n  port: 2\n");
        let leftovers = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn test_read_missing_file_does_not_create_it() {
        let dir = tempfile::tempdir().unwrap();
        let file = AtomicFile::new(dir.path().join("missing.yml"));

        assert!(matches!(file.read(), Err(Error::Io(_))));
        assert!(!file.path().exists());
    }

    #[test]
    fn test_settings_round_trip_in_file_format() {
        let dir = tempfile::tempdir().unwrap();
        let settings: Value =
            serde_yaml::from_str("server:\n  port: 5601\n  cors:\n    enabled: true\n").unwrap();

        for name in ["kibana.yml", "kibana.toml", "kibana.json"] {
            let file = AtomicFile::new(dir.path().join(name));
            file.write_settings(&settings).unwrap();
            assert_eq!(file.read_settings().unwrap(), settings, "{name}");
        }
    }

    #[test]
    fn test_unsupported_extension_is_rejected_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let file = AtomicFile::new(dir.path().join("kibana.ini"));

        let err = file.write_settings(&Value::mapping()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
        assert!(!file.path().exists());
    }
}
