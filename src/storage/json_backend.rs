use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use crate::errors::StoreError;

use super::{Result, StorageBackend};

const APP_DIR: &str = "fintrack";
const RECORD_FILE: &str = "record.json";
const TMP_SUFFIX: &str = "tmp";

/// File-backed storage holding the serialized record as a single JSON
/// document. Writes go through a temp file and rename so a crash mid-write
/// never leaves a torn record behind.
#[derive(Debug, Clone)]
pub struct JsonStorage {
    path: PathBuf,
}

impl JsonStorage {
    /// Opens storage rooted at `path`, or at the platform data directory
    /// when none is given.
    pub fn new(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => default_record_path()?,
        };
        if let Some(parent) = path.parent() {
            ensure_dir(parent)?;
        }
        Ok(Self { path })
    }

    pub fn new_default() -> Result<Self> {
        Self::new(None)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StorageBackend for JsonStorage {
    fn read(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(&self.path)?))
    }

    fn write(&self, data: &str) -> Result<()> {
        let tmp = tmp_path(&self.path);
        write_file(&tmp, data)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn default_record_path() -> Result<PathBuf> {
    let base = dirs::data_dir()
        .ok_or_else(|| StoreError::Storage("no data directory available".into()))?;
    Ok(base.join(APP_DIR).join(RECORD_FILE))
}

fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_file(path: &Path, data: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    Ok(())
}
