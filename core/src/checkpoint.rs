use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckpointFile {
    pub saved_at: String,
    pub urls: Vec<String>,
}

/// Durable copy of the local frontier, overwritten atomically.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    path: PathBuf,
}

impl Checkpoint {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// URLs saved by a previous run, or `None` when there is no checkpoint.
    pub fn load(&self) -> Result<Option<Vec<String>>> {
        let buf = match fs::read_to_string(&self.path) {
            Ok(buf) => buf,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).with_context(|| format!("failed to read {}", self.path.display())),
        };
        let file: CheckpointFile = serde_json::from_str(&buf)
            .with_context(|| format!("corrupt checkpoint {}", self.path.display()))?;
        Ok(Some(file.urls))
    }

    /// Write to a sibling temp file, sync it, then rename over the old copy.
    pub fn save<'a>(&self, urls: impl IntoIterator<Item = &'a String>) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let file = CheckpointFile {
            saved_at: time::OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default(),
            urls: urls.into_iter().cloned().collect(),
        };
        let tmp = self.tmp_path();
        let mut f = File::create(&tmp).with_context(|| format!("failed to create {}", tmp.display()))?;
        f.write_all(serde_json::to_string(&file)?.as_bytes())?;
        f.sync_all()?;
        fs::rename(&tmp, &self.path).with_context(|| format!("failed to replace {}", self.path.display()))?;
        Ok(())
    }
}
