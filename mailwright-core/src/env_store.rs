//! Line-oriented `KEY=VALUE` store backing the `.env` file.
//!
//! Link commands write capability flags here. Writes rewrite the whole file;
//! every line that is not the target key is carried over verbatim and in order.

use std::io;
use std::path::{Path, PathBuf};

/// A `KEY=VALUE` file on disk.
#[derive(Debug, Clone)]
pub struct EnvFile {
    path: PathBuf,
}

impl EnvFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Set `key=value`, replacing the first existing line for `key` or
    /// appending one. A missing file is treated as empty.
    pub fn upsert(&self, key: &str, value: &str) -> io::Result<()> {
        let existing = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e),
        };
        let updated = upsert_line(&existing, key, value);
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, updated)?;
        tracing::debug!(path = %self.path.display(), key, "env file updated");
        Ok(())
    }

    /// Read the value of `key`, if present.
    pub fn get(&self, key: &str) -> io::Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(content
                .lines()
                .find(|line| line_key(line) == Some(key))
                .and_then(|line| line.split_once('='))
                .map(|(_, v)| v.trim().to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Left-hand side of a `KEY=VALUE` line, if it has one.
fn line_key(line: &str) -> Option<&str> {
    line.split_once('=').map(|(lhs, _)| lhs.trim())
}

/// Pure form of [`EnvFile::upsert`] over file content.
pub fn upsert_line(content: &str, key: &str, value: &str) -> String {
    let entry = format!("{key}={value}");
    let mut replaced = false;
    let mut lines: Vec<String> = content
        .lines()
        .map(|line| {
            if !replaced && line_key(line) == Some(key) {
                replaced = true;
                entry.clone()
            } else {
                line.to_string()
            }
        })
        .collect();
    if !replaced {
        lines.push(entry);
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}
