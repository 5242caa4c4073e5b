//! Bounded input history, optionally mirrored to a log file.

use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::Result;

pub const DEFAULT_HISTORY_LIMIT: usize = 500;

#[derive(Debug)]
pub struct History {
    /// Newest first.
    entries: VecDeque<String>,
    limit: usize,
    file: Option<PathBuf>,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl History {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            limit,
            file: None,
        }
    }

    /// History appended to `path`, seeded with the last `limit` lines already
    /// in it.
    pub fn with_file(path: impl Into<PathBuf>, limit: usize) -> Result<Self> {
        let path = path.into();
        let mut history = Self::new(limit);

        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            for line in contents.lines().filter(|line| !line.trim().is_empty()) {
                history.remember(line.to_string());
            }
            tracing::debug!(entries = history.len(), "loaded history from {:?}", path);
        }

        history.file = Some(path);
        Ok(history)
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    pub fn push(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        self.remember(line.to_string());

        if let Some(path) = &self.file {
            if let Err(e) = append_line(path, line) {
                tracing::warn!("failed to append to history file {:?}: {}", path, e);
            }
        }
    }

    fn remember(&mut self, line: String) {
        if self.limit == 0 {
            return;
        }
        self.entries.push_front(line);
        self.entries.truncate(self.limit);
    }

    /// Entries, newest first.
    pub fn entries(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", line)
}
