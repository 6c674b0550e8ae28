// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Config store management.
//!
//! Kalmiya keeps small pieces of state, like API credentials or the last time
//! new releases were checked, in a __config store__. A config store is a flat
//! namespace of named entries whose content is plain text.
//!
//! # Config Store Layout
//!
//! On disk, a config store is a directory where each entry is a regular file
//! named after the entry itself. So, `$HOME/.kalmiya/apple-music/user-token`
//! means that the "apple-music" config store contains an entry named
//! "user-token". Nested directories are never evaluated.

use std::{
    cell::RefCell,
    collections::HashMap,
    fs::{read_to_string, write},
    io::ErrorKind,
    path::PathBuf,
};
use tracing::{debug, instrument};

/// Layer of indirection for config store access.
pub trait ConfigStore {
    /// Check if entry exists.
    fn contains(&self, name: &str) -> bool;

    /// Read entry content, [`None`] if entry does not exist.
    fn get(&self, name: &str) -> Result<Option<String>>;

    /// Insert or overwrite entry.
    fn add(&self, name: &str, content: &str) -> Result<()>;
}

/// Config store backed by a directory.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    /// Open config store at target directory.
    ///
    /// The directory is only created on the first write.
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ConfigStore for DirectoryStore {
    fn contains(&self, name: &str) -> bool {
        self.root.join(name).is_file()
    }

    #[instrument(skip(self), level = "debug")]
    fn get(&self, name: &str) -> Result<Option<String>> {
        let path = self.root.join(name);
        match read_to_string(&path) {
            // INVARIANT: Entries are written by hand sometimes, chomp trailing newlines.
            Ok(content) => Ok(Some(content.trim_end_matches(['\r', '\n']).to_string())),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
            Err(error) => Err(StoreError::ReadEntry {
                source: error,
                path,
            }),
        }
    }

    #[instrument(skip(self, content), level = "debug")]
    fn add(&self, name: &str, content: &str) -> Result<()> {
        mkdirp::mkdirp(&self.root).map_err(|error| StoreError::CreateStore {
            source: error,
            path: self.root.clone(),
        })?;

        let path = self.root.join(name);
        debug!("write config entry {:?}", path.display());
        write(&path, content.as_bytes()).map_err(|error| StoreError::WriteEntry {
            source: error,
            path,
        })
    }
}

/// Config store kept in memory.
///
/// Nothing is persisted, useful to run commands against fake collaborators.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    /// Construct new empty config store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct config store with initial entries.
    pub fn with_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let entries = entries
            .into_iter()
            .map(|(name, content)| (name.to_string(), content.to_string()))
            .collect();

        Self {
            entries: RefCell::new(entries),
        }
    }
}

impl ConfigStore for MemoryStore {
    fn contains(&self, name: &str) -> bool {
        self.entries.borrow().contains_key(name)
    }

    fn get(&self, name: &str) -> Result<Option<String>> {
        Ok(self.entries.borrow().get(name).cloned())
    }

    fn add(&self, name: &str, content: &str) -> Result<()> {
        self.entries
            .borrow_mut()
            .insert(name.to_string(), content.to_string());

        Ok(())
    }
}

/// All possible error types for config store interaction.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Config store directory cannot be created.
    #[error("failed to create config store at {:?}", path.display())]
    CreateStore {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Entry exists but cannot be read.
    #[error("failed to read config entry at {:?}", path.display())]
    ReadEntry {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Entry cannot be written.
    #[error("failed to write config entry at {:?}", path.display())]
    WriteEntry {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = StoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn directory_store_creates_itself_on_first_write() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = DirectoryStore::open(dir.path().join("apple-music"));

        assert!(!store.contains("user-token"));
        assert_eq!(store.get("user-token")?, None);

        store.add("user-token", "secret")?;
        assert!(store.contains("user-token"));
        assert_eq!(store.get("user-token")?, Some("secret".to_string()));

        store.add("user-token", "other")?;
        assert_eq!(store.get("user-token")?, Some("other".to_string()));

        Ok(())
    }

    #[test]
    fn directory_store_chomps_trailing_newlines() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        write(dir.path().join("team-id"), "ABCDE12345\n")?;
        let store = DirectoryStore::open(dir.path());

        assert_eq!(store.get("team-id")?, Some("ABCDE12345".to_string()));

        Ok(())
    }

    #[test]
    fn memory_store_round_trip() -> anyhow::Result<()> {
        let store = MemoryStore::with_entries([("user-token", "secret")]);

        assert!(store.contains("user-token"));
        assert!(!store.contains("releases-check"));

        store.add("releases-check", "2020-01-01T00:00:00+00:00")?;
        assert_eq!(
            store.get("releases-check")?,
            Some("2020-01-01T00:00:00+00:00".to_string())
        );

        Ok(())
    }
}
