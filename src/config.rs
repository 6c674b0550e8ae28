// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout of the settings file that Kalmiya reads from
//! `$HOME/.kalmiya/kalmiya.toml` to simplify the process of serialization and
//! deserialization. Every section and every field is optional. Missing values
//! fall back to the defaults of the machine this tool was first written for.
//!
//! # General Layout
//!
//! ```toml
//! [backup]
//! target = "/Volumes/Backup/$USER"
//! folders = ["Desktop", "Documents"]
//! open = ["$HOME/Library/Mobile Documents"]
//!
//! [music]
//! callback_port = 8080
//! retry_attempts = 5
//! retry_delay_secs = 10
//!
//! [projects]
//! root = "$HOME/Sites"
//! backup = "/Volumes/Backup/Code"
//! template = "$HOME/.kalmiya/project-template"
//! ```
//!
//! All path fields go through shell expansion when parsed.

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    fs::read_to_string,
    io::ErrorKind,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};
use tracing::{debug, instrument};

/// Kalmiya settings layout.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Folders to backup and restore.
    pub backup: BackupSettings,

    /// Apple Music integration.
    pub music: MusicSettings,

    /// Project scaffolding.
    pub projects: ProjectSettings,
}

impl Settings {
    /// Load settings from target path.
    ///
    /// A missing settings file is not an error, the defaults are used
    /// instead.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Read`] if file exists but cannot be read.
    /// - Return [`ConfigError::Deserialize`] if file content is invalid.
    /// - Return [`ConfigError::ShellExpansion`] if a path cannot be expanded.
    #[instrument(skip(path), level = "debug")]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match read_to_string(path) {
            Ok(data) => data.parse(),
            Err(error) if error.kind() == ErrorKind::NotFound => {
                debug!("no settings at {:?}, use defaults", path.display());
                Self::default().expanded()
            }
            Err(error) => Err(ConfigError::Read {
                source: error,
                path: path.to_path_buf(),
            }),
        }
    }

    fn expanded(mut self) -> Result<Self> {
        self.backup.target = expand(&self.backup.target)?;
        self.backup.folders = self
            .backup
            .folders
            .iter()
            .map(|path| expand(path))
            .collect::<Result<Vec<_>>>()?;
        self.backup.open = self
            .backup
            .open
            .iter()
            .map(|path| expand(path))
            .collect::<Result<Vec<_>>>()?;
        self.projects.root = expand(&self.projects.root)?;
        self.projects.backup = expand(&self.projects.backup)?;
        self.projects.template = expand(&self.projects.template)?;

        Ok(self)
    }
}

impl FromStr for Settings {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let settings: Settings = toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on every path field.
        settings.expanded()
    }
}

impl Display for Settings {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Backup and restore settings.
///
/// Each folder is relative to the home directory on one side, and relative to
/// the backup target on the other side.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackupSettings {
    /// Root directory of the backup volume.
    pub target: PathBuf,

    /// Folders relative to home directory to copy into backup target.
    pub folders: Vec<PathBuf>,

    /// Folders to open once backup is done, for content that cannot be
    /// copied automatically.
    pub open: Vec<PathBuf>,
}

impl BackupSettings {
    /// Pair each backup folder as `(home/folder, target/folder)`.
    pub fn pairs(&self, home: impl AsRef<Path>) -> Vec<(PathBuf, PathBuf)> {
        self.folders
            .iter()
            .map(|folder| (home.as_ref().join(folder), self.target.join(folder)))
            .collect()
    }
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            target: PathBuf::from("/Volumes/Backup/$USER"),
            folders: [
                "Desktop",
                "Documents",
                "Downloads",
                "Movies",
                "Library/Services",
                ".series",
                ".kalmiya",
            ]
            .into_iter()
            .map(PathBuf::from)
            .collect(),
            // iCloud files are present on disk but not always downloaded, so
            // copying them would only copy empty shells.
            open: vec![
                PathBuf::from("$HOME/Library/Mobile Documents"),
                PathBuf::from("/Volumes/Backup/$USER"),
            ],
        }
    }
}

/// Apple Music integration settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MusicSettings {
    /// Local port of the authentication callback server.
    pub callback_port: u16,

    /// Number of attempts for requests answered with "not found".
    pub retry_attempts: u32,

    /// Delay in seconds between attempts.
    pub retry_delay_secs: u64,
}

impl MusicSettings {
    /// Delay between attempts as [`Duration`].
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

impl Default for MusicSettings {
    fn default() -> Self {
        Self {
            callback_port: 8080,
            retry_attempts: 5,
            retry_delay_secs: 10,
        }
    }
}

/// Project scaffolding settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProjectSettings {
    /// Directory containing `<vendor>/<package>` working copies.
    pub root: PathBuf,

    /// Directory containing `<vendor>/<package>` bare mirrors.
    pub backup: PathBuf,

    /// Directory of template files copied into new projects.
    pub template: PathBuf,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("$HOME/Sites"),
            backup: PathBuf::from("/Volumes/Backup/Code"),
            template: PathBuf::from("$HOME/.kalmiya/project-template"),
        }
    }
}

fn expand(path: &Path) -> Result<PathBuf> {
    Ok(PathBuf::from(
        shellexpand::full(path.to_string_lossy().as_ref())
            .map_err(ConfigError::ShellExpansion)?
            .into_owned(),
    ))
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read settings file.
    #[error("failed to read settings at {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;

    #[sealed_test(env = [("BLAH", "/home/blah"), ("USER", "blah")])]
    fn deserialize_settings() -> anyhow::Result<()> {
        let result: Settings = r#"
            [backup]
            target = "/Volumes/Backup/$USER"
            folders = ["Desktop", "Documents"]
            open = ["$BLAH/Library/Mobile Documents"]

            [music]
            callback_port = 9090
            retry_attempts = 2
            retry_delay_secs = 1

            [projects]
            root = "$BLAH/Sites"
            backup = "/Volumes/Backup/Code"
            template = "$BLAH/template"
        "#
        .parse()?;

        let expect = Settings {
            backup: BackupSettings {
                target: "/Volumes/Backup/blah".into(),
                folders: vec!["Desktop".into(), "Documents".into()],
                open: vec!["/home/blah/Library/Mobile Documents".into()],
            },
            music: MusicSettings {
                callback_port: 9090,
                retry_attempts: 2,
                retry_delay_secs: 1,
            },
            projects: ProjectSettings {
                root: "/home/blah/Sites".into(),
                backup: "/Volumes/Backup/Code".into(),
                template: "/home/blah/template".into(),
            },
        };

        assert_eq!(result, expect);

        Ok(())
    }

    #[sealed_test(env = [("HOME", "/home/blah"), ("USER", "blah")])]
    fn missing_sections_use_defaults() -> anyhow::Result<()> {
        let result: Settings = r#"
            [music]
            callback_port = 9090
        "#
        .parse()?;

        assert_eq!(result.music.callback_port, 9090);
        assert_eq!(result.music.retry_attempts, 5);
        assert_eq!(result.backup.target, PathBuf::from("/Volumes/Backup/blah"));
        assert_eq!(result.projects.root, PathBuf::from("/home/blah/Sites"));

        Ok(())
    }

    #[sealed_test(env = [("HOME", "/home/blah"), ("USER", "blah")])]
    fn missing_settings_file_uses_defaults() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let result = Settings::load(dir.path().join("kalmiya.toml"))?;

        assert_eq!(result.music, MusicSettings::default());
        assert_eq!(
            result.backup.open,
            vec![
                PathBuf::from("/home/blah/Library/Mobile Documents"),
                PathBuf::from("/Volumes/Backup/blah"),
            ]
        );

        Ok(())
    }

    #[test]
    fn serialize_settings() {
        let result = Settings {
            backup: BackupSettings {
                target: "/backup".into(),
                folders: vec!["Desktop".into()],
                open: vec![],
            },
            music: MusicSettings::default(),
            projects: ProjectSettings {
                root: "/home/blah/Sites".into(),
                backup: "/backup/Code".into(),
                template: "/home/blah/template".into(),
            },
        }
        .to_string();

        let expect = indoc! {r#"
            [backup]
            target = "/backup"
            folders = ["Desktop"]
            open = []

            [music]
            callback_port = 8080
            retry_attempts = 5
            retry_delay_secs = 10

            [projects]
            root = "/home/blah/Sites"
            backup = "/backup/Code"
            template = "/home/blah/template"
        "#};

        assert_eq!(result, expect);
    }

    #[test]
    fn backup_pairs_join_home_and_target() {
        let settings = BackupSettings {
            target: "/backup".into(),
            folders: vec!["Desktop".into(), ".kalmiya".into()],
            open: vec![],
        };

        assert_eq!(
            settings.pairs("/home/blah"),
            vec![
                ("/home/blah/Desktop".into(), "/backup/Desktop".into()),
                ("/home/blah/.kalmiya".into(), "/backup/.kalmiya".into()),
            ]
        );
    }
}
