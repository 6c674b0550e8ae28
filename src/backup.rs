// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Backup and restore of home folders.
//!
//! Each configured folder of the home directory is paired with a folder of
//! the same name on the backup volume. Backup copies home folders onto the
//! volume, restore copies them back. Files are only ever added or
//! overwritten, nothing is deleted on either side.
//!
//! A pair whose source or target is missing is reported and skipped, so a
//! backup volume that is not mounted never fails the whole run.

use crate::config::BackupSettings;

use ignore::WalkBuilder;
use indicatif::{ProgressBar, ProgressStyle};
use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    fs::copy,
    io::{self, Write},
    path::{Path, PathBuf},
    process::Command,
};
use tracing::{debug, info, instrument, warn};

/// Direction of a copy between home and backup volume.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Direction {
    Backup,
    Restore,
}

impl Direction {
    fn progressive(self) -> &'static str {
        match self {
            Direction::Backup => "Backuping",
            Direction::Restore => "Restoring",
        }
    }
}

impl Display for Direction {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Direction::Backup => fmt.write_str("Backup"),
            Direction::Restore => fmt.write_str("Restore"),
        }
    }
}

/// Copy every configured home folder onto backup volume.
///
/// # Errors
///
/// - Return [`BackupError`] if any accessible pair fails to be copied.
pub fn backup(
    settings: &BackupSettings,
    home: impl AsRef<Path>,
    output: &mut impl Write,
    bar: &ProgressBar,
) -> Result<()> {
    for (source, target) in settings.pairs(home) {
        transfer(Direction::Backup, &source, &target, output, bar)?;
    }

    Ok(())
}

/// Copy every configured folder of backup volume back into home.
///
/// # Errors
///
/// - Return [`BackupError`] if any accessible pair fails to be copied.
pub fn restore(
    settings: &BackupSettings,
    home: impl AsRef<Path>,
    output: &mut impl Write,
    bar: &ProgressBar,
) -> Result<()> {
    for (target, source) in settings.pairs(home) {
        transfer(Direction::Restore, &source, &target, output, bar)?;
    }

    Ok(())
}

#[instrument(skip(output, bar), level = "debug")]
fn transfer(
    direction: Direction,
    source: &Path,
    target: &Path,
    output: &mut impl Write,
    bar: &ProgressBar,
) -> Result<()> {
    if !source.is_dir() {
        writeln!(output, "{direction} source {} not accessible", source.display())?;
        return Ok(());
    }

    if !target.is_dir() {
        writeln!(output, "{direction} target {} not accessible", target.display())?;
        return Ok(());
    }

    writeln!(
        output,
        "{} {} to {}:",
        direction.progressive(),
        source.display(),
        target.display()
    )?;
    let copied = copy_tree(source, target, bar)?;
    writeln!(output, "{copied} files copied")?;

    Ok(())
}

/// Copy every file below source directory into target directory.
///
/// Hidden files are copied too, and ignore files are not honored. Symbolic
/// links are not followed, nor copied.
///
/// # Errors
///
/// - Return [`BackupError::Walk`] if source directory cannot be walked.
/// - Return [`BackupError::CreateDir`] if a target directory cannot be made.
/// - Return [`BackupError::CopyFile`] if a file cannot be copied.
pub fn copy_tree(source: &Path, target: &Path, bar: &ProgressBar) -> Result<u64> {
    let entries = WalkBuilder::new(source)
        .standard_filters(false)
        .follow_links(false)
        .build()
        .collect::<Result<Vec<_>, _>>()?;
    let files = entries
        .iter()
        .filter(|entry| entry.file_type().is_some_and(|kind| kind.is_file()))
        .count() as u64;

    let style = ProgressStyle::with_template(
        "{elapsed_precise:.green}  {msg:<50}  [{wide_bar:.yellow/blue}] {pos}/{len}",
    )?
    .progress_chars("-Cco.");
    bar.set_style(style);
    bar.set_message(source.display().to_string());
    bar.set_length(files);
    bar.set_position(0);

    let mut copied = 0;
    for entry in entries {
        // INVARIANT: Walk only yields paths below its root.
        let Ok(relative) = entry.path().strip_prefix(source) else {
            continue;
        };
        let destination = target.join(relative);

        match entry.file_type() {
            Some(kind) if kind.is_dir() => {
                mkdirp::mkdirp(&destination).map_err(|error| BackupError::CreateDir {
                    source: error,
                    path: destination.clone(),
                })?;
            }
            Some(kind) if kind.is_file() => {
                copy(entry.path(), &destination).map_err(|error| BackupError::CopyFile {
                    source: error,
                    path: entry.path().to_path_buf(),
                })?;
                copied += 1;
                bar.inc(1);
            }
            _ => debug!("skip {:?}, not a regular file", entry.path().display()),
        }
    }
    bar.finish_and_clear();
    info!("copied {copied} files from {:?}", source.display());

    Ok(copied)
}

/// Open folder with the desktop file manager.
pub trait Opener {
    /// Open target folder.
    ///
    /// # Errors
    ///
    /// - Return [`io::Error`] if file manager cannot be launched.
    fn open(&self, path: &Path) -> io::Result<()>;
}

/// Open folders through the `open` command of the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemOpener;

impl Opener for SystemOpener {
    fn open(&self, path: &Path) -> io::Result<()> {
        let program = if cfg!(target_os = "macos") {
            "open"
        } else {
            "xdg-open"
        };
        let status = Command::new(program).arg(path).status()?;
        if !status.success() {
            return Err(io::Error::other(format!("{program} exited with {status}")));
        }

        Ok(())
    }
}

/// Open every target folder, for content that needs a manual copy.
///
/// Folders that cannot be opened are only warned about.
pub fn open_folders(folders: &[PathBuf], opener: &impl Opener) {
    for folder in folders {
        if let Err(error) = opener.open(folder) {
            warn!("cannot open {:?}: {error}", folder.display());
        }
    }
}

/// All possible error types of backup and restore.
#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    /// Source directory cannot be walked.
    #[error(transparent)]
    Walk(#[from] ignore::Error),

    /// Target directory cannot be created.
    #[error("failed to create directory {path:?}")]
    CreateDir {
        #[source]
        source: io::Error,
        path: PathBuf,
    },

    /// File cannot be copied.
    #[error("failed to copy {path:?}")]
    CopyFile {
        #[source]
        source: io::Error,
        path: PathBuf,
    },

    /// Style template cannot be set for progress bars.
    #[error(transparent)]
    IndicatifStyleTemplate(#[from] indicatif::style::TemplateError),

    /// Report cannot be written.
    #[error(transparent)]
    Output(#[from] io::Error),
}

/// Friendly result alias :3
pub type Result<T, E = BackupError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::{
        cell::RefCell,
        fs::{create_dir_all, read_to_string, write},
    };
    use tempfile::TempDir;

    fn settings(target: &Path, folders: &[&str]) -> BackupSettings {
        BackupSettings {
            target: target.to_path_buf(),
            folders: folders.iter().map(PathBuf::from).collect(),
            open: vec![],
        }
    }

    #[test]
    fn backup_copies_nested_and_hidden_files() -> anyhow::Result<()> {
        let home = TempDir::new()?;
        let volume = TempDir::new()?;
        create_dir_all(home.path().join("Documents/notes"))?;
        write(home.path().join("Documents/todo.md"), "milk")?;
        write(home.path().join("Documents/notes/.secret"), "42")?;
        write(home.path().join("Documents/.gitignore"), "notes\n")?;
        create_dir_all(volume.path().join("Documents"))?;

        let mut output = Vec::new();
        backup(
            &settings(volume.path(), &["Documents"]),
            home.path(),
            &mut output,
            &ProgressBar::hidden(),
        )?;

        assert_eq!(read_to_string(volume.path().join("Documents/todo.md"))?, "milk");
        assert_eq!(read_to_string(volume.path().join("Documents/notes/.secret"))?, "42");
        assert_eq!(
            String::from_utf8(output)?,
            format!(
                "Backuping {} to {}:\n3 files copied\n",
                home.path().join("Documents").display(),
                volume.path().join("Documents").display()
            )
        );

        Ok(())
    }

    #[test]
    fn inaccessible_pairs_are_skipped() -> anyhow::Result<()> {
        let home = TempDir::new()?;
        let volume = TempDir::new()?;
        create_dir_all(home.path().join("Movies"))?;

        let mut output = Vec::new();
        backup(
            &settings(volume.path(), &["Desktop", "Movies"]),
            home.path(),
            &mut output,
            &ProgressBar::hidden(),
        )?;

        assert_eq!(
            String::from_utf8(output)?,
            format!(
                "Backup source {} not accessible\nBackup target {} not accessible\n",
                home.path().join("Desktop").display(),
                volume.path().join("Movies").display()
            )
        );

        Ok(())
    }

    #[test]
    fn restore_copies_back_into_home() -> anyhow::Result<()> {
        let home = TempDir::new()?;
        let volume = TempDir::new()?;
        create_dir_all(home.path().join("Desktop"))?;
        create_dir_all(volume.path().join("Desktop"))?;
        write(volume.path().join("Desktop/photo.jpg"), "jpg")?;
        write(home.path().join("Desktop/kept.txt"), "kept")?;

        let mut output = Vec::new();
        restore(
            &settings(volume.path(), &["Desktop"]),
            home.path(),
            &mut output,
            &ProgressBar::hidden(),
        )?;

        assert_eq!(read_to_string(home.path().join("Desktop/photo.jpg"))?, "jpg");
        assert_eq!(read_to_string(home.path().join("Desktop/kept.txt"))?, "kept");
        assert!(String::from_utf8(output)?.starts_with("Restoring "));

        Ok(())
    }

    struct Recorder(RefCell<Vec<PathBuf>>);

    impl Opener for Recorder {
        fn open(&self, path: &Path) -> io::Result<()> {
            self.0.borrow_mut().push(path.to_path_buf());
            if path.ends_with("broken") {
                return Err(io::Error::other("no file manager"));
            }

            Ok(())
        }
    }

    #[test]
    fn every_folder_is_opened_despite_failures() {
        let opener = Recorder(RefCell::new(Vec::new()));
        let folders = vec![PathBuf::from("/broken"), PathBuf::from("/Volumes/Backup")];

        open_folders(&folders, &opener);

        assert_eq!(opener.0.into_inner(), folders);
    }
}
