// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine where Kalmiya keeps its own state on the user's machine.

use std::path::PathBuf;

/// Name of the settings file inside the config directory.
pub const SETTINGS_FILE: &str = "kalmiya.toml";

/// Name of the config store namespace holding Apple Music entries.
pub const APPLE_MUSIC_NAMESPACE: &str = "apple-music";

/// Determine absolute path to user's home directory.
///
/// Does not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or(NoWayHome)
}

/// Determine default absolute path to Kalmiya's config directory.
///
/// Uses `$HOME/.kalmiya` so the directory itself can be part of the default
/// backup folder listing. Does not check if the path returned actually
/// exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn default_config_dir() -> Result<PathBuf> {
    home_dir().map(|path| path.join(".kalmiya"))
}

/// Determine default absolute path to the settings file.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn default_settings_path() -> Result<PathBuf> {
    default_config_dir().map(|path| path.join(SETTINGS_FILE))
}

/// Determine default absolute path to the Apple Music config store.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn default_apple_music_dir() -> Result<PathBuf> {
    default_config_dir().map(|path| path.join(APPLE_MUSIC_NAMESPACE))
}

/// No way to determine user's home directory.
///
/// # See Also
///
/// - [`dirs::home_dir`](https://docs.rs/dirs/latest/dirs/fn.home_dir.html)
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine absolute path to user's home directory")]
pub struct NoWayHome;

/// Friendly result alias :3
pub type Result<T, E = NoWayHome> = std::result::Result<T, E>;
