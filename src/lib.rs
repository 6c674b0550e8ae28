// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Personal productivity toolbox.
//!
//! Kalmiya bundles the small chores of a single machine behind one command
//! line:
//!
//! - Discover albums released by the artists of an Apple Music library since
//!   the last check, see [`music`].
//! - Copy home folders to and from a backup volume, see [`backup`].
//! - Scaffold new code projects as Git repositories, see [`project`].
//!
//! Persistent state lives in a [`store::ConfigStore`] below `$HOME/.kalmiya`,
//! and tunables in the settings file described by [`config`].

pub mod backup;
pub mod clock;
pub mod config;
pub mod music;
pub mod path;
pub mod project;
pub mod store;
