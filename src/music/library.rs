// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Library listing.

use crate::{
    music::{
        catalog::{Library, MusicService},
        format::{Console, Format},
        model::AlbumRef,
        user_token, Result,
    },
    store::ConfigStore,
};

use std::io::Write;
use tracing::{debug, instrument};

/// Render every album of the user's library, artist by artist.
///
/// # Errors
///
/// - Return [`MusicError::NotConfigured`](crate::music::MusicError) if there
///   is no user token, before reaching the service.
/// - Return [`MusicError::Catalog`](crate::music::MusicError) if the library
///   cannot be read.
/// - Return [`MusicError::Output`](crate::music::MusicError) if console cannot
///   be written to.
#[instrument(skip_all, level = "debug")]
pub fn list<M, F, W>(
    store: &impl ConfigStore,
    service: M,
    format: &F,
    console: Console<W>,
) -> Result<Console<W>>
where
    M: MusicService,
    F: Format,
    W: Write,
{
    let token = user_token(store)?;
    let library = service.library(&token)?;
    let artists = library.artists()?;
    debug!("{} artists in library", artists.len());

    artists.iter().try_fold(console, |console, artist| -> Result<Console<W>> {
        library
            .albums(&artist.id)?
            .iter()
            .try_fold(console, |console, album| -> Result<Console<W>> {
                Ok(format.render(console, AlbumRef::Library(album), artist)?)
            })
    })
}
