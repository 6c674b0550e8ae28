// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Artist disambiguation.
//!
//! Map an artist of the library to the artist of the catalog that really is
//! the same act. Searching the catalog by artist name alone is useless for
//! common names, the search engine returns a flood of unrelated acts. Instead
//! the search is narrowed with the name of an album the user owns, and the
//! results go through two exact filters:
//!
//! 1. Keep only albums whose name is exactly the owned album name. This
//!    discards every act that merely shares the artist name.
//! 2. Keep only artists of those albums whose name is exactly the library
//!    artist name. This discards every act that merely released an album
//!    with the same title.
//!
//! The first artist surviving both filters wins.

use crate::music::{
    catalog::{Catalog, CatalogError, Library, Lookup, Result},
    model::{ArtistId, CatalogArtist, LibraryArtist},
};

use std::collections::HashSet;
use tracing::{debug, instrument};

/// Maximum number of search results to look at.
pub const SEARCH_LIMIT: usize = 25;

/// Build search term out of artist name and owned album name.
///
/// Self-titled albums, e.g., "America" by America, only use the artist
/// name. The search engine finds nothing relevant when the same word appears
/// twice in the term.
pub fn search_term(artist: &str, album: &str) -> String {
    if artist.to_lowercase() == album.to_lowercase() {
        return artist.to_string();
    }

    format!("{artist} {album}")
}

/// Resolve library artist to its catalog counterpart.
///
/// Returns [`None`] when the artist has no album in the library, or when no
/// catalog artist survives disambiguation. Catalog identifiers answering "not
/// found" are dropped along the way.
///
/// # Errors
///
/// - Return [`CatalogError`] for any failure other than a lookup miss.
#[instrument(skip_all, fields(artist = %artist.name), level = "debug")]
pub fn resolve(
    artist: &LibraryArtist,
    library: &impl Library,
    catalog: &impl Catalog,
) -> Result<Option<CatalogArtist>> {
    let albums = library.albums(&artist.id)?;
    let Some(reference) = albums.first() else {
        debug!("no album in library");
        return Ok(None);
    };

    let term = search_term(&artist.name, &reference.name);
    debug!("search catalog for {term:?}");
    let results = catalog.search(&term)?;

    // INVARIANT: Keep first seen order of artist ids for a deterministic pick.
    let mut seen = HashSet::new();
    let candidates = results
        .iter()
        .take(SEARCH_LIMIT)
        .map(|id| catalog.album(id).found())
        .filter_map(Result::transpose)
        .try_fold(Vec::<ArtistId>::new(), |mut ids, album| {
            let album = album?;
            if album.name == reference.name {
                ids.extend(album.artists.into_iter().filter(|id| seen.insert(id.clone())));
            }

            Ok::<_, CatalogError>(ids)
        })?;

    if candidates.is_empty() {
        debug!("no catalog album named {:?}", reference.name);
        return Ok(None);
    }

    let matched = candidates
        .iter()
        .map(|id| catalog.artist(id).found())
        .filter_map(Result::transpose)
        .find(|candidate| {
            candidate
                .as_ref()
                .map_or(true, |candidate| candidate.name == artist.name)
        })
        .transpose()?;

    match &matched {
        Some(found) => debug!("matched catalog artist {}", found.id),
        None => debug!("no catalog artist named {:?}", artist.name),
    }

    Ok(matched)
}
