// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Release window.
//!
//! Select the albums of a catalog artist released strictly between the last
//! check and now. The catalog indexes pre-announced albums ahead of their
//! availability, those are left for a later check. Albums without a known
//! release date cannot be proven new, so they are never selected.

use crate::music::{
    catalog::{Catalog, Lookup, Result},
    model::{CatalogAlbum, CatalogArtist},
};

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

/// Check if album was released inside the window `(last_check, now)`.
pub fn is_new_release(album: &CatalogAlbum, last_check: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    album
        .release_date
        .is_some_and(|released| last_check < released && released < now)
}

/// Lazily select new releases of a catalog artist.
///
/// Each album is looked up when the iterator reaches it, albums answering
/// "not found" are dropped.
///
/// # Errors
///
/// - Return [`CatalogError`](crate::music::CatalogError) if the album listing
///   fails, or yield it if an album lookup fails for another reason than a
///   lookup miss.
#[instrument(skip_all, fields(artist = %artist.id), level = "debug")]
pub fn select_new_releases<'a, C>(
    artist: &CatalogArtist,
    catalog: &'a C,
    last_check: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<impl Iterator<Item = Result<CatalogAlbum>> + 'a>
where
    C: Catalog,
{
    let ids = catalog.artist_albums(&artist.id).found()?.unwrap_or_default();
    debug!("{} albums in discography", ids.len());

    Ok(ids
        .into_iter()
        .map(move |id| catalog.album(&id).found())
        .filter_map(Result::transpose)
        .filter(move |album| {
            album
                .as_ref()
                .map_or(true, |album| is_new_release(album, last_check, now))
        }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::music::{
        memory::MemoryCatalog,
        model::{AlbumId, ArtistId},
        CatalogError,
    };
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn album(id: &str, release_date: Option<DateTime<Utc>>) -> CatalogAlbum {
        CatalogAlbum {
            id: AlbumId::new(id),
            name: id.into(),
            release_date,
            artists: vec![ArtistId::new("air")],
            url: format!("https://music.apple.com/album/{id}"),
            artwork: None,
        }
    }

    fn air() -> CatalogArtist {
        CatalogArtist {
            id: ArtistId::new("air"),
            name: "Air".into(),
        }
    }

    #[test]
    fn only_albums_inside_window_are_selected() -> anyhow::Result<()> {
        let last_check = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2020, 6, 1, 0, 0, 0).unwrap();
        let catalog = MemoryCatalog::new()
            .with_artist("air", "Air", ["past", "new", "future", "undated", "gone"])
            .with_album(album("past", Some(last_check - Duration::days(30))))
            .with_album(album("new", Some(last_check + Duration::days(30))))
            .with_album(album("future", Some(now + Duration::days(30))))
            .with_album(album("undated", None));

        let result = select_new_releases(&air(), &catalog, last_check, now)?
            .map(|album| album.map(|album| album.id))
            .collect::<Result<Vec<_>>>()?;

        assert_eq!(result, vec![AlbumId::new("new")]);

        Ok(())
    }

    #[test]
    fn window_bounds_are_exclusive() {
        let last_check = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2020, 6, 1, 0, 0, 0).unwrap();

        assert!(!is_new_release(&album("a", Some(last_check)), last_check, now));
        assert!(!is_new_release(&album("a", Some(now)), last_check, now));
        assert!(is_new_release(
            &album("a", Some(last_check + Duration::seconds(1))),
            last_check,
            now
        ));
    }

    #[test]
    fn albums_are_looked_up_lazily() -> anyhow::Result<()> {
        let last_check = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2020, 6, 1, 0, 0, 0).unwrap();
        let catalog = MemoryCatalog::new()
            .with_artist("air", "Air", ["first", "second"])
            .with_album(album("first", Some(last_check + Duration::days(1))))
            .with_album(album("second", Some(last_check + Duration::days(2))));

        let mut releases = select_new_releases(&air(), &catalog, last_check, now)?;
        assert!(catalog.lookups().is_empty());

        let _ = releases.next();
        assert_eq!(catalog.lookups(), vec!["first"]);

        Ok(())
    }

    #[test]
    fn unknown_discography_yields_nothing() -> anyhow::Result<()> {
        let now = Utc.with_ymd_and_hms(2020, 6, 1, 0, 0, 0).unwrap();
        let catalog = MemoryCatalog::new();

        let result = select_new_releases(&air(), &catalog, now - Duration::days(365), now)?.count();

        assert_eq!(result, 0);

        Ok(())
    }

    #[test]
    fn server_errors_are_yielded() -> anyhow::Result<()> {
        let now = Utc.with_ymd_and_hms(2020, 6, 1, 0, 0, 0).unwrap();
        let catalog = MemoryCatalog::new()
            .with_artist("air", "Air", ["broken"])
            .with_broken("broken");

        let result = select_new_releases(&air(), &catalog, now - Duration::days(365), now)?
            .collect::<Result<Vec<_>>>();

        assert!(matches!(result, Err(CatalogError::Status { status: 500, .. })));

        Ok(())
    }
}
