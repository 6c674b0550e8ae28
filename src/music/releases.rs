// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! New release discovery.
//!
//! Walk every artist of the library, resolve it in the catalog, and render
//! each album released since the last check. The time of the check is then
//! stored as the new __checkpoint__, so the next check only covers what came
//! out in between.
//!
//! # Checkpoint
//!
//! The checkpoint is stored in the config store under "releases-check". When
//! there is none yet, the last year is covered. The checkpoint only moves
//! once every artist was processed: a run aborted by an error leaves it
//! untouched, so the next run covers the same window again. Showing a release
//! twice is fine, missing one is not.

use crate::{
    clock::{self, Clock},
    music::{
        catalog::{Catalog, Library, MusicService},
        filter::select_new_releases,
        format::{Console, Format},
        matcher,
        model::{AlbumRef, LibraryArtist},
        user_token, MusicError, Result, RELEASES_CHECK,
    },
    store::ConfigStore,
};

use chrono::{DateTime, Months, Utc};
use std::io::Write;
use tracing::{debug, info, instrument};

/// Read last release check, defaulting to one year before now.
///
/// # Errors
///
/// - Return [`MusicError::Store`] if config store cannot be read.
/// - Return [`MusicError::Checkpoint`] if stored timestamp is malformed.
pub fn last_check(store: &impl ConfigStore, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    match store.get(RELEASES_CHECK)? {
        Some(value) => {
            clock::parse(&value).map_err(|source| MusicError::Checkpoint { source, value })
        }
        None => Ok(now.checked_sub_months(Months::new(12)).unwrap_or(now)),
    }
}

/// Release check over the whole library.
#[derive(Debug)]
pub struct Releases<'a, S, M, K> {
    store: &'a S,
    service: M,
    clock: &'a K,
}

impl<'a, S, M, K> Releases<'a, S, M, K>
where
    S: ConfigStore,
    M: MusicService,
    K: Clock,
{
    /// Construct new release check.
    pub fn new(store: &'a S, service: M, clock: &'a K) -> Self {
        Self {
            store,
            service,
            clock,
        }
    }

    /// Render every new release, then move checkpoint to the time the run
    /// started.
    ///
    /// Artists that cannot be resolved in the catalog are skipped silently.
    ///
    /// # Errors
    ///
    /// - Return [`MusicError::NotConfigured`] if there is no user token, before
    ///   reaching the service.
    /// - Return [`MusicError::Catalog`] if the service fails for any other
    ///   reason than a lookup miss. Checkpoint is left untouched.
    /// - Return [`MusicError::Output`] if console cannot be written to.
    #[instrument(skip_all, level = "debug")]
    pub fn run<F, W>(&self, format: &F, console: Console<W>) -> Result<Console<W>>
    where
        F: Format,
        W: Write,
    {
        let token = user_token(self.store)?;
        let now = self.clock.now();
        let last_check = last_check(self.store, now)?;
        info!("look for releases since {}", clock::format(last_check));

        let library = self.service.library(&token)?;
        let catalog = self.service.catalog(&library.storefront()?)?;
        let artists = library.artists()?;
        debug!("{} artists in library", artists.len());

        let console = artists.iter().try_fold(console, |console, artist| {
            check_artist(artist, &library, &catalog, last_check, now, format, console)
        })?;

        self.store.add(RELEASES_CHECK, &clock::format(now))?;
        debug!("checkpoint moved to {}", clock::format(now));

        Ok(console)
    }
}

fn check_artist<F, W>(
    artist: &LibraryArtist,
    library: &impl Library,
    catalog: &impl Catalog,
    last_check: DateTime<Utc>,
    now: DateTime<Utc>,
    format: &F,
    console: Console<W>,
) -> Result<Console<W>>
where
    F: Format,
    W: Write,
{
    let Some(found) = matcher::resolve(artist, library, catalog)? else {
        debug!("skip {:?}, not found in catalog", artist.name);
        return Ok(console);
    };

    let mut releases = select_new_releases(&found, catalog, last_check, now)?;
    releases.try_fold(console, |console, album| -> Result<Console<W>> {
        let album = album?;
        info!("new release {:?} by {:?}", album.name, artist.name);
        Ok(format.render(console, AlbumRef::Catalog(&album), artist)?)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clock::FrozenClock,
        music::{
            catalog::CatalogError,
            format::Text,
            memory::{MemoryCatalog, MemoryLibrary, MemoryService},
            model::{AlbumId, ArtistId, CatalogAlbum},
        },
        store::MemoryStore,
    };
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn album(id: &str, name: &str, released: DateTime<Utc>, artists: &[&str]) -> CatalogAlbum {
        CatalogAlbum {
            id: AlbumId::new(id),
            name: name.into(),
            release_date: Some(released),
            artists: artists.iter().copied().map(ArtistId::new).collect(),
            url: format!("https://music.apple.com/album/{id}"),
            artwork: None,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 6, 1, 0, 0, 0).unwrap()
    }

    fn service() -> MemoryService {
        let library = MemoryLibrary::new("fr")
            .with_artist("l.1", "Air", ["Moon Safari"])
            .with_artist("l.2", "Nobody", ["Unknown"]);
        let catalog = MemoryCatalog::new()
            .with_search("Air Moon Safari", ["a.moon"])
            .with_album(album("a.moon", "Moon Safari", now() - Duration::days(8000), &["air"]))
            .with_album(album("a.new", "Le Voyage", now() - Duration::days(10), &["air"]))
            .with_artist("air", "Air", ["a.moon", "a.new"]);

        MemoryService::new(library, catalog)
    }

    fn render(console: Console<Vec<u8>>) -> String {
        String::from_utf8(console.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn missing_checkpoint_covers_last_year() -> anyhow::Result<()> {
        let store = MemoryStore::new();

        assert_eq!(
            last_check(&store, now())?,
            Utc.with_ymd_and_hms(2019, 6, 1, 0, 0, 0).unwrap()
        );

        Ok(())
    }

    #[test]
    fn malformed_checkpoint_is_an_error() {
        let store = MemoryStore::with_entries([(RELEASES_CHECK, "last tuesday")]);

        assert!(matches!(
            last_check(&store, now()),
            Err(MusicError::Checkpoint { .. })
        ));
    }

    #[test]
    fn renders_new_releases_and_moves_checkpoint() -> anyhow::Result<()> {
        let store = MemoryStore::with_entries([("user-token", "secret")]);
        let service = service();
        let clock = FrozenClock::at(now());

        let console = Releases::new(&store, &service, &clock)
            .run(&Text, Console::new(Vec::new(), false, None))?;

        assert_eq!(
            render(console),
            "Air ||| Le Voyage ||| itmss://music.apple.com/album/a.new\n"
        );
        assert_eq!(
            store.get(RELEASES_CHECK)?,
            Some("2020-06-01T00:00:00+00:00".to_string())
        );
        assert_eq!(service.opened(), vec!["secret", "fr"]);

        Ok(())
    }

    #[test]
    fn missing_user_token_fails_before_reaching_service() {
        let store = MemoryStore::new();
        let service = service();
        let clock = FrozenClock::at(now());

        let result = Releases::new(&store, &service, &clock)
            .run(&Text, Console::new(Vec::new(), false, None));

        assert!(matches!(result, Err(MusicError::NotConfigured)));
        assert!(service.opened().is_empty());
        assert!(!store.contains(RELEASES_CHECK));
    }

    #[test]
    fn service_failure_leaves_checkpoint_untouched() {
        let store = MemoryStore::with_entries([
            ("user-token", "secret"),
            (RELEASES_CHECK, "2020-01-01T00:00:00+00:00"),
        ]);
        let library = MemoryLibrary::new("fr").with_artist("l.1", "Air", ["Moon Safari"]);
        let catalog = MemoryCatalog::new()
            .with_search("Air Moon Safari", ["a.moon"])
            .with_broken("a.moon");
        let service = MemoryService::new(library, catalog);
        let clock = FrozenClock::at(now());

        let result = Releases::new(&store, &service, &clock)
            .run(&Text, Console::new(Vec::new(), false, None));

        assert!(matches!(result, Err(MusicError::Catalog(_))));
        assert_eq!(
            store.get(RELEASES_CHECK).unwrap(),
            Some("2020-01-01T00:00:00+00:00".to_string())
        );
    }

    #[test]
    fn discography_failure_leaves_checkpoint_untouched() {
        let store = MemoryStore::with_entries([
            ("user-token", "secret"),
            (RELEASES_CHECK, "2020-01-01T00:00:00+00:00"),
        ]);
        let library = MemoryLibrary::new("fr").with_artist("l.1", "Air", ["Moon Safari"]);
        let catalog = MemoryCatalog::new()
            .with_search("Air Moon Safari", ["a.moon"])
            .with_album(album("a.moon", "Moon Safari", now() - Duration::days(8000), &["air"]))
            .with_artist("air", "Air", ["a.moon"])
            .with_broken_discography("air");
        let service = MemoryService::new(library, catalog);
        let clock = FrozenClock::at(now());

        let result = Releases::new(&store, &service, &clock)
            .run(&Text, Console::new(Vec::new(), false, None));

        assert!(matches!(
            result,
            Err(MusicError::Catalog(CatalogError::Status { status: 500, .. }))
        ));
        assert_eq!(
            store.get(RELEASES_CHECK).unwrap(),
            Some("2020-01-01T00:00:00+00:00".to_string())
        );
    }
}
