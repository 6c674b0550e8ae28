// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Service kept in memory.
//!
//! Stand-in for the remote service when it must not be reached, e.g., to
//! exercise the release discovery pipeline. Every lookup is recorded so
//! callers can inspect how much of the service was queried.

use crate::music::{
    catalog::{Catalog, CatalogError, Library, MusicService, Result},
    model::{
        AlbumId, ArtistId, CatalogAlbum, CatalogArtist, LibraryAlbum, LibraryArtist,
        LibraryArtistId,
    },
};

use std::{
    cell::RefCell,
    collections::{HashMap, HashSet},
};

/// Library kept in memory.
#[derive(Debug, Default)]
pub struct MemoryLibrary {
    storefront: String,
    artists: Vec<(LibraryArtist, Vec<LibraryAlbum>)>,
}

impl MemoryLibrary {
    /// Construct new empty library for target storefront.
    pub fn new(storefront: impl Into<String>) -> Self {
        Self {
            storefront: storefront.into(),
            artists: Vec::new(),
        }
    }

    /// Append artist along with its albums.
    pub fn with_artist(
        mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        albums: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let artist = LibraryArtist {
            id: LibraryArtistId::new(id),
            name: name.into(),
        };
        let albums = albums
            .into_iter()
            .map(|name| LibraryAlbum {
                name: name.into(),
                artwork: None,
            })
            .collect();
        self.artists.push((artist, albums));
        self
    }
}

impl Library for MemoryLibrary {
    fn storefront(&self) -> Result<String> {
        Ok(self.storefront.clone())
    }

    fn artists(&self) -> Result<Vec<LibraryArtist>> {
        Ok(self
            .artists
            .iter()
            .map(|(artist, _)| artist.clone())
            .collect())
    }

    fn albums(&self, artist: &LibraryArtistId) -> Result<Vec<LibraryAlbum>> {
        self.artists
            .iter()
            .find(|(candidate, _)| &candidate.id == artist)
            .map(|(_, albums)| albums.clone())
            .ok_or_else(|| CatalogError::NotFound(format!("/me/library/artists/{artist}/albums")))
    }
}

/// Catalog kept in memory.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    searches: HashMap<String, Vec<AlbumId>>,
    albums: HashMap<AlbumId, CatalogAlbum>,
    artists: HashMap<ArtistId, CatalogArtist>,
    discographies: HashMap<ArtistId, Vec<AlbumId>>,
    broken: HashSet<String>,
    broken_discographies: HashSet<ArtistId>,
    lookups: RefCell<Vec<String>>,
}

impl MemoryCatalog {
    /// Construct new empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer search term with album identifiers, in given order.
    pub fn with_search(
        mut self,
        term: impl Into<String>,
        ids: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.searches
            .insert(term.into(), ids.into_iter().map(AlbumId::new).collect());
        self
    }

    /// Register album.
    pub fn with_album(mut self, album: CatalogAlbum) -> Self {
        self.albums.insert(album.id.clone(), album);
        self
    }

    /// Register artist along with the identifiers of its albums.
    pub fn with_artist(
        mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        albums: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let id = ArtistId::new(id);
        self.discographies.insert(
            id.clone(),
            albums.into_iter().map(AlbumId::new).collect(),
        );
        self.artists.insert(
            id.clone(),
            CatalogArtist {
                id,
                name: name.into(),
            },
        );
        self
    }

    /// Make any lookup of target identifier fail with a server error.
    pub fn with_broken(mut self, id: impl Into<String>) -> Self {
        self.broken.insert(id.into());
        self
    }

    /// Make the album list of target artist fail with a server error.
    pub fn with_broken_discography(mut self, id: impl Into<String>) -> Self {
        self.broken_discographies.insert(ArtistId::new(id));
        self
    }

    /// Every identifier looked up so far, in lookup order.
    pub fn lookups(&self) -> Vec<String> {
        self.lookups.borrow().clone()
    }

    fn record(&self, path: &str, id: &str) -> Result<()> {
        self.lookups.borrow_mut().push(id.to_string());
        if self.broken.contains(id) {
            return Err(CatalogError::Status {
                url: format!("{path}/{id}"),
                status: 500,
            });
        }

        Ok(())
    }
}

impl Catalog for MemoryCatalog {
    fn search(&self, term: &str) -> Result<Vec<AlbumId>> {
        Ok(self.searches.get(term).cloned().unwrap_or_default())
    }

    fn album(&self, id: &AlbumId) -> Result<CatalogAlbum> {
        self.record("/albums", id.as_str())?;
        self.albums
            .get(id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(format!("/albums/{id}")))
    }

    fn artist(&self, id: &ArtistId) -> Result<CatalogArtist> {
        self.record("/artists", id.as_str())?;
        self.artists
            .get(id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(format!("/artists/{id}")))
    }

    fn artist_albums(&self, id: &ArtistId) -> Result<Vec<AlbumId>> {
        if self.broken_discographies.contains(id) {
            return Err(CatalogError::Status {
                url: format!("/artists/{id}/albums"),
                status: 500,
            });
        }

        self.discographies
            .get(id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(format!("/artists/{id}/albums")))
    }
}

/// Service kept in memory.
#[derive(Debug)]
pub struct MemoryService {
    pub library: MemoryLibrary,
    pub catalog: MemoryCatalog,
    opened: RefCell<Vec<String>>,
}

impl MemoryService {
    /// Construct new service out of a library and a catalog.
    pub fn new(library: MemoryLibrary, catalog: MemoryCatalog) -> Self {
        Self {
            library,
            catalog,
            opened: RefCell::new(Vec::new()),
        }
    }

    /// User tokens and storefronts opened so far, in order.
    pub fn opened(&self) -> Vec<String> {
        self.opened.borrow().clone()
    }
}

impl<'a> MusicService for &'a MemoryService {
    type Library = &'a MemoryLibrary;
    type Catalog = &'a MemoryCatalog;

    fn library(&self, user_token: &str) -> Result<Self::Library> {
        self.opened.borrow_mut().push(user_token.to_string());
        Ok(&self.library)
    }

    fn catalog(&self, storefront: &str) -> Result<Self::Catalog> {
        self.opened.borrow_mut().push(storefront.to_string());
        Ok(&self.catalog)
    }
}
