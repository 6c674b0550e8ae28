// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Library and catalog access.
//!
//! Layers of indirection between the release discovery logic and the remote
//! service, so the logic can run against any implementation of the service.

use crate::music::model::{
    AlbumId, ArtistId, CatalogAlbum, CatalogArtist, LibraryAlbum, LibraryArtist,
    LibraryArtistId,
};

/// Read access to the user's library.
pub trait Library {
    /// Identifier of the catalog storefront the user belongs to.
    fn storefront(&self) -> Result<String>;

    /// All artists of the library, in library order.
    fn artists(&self) -> Result<Vec<LibraryArtist>>;

    /// All albums of a library artist, in library order.
    fn albums(&self, artist: &LibraryArtistId) -> Result<Vec<LibraryAlbum>>;
}

/// Read access to the catalog of a storefront.
///
/// Per identifier lookups answer [`CatalogError::NotFound`] when the catalog
/// does not know the identifier, even if the catalog itself handed it out.
pub trait Catalog {
    /// Album identifiers matching search term, by decreasing relevance.
    fn search(&self, term: &str) -> Result<Vec<AlbumId>>;

    /// Lookup album.
    fn album(&self, id: &AlbumId) -> Result<CatalogAlbum>;

    /// Lookup artist.
    fn artist(&self, id: &ArtistId) -> Result<CatalogArtist>;

    /// Identifiers of every album of an artist.
    fn artist_albums(&self, id: &ArtistId) -> Result<Vec<AlbumId>>;
}

/// Entry point to both sides of the service.
pub trait MusicService {
    type Library: Library;
    type Catalog: Catalog;

    /// Open library of the user owning target user token.
    fn library(&self, user_token: &str) -> Result<Self::Library>;

    /// Open catalog of target storefront.
    fn catalog(&self, storefront: &str) -> Result<Self::Catalog>;
}

impl<L> Library for &L
where
    L: Library + ?Sized,
{
    fn storefront(&self) -> Result<String> {
        (**self).storefront()
    }

    fn artists(&self) -> Result<Vec<LibraryArtist>> {
        (**self).artists()
    }

    fn albums(&self, artist: &LibraryArtistId) -> Result<Vec<LibraryAlbum>> {
        (**self).albums(artist)
    }
}

impl<C> Catalog for &C
where
    C: Catalog + ?Sized,
{
    fn search(&self, term: &str) -> Result<Vec<AlbumId>> {
        (**self).search(term)
    }

    fn album(&self, id: &AlbumId) -> Result<CatalogAlbum> {
        (**self).album(id)
    }

    fn artist(&self, id: &ArtistId) -> Result<CatalogArtist> {
        (**self).artist(id)
    }

    fn artist_albums(&self, id: &ArtistId) -> Result<Vec<AlbumId>> {
        (**self).artist_albums(id)
    }
}

/// Treat a lookup miss as absence of data.
pub trait Lookup<T> {
    /// Turn [`CatalogError::NotFound`] into `Ok(None)`, keep any other error.
    fn found(self) -> Result<Option<T>>;
}

impl<T> Lookup<T> for Result<T> {
    fn found(self) -> Result<Option<T>> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(CatalogError::NotFound(_)) => Ok(None),
            Err(error) => Err(error),
        }
    }
}

/// All possible error types for library and catalog access.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Resource does not exist, expected and recoverable.
    #[error("nothing found at {0}")]
    NotFound(String),

    /// Service answered with an unexpected status.
    #[error("request to {url} failed with status {status}")]
    Status { url: String, status: u16 },

    /// Service answered with something that cannot be understood.
    #[error("malformed response from {url}: {reason}")]
    Malformed { url: String, reason: String },

    /// Request could not be performed at all.
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Friendly result alias :3
pub type Result<T, E = CatalogError> = std::result::Result<T, E>;
