// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Apple Music integration.
//!
//! Kalmiya talks to two distinct sides of the same music service: the
//! __library__, which is the personal collection of albums saved by the user,
//! and the __catalog__, which is the full searchable inventory of the service
//! for the user's storefront.
//!
//! # Release Discovery
//!
//! The main feature of this module is to find albums released by the artists
//! of the library since the last time the user checked. Library artists and
//! catalog artists do not share identifiers, so each library artist must
//! first be __disambiguated__, i.e., mapped to the catalog artist that really
//! is the same act despite any name collision. See [`matcher`] for how this
//! is done, [`filter`] for the release window, and [`releases`] for the whole
//! pipeline.
//!
//! # Unreliable Catalog
//!
//! The catalog is not internally consistent. Identifiers returned by a search
//! regularly answer "not found" when looked up directly. Such misses are
//! expected, and are surfaced as [`CatalogError::NotFound`] so that each
//! lookup site can drop the identifier instead of aborting the whole run. Any
//! other failure is a real error.
//!
//! # See Also
//!
//! 1. [Apple Music API](https://developer.apple.com/documentation/applemusicapi)
//! 2. [`apple`] for the HTTP implementation of the collaborators.

pub mod apple;
pub mod authenticate;
pub mod catalog;
pub mod filter;
pub mod format;
pub mod library;
pub mod matcher;
#[doc(hidden)]
pub mod memory;
pub mod model;
pub mod releases;

pub use catalog::{Catalog, CatalogError, Library, Lookup, MusicService};
pub use format::{ArtworkSource, Console, Format, Markdown, Pretty, Text};
pub use model::{
    AlbumId, AlbumRef, ArtistId, Artwork, CatalogAlbum, CatalogArtist, LibraryAlbum,
    LibraryArtist, LibraryArtistId,
};

use crate::store::{ConfigStore, StoreError};

/// Config store entry holding the user token.
pub const USER_TOKEN: &str = "user-token";

/// Config store entry holding the last release check timestamp.
pub const RELEASES_CHECK: &str = "releases-check";

/// Config store entry holding the developer key identifier.
pub const KEY_ID: &str = "id";

/// Config store entry holding the developer team identifier.
pub const TEAM_ID: &str = "team-id";

/// Config store entry holding the developer private key.
pub const CERTIFICATE: &str = "certificate";

/// Read user token out of config store.
///
/// # Errors
///
/// - Return [`MusicError::NotConfigured`] if no user token is stored.
/// - Return [`MusicError::Store`] if config store cannot be read.
pub fn user_token(store: &impl ConfigStore) -> Result<String> {
    store
        .get(USER_TOKEN)?
        .filter(|token| !token.trim().is_empty())
        .ok_or(MusicError::NotConfigured)
}

/// All possible error types of music commands.
#[derive(Debug, thiserror::Error)]
pub enum MusicError {
    /// User token is missing.
    #[error("no Apple Music config provided, run `kalmiya music authenticate` first")]
    NotConfigured,

    /// Last release check timestamp cannot be understood.
    #[error("malformed last release check {value:?}")]
    Checkpoint {
        #[source]
        source: chrono::ParseError,
        value: String,
    },

    /// Config store access fails.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Library or catalog access fails.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Developer token cannot be signed.
    #[error("failed to sign developer token")]
    DeveloperToken(#[from] jsonwebtoken::errors::Error),

    /// Rendered output cannot be written.
    #[error(transparent)]
    Output(#[from] std::io::Error),
}

/// Friendly result alias :3
pub type Result<T, E = MusicError> = std::result::Result<T, E>;
