// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Library and catalog entities.
//!
//! Every entity is transient. They are fetched fresh from the service on each
//! run and never cached.

use chrono::{DateTime, NaiveDate, Utc};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Identifier of an artist in the user's library.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LibraryArtistId(String);

impl LibraryArtistId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for LibraryArtistId {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(&self.0)
    }
}

/// Identifier of an album in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AlbumId(String);

impl AlbumId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for AlbumId {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(&self.0)
    }
}

/// Identifier of an artist in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtistId(String);

impl ArtistId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for ArtistId {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(&self.0)
    }
}

/// Artist saved in the user's library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryArtist {
    pub id: LibraryArtistId,
    pub name: String,
}

/// Album saved in the user's library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryAlbum {
    pub name: String,
    pub artwork: Option<Artwork>,
}

/// Album of the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogAlbum {
    pub id: AlbumId,
    pub name: String,

    /// Release date, absent when the catalog does not know it.
    pub release_date: Option<DateTime<Utc>>,

    /// Artists credited on the album, in catalog order, without duplicates.
    pub artists: Vec<ArtistId>,

    pub url: String,
    pub artwork: Option<Artwork>,
}

impl CatalogAlbum {
    /// Album URL opening in the Music app instead of the browser.
    pub fn store_url(&self) -> String {
        match self.url.split_once("://") {
            Some((_, rest)) => format!("itmss://{rest}"),
            None => self.url.clone(),
        }
    }
}

/// Artist of the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogArtist {
    pub id: ArtistId,
    pub name: String,
}

/// Cover art of an album.
///
/// The service hands out a URL template containing `{w}` and `{h}`
/// placeholders, to be filled with the wanted dimensions in pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artwork {
    url: String,
}

impl Artwork {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Resolve URL template for target size.
    pub fn of_size(&self, width: u32, height: u32) -> String {
        self.url
            .replace("{w}", width.to_string().as_str())
            .replace("{h}", height.to_string().as_str())
    }
}

/// Album of either side of the service.
#[derive(Debug, Clone, Copy)]
pub enum AlbumRef<'a> {
    Library(&'a LibraryAlbum),
    Catalog(&'a CatalogAlbum),
}

impl AlbumRef<'_> {
    pub fn name(&self) -> &str {
        match self {
            Self::Library(album) => album.name.as_str(),
            Self::Catalog(album) => album.name.as_str(),
        }
    }

    pub fn artwork(&self) -> Option<&Artwork> {
        match self {
            Self::Library(album) => album.artwork.as_ref(),
            Self::Catalog(album) => album.artwork.as_ref(),
        }
    }

    /// Store URL, only catalog albums have one.
    pub fn store_url(&self) -> Option<String> {
        match self {
            Self::Library(_) => None,
            Self::Catalog(album) => Some(album.store_url()),
        }
    }
}

/// Parse release date as given by the catalog.
///
/// The catalog gives `YYYY-MM-DD` when the exact day is known, but sometimes
/// only `YYYY-MM` or `YYYY`. The date is taken as midnight UTC on the first
/// day of the given period. Anything else means the date is unknown.
pub fn parse_release_date(input: &str) -> Option<DateTime<Utc>> {
    let mut parts = input.trim().splitn(3, '-');
    let year = parts.next()?.parse::<i32>().ok()?;
    let month = match parts.next() {
        Some(month) => month.parse::<u32>().ok()?,
        None => 1,
    };
    let day = match parts.next() {
        Some(day) => day.parse::<u32>().ok()?,
        None => 1,
    };

    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|time| time.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use simple_test_case::test_case;

    #[test_case("2020-05-01", Some((2020, 5, 1)); "full date")]
    #[test_case("2020-05", Some((2020, 5, 1)); "month only")]
    #[test_case("1969", Some((1969, 1, 1)); "year only")]
    #[test_case("2020-13-01", None; "invalid month")]
    #[test_case("", None; "empty")]
    #[test_case("soon", None; "not a date")]
    #[test]
    fn release_date_parsing(input: &str, expect: Option<(i32, u32, u32)>) {
        let expect = expect.map(|(y, m, d)| Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap());
        pretty_assertions::assert_eq!(parse_release_date(input), expect);
    }

    #[test]
    fn artwork_fills_size_placeholders() {
        let artwork = Artwork::new("https://is1.mzstatic.com/image/{w}x{h}bb.jpg");

        assert_eq!(
            artwork.of_size(300, 300),
            "https://is1.mzstatic.com/image/300x300bb.jpg"
        );
    }

    #[test]
    fn catalog_album_store_url_uses_itmss_scheme() {
        let album = CatalogAlbum {
            id: AlbumId::new("1"),
            name: "Hearts".into(),
            release_date: None,
            artists: vec![],
            url: "https://music.apple.com/fr/album/hearts/1".into(),
            artwork: None,
        };

        assert_eq!(album.store_url(), "itmss://music.apple.com/fr/album/hearts/1");
        assert_eq!(
            AlbumRef::Catalog(&album).store_url(),
            Some("itmss://music.apple.com/fr/album/hearts/1".to_string())
        );
        assert_eq!(
            AlbumRef::Library(&LibraryAlbum {
                name: "Hearts".into(),
                artwork: None
            })
            .store_url(),
            None
        );
    }
}
