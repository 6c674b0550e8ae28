// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Apple Music REST API client.
//!
//! Every request carries a __developer token__, a short lived ES256 signed
//! JWT identifying the application. Library requests also carry the __user
//! token__ obtained through the browser flow of [`authenticate`].
//!
//! # Lookup Misses
//!
//! The API regularly answers "not found" for identifiers it handed out
//! itself, sometimes only for a little while. Requests answered with 404, or
//! with 429 when throttled, are retried after a delay. A 404 that persists
//! becomes [`CatalogError::NotFound`], any other unsuccessful status becomes
//! [`CatalogError::Status`].
//!
//! [`authenticate`]: crate::music::authenticate

use crate::{
    config::MusicSettings,
    music::{
        catalog::{self, Catalog, CatalogError, Library, MusicService},
        format::ArtworkSource,
        model::{
            parse_release_date, AlbumId, ArtistId, Artwork, CatalogAlbum, CatalogArtist,
            LibraryAlbum, LibraryArtist, LibraryArtistId,
        },
        MusicError, CERTIFICATE, KEY_ID, TEAM_ID,
    },
    store::ConfigStore,
};

use chrono::{DateTime, Duration as TimeDelta, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::{
    blocking::{Client, RequestBuilder},
    StatusCode,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{thread::sleep, time::Duration};
use tracing::{debug, instrument, warn};

/// Root of every API endpoint.
pub const API_ROOT: &str = "https://api.music.apple.com";

/// Lifetime of signed developer tokens, in hours.
pub const DEVELOPER_TOKEN_TTL_HOURS: i64 = 24;

/// Number of search results asked for.
const SEARCH_PAGE_SIZE: usize = 25;

/// Developer credentials, as issued by the Apple developer portal.
#[derive(Debug, Clone)]
pub struct DeveloperKey {
    id: String,
    team_id: String,
    certificate: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    iss: String,
    iat: i64,
    exp: i64,
}

impl DeveloperKey {
    /// Construct new developer key.
    pub fn new(
        id: impl Into<String>,
        team_id: impl Into<String>,
        certificate: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            team_id: team_id.into(),
            certificate: certificate.into(),
        }
    }

    /// Read developer key out of config store.
    ///
    /// # Errors
    ///
    /// - Return [`MusicError::NotConfigured`] if any part of the key is
    ///   missing.
    /// - Return [`MusicError::Store`] if config store cannot be read.
    pub fn load(store: &impl ConfigStore) -> Result<Self, MusicError> {
        let read = |name: &str| -> Result<String, MusicError> {
            store
                .get(name)?
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or(MusicError::NotConfigured)
        };

        Ok(Self {
            id: read(KEY_ID)?,
            team_id: read(TEAM_ID)?,
            certificate: read(CERTIFICATE)?,
        })
    }

    /// Sign developer token valid from target time.
    ///
    /// # Errors
    ///
    /// - Return [`MusicError::DeveloperToken`] if certificate is not a valid
    ///   EC private key.
    pub fn sign(&self, now: DateTime<Utc>) -> Result<String, MusicError> {
        let mut header = Header::new(Algorithm::ES256);
        header.kid = Some(self.id.clone());
        let claims = Claims {
            iss: self.team_id.clone(),
            iat: now.timestamp(),
            exp: (now + TimeDelta::hours(DEVELOPER_TOKEN_TTL_HOURS)).timestamp(),
        };
        let key = EncodingKey::from_ec_pem(self.certificate.as_bytes())?;

        Ok(jsonwebtoken::encode(&header, &claims, &key)?)
    }
}

/// Retry policy for requests answered with "not found" or "too many
/// requests".
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl From<&MusicSettings> for RetryPolicy {
    fn from(settings: &MusicSettings) -> Self {
        Self {
            attempts: settings.retry_attempts.max(1),
            delay: settings.retry_delay(),
        }
    }
}

#[derive(Debug, Clone)]
struct Transport {
    http: Client,
    root: String,
    developer_token: String,
    retry: RetryPolicy,
}

impl Transport {
    #[instrument(skip(self, user_token), level = "debug")]
    fn get<T>(&self, path: &str, user_token: Option<&str>) -> catalog::Result<T>
    where
        T: DeserializeOwned,
    {
        let url = self.url(path);
        let mut attempt = 1;
        loop {
            debug!("GET {url}");
            let response = self.request(&url, user_token).send()?;
            let status = response.status();

            if status.is_success() {
                let body = response.text()?;
                return serde_json::from_str(&body).map_err(|error| CatalogError::Malformed {
                    url,
                    reason: error.to_string(),
                });
            }

            let retryable = matches!(status, StatusCode::NOT_FOUND | StatusCode::TOO_MANY_REQUESTS);
            if retryable && attempt < self.retry.attempts {
                warn!(
                    "{url} answered {status}, retry in {:?} ({attempt}/{})",
                    self.retry.delay, self.retry.attempts
                );
                attempt += 1;
                sleep(self.retry.delay);
                continue;
            }

            if status == StatusCode::NOT_FOUND {
                return Err(CatalogError::NotFound(url));
            }

            return Err(CatalogError::Status {
                url,
                status: status.as_u16(),
            });
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.root)
    }

    fn request(&self, url: &str, user_token: Option<&str>) -> RequestBuilder {
        let request = self.http.get(url).bearer_auth(&self.developer_token);
        match user_token {
            Some(token) => request.header("Music-User-Token", token),
            None => request,
        }
    }

    /// Collect every resource of a paginated collection.
    fn get_all<A>(&self, path: &str, user_token: Option<&str>) -> catalog::Result<Vec<Resource<A>>>
    where
        A: DeserializeOwned,
    {
        let mut resources = Vec::new();
        let mut next = Some(path.to_string());
        while let Some(path) = next {
            let page: Page<A> = self.get(&path, user_token)?;
            resources.extend(page.data);
            next = page.next;
        }

        Ok(resources)
    }
}

/// Apple Music, both library and catalog.
#[derive(Debug, Clone)]
pub struct AppleMusic {
    transport: Transport,
}

impl AppleMusic {
    /// Construct new client signing requests with target developer token.
    ///
    /// # Errors
    ///
    /// - Return [`CatalogError::Http`] if HTTP client cannot be built.
    pub fn new(developer_token: impl Into<String>, retry: RetryPolicy) -> catalog::Result<Self> {
        Self::with_root(API_ROOT, developer_token, retry)
    }

    /// Construct new client talking to the API served at target root.
    ///
    /// # Errors
    ///
    /// - Return [`CatalogError::Http`] if HTTP client cannot be built.
    pub fn with_root(
        root: impl Into<String>,
        developer_token: impl Into<String>,
        retry: RetryPolicy,
    ) -> catalog::Result<Self> {
        let root: String = root.into();
        let http = Client::builder()
            .user_agent(concat!("kalmiya/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            transport: Transport {
                http,
                root: root.trim_end_matches('/').to_string(),
                developer_token: developer_token.into(),
                retry,
            },
        })
    }

    /// Artwork downloader sharing this client's connections.
    pub fn artwork(&self) -> ArtworkDownloader {
        ArtworkDownloader {
            http: self.transport.http.clone(),
        }
    }
}

impl MusicService for AppleMusic {
    type Library = AppleLibrary;
    type Catalog = AppleCatalog;

    fn library(&self, user_token: &str) -> catalog::Result<Self::Library> {
        Ok(AppleLibrary {
            transport: self.transport.clone(),
            user_token: user_token.to_string(),
        })
    }

    fn catalog(&self, storefront: &str) -> catalog::Result<Self::Catalog> {
        Ok(AppleCatalog {
            transport: self.transport.clone(),
            storefront: urlencoding::encode(storefront).into_owned(),
        })
    }
}

/// Library of a user.
#[derive(Debug, Clone)]
pub struct AppleLibrary {
    transport: Transport,
    user_token: String,
}

impl Library for AppleLibrary {
    fn storefront(&self) -> catalog::Result<String> {
        let page: Page<serde_json::Value> =
            self.transport.get("/v1/me/storefront", Some(&self.user_token))?;

        page.data
            .into_iter()
            .next()
            .map(|storefront| storefront.id)
            .ok_or_else(|| CatalogError::Malformed {
                url: self.transport.url("/v1/me/storefront"),
                reason: "no storefront".into(),
            })
    }

    fn artists(&self) -> catalog::Result<Vec<LibraryArtist>> {
        self.transport
            .get_all::<NameAttributes>("/v1/me/library/artists?limit=100", Some(&self.user_token))?
            .into_iter()
            .map(|resource| {
                let id = resource.id.clone();
                let name = resource.attributes("library artist")?.name;
                Ok(LibraryArtist {
                    id: LibraryArtistId::new(id),
                    name,
                })
            })
            .collect()
    }

    fn albums(&self, artist: &LibraryArtistId) -> catalog::Result<Vec<LibraryAlbum>> {
        let path = format!(
            "/v1/me/library/artists/{}/albums?limit=100",
            urlencoding::encode(artist.as_str())
        );

        self.transport
            .get_all::<AlbumAttributes>(&path, Some(&self.user_token))?
            .into_iter()
            .map(|resource| {
                let attributes = resource.attributes("library album")?;
                Ok(LibraryAlbum {
                    name: attributes.name,
                    artwork: attributes.artwork.map(Into::into),
                })
            })
            .collect()
    }
}

/// Catalog of a storefront.
#[derive(Debug, Clone)]
pub struct AppleCatalog {
    transport: Transport,
    storefront: String,
}

impl Catalog for AppleCatalog {
    fn search(&self, term: &str) -> catalog::Result<Vec<AlbumId>> {
        let path = format!(
            "/v1/catalog/{}/search?types=albums&limit={SEARCH_PAGE_SIZE}&term={}",
            self.storefront,
            urlencoding::encode(term)
        );
        let response: SearchResponse = self.transport.get(&path, None)?;

        Ok(response
            .results
            .albums
            .map(|albums| {
                albums
                    .data
                    .into_iter()
                    .map(|album| AlbumId::new(album.id))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn album(&self, id: &AlbumId) -> catalog::Result<CatalogAlbum> {
        let path = format!(
            "/v1/catalog/{}/albums/{}",
            self.storefront,
            urlencoding::encode(id.as_str())
        );
        let page: Page<AlbumAttributes> = self.transport.get(&path, None)?;

        page.data
            .into_iter()
            .next()
            .ok_or_else(|| CatalogError::NotFound(self.transport.url(&path)))?
            .into_catalog_album()
    }

    fn artist(&self, id: &ArtistId) -> catalog::Result<CatalogArtist> {
        let path = format!(
            "/v1/catalog/{}/artists/{}",
            self.storefront,
            urlencoding::encode(id.as_str())
        );
        let page: Page<NameAttributes> = self.transport.get(&path, None)?;
        let resource = page
            .data
            .into_iter()
            .next()
            .ok_or_else(|| CatalogError::NotFound(self.transport.url(&path)))?;
        let id = resource.id.clone();
        let name = resource.attributes("catalog artist")?.name;

        Ok(CatalogArtist {
            id: ArtistId::new(id),
            name,
        })
    }

    fn artist_albums(&self, id: &ArtistId) -> catalog::Result<Vec<AlbumId>> {
        let path = format!(
            "/v1/catalog/{}/artists/{}/albums",
            self.storefront,
            urlencoding::encode(id.as_str())
        );

        Ok(self
            .transport
            .get_all::<serde_json::Value>(&path, None)?
            .into_iter()
            .map(|resource| AlbumId::new(resource.id))
            .collect())
    }
}

/// Artwork downloads, outside of the API.
#[derive(Debug, Clone)]
pub struct ArtworkDownloader {
    http: Client,
}

impl ArtworkSource for ArtworkDownloader {
    #[instrument(skip(self), level = "debug")]
    fn fetch(&self, url: &str) -> Option<Vec<u8>> {
        let response = self
            .http
            .get(url)
            .send()
            .and_then(|response| response.error_for_status())
            .inspect_err(|error| debug!("artwork download failed: {error}"))
            .ok()?;

        // INVARIANT: Inline images need their size announced up front.
        response.content_length()?;
        response.bytes().ok().map(|bytes| bytes.to_vec())
    }
}

#[derive(Debug, Deserialize)]
struct Page<A> {
    data: Vec<Resource<A>>,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Resource<A> {
    id: String,
    attributes: Option<A>,
    relationships: Option<Relationships>,
}

impl<A> Resource<A> {
    fn attributes(self, kind: &str) -> catalog::Result<A> {
        let id = self.id;
        self.attributes.ok_or_else(|| CatalogError::Malformed {
            url: API_ROOT.into(),
            reason: format!("{kind} {id} has no attributes"),
        })
    }
}

impl Resource<AlbumAttributes> {
    fn into_catalog_album(self) -> catalog::Result<CatalogAlbum> {
        let id = AlbumId::new(self.id.as_str());
        let mut artists: Vec<ArtistId> = Vec::new();
        for artist in self
            .relationships
            .iter()
            .flat_map(|relationships| relationships.artists.iter())
            .flat_map(|artists| artists.data.iter())
        {
            let artist = ArtistId::new(artist.id.as_str());
            if !artists.contains(&artist) {
                artists.push(artist);
            }
        }
        let attributes = self.attributes("catalog album")?;

        Ok(CatalogAlbum {
            id,
            name: attributes.name,
            release_date: attributes.release_date.as_deref().and_then(parse_release_date),
            artists,
            url: attributes.url.unwrap_or_default(),
            artwork: attributes.artwork.map(Into::into),
        })
    }
}

#[derive(Debug, Deserialize)]
struct Relationships {
    artists: Option<Relationship>,
}

#[derive(Debug, Deserialize)]
struct Relationship {
    data: Vec<Identifier>,
}

#[derive(Debug, Deserialize)]
struct Identifier {
    id: String,
}

#[derive(Debug, Deserialize)]
struct NameAttributes {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AlbumAttributes {
    name: String,
    release_date: Option<String>,
    url: Option<String>,
    artwork: Option<ArtworkAttributes>,
}

#[derive(Debug, Deserialize)]
struct ArtworkAttributes {
    url: String,
}

impl From<ArtworkAttributes> for Artwork {
    fn from(attributes: ArtworkAttributes) -> Self {
        Artwork::new(attributes.url)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: SearchResults,
}

#[derive(Debug, Deserialize)]
struct SearchResults {
    albums: Option<Page<serde_json::Value>>,
}
