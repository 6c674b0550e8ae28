// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Album rendering.
//!
//! Albums are rendered one at a time through a [`Format`]. Rendering consumes
//! a [`Console`] and hands back the console to use for the next album, so any
//! state a format needs across albums travels with the console itself.
//!
//! # Formats
//!
//! - [`Text`]: one line per album, easy to grep.
//! - [`Markdown`]: a table with a row per album, easy to paste in notes.
//! - [`Pretty`]: a block per album, with the cover art inlined when the
//!   terminal knows how to display images.

use crate::music::model::{AlbumRef, LibraryArtist};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use std::{
    env,
    io::{self, IsTerminal, Stdout, Write},
};
use tracing::{debug, instrument};

/// Destination of rendered albums.
#[derive(Debug)]
pub struct Console<W> {
    output: W,
    interactive: bool,
    terminal: Option<String>,
    header_written: bool,
}

impl Console<Stdout> {
    /// Construct console writing to standard output.
    ///
    /// The terminal type is read from `LC_TERMINAL`.
    pub fn stdout() -> Self {
        let output = io::stdout();
        let interactive = output.is_terminal();
        Self::new(output, interactive, env::var("LC_TERMINAL").ok())
    }
}

impl<W> Console<W>
where
    W: Write,
{
    /// Construct new console.
    pub fn new(output: W, interactive: bool, terminal: Option<String>) -> Self {
        Self {
            output,
            interactive,
            terminal,
            header_written: false,
        }
    }

    /// Write text to console.
    ///
    /// # Errors
    ///
    /// - Return [`io::Error`] if underlying output cannot be written to.
    pub fn output(mut self, text: impl AsRef<[u8]>) -> io::Result<Self> {
        self.output.write_all(text.as_ref())?;
        Ok(self)
    }

    /// Check if a human is looking at console.
    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    /// Terminal emulator in use, if known.
    pub fn terminal(&self) -> Option<&str> {
        self.terminal.as_deref()
    }

    /// Flush and release underlying output.
    ///
    /// # Errors
    ///
    /// - Return [`io::Error`] if underlying output cannot be flushed.
    pub fn into_inner(mut self) -> io::Result<W> {
        self.output.flush()?;
        Ok(self.output)
    }
}

/// Render album of an artist.
pub trait Format {
    /// Render album to console, and return console to use next.
    ///
    /// # Errors
    ///
    /// - Return [`io::Error`] if console cannot be written to.
    fn render<W: Write>(
        &self,
        console: Console<W>,
        album: AlbumRef<'_>,
        artist: &LibraryArtist,
    ) -> io::Result<Console<W>>;
}

/// Render albums as `artist ||| album ||| url` lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct Text;

impl Format for Text {
    fn render<W: Write>(
        &self,
        console: Console<W>,
        album: AlbumRef<'_>,
        artist: &LibraryArtist,
    ) -> io::Result<Console<W>> {
        let mut console = console.output(format!("{} ||| {}", artist.name, album.name()))?;
        if let Some(url) = album.store_url() {
            console = console.output(format!(" ||| {url}"))?;
        }

        console.output("\n")
    }
}

/// Render albums as markdown table rows.
///
/// The table header is written once, before the first row.
#[derive(Debug, Default, Clone, Copy)]
pub struct Markdown;

impl Markdown {
    /// Artwork size in pixels.
    pub const ARTWORK_SIZE: u32 = 200;
}

impl Format for Markdown {
    fn render<W: Write>(
        &self,
        mut console: Console<W>,
        album: AlbumRef<'_>,
        artist: &LibraryArtist,
    ) -> io::Result<Console<W>> {
        if !console.header_written {
            console = console
                .output("|Artist|Album|Artwork|\n")?
                .output("|---|---|---|\n")?;
            console.header_written = true;
        }

        let name = match album.store_url() {
            Some(url) => format!("[{}]({url})", album.name()),
            None => album.name().to_string(),
        };
        let artwork = album
            .artwork()
            .map(|artwork| {
                format!(
                    "![]({})",
                    artwork.of_size(Self::ARTWORK_SIZE, Self::ARTWORK_SIZE)
                )
            })
            .unwrap_or_default();

        console.output(format!("| {} | {name} | {artwork} |\n", artist.name))
    }
}

/// Source of artwork images.
pub trait ArtworkSource {
    /// Download image at target URL.
    ///
    /// Returns [`None`] if the download fails, or if the size of the image is
    /// not announced up front.
    fn fetch(&self, url: &str) -> Option<Vec<u8>>;
}

impl<F> ArtworkSource for F
where
    F: Fn(&str) -> Option<Vec<u8>>,
{
    fn fetch(&self, url: &str) -> Option<Vec<u8>> {
        self(url)
    }
}

/// Render albums as blocks, with inline artwork in iTerm2.
///
/// # See Also
///
/// - [iTerm2 inline images](https://iterm2.com/documentation-images.html)
#[derive(Debug, Clone)]
pub struct Pretty<A> {
    artwork: A,
}

impl<A> Pretty<A>
where
    A: ArtworkSource,
{
    /// Artwork size in pixels.
    pub const ARTWORK_SIZE: u32 = 300;

    /// Construct new pretty format downloading artwork through target source.
    pub fn new(artwork: A) -> Self {
        Self { artwork }
    }

    #[instrument(skip_all, level = "debug")]
    fn print_artwork<W: Write>(
        &self,
        console: Console<W>,
        album: AlbumRef<'_>,
    ) -> io::Result<Console<W>> {
        if !console.is_interactive() || console.terminal() != Some("iTerm2") {
            return Ok(console);
        }

        let Some(url) = album
            .artwork()
            .map(|artwork| artwork.of_size(Self::ARTWORK_SIZE, Self::ARTWORK_SIZE))
        else {
            return Ok(console);
        };

        let Some(image) = self.artwork.fetch(&url) else {
            debug!("artwork unavailable at {url}");
            return Ok(console);
        };

        // INVARIANT: OSC 1337 sequence terminated by a bell character.
        console
            .output("\x1b]")?
            .output("1337;File=")?
            .output(format!("size={}", image.len()))?
            .output(format!(";width={}px;inline=1:", Self::ARTWORK_SIZE))?
            .output(BASE64.encode(&image))?
            .output("\x07")?
            .output("\n")
    }
}

impl<A> Format for Pretty<A>
where
    A: ArtworkSource,
{
    fn render<W: Write>(
        &self,
        console: Console<W>,
        album: AlbumRef<'_>,
        artist: &LibraryArtist,
    ) -> io::Result<Console<W>> {
        let console = console.output(format!("{} ||| {}\n", artist.name, album.name()))?;
        let console = self.print_artwork(console, album)?;

        match album.store_url() {
            Some(url) => console.output(format!("{url}\n\n")),
            None => Ok(console),
        }
    }
}
