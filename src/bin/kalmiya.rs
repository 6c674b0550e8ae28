// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use kalmiya::{
    backup::{backup, open_folders, restore, SystemOpener},
    clock::{Clock, SystemClock},
    config::Settings,
    music::{
        apple::{AppleMusic, DeveloperKey, RetryPolicy},
        authenticate::{authenticate, Terminal},
        library,
        releases::Releases,
        Console, Markdown, Pretty, Text,
    },
    path::{default_apple_music_dir, default_settings_path, home_dir},
    project::{self, ProjectName},
    store::DirectoryStore,
};

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::ProgressBar;
use std::{io, process::exit};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "kalmiya [options] <kalmiya-command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn run(self) -> Result<()> {
        match self.command {
            Command::Music(opts) => match opts.command {
                MusicCommand::Authenticate => run_authenticate(),
                MusicCommand::Library(opts) => run_library(opts),
                MusicCommand::Releases(opts) => run_releases(opts),
            },
            Command::Backup => run_backup(),
            Command::Restore => run_restore(),
            Command::New(opts) => run_new(opts),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Apple Music library and new releases.
    #[command(override_usage = "kalmiya music <music-command>")]
    Music(MusicOptions),

    /// Copy home folders onto backup volume.
    Backup,

    /// Copy backup volume folders back into home.
    Restore,

    /// Create new code project in Sites folder.
    #[command(override_usage = "kalmiya new <vendor> <package>")]
    New(NewOptions),
}

#[derive(Parser, Clone, Debug)]
struct MusicOptions {
    #[command(subcommand)]
    pub command: MusicCommand,
}

#[derive(Debug, Clone, Subcommand)]
enum MusicCommand {
    /// Provide the information to communicate with Apple Music.
    Authenticate,

    /// List every album of the library.
    Library(FormatOptions),

    /// List albums released since last check by artists of the library.
    Releases(FormatOptions),
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct FormatOptions {
    /// How to render albums.
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Pretty)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// One `artist ||| album ||| url` line per album.
    Text,

    /// Markdown table with artwork.
    Markdown,

    /// Block per album, with inline artwork in iTerm2.
    Pretty,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct NewOptions {
    /// GitHub organization owning the project.
    #[arg(required = true, value_name = "vendor")]
    pub vendor: String,

    /// Name of the project.
    #[arg(required = true, value_name = "package")]
    pub package: String,
}

fn main() {
    // INVARIANT: Logs go to stderr, stdout only carries rendered output.
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time()
        .with_writer(io::stderr);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn run() -> Result<()> {
    Cli::parse().run()
}

fn load_settings() -> Result<Settings> {
    Ok(Settings::load(default_settings_path()?)?)
}

fn open_store() -> Result<DirectoryStore> {
    Ok(DirectoryStore::open(default_apple_music_dir()?))
}

fn apple_music(store: &DirectoryStore, settings: &Settings) -> Result<AppleMusic> {
    let key = DeveloperKey::load(store)?;
    let developer_token = key.sign(SystemClock.now())?;

    Ok(AppleMusic::new(developer_token, RetryPolicy::from(&settings.music))?)
}

fn run_authenticate() -> Result<()> {
    let settings = load_settings()?;
    authenticate(
        open_store()?,
        &Terminal,
        &SystemClock,
        settings.music.callback_port,
    )?;

    Ok(())
}

fn run_library(opts: FormatOptions) -> Result<()> {
    let settings = load_settings()?;
    let store = open_store()?;
    let service = apple_music(&store, &settings)?;
    let artwork = service.artwork();

    let console = match opts.format {
        OutputFormat::Text => library::list(&store, service, &Text, Console::stdout())?,
        OutputFormat::Markdown => library::list(&store, service, &Markdown, Console::stdout())?,
        OutputFormat::Pretty => {
            library::list(&store, service, &Pretty::new(artwork), Console::stdout())?
        }
    };
    console.into_inner()?;

    Ok(())
}

fn run_releases(opts: FormatOptions) -> Result<()> {
    let settings = load_settings()?;
    let store = open_store()?;
    let service = apple_music(&store, &settings)?;
    let artwork = service.artwork();
    let releases = Releases::new(&store, service, &SystemClock);

    let console = match opts.format {
        OutputFormat::Text => releases.run(&Text, Console::stdout())?,
        OutputFormat::Markdown => releases.run(&Markdown, Console::stdout())?,
        OutputFormat::Pretty => releases.run(&Pretty::new(artwork), Console::stdout())?,
    };
    console.into_inner()?;

    Ok(())
}

fn run_backup() -> Result<()> {
    let settings = load_settings()?;
    backup(
        &settings.backup,
        home_dir()?,
        &mut io::stdout(),
        &ProgressBar::new(0),
    )?;
    open_folders(&settings.backup.open, &SystemOpener);

    Ok(())
}

fn run_restore() -> Result<()> {
    let settings = load_settings()?;
    restore(
        &settings.backup,
        home_dir()?,
        &mut io::stdout(),
        &ProgressBar::new(0),
    )?;

    Ok(())
}

fn run_new(opts: NewOptions) -> Result<()> {
    let settings = load_settings()?;
    let name = ProjectName::new(opts.vendor, opts.package)?;
    let path = project::create(&settings.projects, &name)?;
    info!("project ready at {:?}", path.display());

    let url = name.new_repository_url();
    if let Err(error) = webbrowser::open(&url) {
        warn!("cannot open browser ({error}), create the repository at {url}");
    }

    Ok(())
}
