// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Apple Music authentication.
//!
//! Authentication happens in two steps. First, the developer credentials
//! issued by the Apple developer portal are asked for, unless they are
//! already in the config store. Second, a small local web server is started
//! and opened in the browser. The page it serves runs MusicKit JS with a
//! freshly signed developer token, lets the user authorize kalmiya, then
//! posts the resulting user token back to the server. The user token is
//! stored and the server stops.
//!
//! The page carries a random state generated for each run, and posts it back
//! along with the user token. Posts without it come from another page and
//! are refused.
//!
//! The user token is always asked for again, as it expires.

use crate::{
    clock::Clock,
    music::{apple::DeveloperKey, MusicError, CERTIFICATE, KEY_ID, TEAM_ID, USER_TOKEN},
    store::{ConfigStore, StoreError},
};

use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::Html,
    routing::get,
    Router,
};
use inquire::{InquireError, Text};
use serde::Deserialize;
use std::{
    future::IntoFuture,
    io,
    net::Ipv4Addr,
    sync::{Arc, Mutex},
};
use tokio::{net::TcpListener, sync::oneshot};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

const CALLBACK_PAGE: &str = include_str!("../../templates/apple-music.html");

/// Marker ending a PEM encoded private key.
const END_OF_KEY: &str = "END PRIVATE KEY";

/// Ask user for a line of input.
pub trait Prompter {
    /// Show message and read answer.
    ///
    /// # Errors
    ///
    /// - Return [`InquireError`] if the answer cannot be read.
    fn ask(&self, message: &str) -> Result<String, InquireError>;
}

/// Prompt on the terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct Terminal;

impl Prompter for Terminal {
    fn ask(&self, message: &str) -> Result<String, InquireError> {
        Text::new(message).prompt()
    }
}

/// Ask for each missing part of the developer key, and store it.
///
/// The certificate is read line by line until the end of the private key.
///
/// # Errors
///
/// - Return [`AuthenticateError::Prompt`] if user input cannot be read.
/// - Return [`AuthenticateError::Store`] if config store cannot be accessed.
#[instrument(skip_all, level = "debug")]
pub fn ask_credentials(store: &impl ConfigStore, prompter: &impl Prompter) -> Result<DeveloperKey> {
    if !store.contains(KEY_ID) {
        store.add(KEY_ID, prompter.ask("Id:")?.trim())?;
    }

    if !store.contains(TEAM_ID) {
        store.add(TEAM_ID, prompter.ask("Team id:")?.trim())?;
    }

    if !store.contains(CERTIFICATE) {
        let mut certificate = String::new();
        while !certificate.contains(END_OF_KEY) {
            certificate.push_str(&prompter.ask("Certificate:")?);
            certificate.push('\n');
        }
        store.add(CERTIFICATE, &certificate)?;
    }

    Ok(DeveloperKey::load(store)?)
}

/// Callback page signed with target developer token, posting back target
/// state.
pub fn callback_page(developer_token: &str, state: &str) -> String {
    CALLBACK_PAGE
        .replace("{{ token }}", developer_token)
        .replace("{{ state }}", state)
}

/// Run whole authentication flow, returning once the user token is stored.
///
/// # Errors
///
/// - Return [`AuthenticateError::Prompt`] if developer credentials cannot be
///   read.
/// - Return [`AuthenticateError::Music`] if developer token cannot be
///   signed.
/// - Return [`AuthenticateError::Server`] if callback server cannot run on
///   target port.
/// - Return [`AuthenticateError::Store`] if user token cannot be stored.
pub fn authenticate<S>(
    store: S,
    prompter: &impl Prompter,
    clock: &impl Clock,
    port: u16,
) -> Result<()>
where
    S: ConfigStore + Send + Sync + 'static,
{
    let key = ask_credentials(&store, prompter)?;
    let state = Uuid::new_v4().simple().to_string();
    let page = callback_page(&key.sign(clock.now())?, &state);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(serve(store, page, state, port))
}

/// Serve callback page until a user token is posted back.
#[instrument(skip(store, page, state), level = "debug")]
async fn serve<S>(store: S, page: String, state: String, port: u16) -> Result<()>
where
    S: ConfigStore + Send + Sync + 'static,
{
    let (callback, posted) = Callback::new(store, page, state);
    let app = Router::new()
        .route("/", get(authorize::<S>).post(save::<S>))
        .with_state(callback);

    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, port)).await?;
    let url = format!("http://{}", listener.local_addr()?);
    info!("waiting for Apple Music authorization at {url}");
    if let Err(error) = webbrowser::open(&url) {
        warn!("cannot open browser ({error}), open {url} manually");
    }

    let (stop, stopped) = oneshot::channel::<()>();
    let server = tokio::spawn(
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = stopped.await;
            })
            .into_future(),
    );

    let outcome = posted.await.map_err(|_| AuthenticateError::Interrupted);
    let _ = stop.send(());
    server.await??;
    outcome??;
    info!("user token stored");

    Ok(())
}

#[derive(Debug)]
struct Callback<S> {
    page: Arc<String>,
    state: Arc<String>,
    store: Arc<S>,
    posted: Arc<Mutex<Option<oneshot::Sender<Result<(), StoreError>>>>>,
}

impl<S> Clone for Callback<S> {
    fn clone(&self) -> Self {
        Self {
            page: Arc::clone(&self.page),
            state: Arc::clone(&self.state),
            store: Arc::clone(&self.store),
            posted: Arc::clone(&self.posted),
        }
    }
}

impl<S> Callback<S>
where
    S: ConfigStore,
{
    fn new(
        store: S,
        page: String,
        state: String,
    ) -> (Self, oneshot::Receiver<Result<(), StoreError>>) {
        let (posted, receiver) = oneshot::channel();
        let callback = Self {
            page: Arc::new(page),
            state: Arc::new(state),
            store: Arc::new(store),
            posted: Arc::new(Mutex::new(Some(posted))),
        };

        (callback, receiver)
    }

    fn finish(&self, outcome: Result<(), StoreError>) {
        // INVARIANT: Only the first posted token ends the flow.
        let sender = self.posted.lock().ok().and_then(|mut posted| posted.take());
        match sender {
            Some(sender) => {
                let _ = sender.send(outcome);
            }
            None => debug!("user token posted again, ignored"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenForm {
    token: String,
    #[serde(default)]
    state: String,
}

async fn authorize<S>(State(callback): State<Callback<S>>) -> Html<String>
where
    S: ConfigStore + Send + Sync + 'static,
{
    Html(callback.page.to_string())
}

async fn save<S>(State(callback): State<Callback<S>>, Form(form): Form<TokenForm>) -> StatusCode
where
    S: ConfigStore + Send + Sync + 'static,
{
    if form.state != *callback.state {
        warn!("user token posted without the state of the callback page, refused");
        return StatusCode::FORBIDDEN;
    }

    let token = form.token.trim();
    if token.is_empty() {
        return StatusCode::BAD_REQUEST;
    }

    let outcome = callback.store.add(USER_TOKEN, token);
    let status = match outcome {
        Ok(()) => StatusCode::OK,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    callback.finish(outcome);

    status
}

/// All possible error types of the authentication flow.
#[derive(Debug, thiserror::Error)]
pub enum AuthenticateError {
    /// User input cannot be read.
    #[error("failed to read answer")]
    Prompt(#[from] InquireError),

    /// Config store access fails.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Developer key cannot be loaded or signed.
    #[error(transparent)]
    Music(#[from] MusicError),

    /// Callback server fails.
    #[error("callback server failed")]
    Server(#[from] io::Error),

    /// Callback server task cannot be joined.
    #[error(transparent)]
    Task(#[from] tokio::task::JoinError),

    /// Callback server stopped before any user token was posted.
    #[error("authorization interrupted before a user token was received")]
    Interrupted,
}

/// Friendly result alias :3
pub type Result<T, E = AuthenticateError> = std::result::Result<T, E>;
