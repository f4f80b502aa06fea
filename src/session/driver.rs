//! Async driver for a playback session
//!
//! Fetches run on their own tokio tasks and report back over an unbounded
//! channel. The owner of the [`PlaybackSession`] drains the channel on its
//! own task, so session state only ever changes one event at a time.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::controller::PlaybackSession;
use super::detail::DetailRequest;
use super::season::SeasonRequest;
use super::{Fetch, SessionError};
use crate::api::{MetadataProvider, ProviderError};
use crate::models::{MediaItem, MediaType, SeasonDetail};

/// A finished fetch, still carrying the tag it was issued with
#[derive(Debug)]
pub enum SessionEvent {
    Details(DetailRequest, Result<MediaItem, ProviderError>),
    Season(SeasonRequest, Result<SeasonDetail, ProviderError>),
}

/// Perform one fetch against the provider
pub async fn perform(provider: &dyn MetadataProvider, fetch: Fetch) -> SessionEvent {
    match fetch {
        Fetch::Details(req) => {
            debug!(seq = req.seq, id = %req.id, "fetching details");
            let result = provider.details(req.media_type, &req.id).await;
            SessionEvent::Details(req, result)
        }
        Fetch::Season(req) => {
            debug!(seq = req.seq, id = %req.id, season = req.season, "fetching season");
            let result = provider.season(&req.id, req.season).await;
            SessionEvent::Season(req, result)
        }
    }
}

/// Spawns fetches and hands their results back in completion order
#[derive(Clone)]
pub struct SessionDriver {
    provider: Arc<dyn MetadataProvider>,
    sender: mpsc::UnboundedSender<SessionEvent>,
}

impl SessionDriver {
    pub fn new(provider: Arc<dyn MetadataProvider>) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { provider, sender }, receiver)
    }

    /// Run `fetch` in the background. Requests are never cancelled; the
    /// session drops stale answers when they arrive.
    pub fn dispatch(&self, fetch: Fetch) -> JoinHandle<()> {
        let provider = Arc::clone(&self.provider);
        let sender = self.sender.clone();
        tokio::spawn(async move {
            let event = perform(provider.as_ref(), fetch).await;
            if sender.send(event).is_err() {
                debug!("session receiver dropped, discarding fetch result");
            }
        })
    }

    pub fn dispatch_all(&self, fetch: Option<Fetch>) {
        if let Some(fetch) = fetch {
            self.dispatch(fetch);
        }
    }
}

/// Run fetches inline until the session asks for nothing more
pub async fn settle(provider: &dyn MetadataProvider, session: &mut PlaybackSession, mut next: Option<Fetch>) {
    while let Some(fetch) = next.take() {
        let event = perform(provider, fetch).await;
        next = session.handle(event);
    }
}

/// Open and fully load a session (details, plus the first season for
/// series). Details failures come back as errors; season failures stay
/// in the session state.
pub async fn load_session(
    provider: &dyn MetadataProvider,
    media_type: MediaType,
    id: &str,
    server_id: Option<&str>,
) -> Result<PlaybackSession, SessionError> {
    let mut session = PlaybackSession::new();
    if let Some(server_id) = server_id {
        session = session.with_server(server_id);
    }

    let fetch = session.open(media_type, id);
    settle(provider, &mut session, fetch).await;

    match session.state() {
        super::SessionState::Failed(err) => Err(err),
        _ => Ok(session),
    }
}
