//! App deep-link resolution
//!
//! The link can only be built once a session id exists. [`AppLinkResolver`]
//! waits for it cooperatively, re-checking at half the polling cadence. It has
//! no timeout of its own; use [`AppLinkResolver::resolve_with_cancel`] to bound
//! the wait.

use crate::config::Environment;
use crate::error::SsoError;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const MIN_RECHECK_INTERVAL: Duration = Duration::from_millis(1);

/// Shared, write-once-per-session slot holding the current session id
pub(crate) type SessionSlot = Arc<RwLock<Option<String>>>;

/// Format `<prefix>://service-register/<client_id>?session=<session_id>`
#[must_use]
pub fn format_app_link(env: Environment, client_id: &str, session_id: &str) -> String {
    format!(
        "{}://service-register/{client_id}?session={session_id}",
        env.app_link_prefix()
    )
}

/// Waits for a session id and formats the app link
#[derive(Debug, Clone)]
pub struct AppLinkResolver {
    env: Environment,
    client_id: String,
    session: SessionSlot,
    recheck_interval: Duration,
}

impl AppLinkResolver {
    pub(crate) fn new(
        env: Environment,
        client_id: &str,
        session: SessionSlot,
        refresh_rate: Duration,
    ) -> Self {
        Self {
            env,
            client_id: client_id.to_string(),
            session,
            recheck_interval: (refresh_rate / 2).max(MIN_RECHECK_INTERVAL),
        }
    }

    /// Link for the current session, if one exists
    #[must_use]
    pub fn current(&self) -> Option<String> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_deref()
            .map(|session_id| format_app_link(self.env, &self.client_id, session_id))
    }

    /// Wait until a session id exists, then return the link
    pub async fn resolve(&self) -> String {
        loop {
            if let Some(link) = self.current() {
                return link;
            }
            tokio::time::sleep(self.recheck_interval).await;
        }
    }

    /// Like [`Self::resolve`], but gives up when `token` is cancelled
    ///
    /// # Errors
    ///
    /// Returns [`SsoError::Cancelled`] if `token` fires before a session exists.
    pub async fn resolve_with_cancel(&self, token: &CancellationToken) -> Result<String, SsoError> {
        // An existing session wins over a token that is already cancelled
        tokio::select! {
            biased;
            link = self.resolve() => Ok(link),
            () = token.cancelled() => Err(SsoError::Cancelled),
        }
    }
}
