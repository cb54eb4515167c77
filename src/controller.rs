//! Session Controller - SSO handshake lifecycle
//!
//! The `SessionController` is the single entry point for starting an SSO
//! handshake. It registers a session with the broker, owns at most one
//! [`PollingJob`] at a time, and exposes the session id to the app-link
//! resolver.
//!
//! ## Lifecycle
//!
//! 1. `create_session` registers a session and publishes `code-refresh`
//! 2. A polling job queries the session status and publishes transitions
//! 3. The job stops on `success`/`failed`, on the first failed query, or when
//!    superseded by another `create_session`, `destroy`, or drop
//!
//! The controller is a cheap handle: clones share the same session, job and
//! event bus. Dropping the last clone cancels the active job.

use crate::app_link::{AppLinkResolver, SessionSlot};
use crate::config::ControllerConfig;
use crate::error::SsoError;
use crate::events::{EventBus, SsoEvent};
use crate::fetcher::{registration_url, HttpTicketFetcher, TicketFetcher};
use crate::models::{SessionRegistration, SessionStatus};
use crate::polling::{CancelHandle, JobPhase, PollingJob};
use crate::utils::logging::LoggingHelper;
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

// =============================================================================
// Types
// =============================================================================

/// Result of a successful `create_session`
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedSession {
    /// Session id assigned by the broker
    pub session_id: String,
    /// Raw registration response body
    pub response: Value,
}

/// Controller for one SSO handshake at a time
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: ControllerConfig,
    fetcher: Arc<dyn TicketFetcher>,
    events: EventBus,
    session: SessionSlot,
    jobs: Mutex<JobSlot>,
}

/// The active job, plus the status its predecessor ended with
#[derive(Default)]
struct JobSlot {
    active: Option<PollingJob>,
    last_status: Option<SessionStatus>,
}

impl JobSlot {
    /// Cancel the active job, keeping its last observed status
    fn stop_active(&mut self) {
        if let Some(job) = self.active.take() {
            job.cancel();
            self.last_status = Some(job.status());
        }
    }

    fn status(&self) -> Option<SessionStatus> {
        self.active
            .as_ref()
            .map(PollingJob::status)
            .or_else(|| self.last_status.clone())
    }
}

impl Drop for ControllerInner {
    fn drop(&mut self) {
        self.jobs
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .stop_active();
    }
}

// =============================================================================
// 1. Construction
// =============================================================================

impl SessionController {
    /// Create a controller talking to the broker over HTTP
    #[must_use]
    pub fn new(config: ControllerConfig) -> Self {
        Self::with_fetcher(config, Arc::new(HttpTicketFetcher::new()))
    }

    /// Create a controller on a custom transport
    #[must_use]
    pub fn with_fetcher(config: ControllerConfig, fetcher: Arc<dyn TicketFetcher>) -> Self {
        Self {
            inner: Arc::new(ControllerInner {
                config,
                fetcher,
                events: EventBus::new(),
                session: SessionSlot::default(),
                jobs: Mutex::new(JobSlot::default()),
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    /// Receive lifecycle events published from now on
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SsoEvent> {
        self.inner.events.subscribe()
    }

    // =========================================================================
    // 2. Session lifecycle
    // =========================================================================

    /// Register a new session and start polling its status
    ///
    /// Any job polling a previous session is cancelled before the new session
    /// id is recorded.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the transport fails or the body is not JSON
    /// - the broker answers with a non-success status
    /// - the body has no `data.session`
    ///
    /// On error no state changes and no event is published.
    pub async fn create_session(&self) -> Result<CreatedSession, SsoError> {
        let config = &self.inner.config;
        let url = registration_url(config.base_url(), config.client_id());
        LoggingHelper::log_session_requested(config.client_id(), &url);

        let fetched = self.inner.fetcher.fetch(&url).await;
        let response = match fetched {
            Ok(Some(body)) => body,
            Ok(None) => {
                let err = SsoError::NoData(url);
                LoggingHelper::log_session_registration_failed(config.client_id(), &err);
                return Err(err);
            }
            Err(err) => {
                LoggingHelper::log_session_registration_failed(config.client_id(), &err);
                return Err(err);
            }
        };

        let registration = SessionRegistration::from_response(&response)
            .filter(|registration| !registration.session.is_empty())
            .ok_or_else(|| {
                SsoError::MalformedResponse(
                    "registration response has no data.session".to_string(),
                )
            })?;
        let session_id = registration.session.clone();

        self.install_session(registration);
        LoggingHelper::log_session_registered(&session_id);

        Ok(CreatedSession {
            session_id,
            response,
        })
    }

    /// Supersede the active job with one bound to `registration`
    fn install_session(&self, registration: SessionRegistration) {
        let inner = &self.inner;
        let mut jobs = self.lock_jobs();

        jobs.stop_active();
        jobs.last_status = None;

        let session_id = registration.session.clone();
        *inner.session.write().unwrap_or_else(PoisonError::into_inner) = Some(session_id.clone());

        inner.events.publish(SsoEvent::CodeRefresh {
            session_id: session_id.clone(),
            registration,
        });

        jobs.active = Some(PollingJob::spawn(
            &session_id,
            inner.config.base_url(),
            Arc::clone(&inner.fetcher),
            inner.events.clone(),
            inner.config.refresh_rate(),
        ));
    }

    /// Cancel the active polling job, if any; idempotent
    ///
    /// The session id and the last observed status stay readable.
    pub fn destroy(&self) {
        self.lock_jobs().stop_active();
    }

    // =========================================================================
    // 3. App link
    // =========================================================================

    /// Resolver bound to this controller's session
    #[must_use]
    pub fn app_link_resolver(&self) -> AppLinkResolver {
        let config = &self.inner.config;
        AppLinkResolver::new(
            config.env(),
            config.client_id(),
            Arc::clone(&self.inner.session),
            config.refresh_rate(),
        )
    }

    /// Wait until a session exists, then return its app link
    ///
    /// Never times out on its own.
    pub async fn app_link(&self) -> String {
        self.app_link_resolver().resolve().await
    }

    /// Wait for the app link until `token` is cancelled
    ///
    /// # Errors
    ///
    /// Returns [`SsoError::Cancelled`] if `token` fires first.
    pub async fn app_link_with_cancel(&self, token: &CancellationToken) -> Result<String, SsoError> {
        self.app_link_resolver().resolve_with_cancel(token).await
    }

    // =========================================================================
    // 4. Accessors
    // =========================================================================

    /// Most recently registered session id
    #[must_use]
    pub fn session_id(&self) -> Option<String> {
        self.inner
            .session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Last status observed for the most recent session
    ///
    /// Survives `destroy`; `None` until a session has been created.
    #[must_use]
    pub fn session_status(&self) -> Option<SessionStatus> {
        self.lock_jobs().status()
    }

    /// Whether a polling job is currently running
    #[must_use]
    pub fn is_polling(&self) -> bool {
        self.lock_jobs()
            .active
            .as_ref()
            .is_some_and(|job| job.phase() == JobPhase::Running)
    }

    /// Cancellation capability of the current job
    #[must_use]
    pub fn cancel_handle(&self) -> Option<CancelHandle> {
        self.lock_jobs().active.as_ref().map(PollingJob::cancel_handle)
    }

    fn lock_jobs(&self) -> MutexGuard<'_, JobSlot> {
        self.inner.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("config", &self.inner.config)
            .field("session_id", &self.session_id())
            .field("polling", &self.is_polling())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// 5. Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::assertions::{assert_no_pending_events, collect_event_names, next_event};
    use crate::testing::constants::TEST_SESSION_ID;
    use crate::testing::fixtures::TestFixtures;
    use crate::testing::mock::{ScriptedReply, ScriptedTicketFetcher};
    use std::time::Duration;

    fn controller_with(fetcher: &Arc<ScriptedTicketFetcher>) -> SessionController {
        SessionController::with_fetcher(
            TestFixtures::controller_config(),
            Arc::clone(fetcher) as Arc<dyn TicketFetcher>,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_session_publishes_code_refresh_first() {
        let fetcher = Arc::new(ScriptedTicketFetcher::new());
        fetcher.script_registration(ScriptedReply::registration(TEST_SESSION_ID));
        fetcher.script_status(TEST_SESSION_ID, vec![ScriptedReply::status("processing")]);
        let controller = controller_with(&fetcher);
        let mut rx = controller.subscribe();

        let created = controller.create_session().await.unwrap();
        assert_eq!(created.session_id, TEST_SESSION_ID);
        assert_eq!(created.response, TestFixtures::registration_response(TEST_SESSION_ID));
        assert_eq!(controller.session_id().as_deref(), Some(TEST_SESSION_ID));
        assert!(controller.is_polling());

        match next_event(&mut rx, Duration::from_secs(1)).await {
            SsoEvent::CodeRefresh {
                session_id,
                registration,
            } => {
                assert_eq!(session_id, TEST_SESSION_ID);
                assert_eq!(registration.session, TEST_SESSION_ID);
                assert!(registration.extra.contains_key("createdAt"));
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(
            next_event(&mut rx, Duration::from_secs(1)).await.name(),
            "sso-processing"
        );
        assert_eq!(controller.session_status(), Some(SessionStatus::Processing));
        assert_eq!(
            fetcher.requests()[0],
            "http://broker.test/api/3rdService/register/session/svc1"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_session_failure_leaves_no_state() {
        let fetcher = Arc::new(ScriptedTicketFetcher::new());
        fetcher.script_registration(ScriptedReply::TransportError("dns failure".to_string()));
        fetcher.script_registration(ScriptedReply::NoData);
        fetcher.script_registration(ScriptedReply::Body(serde_json::json!({ "data": {} })));
        fetcher.script_registration(ScriptedReply::registration(""));
        let controller = controller_with(&fetcher);
        let mut rx = controller.subscribe();

        assert!(matches!(
            controller.create_session().await,
            Err(SsoError::Transport(_))
        ));
        assert!(matches!(
            controller.create_session().await,
            Err(SsoError::NoData(_))
        ));
        assert!(matches!(
            controller.create_session().await,
            Err(SsoError::MalformedResponse(_))
        ));
        assert!(matches!(
            controller.create_session().await,
            Err(SsoError::MalformedResponse(_))
        ));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_no_pending_events(&mut rx);
        assert!(controller.session_id().is_none());
        assert!(controller.session_status().is_none());
        assert!(!controller.is_polling());
        assert_eq!(fetcher.requests().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_destroy_without_job_is_noop() {
        let fetcher = Arc::new(ScriptedTicketFetcher::new());
        let controller = controller_with(&fetcher);
        let mut rx = controller.subscribe();

        controller.destroy();
        controller.destroy();

        assert_no_pending_events(&mut rx);
        assert!(controller.cancel_handle().is_none());
        assert!(fetcher.requests().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_destroy_stops_events() {
        let fetcher = Arc::new(ScriptedTicketFetcher::new());
        fetcher.script_registration(ScriptedReply::registration(TEST_SESSION_ID));
        fetcher.script_status(
            TEST_SESSION_ID,
            vec![
                ScriptedReply::status("processing"),
                ScriptedReply::status("processing"),
                ScriptedReply::status("success"),
            ],
        );
        let controller = controller_with(&fetcher);
        let mut rx = controller.subscribe();

        controller.create_session().await.unwrap();
        let handle = controller.cancel_handle().unwrap();
        assert_eq!(next_event(&mut rx, Duration::from_secs(1)).await.name(), "code-refresh");
        assert_eq!(next_event(&mut rx, Duration::from_secs(1)).await.name(), "sso-processing");

        controller.destroy();
        assert!(handle.is_stopped());
        assert!(!controller.is_polling());
        assert_eq!(controller.session_status(), Some(SessionStatus::Processing));
        assert_eq!(controller.session_id().as_deref(), Some(TEST_SESSION_ID));

        let names = collect_event_names(&mut rx, Duration::from_secs(5)).await;
        assert!(names.is_empty(), "unexpected events {names:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_controller_cancels_job() {
        let fetcher = Arc::new(ScriptedTicketFetcher::new());
        fetcher.script_registration(ScriptedReply::registration(TEST_SESSION_ID));
        let controller = controller_with(&fetcher);
        let mut rx = controller.subscribe();

        controller.create_session().await.unwrap();
        let handle = controller.cancel_handle().unwrap();
        assert_eq!(next_event(&mut rx, Duration::from_secs(1)).await.name(), "code-refresh");

        let clone = controller.clone();
        drop(controller);
        assert!(!handle.is_stopped());

        drop(clone);
        assert!(handle.is_stopped());
    }
}
