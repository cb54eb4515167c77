//! Status polling job
//!
//! A [`PollingJob`] is bound to one session id. It queries the broker for the
//! session's status, publishes the transitions it observes, and stops on a
//! terminal status, on the first query that yields no data, or when its
//! [`CancelHandle`] is invoked.
//!
//! The job's phase and the publish step share one lock. Once
//! [`CancelHandle::cancel`] returns, the job cannot publish again, even if a
//! request was in flight when it was cancelled.

use crate::events::{EventBus, SsoEvent};
use crate::fetcher::{status_url, TicketFetcher};
use crate::models::{SessionStatus, StatusTicket};
use crate::utils::logging::LoggingHelper;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Phase of a polling job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    Running,
    Stopped,
}

#[derive(Debug)]
struct JobState {
    phase: JobPhase,
    status: SessionStatus,
}

impl JobState {
    fn is_running(&self) -> bool {
        self.phase == JobPhase::Running
    }

    fn observe(&mut self, status: SessionStatus) {
        self.status = status;
    }

    fn finish(&mut self, status: SessionStatus) {
        self.status = status;
        self.phase = JobPhase::Stopped;
    }

    fn cancel(&mut self) -> bool {
        let was_running = self.is_running();
        self.phase = JobPhase::Stopped;
        was_running
    }
}

fn lock_state(state: &Mutex<JobState>) -> MutexGuard<'_, JobState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Opaque capability that stops one polling job
#[derive(Debug, Clone)]
pub struct CancelHandle {
    session_id: Arc<str>,
    state: Arc<Mutex<JobState>>,
    token: CancellationToken,
}

impl CancelHandle {
    /// Stop the job; idempotent
    ///
    /// No event from this job is published after this returns.
    pub fn cancel(&self) {
        if lock_state(&self.state).cancel() {
            LoggingHelper::log_polling_cancelled(&self.session_id);
        }
        self.token.cancel();
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        !lock_state(&self.state).is_running()
    }

    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

/// One in-flight polling activity, owned by the session controller
#[derive(Debug)]
pub(crate) struct PollingJob {
    handle: CancelHandle,
}

impl PollingJob {
    /// Start polling `session_id` on the current tokio runtime
    ///
    /// The first status query runs immediately.
    pub(crate) fn spawn(
        session_id: &str,
        base_url: &str,
        fetcher: Arc<dyn TicketFetcher>,
        events: EventBus,
        refresh_rate: Duration,
    ) -> Self {
        let handle = CancelHandle {
            session_id: Arc::from(session_id),
            state: Arc::new(Mutex::new(JobState {
                phase: JobPhase::Running,
                status: SessionStatus::Created,
            })),
            token: CancellationToken::new(),
        };

        let poll_loop = PollLoop {
            session_id: session_id.to_string(),
            url: status_url(base_url, session_id),
            fetcher,
            events,
            refresh_rate,
            state: Arc::clone(&handle.state),
            token: handle.token.clone(),
        };

        LoggingHelper::log_polling_started(session_id, refresh_rate.as_millis());
        tokio::spawn(poll_loop.run());

        Self { handle }
    }

    pub(crate) fn cancel(&self) {
        self.handle.cancel();
    }

    pub(crate) fn cancel_handle(&self) -> CancelHandle {
        self.handle.clone()
    }

    pub(crate) fn phase(&self) -> JobPhase {
        lock_state(&self.handle.state).phase
    }

    pub(crate) fn status(&self) -> SessionStatus {
        lock_state(&self.handle.state).status.clone()
    }
}

/// What a single tick decided
enum Tick {
    Continue,
    Done,
}

struct PollLoop {
    session_id: String,
    url: String,
    fetcher: Arc<dyn TicketFetcher>,
    events: EventBus,
    refresh_rate: Duration,
    state: Arc<Mutex<JobState>>,
    token: CancellationToken,
}

impl PollLoop {
    async fn run(self) {
        loop {
            if self.token.is_cancelled() {
                return;
            }

            let ticket = self.query().await;

            if let Tick::Done = self.apply(ticket) {
                return;
            }

            tokio::select! {
                () = self.token.cancelled() => return,
                () = tokio::time::sleep(self.refresh_rate) => {}
            }
        }
    }

    /// Fetch the status, folding every failure into `None`
    async fn query(&self) -> Option<StatusTicket> {
        match self.fetcher.fetch(&self.url).await {
            Ok(Some(body)) => {
                let ticket = StatusTicket::from_response(&body);
                if ticket.is_none() {
                    LoggingHelper::log_poll_failed(&self.session_id, "response has no data object");
                }
                ticket
            }
            Ok(None) => {
                LoggingHelper::log_poll_failed(&self.session_id, "non-success status");
                None
            }
            Err(e) => {
                LoggingHelper::log_poll_failed(&self.session_id, &e.to_string());
                None
            }
        }
    }

    /// Interpret one query result and publish under the state lock
    fn apply(&self, ticket: Option<StatusTicket>) -> Tick {
        let mut state = lock_state(&self.state);
        if !state.is_running() {
            LoggingHelper::log_response_discarded(&self.session_id);
            return Tick::Done;
        }

        let Some(ticket) = ticket else {
            state.finish(SessionStatus::Expired);
            self.events.publish(SsoEvent::CodeExpired {
                session_id: self.session_id.clone(),
            });
            LoggingHelper::log_polling_finished(&self.session_id, &SessionStatus::Expired);
            return Tick::Done;
        };

        LoggingHelper::log_status_observed(&self.session_id, &ticket.status);

        if ticket.status.is_terminal() {
            let status = ticket.status.clone();
            state.finish(status.clone());
            self.events.publish(SsoEvent::SsoComplete {
                session_id: self.session_id.clone(),
                ticket,
            });
            LoggingHelper::log_polling_finished(&self.session_id, &status);
            return Tick::Done;
        }

        if ticket.status == SessionStatus::Processing {
            state.observe(SessionStatus::Processing);
            self.events.publish(SsoEvent::SsoProcessing {
                session_id: self.session_id.clone(),
                ticket,
            });
        } else {
            state.observe(ticket.status);
        }

        Tick::Continue
    }
}
