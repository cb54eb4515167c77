// Centralized logging utilities for the session lifecycle
use crate::models::SessionStatus;
use crate::settings::LoggingSettings;
use log::{debug, info, warn};

pub struct LoggingHelper;

impl LoggingHelper {
    /// Initialize `env_logger` with the configured level as default filter
    ///
    /// `RUST_LOG` still takes precedence when set.
    ///
    /// # Errors
    ///
    /// Returns an error if a global logger is already installed
    pub fn init(settings: &LoggingSettings) -> Result<(), log::SetLoggerError> {
        env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or(settings.level.as_str()),
        )
        .try_init()
    }

    /// Log session registration request
    pub fn log_session_requested(client_id: &str, url: &str) {
        info!("🔄 Requesting SSO session for client {client_id} from {url}");
    }

    /// Log session registration success
    pub fn log_session_registered(session_id: &str) {
        info!("✅ SSO session registered: {session_id}");
    }

    /// Log session registration failure
    pub fn log_session_registration_failed(client_id: &str, error: &dyn std::fmt::Display) {
        warn!("❌ SSO session registration failed for client {client_id}: {error}");
    }

    /// Log polling job start
    pub fn log_polling_started(session_id: &str, refresh_ms: u128) {
        debug!("🔍 Polling status of session {session_id} every {refresh_ms}ms");
    }

    /// Log a status transition observed by the polling job
    pub fn log_status_observed(session_id: &str, status: &SessionStatus) {
        match status {
            SessionStatus::Unknown(raw) => {
                debug!("⏭️  Session {session_id} reported unrecognised status '{raw}', still polling");
            }
            _ => debug!("Session {session_id} status: {status}"),
        }
    }

    /// Log that a status query yielded nothing usable
    pub fn log_poll_failed(session_id: &str, reason: &str) {
        warn!("⚠️  Status query for session {session_id} yielded no data ({reason}), treating session as expired");
    }

    /// Log polling job completion
    pub fn log_polling_finished(session_id: &str, status: &SessionStatus) {
        info!("🎯 Session {session_id} finished with status {status}");
    }

    /// Log explicit cancellation of a polling job
    pub fn log_polling_cancelled(session_id: &str) {
        debug!("⏹️  Polling of session {session_id} cancelled");
    }

    /// Log that an in-flight response was discarded after cancellation
    pub fn log_response_discarded(session_id: &str) {
        debug!("Discarding status response for cancelled session {session_id}");
    }
}
