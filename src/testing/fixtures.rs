//! Test fixtures providing pre-built test objects
//!
//! Broker response bodies and controller configurations used across unit and
//! integration tests.

use crate::config::{ControllerConfig, Environment};
use serde_json::{json, Value};

use super::constants::{TEST_BASE_URL, TEST_CLIENT_ID, TEST_REFRESH_RATE_MS};

/// Central fixture provider for all test data
pub struct TestFixtures;

impl TestFixtures {
    /// Registration response carrying `session_id`
    #[must_use]
    pub fn registration_response(session_id: &str) -> Value {
        json!({
            "data": {
                "session": session_id,
                "createdAt": "2026-10-19T08:00:00Z"
            }
        })
    }

    /// Status response with a bare `status`
    #[must_use]
    pub fn status_response(status: &str) -> Value {
        json!({ "data": { "status": status } })
    }

    /// Terminal status response carrying the broker's `customData`
    #[must_use]
    pub fn status_response_with_custom_data(status: &str, session_id: &str) -> Value {
        json!({
            "data": {
                "status": status,
                "customData": {
                    "sessionData": session_id,
                    "extraData": { "accountId": "acct-42" }
                }
            }
        })
    }

    /// Controller config pointing at the fake broker
    ///
    /// # Panics
    ///
    /// Panics if the test constants stop forming a valid configuration.
    #[must_use]
    pub fn controller_config() -> ControllerConfig {
        Self::controller_config_for(Environment::Prod, TEST_CLIENT_ID)
    }

    /// Controller config for a given environment and client id
    ///
    /// # Panics
    ///
    /// Panics if `client_id` is empty.
    #[must_use]
    pub fn controller_config_for(env: Environment, client_id: &str) -> ControllerConfig {
        ControllerConfig::builder(client_id)
            .env(env)
            .base_url(TEST_BASE_URL)
            .refresh_rate_ms(TEST_REFRESH_RATE_MS)
            .build()
            .expect("test controller config must be valid")
    }
}
