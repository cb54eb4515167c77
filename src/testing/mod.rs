//! Unified testing utilities for ssolink
//!
//! ## Organization
//!
//! - [`fixtures`] - Broker response bodies and controller configs
//! - [`mock`] - A scripted [`crate::fetcher::TicketFetcher`]
//! - [`assertions`] - Helpers for asserting on event streams
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ssolink::testing::{fixtures::TestFixtures, mock::{ScriptedReply, ScriptedTicketFetcher}};
//!
//! let fetcher = ScriptedTicketFetcher::new();
//! fetcher.script_registration(ScriptedReply::registration("abc-123"));
//! fetcher.script_status("abc-123", vec![ScriptedReply::status("success")]);
//! let config = TestFixtures::controller_config();
//! ```

pub mod assertions;
pub mod fixtures;
pub mod mock;

pub use assertions::*;
pub use fixtures::TestFixtures;
pub use mock::{ScriptedReply, ScriptedTicketFetcher};

/// Common test constants
pub mod constants {
    /// Base URL of the fake broker
    pub const TEST_BASE_URL: &str = "http://broker.test";

    /// Default test client id
    pub const TEST_CLIENT_ID: &str = "svc1";

    /// Default test session id
    pub const TEST_SESSION_ID: &str = "abc-123";

    /// Polling cadence used by fixtures
    pub const TEST_REFRESH_RATE_MS: u64 = 500;
}
