#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![deny(warnings)]
#![allow(clippy::multiple_crate_versions)]

/// Version of the ssolink library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod app_link;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod fetcher;
pub mod models;
pub mod polling;
pub mod settings;
pub mod utils;

// Test utilities (only available in test builds or with testing feature)
#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Re-export commonly used items
pub use app_link::{format_app_link, AppLinkResolver};
pub use config::{ControllerConfig, ControllerConfigBuilder, Environment};
pub use controller::{CreatedSession, SessionController};
pub use error::{ConfigError, SsoError};
pub use events::{EventBus, SsoEvent};
pub use fetcher::{HttpTicketFetcher, TicketFetcher};
pub use models::{SessionRegistration, SessionStatus, StatusTicket};
pub use polling::{CancelHandle, JobPhase};
pub use settings::SsoSettings;
