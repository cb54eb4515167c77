#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![deny(warnings)]
#![allow(clippy::multiple_crate_versions)]

use anyhow::{anyhow, Context};
use log::warn;
use ssolink::{
    settings::SsoSettings, utils::logging::LoggingHelper, ControllerConfig, SessionController,
    SessionStatus, SsoEvent,
};
use std::process::ExitCode;
use tokio::sync::broadcast::{self, error::RecvError};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Load configuration from Settings.toml and environment variables
    let settings = SsoSettings::load().map_err(|e| anyhow!("Failed to load settings: {e}"))?;
    LoggingHelper::init(&settings.logging).context("Failed to initialize logger")?;

    let config = settings
        .to_controller_config()
        .context("Invalid client configuration")?;
    print_startup_info(&config);

    let controller = SessionController::new(config);
    let mut events = controller.subscribe();

    let link_task = tokio::spawn({
        let controller = controller.clone();
        async move {
            println!("App link: {}", controller.app_link().await);
        }
    });

    let created = controller
        .create_session()
        .await
        .context("Failed to create SSO session")?;
    println!("Session: {}", created.session_id);

    let succeeded = tokio::select! {
        succeeded = watch_events(&mut events) => succeeded,
        _ = tokio::signal::ctrl_c() => {
            println!("Interrupted, cancelling session");
            false
        }
    };

    controller.destroy();
    link_task.abort();

    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Print events until the handshake ends; `true` on `success`
async fn watch_events(events: &mut broadcast::Receiver<SsoEvent>) -> bool {
    loop {
        match events.recv().await {
            Ok(SsoEvent::CodeRefresh { session_id, .. }) => {
                println!("[code-refresh] new session code {session_id}");
            }
            Ok(SsoEvent::SsoProcessing { session_id, .. }) => {
                println!("[sso-processing] session {session_id} is being processed");
            }
            Ok(SsoEvent::SsoComplete { session_id, ticket }) => {
                println!("[sso-complete] session {session_id} finished: {}", ticket.status);
                if let Some(custom_data) = &ticket.custom_data {
                    println!("  customData: {custom_data}");
                }
                return ticket.status == SessionStatus::Success;
            }
            Ok(SsoEvent::CodeExpired { session_id }) => {
                println!("[code-expired] session {session_id} expired, request a new code");
                return false;
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!("Event stream lagged, skipped {skipped} events");
            }
            Err(RecvError::Closed) => return false,
        }
    }
}

fn print_startup_info(config: &ControllerConfig) {
    println!("ssolink {}", ssolink::VERSION);
    println!("  Environment:  {}", config.env());
    println!("  API origin:   {}", config.base_url());
    println!("  Client id:    {}", config.client_id());
    println!("  Refresh rate: {}ms", config.refresh_rate().as_millis());
    println!();
}
