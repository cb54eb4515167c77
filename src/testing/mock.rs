//! Mock objects and fake implementations for testing
//!
//! [`ScriptedTicketFetcher`] stands in for the broker. Registration replies
//! are served from one queue; status replies from one queue per session id.

use crate::error::SsoError;
use crate::fetcher::TicketFetcher;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::fixtures::TestFixtures;

const REGISTRATION_PATH: &str = "/api/3rdService/register/session/";
const STATUS_PATH: &str = "/api/3rdService/register/status/";

/// One scripted broker reply
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Successful response with this JSON body
    Body(Value),
    /// Non-success HTTP status
    NoData,
    /// Transport failure
    TransportError(String),
    /// Wait, then answer with the inner reply
    Delayed(Duration, Box<ScriptedReply>),
}

impl ScriptedReply {
    #[must_use]
    pub fn status(status: &str) -> Self {
        Self::Body(TestFixtures::status_response(status))
    }

    #[must_use]
    pub fn registration(session_id: &str) -> Self {
        Self::Body(TestFixtures::registration_response(session_id))
    }

    #[must_use]
    pub fn delayed(delay: Duration, reply: ScriptedReply) -> Self {
        Self::Delayed(delay, Box::new(reply))
    }
}

/// Fake broker answering from scripted queues
///
/// An exhausted registration queue answers [`ScriptedReply::NoData`]. An
/// exhausted status queue keeps answering `created`.
#[derive(Debug, Default)]
pub struct ScriptedTicketFetcher {
    registrations: Mutex<VecDeque<ScriptedReply>>,
    statuses: Mutex<HashMap<String, VecDeque<ScriptedReply>>>,
    requests: Mutex<Vec<String>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ScriptedTicketFetcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a registration reply
    pub fn script_registration(&self, reply: ScriptedReply) {
        lock(&self.registrations).push_back(reply);
    }

    /// Queue status replies for `session_id`
    pub fn script_status(&self, session_id: &str, replies: Vec<ScriptedReply>) {
        lock(&self.statuses)
            .entry(session_id.to_string())
            .or_default()
            .extend(replies);
    }

    /// Every URL requested so far, in order
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        lock(&self.requests).clone()
    }

    #[must_use]
    pub fn registration_request_count(&self) -> usize {
        lock(&self.requests)
            .iter()
            .filter(|url| url.contains(REGISTRATION_PATH))
            .count()
    }

    #[must_use]
    pub fn status_request_count(&self, session_id: &str) -> usize {
        let suffix = format!("{STATUS_PATH}{session_id}");
        lock(&self.requests)
            .iter()
            .filter(|url| url.ends_with(&suffix))
            .count()
    }

    fn next_reply(&self, url: &str) -> ScriptedReply {
        if url.contains(REGISTRATION_PATH) {
            return lock(&self.registrations)
                .pop_front()
                .unwrap_or(ScriptedReply::NoData);
        }

        if let Some((_, session_id)) = url.split_once(STATUS_PATH) {
            return lock(&self.statuses)
                .get_mut(session_id)
                .and_then(VecDeque::pop_front)
                .unwrap_or_else(|| ScriptedReply::status("created"));
        }

        ScriptedReply::NoData
    }
}

#[async_trait]
impl TicketFetcher for ScriptedTicketFetcher {
    async fn fetch(&self, url: &str) -> Result<Option<Value>, SsoError> {
        lock(&self.requests).push(url.to_string());

        let mut reply = self.next_reply(url);
        loop {
            match reply {
                ScriptedReply::Body(body) => return Ok(Some(body)),
                ScriptedReply::NoData => return Ok(None),
                ScriptedReply::TransportError(msg) => return Err(SsoError::Transport(msg)),
                ScriptedReply::Delayed(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    reply = *inner;
                }
            }
        }
    }
}
