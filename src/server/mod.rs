// ABOUTME: Inbound side of the gateway: ESME sessions and the TCP listener that spawns them
// ABOUTME: Credentials are checked through the Authenticator seam; sessions publish domain events

//! Inbound SMPP server.
//!
//! Every accepted connection gets its own [`Session`] state machine, driven
//! by one task, so PDUs from one peer are handled strictly in order while
//! different peers run concurrently. Live sessions are listed in a
//! [`SessionRegistry`] keyed by remote address.

mod listener;
mod session;

pub use listener::{Server, SessionInfo, SessionRegistry};
pub use session::{Action, Session, SessionState};

use crate::event::EventSender;
use crate::message_id::MessageIdGenerator;
use std::sync::Arc;
use std::time::Duration;

/// Default inbound SMPP port.
pub const DEFAULT_PORT: u16 = 2775;

/// Checks bind credentials.
///
/// Returns the carrier the credentials belong to, or `None` to reject the
/// bind.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, system_id: &str, password: &str) -> Option<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Gateway-originated enquire_link cadence once bound; zero disables it.
    pub enquire_link_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enquire_link_interval: Duration::from_secs(30),
        }
    }
}

impl ServerConfig {
    pub fn with_enquire_link_interval(mut self, interval: Duration) -> Self {
        self.enquire_link_interval = interval;
        self
    }
}

/// Collaborators shared by every session of one server.
pub struct SessionContext {
    pub config: ServerConfig,
    pub authenticator: Arc<dyn Authenticator>,
    pub events: EventSender,
    pub message_ids: MessageIdGenerator,
}

impl SessionContext {
    pub fn new(
        config: ServerConfig,
        authenticator: Arc<dyn Authenticator>,
        events: EventSender,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            authenticator,
            events,
            message_ids: MessageIdGenerator::new(),
        })
    }
}
