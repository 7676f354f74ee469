// ABOUTME: One live outbound link per carrier, created on first use and replaced when it dies
// ABOUTME: A per-carrier async lock makes concurrent callers share a single connect attempt

use crate::client::{CarrierLink, ClientConfig, OutboundClient};
use crate::dispatch::error::DispatchError;
use crate::event::EventSender;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

type Slot = Arc<tokio::sync::Mutex<Option<Arc<OutboundClient>>>>;

/// Carrier link pool.
pub struct ClientPool {
    config: ClientConfig,
    events: Option<EventSender>,
    slots: Mutex<HashMap<String, Slot>>,
    closed: AtomicBool,
}

impl ClientPool {
    pub fn new(config: ClientConfig, events: Option<EventSender>) -> Self {
        Self {
            config,
            events,
            slots: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    fn slots(&self) -> std::sync::MutexGuard<'_, HashMap<String, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the live link for `carrier`, connecting with `link` when there
    /// is none or the pooled one has dropped.
    pub async fn get_or_connect(
        &self,
        carrier: &str,
        link: impl FnOnce() -> CarrierLink,
    ) -> Result<Arc<OutboundClient>, DispatchError> {
        let slot = {
            if self.closed.load(Ordering::Acquire) {
                return Err(DispatchError::ShutDown);
            }
            Arc::clone(self.slots().entry(carrier.to_string()).or_default())
        };

        let mut pooled = slot.lock().await;
        // Shutdown may have drained this slot while we waited.
        if self.closed.load(Ordering::Acquire) {
            return Err(DispatchError::ShutDown);
        }
        if let Some(client) = pooled.as_ref() {
            if client.is_connected() {
                return Ok(Arc::clone(client));
            }
            debug!(carrier, "evicting dead carrier link");
            *pooled = None;
        }

        let client = OutboundClient::connect(link(), self.config.clone(), self.events.clone())
            .await
            .map_err(|source| {
                warn!(carrier, error = %source, "failed to connect to carrier");
                DispatchError::Carrier {
                    carrier: carrier.to_string(),
                    source,
                }
            })?;
        info!(carrier, "carrier link established");

        let client = Arc::new(client);
        *pooled = Some(Arc::clone(&client));
        Ok(client)
    }

    /// The pooled link for `carrier`, live or not, without connecting.
    pub async fn get(&self, carrier: &str) -> Option<Arc<OutboundClient>> {
        let slot = self.slots().get(carrier).cloned()?;
        let pooled = slot.lock().await;
        pooled.clone()
    }

    /// Disconnects every pooled link and refuses further connects.
    pub async fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let slots: Vec<(String, Slot)> = self.slots().drain().collect();

        let mut disconnects = JoinSet::new();
        for (carrier, slot) in slots {
            disconnects.spawn(async move {
                let Some(client) = slot.lock().await.take() else {
                    return;
                };
                if let Err(e) = client.disconnect().await {
                    warn!(carrier = %carrier, error = %e, "disconnect failed");
                }
            });
        }
        while let Some(joined) = disconnects.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "disconnect task failed");
            }
        }
        info!("carrier pool shut down");
    }
}
