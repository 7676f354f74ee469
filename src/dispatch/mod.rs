// ABOUTME: Routes accepted messages to carrier links with compliance, rate limiting and batching
// ABOUTME: Dispatcher is cheap to clone; all state sits behind one shared inner value

//! Outbound dispatch.
//!
//! A [`Dispatcher`] takes messages from the queue layer (or straight from
//! session `message` events), resolves the carrier for each destination,
//! applies compliance checks and the carrier's rate limits, and submits over
//! a pooled [`OutboundClient`](crate::client::OutboundClient). Each call
//! reports one outcome per attempt; retries are left to the caller.
//!
//! ```rust,no_run
//! use smpp_gateway::dispatch::{Dispatcher, GatewayConfig, SendJob};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = GatewayConfig::load("config/gateway.yaml")?;
//! let dispatcher = Dispatcher::builder(&config).build();
//!
//! let sent = dispatcher
//!     .submit(SendJob {
//!         message_id: "m-1".to_string(),
//!         from: "MyBrand".to_string(),
//!         to: "0241234567".to_string(),
//!         content: "Hello!".to_string(),
//!         client_id: None,
//!     })
//!     .await?;
//! println!("{} accepted it as {}", sent.carrier, sent.message_id);
//!
//! dispatcher.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod compliance;
mod config;
mod error;
mod job;
mod pool;
mod registry;
mod router;

pub use compliance::{AllowAll, ContentPolicy, DndRegistry, PolicyVerdict};
pub use config::{
    CarrierConfig, ConfigError, DispatchSection, GatewayConfig, RateLimits, ServerSection,
    SpecificParams,
};
pub use error::DispatchError;
pub use job::{BatchItem, BatchJob, BatchOutcome, BatchReport, Dispatched, SendJob};
pub use pool::ClientPool;
pub use registry::CarrierRegistry;
pub use router::{NumberPlan, Route, Router};

use crate::client::{ClientConfig, SubmitRequest};
use crate::datatypes::DataCoding;
use crate::event::{EventSender, MessageEvent};
use crate::ratelimit::RateLimiterRegistry;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

struct Inner {
    registry: Arc<CarrierRegistry>,
    router: Router,
    pool: ClientPool,
    limiters: Arc<RateLimiterRegistry>,
    content_policy: Arc<dyn ContentPolicy>,
    dnd: Arc<dyn DndRegistry>,
    batch_delay: Duration,
}

/// Assembles a [`Dispatcher`] from configuration plus injected collaborators.
pub struct DispatcherBuilder {
    registry: Arc<CarrierRegistry>,
    router: Router,
    client_config: ClientConfig,
    batch_delay: Duration,
    events: Option<EventSender>,
    limiters: Option<Arc<RateLimiterRegistry>>,
    content_policy: Arc<dyn ContentPolicy>,
    dnd: Arc<dyn DndRegistry>,
}

impl DispatcherBuilder {
    /// Where delivery reports from carrier links go.
    pub fn events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    /// Shares an existing limiter registry instead of creating one.
    pub fn rate_limiters(mut self, limiters: Arc<RateLimiterRegistry>) -> Self {
        self.limiters = Some(limiters);
        self
    }

    pub fn content_policy(mut self, policy: Arc<dyn ContentPolicy>) -> Self {
        self.content_policy = policy;
        self
    }

    pub fn dnd_registry(mut self, dnd: Arc<dyn DndRegistry>) -> Self {
        self.dnd = dnd;
        self
    }

    pub fn client_config(mut self, config: ClientConfig) -> Self {
        self.client_config = config;
        self
    }

    pub fn batch_delay(mut self, delay: Duration) -> Self {
        self.batch_delay = delay;
        self
    }

    pub fn build(self) -> Dispatcher {
        Dispatcher {
            inner: Arc::new(Inner {
                registry: self.registry,
                router: self.router,
                pool: ClientPool::new(self.client_config, self.events),
                limiters: self.limiters.unwrap_or_default(),
                content_policy: self.content_policy,
                dnd: self.dnd,
                batch_delay: self.batch_delay,
            }),
        }
    }
}

/// Message dispatcher shared by every producer in the process.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Dispatcher {
    pub fn builder(config: &GatewayConfig) -> DispatcherBuilder {
        DispatcherBuilder {
            registry: Arc::new(CarrierRegistry::from_config(config)),
            router: Router::from_config(config),
            client_config: config.dispatch.client_config(),
            batch_delay: config.dispatch.batch_delay,
            events: None,
            limiters: None,
            content_policy: Arc::new(AllowAll),
            dnd: Arc::new(AllowAll),
        }
    }

    pub fn registry(&self) -> &Arc<CarrierRegistry> {
        &self.inner.registry
    }

    pub fn router(&self) -> &Router {
        &self.inner.router
    }

    pub fn pool(&self) -> &ClientPool {
        &self.inner.pool
    }

    pub fn rate_limiters(&self) -> &Arc<RateLimiterRegistry> {
        &self.inner.limiters
    }

    /// Carrier and international number for `destination`.
    pub fn route(&self, destination: &str) -> Result<Route, DispatchError> {
        self.inner.router.resolve(destination)
    }

    /// Sends one queued message.
    pub async fn submit(&self, job: SendJob) -> Result<Dispatched, DispatchError> {
        let route = self.admit(&job.to, &job.content)?;
        let request = SubmitRequest::new(job.from, route.msisdn.as_str(), job.content)
            .with_reference(job.message_id);
        self.deliver(&route.carrier, request).await
    }

    /// Sends a message accepted by an inbound session, keeping its data
    /// coding and receipt flags. The carrier the submitting ESME bound for
    /// wins over prefix routing when it is a known carrier.
    pub async fn submit_message(&self, event: MessageEvent) -> Result<Dispatched, DispatchError> {
        let route = self.admit(&event.destination, &event.body)?;
        let carrier = if self.inner.registry.contains(&event.carrier) {
            event.carrier
        } else {
            route.carrier
        };

        let request = SubmitRequest::new(event.source, route.msisdn.as_str(), event.body)
            .with_data_coding(DataCoding::from_byte(event.data_coding))
            .with_registered_delivery(event.registered_delivery)
            .with_reference(event.message_id);
        self.deliver(&carrier, request).await
    }

    /// Sends a batch grouped by carrier, in chunks of each carrier's
    /// throughput with the batch delay between chunks.
    ///
    /// Carriers are worked on concurrently. A failing message does not stop
    /// the rest of the batch; the report lists every message in input order.
    pub async fn submit_batch(&self, job: BatchJob) -> BatchReport {
        let total = job.messages.len();
        let mut outcomes: Vec<BatchOutcome> = Vec::with_capacity(total);
        let mut groups: BTreeMap<String, Vec<(usize, SubmitRequest)>> = BTreeMap::new();

        for (index, item) in job.messages.into_iter().enumerate() {
            let (carrier, result) = match self.admit(&item.recipient, &item.content) {
                Ok(route) => {
                    let request = SubmitRequest::new(
                        job.from.as_str(),
                        route.msisdn.as_str(),
                        item.content,
                    )
                    .with_reference(item.message_id.as_str());
                    groups
                        .entry(route.carrier.clone())
                        .or_default()
                        .push((index, request));
                    // Overwritten once the carrier task reports back.
                    (
                        Some(route.carrier),
                        Err(DispatchError::Task("submission did not complete".to_string())),
                    )
                }
                Err(e) => {
                    debug!(batch = %job.batch_id, message_id = %item.message_id, error = %e, "batch message refused");
                    (None, Err(e))
                }
            };
            outcomes.push(BatchOutcome {
                message_id: item.message_id,
                recipient: item.recipient,
                carrier,
                result,
            });
        }

        let mut carriers = JoinSet::new();
        for (carrier, requests) in groups {
            let this = self.clone();
            carriers.spawn(async move { this.send_group(carrier, requests).await });
        }
        while let Some(joined) = carriers.join_next().await {
            match joined {
                Ok(sent) => {
                    for (index, result) in sent {
                        outcomes[index].result = result;
                    }
                }
                Err(e) => warn!(batch = %job.batch_id, error = %e, "batch carrier task failed"),
            }
        }

        let report = BatchReport {
            batch_id: job.batch_id,
            outcomes,
        };
        info!(
            batch = %report.batch_id,
            total,
            accepted = report.accepted(),
            failed = report.failed(),
            "batch dispatched"
        );
        report
    }

    /// Disconnects every carrier link. Later submissions fail with
    /// [`DispatchError::ShutDown`].
    pub async fn shutdown(&self) {
        self.inner.pool.shutdown().await;
    }

    /// Compliance and routing checks that need no carrier link.
    fn admit(&self, destination: &str, content: &str) -> Result<Route, DispatchError> {
        let verdict = self.inner.content_policy.check(content);
        if !verdict.allowed {
            return Err(DispatchError::ContentRejected(
                verdict
                    .reason
                    .unwrap_or_else(|| "content not allowed".to_string()),
            ));
        }

        let route = self.inner.router.resolve(destination)?;
        if route.fallback {
            debug!(destination = %route.msisdn, carrier = %route.carrier, "no prefix matched, using default carrier");
        }
        if self.inner.dnd.is_blocked(&route.msisdn) {
            return Err(DispatchError::DoNotDisturb(route.msisdn));
        }
        Ok(route)
    }

    async fn deliver(
        &self,
        carrier: &str,
        request: SubmitRequest,
    ) -> Result<Dispatched, DispatchError> {
        let config = self
            .inner
            .registry
            .get(carrier)
            .ok_or_else(|| DispatchError::UnknownCarrier(carrier.to_string()))?;

        let limiter = self
            .inner
            .limiters
            .get_or_create_windows(carrier, &config.rate_windows());
        if !limiter.try_consume(1) {
            debug!(carrier, destination = %request.destination, "rate limited");
            return Err(DispatchError::RateLimited(carrier.to_string()));
        }

        let client = self
            .inner
            .pool
            .get_or_connect(carrier, || config.link(carrier))
            .await?;

        let destination = request.destination.clone();
        let response = client
            .submit(request)
            .await
            .map_err(|source| DispatchError::Carrier {
                carrier: carrier.to_string(),
                source,
            })?;
        debug!(
            carrier,
            destination = %destination,
            message_id = %response.message_id,
            "message submitted"
        );

        Ok(Dispatched {
            carrier: carrier.to_string(),
            message_id: response.message_id,
            status: response.status,
        })
    }

    async fn send_group(
        self,
        carrier: String,
        requests: Vec<(usize, SubmitRequest)>,
    ) -> Vec<(usize, Result<Dispatched, DispatchError>)> {
        let chunk_size = self
            .inner
            .registry
            .get(&carrier)
            .and_then(|config| usize::try_from(config.throughput).ok())
            .unwrap_or(1)
            .max(1);

        let mut sent = Vec::with_capacity(requests.len());
        for (n, chunk) in requests.chunks(chunk_size).enumerate() {
            if n > 0 {
                tokio::time::sleep(self.inner.batch_delay).await;
            }
            debug!(carrier = %carrier, chunk = n, size = chunk.len(), "sending batch chunk");

            let mut submissions = JoinSet::new();
            for (index, request) in chunk.iter().cloned() {
                let this = self.clone();
                let carrier = carrier.clone();
                submissions.spawn(async move { (index, this.deliver(&carrier, request).await) });
            }
            while let Some(joined) = submissions.join_next().await {
                match joined {
                    Ok(result) => sent.push(result),
                    Err(e) => warn!(carrier = %carrier, error = %e, "batch submission task failed"),
                }
            }
        }
        sent
    }
}
