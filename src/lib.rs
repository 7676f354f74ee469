#[macro_use]
mod macros;

pub mod client;
pub mod codec;
pub mod connection;
pub mod datatypes;
pub mod dispatch;
pub mod event;
pub mod message_id;
pub mod ratelimit;
pub mod sequence;
pub mod server;

#[cfg(test)]
mod tests;

// Re-export codec types for direct access
pub use codec::{CodecError, Decodable, Encodable, Frame, Pdu, PduHeader};

// Re-export the gateway building blocks for easy access
pub use client::{OutboundClient, SmppError, SmppResult};
pub use dispatch::{DispatchError, Dispatcher, GatewayConfig};
pub use event::{EventReceiver, EventSender, GatewayEvent};
pub use ratelimit::{RateLimitConfig, RateLimiter, RateLimiterRegistry};
pub use server::{Server, ServerConfig};

/// Error returned by the binaries' top-level functions.
///
/// Library code returns the specific error of its layer (`CodecError`,
/// `SmppError`, `ConfigError`, `DispatchError`); this boxed form is only for
/// gluing them together at the edge of the process.
pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// A specialized `Result` type for gateway entry points.
///
/// # Examples
///
/// Running the inbound server and forwarding accepted messages to carriers:
///
/// ```rust,no_run
/// use smpp_gateway::dispatch::CarrierRegistry;
/// use smpp_gateway::{Dispatcher, EventSender, GatewayConfig, GatewayEvent, Server};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> smpp_gateway::Result<()> {
///     let config = GatewayConfig::load("config/gateway.yaml")?;
///     let (events, mut rx) = EventSender::channel(1024);
///
///     let dispatcher = Dispatcher::builder(&config).events(events.clone()).build();
///     let registry = Arc::new(CarrierRegistry::from_config(&config));
///     let server = Server::new(config.server.server_config(), registry, events);
///     server.start(config.server.port).await?;
///
///     while let Some(event) = rx.recv().await {
///         if let GatewayEvent::Message(message) = event {
///             let dispatcher = dispatcher.clone();
///             tokio::spawn(async move { dispatcher.submit_message(message).await });
///         }
///     }
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;
