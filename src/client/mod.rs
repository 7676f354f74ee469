// ABOUTME: Outbound side of the gateway: links from the gateway to carrier SMSCs
// ABOUTME: Exports the client, its configuration, request types and error type

//! Outbound carrier links.
//!
//! An [`OutboundClient`] owns one TCP connection to a carrier SMSC, bound as
//! transceiver. Submissions run concurrently over that connection and are
//! matched to their responses by sequence number; delivery receipts pushed by
//! the carrier are acknowledged and surfaced as events.
//!
//! ```rust,no_run
//! use smpp_gateway::client::{
//!     BindCredentials, CarrierLink, ClientConfig, OutboundClient, SubmitParams, SubmitRequest,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let link = CarrierLink {
//!     carrier: "mtn".to_string(),
//!     address: "smsc.example.net:5016".to_string(),
//!     credentials: BindCredentials::new("mtn_smpp_user", "secret"),
//!     params: SubmitParams::default(),
//! };
//! let client = OutboundClient::connect(link, ClientConfig::default(), None).await?;
//!
//! let response = client
//!     .submit(SubmitRequest::new("MyBrand", "233241234567", "Hello!"))
//!     .await?;
//! println!("accepted as {}", response.message_id);
//!
//! client.disconnect().await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod keepalive;
mod outbound;
mod pending;
pub mod types;

pub use error::{SmppError, SmppResult};
pub use keepalive::KeepAliveConfig;
pub use outbound::{CarrierLink, OutboundClient};
pub use types::{BindCredentials, ClientConfig, SubmitParams, SubmitRequest, SubmitResponse};
