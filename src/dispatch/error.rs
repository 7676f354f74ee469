// ABOUTME: Failure of one dispatch attempt, typed so the queue layer can pick a retry policy
// ABOUTME: Rate limiting and transient carrier errors are retryable; routing and policy failures are not

use crate::client::SmppError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("invalid destination number: {0}")]
    InvalidNumber(String),

    /// Routed to a carrier the registry does not know.
    #[error("unknown carrier: {0}")]
    UnknownCarrier(String),

    #[error("content rejected: {0}")]
    ContentRejected(String),

    #[error("recipient {0} opted out of messages")]
    DoNotDisturb(String),

    #[error("rate limit exceeded for carrier {0}")]
    RateLimited(String),

    #[error("carrier {carrier}: {source}")]
    Carrier {
        carrier: String,
        #[source]
        source: SmppError,
    },

    #[error("dispatcher is shut down")]
    ShutDown,

    #[error("submission task failed: {0}")]
    Task(String),
}

impl DispatchError {
    /// Whether the same message may succeed if re-queued.
    pub fn is_retryable(&self) -> bool {
        match self {
            DispatchError::RateLimited(_) => true,
            DispatchError::Carrier { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::CommandStatus;

    #[test]
    fn retry_classification() {
        assert!(DispatchError::RateLimited("mtn".into()).is_retryable());
        assert!(
            DispatchError::Carrier {
                carrier: "mtn".into(),
                source: SmppError::Timeout,
            }
            .is_retryable()
        );
        assert!(
            !DispatchError::Carrier {
                carrier: "mtn".into(),
                source: SmppError::CarrierStatus(CommandStatus::InvalidDestinationAddress.code()),
            }
            .is_retryable()
        );
        assert!(!DispatchError::UnknownCarrier("glo".into()).is_retryable());
        assert!(!DispatchError::ContentRejected("spam".into()).is_retryable());
    }
}
