// ABOUTME: Job payloads handed over by the queue layer and the per-attempt results returned to it
// ABOUTME: Payload keys are camelCase to match the queue's JSON/YAML documents

use crate::dispatch::error::DispatchError;
use serde::{Deserialize, Serialize};

/// One message to one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendJob {
    pub message_id: String,
    /// Sender id or short code.
    pub from: String,
    pub to: String,
    pub content: String,
    #[serde(default)]
    pub client_id: Option<String>,
}

/// Messages from one sender, dispatched together.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchJob {
    pub batch_id: String,
    pub from: String,
    pub messages: Vec<BatchItem>,
    #[serde(default)]
    pub client_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItem {
    pub recipient: String,
    pub content: String,
    pub message_id: String,
}

/// A message the carrier accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatched {
    pub carrier: String,
    /// Carrier message id, or the gateway id when the carrier sent none.
    pub message_id: String,
    pub status: u32,
}

/// Result of one batch message.
#[derive(Debug)]
pub struct BatchOutcome {
    pub message_id: String,
    pub recipient: String,
    /// Carrier the message was routed to, when routing succeeded.
    pub carrier: Option<String>,
    pub result: Result<Dispatched, DispatchError>,
}

/// Per-message results of a batch, in input order.
#[derive(Debug)]
pub struct BatchReport {
    pub batch_id: String,
    pub outcomes: Vec<BatchOutcome>,
}

impl BatchReport {
    pub fn accepted(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.accepted()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_payload_uses_queue_keys() {
        let yaml = r#"
batchId: b-1
from: MyBrand
clientId: acme
messages:
  - recipient: "0241234567"
    content: Hello
    messageId: m-1
"#;
        let job: BatchJob = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(job.batch_id, "b-1");
        assert_eq!(job.client_id.as_deref(), Some("acme"));
        assert_eq!(job.messages[0].message_id, "m-1");

        let single: SendJob = serde_yaml::from_str(
            "messageId: m-2\nfrom: MyBrand\nto: \"233241234567\"\ncontent: Hi\n",
        )
        .unwrap();
        assert_eq!(single.client_id, None);
        assert_eq!(single.to, "233241234567");
    }
}
