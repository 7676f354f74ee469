// ABOUTME: Domain events surfaced to the queue layer by sessions and carrier links
// ABOUTME: Emission is non-blocking over a bounded channel; a full or closed channel drops with a warning

use crate::datatypes::MessageState;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::warn;

/// Default capacity of the event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// A message submitted by an ESME, ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEvent {
    pub carrier: String,
    pub source: String,
    pub destination: String,
    pub body: String,
    pub message_id: String,
    /// Raw data_coding octet of the submission.
    pub data_coding: u8,
    pub registered_delivery: u8,
}

/// Delivery status reported for an earlier message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryReportEvent {
    pub carrier: String,
    pub message_id: String,
    #[serde(serialize_with = "serialize_state")]
    pub state: MessageState,
    pub error_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayEvent {
    Message(MessageEvent),
    DeliveryReport(DeliveryReportEvent),
}

fn serialize_state<S: serde::Serializer>(state: &MessageState, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(state)
}

/// Receiving end handed to the queue layer.
pub type EventReceiver = mpsc::Receiver<GatewayEvent>;

/// Cloneable emitter shared by every session and carrier link.
///
/// Emitters never wait on the consumer.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::Sender<GatewayEvent>,
}

impl EventSender {
    pub fn channel(capacity: usize) -> (EventSender, EventReceiver) {
        let (tx, rx) = mpsc::channel(capacity);
        (EventSender { tx }, rx)
    }

    /// Queues `event`; returns false if it had to be dropped.
    pub fn emit(&self, event: GatewayEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!(?event, "event channel full, dropping event");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("event channel closed, dropping event");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(id: &str) -> GatewayEvent {
        GatewayEvent::DeliveryReport(DeliveryReportEvent {
            carrier: "mtn".into(),
            message_id: id.into(),
            state: MessageState::Delivered,
            error_code: None,
        })
    }

    #[tokio::test]
    async fn full_channel_drops_without_blocking() {
        let (events, mut rx) = EventSender::channel(1);
        assert!(events.emit(report("a")));
        assert!(!events.emit(report("b")));
        assert_eq!(rx.recv().await, Some(report("a")));
    }

    #[test]
    fn closed_channel_is_reported() {
        let (events, rx) = EventSender::channel(4);
        drop(rx);
        assert!(!events.emit(report("a")));
    }

    #[test]
    fn events_serialize_with_camel_case_fields() {
        let event = GatewayEvent::Message(MessageEvent {
            carrier: "mtn".into(),
            source: "233241234567".into(),
            destination: "233501234567".into(),
            body: "Hello".into(),
            message_id: "ID1".into(),
            data_coding: 0,
            registered_delivery: 1,
        });
        let yaml = serde_yaml::to_string(&event).unwrap();
        assert!(yaml.contains("type: message"));
        assert!(yaml.contains("messageId: ID1"));
        assert!(yaml.contains("registeredDelivery: 1"));

        let yaml = serde_yaml::to_string(&report("ID2")).unwrap();
        assert!(yaml.contains("type: delivery_report"));
        assert!(yaml.contains("state: DELIVERED"));
    }
}
