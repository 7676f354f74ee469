// ABOUTME: Supporting types for outbound links: credentials, link settings and submit requests
// ABOUTME: Carrier-specific protocol overrides are applied to every submit_sm built for that carrier

use crate::client::keepalive::KeepAliveConfig;
use crate::codec::{CodecError, MAX_SHORT_MESSAGE_LENGTH};
use crate::datatypes::{DataCoding, NumericPlanIndicator, SubmitSm, Tlv, TypeOfNumber, tags};
use std::time::Duration;

/// SMPP bind operation credentials
///
/// Outbound links always bind as transceiver, so submissions and delivery
/// receipts share one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindCredentials {
    /// System identifier for authentication
    pub system_id: String,
    /// Password for authentication
    pub password: String,
    /// System type (empty unless the carrier asks for one)
    pub system_type: String,
}

impl BindCredentials {
    pub fn new(system_id: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            system_id: system_id.into(),
            password: password.into(),
            system_type: String::new(),
        }
    }

    /// Set system type
    pub fn with_system_type(mut self, system_type: impl Into<String>) -> Self {
        self.system_type = system_type.into();
        self
    }
}

/// Timing and capacity of an outbound link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Deadline for connect, bind and each submit (default: 30 seconds)
    pub request_timeout: Duration,
    /// Deadline for the best-effort unbind on disconnect (default: 5 seconds)
    pub unbind_timeout: Duration,
    pub keep_alive: KeepAliveConfig,
    /// Concurrent requests allowed on the link (default: 1024)
    pub max_in_flight: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            unbind_timeout: Duration::from_secs(5),
            keep_alive: KeepAliveConfig::default(),
            max_in_flight: 1024,
        }
    }
}

impl ClientConfig {
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_unbind_timeout(mut self, timeout: Duration) -> Self {
        self.unbind_timeout = timeout;
        self
    }

    pub fn with_keep_alive(mut self, keep_alive: KeepAliveConfig) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight;
        self
    }
}

/// Protocol fields a carrier wants set on every submit_sm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitParams {
    pub service_type: String,
    pub source_addr_ton: TypeOfNumber,
    pub source_addr_npi: NumericPlanIndicator,
    pub dest_addr_ton: TypeOfNumber,
    pub dest_addr_npi: NumericPlanIndicator,
    pub esm_class: u8,
    pub protocol_id: u8,
    pub priority_flag: u8,
    pub schedule_delivery_time: String,
    pub validity_period: String,
    /// Used when the request does not say.
    pub registered_delivery: u8,
    pub replace_if_present_flag: u8,
    pub sm_default_msg_id: u8,
}

impl Default for SubmitParams {
    fn default() -> Self {
        Self {
            service_type: String::new(),
            source_addr_ton: TypeOfNumber::Unknown,
            source_addr_npi: NumericPlanIndicator::Unknown,
            dest_addr_ton: TypeOfNumber::International,
            dest_addr_npi: NumericPlanIndicator::Isdn,
            esm_class: 0,
            protocol_id: 0,
            priority_flag: 0,
            schedule_delivery_time: String::new(),
            validity_period: String::new(),
            registered_delivery: 1,
            replace_if_present_flag: 0,
            sm_default_msg_id: 0,
        }
    }
}

impl SubmitParams {
    /// Builds the submit_sm for `request` with these overrides applied.
    ///
    /// Text longer than a short_message can carry moves to the
    /// message_payload parameter.
    pub fn build(&self, request: &SubmitRequest) -> Result<SubmitSm, CodecError> {
        let mut submit = SubmitSm::new(
            request.source.clone(),
            request.destination.clone(),
            &request.body,
        )?;
        if let Some(coding) = request.data_coding {
            submit.data_coding = coding;
            submit.short_message = coding.encode_text(&request.body)?;
        }

        submit.service_type = self.service_type.clone();
        submit.source_addr_ton = self.source_addr_ton;
        submit.source_addr_npi = self.source_addr_npi;
        submit.dest_addr_ton = self.dest_addr_ton;
        submit.dest_addr_npi = self.dest_addr_npi;
        submit.esm_class = self.esm_class;
        submit.protocol_id = self.protocol_id;
        submit.priority_flag = self.priority_flag;
        submit.schedule_delivery_time = self.schedule_delivery_time.clone();
        submit.validity_period = self.validity_period.clone();
        submit.registered_delivery = request
            .registered_delivery
            .unwrap_or(self.registered_delivery);
        submit.replace_if_present_flag = self.replace_if_present_flag;
        submit.sm_default_msg_id = self.sm_default_msg_id;

        if submit.short_message.len() > MAX_SHORT_MESSAGE_LENGTH {
            let payload = std::mem::take(&mut submit.short_message);
            submit.tlvs.push(Tlv::new(tags::MESSAGE_PAYLOAD, payload));
        }
        Ok(submit)
    }
}

/// One message to hand to a carrier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitRequest {
    pub source: String,
    pub destination: String,
    pub body: String,
    /// Chosen from the text when unset.
    pub data_coding: Option<DataCoding>,
    /// Falls back to the carrier default when unset.
    pub registered_delivery: Option<u8>,
    /// Gateway message id, reported back if the carrier omits its own.
    pub reference: Option<String>,
}

impl SubmitRequest {
    pub fn new(
        source: impl Into<String>,
        destination: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            body: body.into(),
            data_coding: None,
            registered_delivery: None,
            reference: None,
        }
    }

    pub fn with_data_coding(mut self, data_coding: DataCoding) -> Self {
        self.data_coding = Some(data_coding);
        self
    }

    pub fn with_registered_delivery(mut self, registered_delivery: u8) -> Self {
        self.registered_delivery = Some(registered_delivery);
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }
}

/// Carrier acknowledgement of a submit_sm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitResponse {
    /// Carrier-assigned message id.
    pub message_id: String,
    pub status: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carrier_overrides_apply_to_submit_sm() {
        let params = SubmitParams {
            service_type: "CMT".into(),
            validity_period: "000001000000000R".into(),
            priority_flag: 1,
            ..SubmitParams::default()
        };
        let request = SubmitRequest::new("MyBrand", "233241234567", "Hello");

        let submit = params.build(&request).unwrap();
        assert_eq!(submit.service_type, "CMT");
        assert_eq!(submit.validity_period, "000001000000000R");
        assert_eq!(submit.priority_flag, 1);
        assert_eq!(submit.dest_addr_ton, TypeOfNumber::International);
        assert_eq!(submit.registered_delivery, 1);
        assert_eq!(submit.text(), "Hello");
    }

    #[test]
    fn request_flags_win_over_carrier_defaults() {
        let request = SubmitRequest::new("MyBrand", "233241234567", "Hello")
            .with_registered_delivery(0)
            .with_data_coding(DataCoding::Ucs2);

        let submit = SubmitParams::default().build(&request).unwrap();
        assert_eq!(submit.registered_delivery, 0);
        assert_eq!(submit.data_coding, DataCoding::Ucs2);
        assert_eq!(submit.short_message.len(), 10);
    }

    #[test]
    fn long_text_moves_to_message_payload() {
        let body = "x".repeat(300);
        let request = SubmitRequest::new("MyBrand", "233241234567", body.clone());

        let submit = SubmitParams::default().build(&request).unwrap();
        assert!(submit.short_message.is_empty());
        assert_eq!(submit.text(), body);
    }
}
