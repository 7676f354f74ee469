use crate::datatypes::{DataCoding, NumericPlanIndicator, Tlv, TypeOfNumber, find_tlv, tags};
use bytes::Bytes;
use num_enum::TryFromPrimitive;
use std::fmt;

/// esm_class message type bits marking an SMSC delivery receipt.
pub const ESM_CLASS_DELIVERY_RECEIPT: u8 = 0x04;

/// This operation is used by the SMSC to deliver a short message to an ESME.
/// It carries both mobile originated messages and delivery receipts.
#[derive(Clone, Debug, PartialEq)]
pub struct DeliverSm {
    pub service_type: String,
    pub source_addr_ton: TypeOfNumber,
    pub source_addr_npi: NumericPlanIndicator,
    pub source_addr: String,
    pub dest_addr_ton: TypeOfNumber,
    pub dest_addr_npi: NumericPlanIndicator,
    pub destination_addr: String,

    /// Bit 2 set: the short message is a delivery receipt.
    pub esm_class: u8,

    pub protocol_id: u8,
    pub priority_flag: u8,

    /// Unused in deliver_sm, always empty on the wire.
    pub schedule_delivery_time: String,

    /// Unused in deliver_sm, always empty on the wire.
    pub validity_period: String,

    pub registered_delivery: u8,
    pub replace_if_present_flag: u8,
    pub data_coding: DataCoding,
    pub sm_default_msg_id: u8,
    pub short_message: Bytes,
    pub tlvs: Vec<Tlv>,
}

impl DeliverSm {
    /// A delivery receipt in the conventional `id:… stat:… err:…` text form.
    pub fn receipt(
        source_addr: impl Into<String>,
        destination_addr: impl Into<String>,
        message_id: &str,
        state: MessageState,
        error_code: &str,
    ) -> Self {
        let text = format!(
            "id:{message_id} sub:001 dlvrd:001 stat:{} err:{error_code} text:",
            state.receipt_stat()
        );
        Self {
            service_type: String::new(),
            source_addr_ton: TypeOfNumber::Unknown,
            source_addr_npi: NumericPlanIndicator::Unknown,
            source_addr: source_addr.into(),
            dest_addr_ton: TypeOfNumber::Unknown,
            dest_addr_npi: NumericPlanIndicator::Unknown,
            destination_addr: destination_addr.into(),
            esm_class: ESM_CLASS_DELIVERY_RECEIPT,
            protocol_id: 0,
            priority_flag: 0,
            schedule_delivery_time: String::new(),
            validity_period: String::new(),
            registered_delivery: 0,
            replace_if_present_flag: 0,
            data_coding: DataCoding::SmscDefault,
            sm_default_msg_id: 0,
            short_message: Bytes::from(text.into_bytes()),
            tlvs: Vec::new(),
        }
    }

    pub fn is_delivery_receipt(&self) -> bool {
        self.esm_class & 0b0011_1100 == ESM_CLASS_DELIVERY_RECEIPT
    }

    /// Extracts receipt details, preferring the receipt TLVs over the
    /// free-form text carried in short_message.
    pub fn delivery_receipt(&self) -> DeliveryReceipt {
        let text = self.text();
        let fields = ReceiptText::parse(&text);

        let message_id = find_tlv(&self.tlvs, tags::RECEIPTED_MESSAGE_ID)
            .map(Tlv::as_string)
            .or_else(|| fields.get("id").map(str::to_string))
            .unwrap_or_default();

        let state = find_tlv(&self.tlvs, tags::MESSAGE_STATE)
            .and_then(Tlv::as_u8)
            .and_then(|raw| MessageState::try_from(raw).ok())
            .or_else(|| fields.get("stat").and_then(MessageState::from_receipt_stat))
            .unwrap_or(MessageState::Unknown);

        // network_error_code is 3 octets: network type then a 2-octet code
        let error_code = match find_tlv(&self.tlvs, tags::NETWORK_ERROR_CODE) {
            Some(tlv) if tlv.value.len() == 3 => {
                Some(u16::from_be_bytes([tlv.value[1], tlv.value[2]]).to_string())
            }
            _ => fields.get("err").map(str::to_string),
        };

        DeliveryReceipt {
            message_id,
            state,
            error_code,
        }
    }
}

impl_short_message_body!(DeliverSm);

impl_message_id_response!(DeliverSmResponse);

/// Final or intermediate state of a message as reported by the SMSC.
#[derive(TryFromPrimitive)]
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MessageState {
    Enroute = 1,
    Delivered = 2,
    Expired = 3,
    Deleted = 4,
    Undeliverable = 5,
    Accepted = 6,
    Unknown = 7,
    Rejected = 8,
}

impl MessageState {
    /// Abbreviation used in receipt text (`stat:DELIVRD`).
    pub fn receipt_stat(self) -> &'static str {
        match self {
            MessageState::Enroute => "ENROUTE",
            MessageState::Delivered => "DELIVRD",
            MessageState::Expired => "EXPIRED",
            MessageState::Deleted => "DELETED",
            MessageState::Undeliverable => "UNDELIV",
            MessageState::Accepted => "ACCEPTD",
            MessageState::Unknown => "UNKNOWN",
            MessageState::Rejected => "REJECTD",
        }
    }

    pub fn from_receipt_stat(stat: &str) -> Option<Self> {
        let state = match stat.to_ascii_uppercase().as_str() {
            "ENROUTE" => MessageState::Enroute,
            "DELIVRD" | "DELIVERED" => MessageState::Delivered,
            "EXPIRED" => MessageState::Expired,
            "DELETED" => MessageState::Deleted,
            "UNDELIV" | "UNDELIVERABLE" | "FAILED" => MessageState::Undeliverable,
            "ACCEPTD" | "ACCEPTED" => MessageState::Accepted,
            "UNKNOWN" => MessageState::Unknown,
            "REJECTD" | "REJECTED" => MessageState::Rejected,
            _ => return None,
        };
        Some(state)
    }

    /// Whether no further receipt is expected for the message.
    pub fn is_final(self) -> bool {
        !matches!(self, MessageState::Enroute | MessageState::Accepted)
    }
}

impl fmt::Display for MessageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MessageState::Enroute => "ENROUTE",
            MessageState::Delivered => "DELIVERED",
            MessageState::Expired => "EXPIRED",
            MessageState::Deleted => "DELETED",
            MessageState::Undeliverable => "UNDELIVERABLE",
            MessageState::Accepted => "ACCEPTED",
            MessageState::Unknown => "UNKNOWN",
            MessageState::Rejected => "REJECTED",
        };
        f.write_str(name)
    }
}

/// What a delivery receipt says about an earlier submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub message_id: String,
    pub state: MessageState,
    pub error_code: Option<String>,
}

/// `key:value` pairs of receipt text. Keys are single words; `text:` runs
/// to the end and is ignored.
struct ReceiptText<'a> {
    pairs: Vec<(&'a str, &'a str)>,
}

impl<'a> ReceiptText<'a> {
    fn parse(text: &'a str) -> Self {
        let body = match text.find("text:") {
            Some(at) => &text[..at],
            None => text,
        };
        let pairs = body
            .split_whitespace()
            .filter_map(|token| token.split_once(':'))
            .collect();
        Self { pairs }
    }

    fn get(&self, key: &str) -> Option<&'a str> {
        self.pairs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| *v)
    }
}
