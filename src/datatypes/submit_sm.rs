use crate::codec::CodecError;
use crate::datatypes::{DataCoding, NumericPlanIndicator, Tlv, TypeOfNumber};
use bytes::Bytes;

/// This operation is used by an ESME to submit a short message to the SMSC for onward transmission
/// to a specified short message entity (SME).
#[derive(Clone, Debug, PartialEq)]
pub struct SubmitSm {
    /// SMS application service associated with the message. Max 5 octets.
    pub service_type: String,

    pub source_addr_ton: TypeOfNumber,
    pub source_addr_npi: NumericPlanIndicator,

    /// Address of the originating SME. Max 20 octets.
    pub source_addr: String,

    pub dest_addr_ton: TypeOfNumber,
    pub dest_addr_npi: NumericPlanIndicator,

    /// Directory number of the recipient. Max 20 octets.
    pub destination_addr: String,

    /// Message mode and type.
    pub esm_class: u8,

    pub protocol_id: u8,

    /// Level 0 (lowest) to 3 (highest).
    pub priority_flag: u8,

    /// Empty for immediate delivery, otherwise `YYMMDDhhmmsstnnp`.
    pub schedule_delivery_time: String,

    /// Empty for the SMSC default validity, otherwise `YYMMDDhhmmsstnnp`.
    pub validity_period: String,

    /// Bits 0-1 request an SMSC delivery receipt.
    pub registered_delivery: u8,

    pub replace_if_present_flag: u8,
    pub data_coding: DataCoding,
    pub sm_default_msg_id: u8,

    /// Up to 254 octets of user data. sm_length is derived on encode.
    pub short_message: Bytes,

    /// Optional parameters in wire order.
    pub tlvs: Vec<Tlv>,
}

impl SubmitSm {
    /// A submit_sm with default header fields and `text` encoded in the
    /// narrowest data coding that can carry it.
    pub fn new(
        source_addr: impl Into<String>,
        destination_addr: impl Into<String>,
        text: &str,
    ) -> Result<Self, CodecError> {
        let data_coding = DataCoding::for_text(text);
        Ok(Self {
            service_type: String::new(),
            source_addr_ton: TypeOfNumber::Unknown,
            source_addr_npi: NumericPlanIndicator::Unknown,
            source_addr: source_addr.into(),
            dest_addr_ton: TypeOfNumber::Unknown,
            dest_addr_npi: NumericPlanIndicator::Unknown,
            destination_addr: destination_addr.into(),
            esm_class: 0,
            protocol_id: 0,
            priority_flag: 0,
            schedule_delivery_time: String::new(),
            validity_period: String::new(),
            registered_delivery: 0,
            replace_if_present_flag: 0,
            data_coding,
            sm_default_msg_id: 0,
            short_message: data_coding.encode_text(text)?,
            tlvs: Vec::new(),
        })
    }

    pub fn delivery_receipt_requested(&self) -> bool {
        self.registered_delivery & 0b11 != 0
    }
}

impl_short_message_body!(SubmitSm);

impl_message_id_response!(SubmitSmResponse);
