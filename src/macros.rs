// ABOUTME: Macros shared by PDU bodies that have identical wire layouts
// ABOUTME: submit_sm/deliver_sm share their mandatory fields; their responses share message_id

/// Implements `Encodable`/`Decodable` for a struct with the submit_sm
/// mandatory field layout followed by optional TLVs.
///
/// The struct must have the fields: `service_type`, `source_addr_ton`,
/// `source_addr_npi`, `source_addr`, `dest_addr_ton`, `dest_addr_npi`,
/// `destination_addr`, `esm_class`, `protocol_id`, `priority_flag`,
/// `schedule_delivery_time`, `validity_period`, `registered_delivery`,
/// `replace_if_present_flag`, `data_coding`, `sm_default_msg_id`,
/// `short_message` and `tlvs`.
macro_rules! impl_short_message_body {
    ($pdu_type:ident) => {
        impl $crate::codec::Encodable for $pdu_type {
            fn encode(&self, buf: &mut bytes::BytesMut) -> Result<(), $crate::codec::CodecError> {
                use $crate::codec::{encode_cstring, encode_short_message, limits};
                use bytes::BufMut;

                encode_cstring(buf, &self.service_type, limits::SERVICE_TYPE, "service_type")?;
                buf.put_u8(self.source_addr_ton as u8);
                buf.put_u8(self.source_addr_npi as u8);
                encode_cstring(buf, &self.source_addr, limits::ADDRESS, "source_addr")?;
                buf.put_u8(self.dest_addr_ton as u8);
                buf.put_u8(self.dest_addr_npi as u8);
                encode_cstring(
                    buf,
                    &self.destination_addr,
                    limits::ADDRESS,
                    "destination_addr",
                )?;
                buf.put_u8(self.esm_class);
                buf.put_u8(self.protocol_id);
                buf.put_u8(self.priority_flag);
                encode_cstring(
                    buf,
                    &self.schedule_delivery_time,
                    limits::TIME,
                    "schedule_delivery_time",
                )?;
                encode_cstring(buf, &self.validity_period, limits::TIME, "validity_period")?;
                buf.put_u8(self.registered_delivery);
                buf.put_u8(self.replace_if_present_flag);
                buf.put_u8(self.data_coding.to_byte());
                buf.put_u8(self.sm_default_msg_id);
                encode_short_message(buf, &self.short_message)?;

                for tlv in &self.tlvs {
                    tlv.encode(buf)?;
                }
                Ok(())
            }
        }

        impl $crate::codec::Decodable for $pdu_type {
            fn decode(buf: &mut std::io::Cursor<&[u8]>) -> Result<Self, $crate::codec::CodecError> {
                use $crate::codec::{decode_cstring, decode_short_message, decode_u8};
                use $crate::datatypes::{DataCoding, NumericPlanIndicator, Tlv, TypeOfNumber};

                Ok($pdu_type {
                    service_type: decode_cstring(buf, "service_type")?,
                    source_addr_ton: TypeOfNumber::from_byte(decode_u8(buf, "source_addr_ton")?),
                    source_addr_npi: NumericPlanIndicator::from_byte(decode_u8(
                        buf,
                        "source_addr_npi",
                    )?),
                    source_addr: decode_cstring(buf, "source_addr")?,
                    dest_addr_ton: TypeOfNumber::from_byte(decode_u8(buf, "dest_addr_ton")?),
                    dest_addr_npi: NumericPlanIndicator::from_byte(decode_u8(
                        buf,
                        "dest_addr_npi",
                    )?),
                    destination_addr: decode_cstring(buf, "destination_addr")?,
                    esm_class: decode_u8(buf, "esm_class")?,
                    protocol_id: decode_u8(buf, "protocol_id")?,
                    priority_flag: decode_u8(buf, "priority_flag")?,
                    schedule_delivery_time: decode_cstring(buf, "schedule_delivery_time")?,
                    validity_period: decode_cstring(buf, "validity_period")?,
                    registered_delivery: decode_u8(buf, "registered_delivery")?,
                    replace_if_present_flag: decode_u8(buf, "replace_if_present_flag")?,
                    data_coding: DataCoding::from_byte(decode_u8(buf, "data_coding")?),
                    sm_default_msg_id: decode_u8(buf, "sm_default_msg_id")?,
                    short_message: decode_short_message(buf)?,
                    tlvs: Tlv::decode_all(buf)?,
                })
            }
        }

        impl $pdu_type {
            /// Message text decoded per `data_coding`. Falls back to the
            /// message_payload TLV when short_message is empty.
            pub fn text(&self) -> String {
                if self.short_message.is_empty() {
                    if let Some(payload) = $crate::datatypes::find_tlv(
                        &self.tlvs,
                        $crate::datatypes::tags::MESSAGE_PAYLOAD,
                    ) {
                        return self.data_coding.decode_text(&payload.value);
                    }
                }
                self.data_coding.decode_text(&self.short_message)
            }
        }
    };
}

/// Implements the codec for a response whose body is a single message_id.
/// Error responses may omit the body, which decodes as an empty id.
macro_rules! impl_message_id_response {
    ($pdu_type:ident) => {
        #[derive(Clone, Debug, Default, PartialEq)]
        pub struct $pdu_type {
            pub message_id: String,
        }

        impl $pdu_type {
            pub fn new(message_id: impl Into<String>) -> Self {
                Self {
                    message_id: message_id.into(),
                }
            }
        }

        impl $crate::codec::Encodable for $pdu_type {
            fn encode(&self, buf: &mut bytes::BytesMut) -> Result<(), $crate::codec::CodecError> {
                $crate::codec::encode_cstring(
                    buf,
                    &self.message_id,
                    $crate::codec::limits::MESSAGE_ID,
                    "message_id",
                )
            }
        }

        impl $crate::codec::Decodable for $pdu_type {
            fn decode(buf: &mut std::io::Cursor<&[u8]>) -> Result<Self, $crate::codec::CodecError> {
                Ok(Self {
                    message_id: $crate::codec::decode_optional_cstring(buf, "message_id")?,
                })
            }
        }
    };
}
