use crate::codec::{
    CodecError, Decodable, Encodable, decode_cstring, decode_optional_cstring, decode_u8,
    encode_cstring, limits,
};
use crate::datatypes::{NumericPlanIndicator, TypeOfNumber};
use bytes::{BufMut, BytesMut};
use std::io::Cursor;

/// SMPP v3.4 interface version advertised in binds.
pub const INTERFACE_VERSION_34: u8 = 0x34;

/// Direction requested by a bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindType {
    Receiver,
    Transmitter,
    Transceiver,
}

/// Body shared by bind_receiver, bind_transmitter and bind_transceiver.
#[derive(Clone, Debug, PartialEq)]
pub struct BindRequest {
    /// Identifies the ESME requesting to bind. Max 15 octets.
    pub system_id: String,

    /// Authenticates the ESME. Max 8 octets.
    pub password: String,

    /// Identifies the type of ESME system. Max 12 octets.
    pub system_type: String,

    pub interface_version: u8,
    pub addr_ton: TypeOfNumber,
    pub addr_npi: NumericPlanIndicator,

    /// Addresses served by the ESME when bound as receiver. Max 40 octets.
    pub address_range: String,
}

impl BindRequest {
    pub fn new(system_id: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            system_id: system_id.into(),
            password: password.into(),
            system_type: String::new(),
            interface_version: INTERFACE_VERSION_34,
            addr_ton: TypeOfNumber::Unknown,
            addr_npi: NumericPlanIndicator::Unknown,
            address_range: String::new(),
        }
    }

    pub fn with_system_type(mut self, system_type: impl Into<String>) -> Self {
        self.system_type = system_type.into();
        self
    }
}

impl Encodable for BindRequest {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        encode_cstring(buf, &self.system_id, limits::SYSTEM_ID, "system_id")?;
        encode_cstring(buf, &self.password, limits::PASSWORD, "password")?;
        encode_cstring(buf, &self.system_type, limits::SYSTEM_TYPE, "system_type")?;
        buf.put_u8(self.interface_version);
        buf.put_u8(self.addr_ton as u8);
        buf.put_u8(self.addr_npi as u8);
        encode_cstring(buf, &self.address_range, limits::ADDRESS_RANGE, "address_range")
    }
}

impl Decodable for BindRequest {
    fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Ok(Self {
            system_id: decode_cstring(buf, "system_id")?,
            password: decode_cstring(buf, "password")?,
            system_type: decode_cstring(buf, "system_type")?,
            interface_version: decode_u8(buf, "interface_version")?,
            addr_ton: TypeOfNumber::from_byte(decode_u8(buf, "addr_ton")?),
            addr_npi: NumericPlanIndicator::from_byte(decode_u8(buf, "addr_npi")?),
            address_range: decode_cstring(buf, "address_range")?,
        })
    }
}

/// Body of every bind_*_resp. Optional parameters after system_id are skipped.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BindResponse {
    pub system_id: String,
}

impl BindResponse {
    pub fn new(system_id: impl Into<String>) -> Self {
        Self {
            system_id: system_id.into(),
        }
    }
}

impl Encodable for BindResponse {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        encode_cstring(buf, &self.system_id, limits::SYSTEM_ID, "system_id")
    }
}

impl Decodable for BindResponse {
    fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Ok(Self {
            system_id: decode_optional_cstring(buf, "system_id")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_longer_than_eight_octets_is_rejected() {
        let mut buf = BytesMut::new();
        let err = BindRequest::new("user", "secure_password_123")
            .encode(&mut buf)
            .unwrap_err();
        assert!(matches!(err, CodecError::FieldValidation { field: "password", .. }));
    }

    #[test]
    fn missing_fixed_field_is_truncation() {
        let data = b"id\0pw\0type\0";
        let mut cursor = Cursor::new(&data[..]);
        assert!(matches!(
            BindRequest::decode(&mut cursor),
            Err(CodecError::Truncated { field: "interface_version" })
        ));
    }
}
