use crate::codec::CodecError;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Cursor;

/// Optional parameter tags the gateway reads or writes.
pub mod tags {
    pub const RECEIPTED_MESSAGE_ID: u16 = 0x001E;
    pub const USER_MESSAGE_REFERENCE: u16 = 0x0204;
    pub const NETWORK_ERROR_CODE: u16 = 0x0423;
    pub const MESSAGE_PAYLOAD: u16 = 0x0424;
    pub const MESSAGE_STATE: u16 = 0x0427;
}

#[derive(Clone, Debug, PartialEq)]
pub struct Tlv {
    /// The Tag field is used to uniquely identify the particular optional parameter in question.
    pub tag: u16,

    /// The Value field contains the actual data for the optional parameter in question.
    /// Its length is written to the wire as the Length field.
    pub value: Bytes,
}

impl Tlv {
    pub fn new(tag: u16, value: impl Into<Bytes>) -> Self {
        Self {
            tag,
            value: value.into(),
        }
    }

    pub fn from_u8(tag: u16, value: u8) -> Self {
        Self::new(tag, vec![value])
    }

    /// A C-octet string value, null terminator included.
    pub fn from_cstring(tag: u16, value: &str) -> Self {
        let mut bytes = Vec::with_capacity(value.len() + 1);
        bytes.extend_from_slice(value.as_bytes());
        bytes.push(0);
        Self::new(tag, bytes)
    }

    pub fn as_u8(&self) -> Option<u8> {
        self.value.first().copied()
    }

    /// Reads the value as text, stopping at the first null.
    pub fn as_string(&self) -> String {
        let end = self
            .value
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.value.len());
        String::from_utf8_lossy(&self.value[..end]).into_owned()
    }

    pub fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        let length = u16::try_from(self.value.len()).map_err(|_| {
            CodecError::TlvError(format!(
                "value of tag {:#06x} is {} octets, limit is {}",
                self.tag,
                self.value.len(),
                u16::MAX
            ))
        })?;
        buf.put_u16(self.tag);
        buf.put_u16(length);
        buf.put_slice(&self.value);
        Ok(())
    }

    /// Decodes every TLV remaining in `buf`.
    pub fn decode_all(buf: &mut Cursor<&[u8]>) -> Result<Vec<Tlv>, CodecError> {
        let mut tlvs = Vec::new();
        while buf.has_remaining() {
            if buf.remaining() < 4 {
                return Err(CodecError::TlvError(format!(
                    "{} trailing octets cannot hold a tag and length",
                    buf.remaining()
                )));
            }
            let tag = buf.get_u16();
            let length = buf.get_u16() as usize;
            if buf.remaining() < length {
                return Err(CodecError::TlvError(format!(
                    "tag {tag:#06x} declares {length} octets, {} remain",
                    buf.remaining()
                )));
            }
            tlvs.push(Tlv {
                tag,
                value: buf.copy_to_bytes(length),
            });
        }
        Ok(tlvs)
    }
}

/// Finds the first TLV with `tag`.
pub fn find_tlv(tlvs: &[Tlv], tag: u16) -> Option<&Tlv> {
    tlvs.iter().find(|tlv| tlv.tag == tag)
}
