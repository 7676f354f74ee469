// SMPP v3.4 codec
//
// A frame is a 16-byte big-endian header followed by a command-specific body.
// Body layouts live next to their domain types in `datatypes`; this module
// owns the header, the dispatch from command_id to body, and the shared
// field helpers.

use crate::datatypes::{
    BindRequest, BindResponse, CommandId, CommandStatus, DeliverSm, DeliverSmResponse, SubmitSm,
    SubmitSmResponse,
};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Cursor;
use thiserror::Error;

/// Maximum allowed PDU size to prevent memory exhaustion attacks
pub const MAX_PDU_SIZE: u32 = 65536; // 64KB

/// Largest short_message body carried in the sm_length-prefixed field.
pub const MAX_SHORT_MESSAGE_LENGTH: usize = 254;

/// C-octet string limits, null terminator included.
pub mod limits {
    pub const SYSTEM_ID: usize = 16;
    pub const PASSWORD: usize = 9;
    pub const SYSTEM_TYPE: usize = 13;
    pub const ADDRESS_RANGE: usize = 41;
    pub const SERVICE_TYPE: usize = 6;
    pub const ADDRESS: usize = 21;
    pub const TIME: usize = 17;
    pub const MESSAGE_ID: usize = 65;
}

/// SMPP v3.4 PDU Header (16 bytes, common to all PDUs)
///
/// `command_id` and `command_status` stay raw so that unknown commands and
/// vendor status codes survive decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PduHeader {
    pub command_length: u32,
    pub command_id: u32,
    pub command_status: u32,
    pub sequence_number: u32,
}

impl PduHeader {
    pub const SIZE: usize = 16;

    /// Decodes the header, validating only the length bounds.
    pub fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        if buf.remaining() < Self::SIZE {
            return Err(CodecError::Incomplete);
        }

        let header = PduHeader {
            command_length: buf.get_u32(),
            command_id: buf.get_u32(),
            command_status: buf.get_u32(),
            sequence_number: buf.get_u32(),
        };

        if header.command_length < Self::SIZE as u32 || header.command_length > MAX_PDU_SIZE {
            return Err(CodecError::InvalidPduLength {
                length: header.command_length,
                min: Self::SIZE as u32,
                max: MAX_PDU_SIZE,
            });
        }

        Ok(header)
    }

    /// Writes the header. `command_length` is written as-is; `Frame::to_bytes`
    /// backpatches it once the body is known.
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32(self.command_length);
        buf.put_u32(self.command_id);
        buf.put_u32(self.command_status);
        buf.put_u32(self.sequence_number);
    }

    pub fn command(&self) -> Option<CommandId> {
        CommandId::try_from(self.command_id).ok()
    }

    pub fn status(&self) -> Option<CommandStatus> {
        CommandStatus::try_from(self.command_status).ok()
    }

    pub fn is_response(&self) -> bool {
        self.command_id & CommandId::RESPONSE_BIT != 0
    }
}

/// Trait for PDU bodies that can be encoded to bytes
pub trait Encodable {
    /// Append the body (everything after the header) to `buf`.
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError>;
}

/// Trait for PDU bodies that can be decoded from bytes
pub trait Decodable: Sized {
    /// Decode the body from `buf`, which is bounded by the frame.
    fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError>;
}

/// Codec errors with detailed context for debugging
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Incomplete PDU: need more data")]
    Incomplete,

    #[error("Frame too short: {0} bytes, header needs 16")]
    FrameTooShort(usize),

    #[error("Length mismatch: command_length is {declared}, frame has {actual} bytes")]
    LengthMismatch { declared: u32, actual: usize },

    #[error("Invalid PDU length: {length}, must be {min}-{max}")]
    InvalidPduLength { length: u32, min: u32, max: u32 },

    #[error("Field '{field}' is truncated")]
    Truncated { field: &'static str },

    #[error("Field '{field}' has no null terminator before the end of the frame")]
    UnterminatedString { field: &'static str },

    #[error("sm_length {declared} exceeds the {remaining} bytes left in the frame")]
    ShortMessageOverrun { declared: u8, remaining: usize },

    #[error("Field '{field}' validation failed: {reason}")]
    FieldValidation { field: &'static str, reason: String },

    #[error("TLV parsing error: {0}")]
    TlvError(String),

    #[error("UTF-8 decoding error in field '{field}': {source}")]
    Utf8Error {
        field: &'static str,
        #[source]
        source: std::string::FromUtf8Error,
    },

    #[error("Cannot encode unknown command_id {0:#010x}")]
    UnencodableCommand(u32),
}

/// Convert codec errors to appropriate SMPP command_status codes
impl CodecError {
    pub fn to_command_status(&self) -> CommandStatus {
        match self {
            CodecError::FrameTooShort(_)
            | CodecError::LengthMismatch { .. }
            | CodecError::InvalidPduLength { .. } => CommandStatus::InvalidCommandLength,
            CodecError::ShortMessageOverrun { .. } => CommandStatus::InvalidMsgLength,
            CodecError::UnencodableCommand(_) => CommandStatus::InvalidCommandId,
            CodecError::FieldValidation { field, .. } => match *field {
                "source_addr" => CommandStatus::InvalidSourceAddress,
                "destination_addr" => CommandStatus::InvalidDestinationAddress,
                "short_message" => CommandStatus::InvalidMsgLength,
                _ => CommandStatus::SystemError,
            },
            CodecError::TlvError(_) => CommandStatus::InvalidParameterLength,
            _ => CommandStatus::SystemError,
        }
    }
}

/// Reads a null-terminated string. The scan is bounded only by the frame.
pub fn decode_cstring(
    buf: &mut Cursor<&[u8]>,
    field: &'static str,
) -> Result<String, CodecError> {
    let rest = buf.chunk();
    let end = rest
        .iter()
        .position(|&b| b == 0)
        .ok_or(CodecError::UnterminatedString { field })?;

    let value = String::from_utf8(rest[..end].to_vec())
        .map_err(|source| CodecError::Utf8Error { field, source })?;
    buf.advance(end + 1);
    Ok(value)
}

/// Like `decode_cstring`, but an exhausted buffer reads as an empty string.
/// Error responses legitimately omit their body.
pub fn decode_optional_cstring(
    buf: &mut Cursor<&[u8]>,
    field: &'static str,
) -> Result<String, CodecError> {
    if !buf.has_remaining() {
        return Ok(String::new());
    }
    decode_cstring(buf, field)
}

/// Decode a single byte
pub fn decode_u8(buf: &mut Cursor<&[u8]>, field: &'static str) -> Result<u8, CodecError> {
    if buf.remaining() < 1 {
        return Err(CodecError::Truncated { field });
    }
    Ok(buf.get_u8())
}

/// Reads the sm_length octet and the short_message that follows it.
pub fn decode_short_message(buf: &mut Cursor<&[u8]>) -> Result<Bytes, CodecError> {
    let declared = decode_u8(buf, "sm_length")?;
    if declared as usize > MAX_SHORT_MESSAGE_LENGTH {
        return Err(CodecError::FieldValidation {
            field: "short_message",
            reason: format!("sm_length {declared} exceeds {MAX_SHORT_MESSAGE_LENGTH}"),
        });
    }
    if declared as usize > buf.remaining() {
        return Err(CodecError::ShortMessageOverrun {
            declared,
            remaining: buf.remaining(),
        });
    }
    Ok(buf.copy_to_bytes(declared as usize))
}

/// Writes `value` followed by a null terminator. `max_len` includes the terminator.
pub fn encode_cstring(
    buf: &mut BytesMut,
    value: &str,
    max_len: usize,
    field: &'static str,
) -> Result<(), CodecError> {
    if value.len() >= max_len {
        return Err(CodecError::FieldValidation {
            field,
            reason: format!("{} octets, limit is {}", value.len(), max_len - 1),
        });
    }
    if value.as_bytes().contains(&0) {
        return Err(CodecError::FieldValidation {
            field,
            reason: "embedded null".to_string(),
        });
    }
    buf.put_slice(value.as_bytes());
    buf.put_u8(0);
    Ok(())
}

/// Writes the sm_length octet and the short_message body.
pub fn encode_short_message(buf: &mut BytesMut, message: &[u8]) -> Result<(), CodecError> {
    if message.len() > MAX_SHORT_MESSAGE_LENGTH {
        return Err(CodecError::FieldValidation {
            field: "short_message",
            reason: format!(
                "{} octets, limit is {MAX_SHORT_MESSAGE_LENGTH}",
                message.len()
            ),
        });
    }
    buf.put_u8(message.len() as u8);
    buf.put_slice(message);
    Ok(())
}

/// Decoded body of a frame, selected by command_id.
#[derive(Debug, Clone, PartialEq)]
pub enum Pdu {
    BindReceiver(BindRequest),
    BindReceiverResp(BindResponse),
    BindTransmitter(BindRequest),
    BindTransmitterResp(BindResponse),
    BindTransceiver(BindRequest),
    BindTransceiverResp(BindResponse),

    SubmitSm(Box<SubmitSm>),
    SubmitSmResp(SubmitSmResponse),
    DeliverSm(Box<DeliverSm>),
    DeliverSmResp(DeliverSmResponse),

    EnquireLink,
    EnquireLinkResp,
    Unbind,
    UnbindResp,
    GenericNack,

    /// A command_id outside the dispatch table. Only the header was decoded.
    Unknown,
}

impl Pdu {
    pub fn command_id(&self) -> Option<CommandId> {
        let id = match self {
            Pdu::BindReceiver(_) => CommandId::BindReceiver,
            Pdu::BindReceiverResp(_) => CommandId::BindReceiverResp,
            Pdu::BindTransmitter(_) => CommandId::BindTransmitter,
            Pdu::BindTransmitterResp(_) => CommandId::BindTransmitterResp,
            Pdu::BindTransceiver(_) => CommandId::BindTransceiver,
            Pdu::BindTransceiverResp(_) => CommandId::BindTransceiverResp,
            Pdu::SubmitSm(_) => CommandId::SubmitSm,
            Pdu::SubmitSmResp(_) => CommandId::SubmitSmResp,
            Pdu::DeliverSm(_) => CommandId::DeliverSm,
            Pdu::DeliverSmResp(_) => CommandId::DeliverSmResp,
            Pdu::EnquireLink => CommandId::EnquireLink,
            Pdu::EnquireLinkResp => CommandId::EnquireLinkResp,
            Pdu::Unbind => CommandId::Unbind,
            Pdu::UnbindResp => CommandId::UnbindResp,
            Pdu::GenericNack => CommandId::GenericNack,
            Pdu::Unknown => return None,
        };
        Some(id)
    }

    fn decode_body(command_id: CommandId, buf: &mut Cursor<&[u8]>) -> Result<Pdu, CodecError> {
        let pdu = match command_id {
            CommandId::BindReceiver => Pdu::BindReceiver(BindRequest::decode(buf)?),
            CommandId::BindTransmitter => Pdu::BindTransmitter(BindRequest::decode(buf)?),
            CommandId::BindTransceiver => Pdu::BindTransceiver(BindRequest::decode(buf)?),
            CommandId::BindReceiverResp => Pdu::BindReceiverResp(BindResponse::decode(buf)?),
            CommandId::BindTransmitterResp => {
                Pdu::BindTransmitterResp(BindResponse::decode(buf)?)
            }
            CommandId::BindTransceiverResp => {
                Pdu::BindTransceiverResp(BindResponse::decode(buf)?)
            }
            CommandId::SubmitSm => Pdu::SubmitSm(Box::new(SubmitSm::decode(buf)?)),
            CommandId::SubmitSmResp => Pdu::SubmitSmResp(SubmitSmResponse::decode(buf)?),
            CommandId::DeliverSm => Pdu::DeliverSm(Box::new(DeliverSm::decode(buf)?)),
            CommandId::DeliverSmResp => Pdu::DeliverSmResp(DeliverSmResponse::decode(buf)?),
            CommandId::EnquireLink => Pdu::EnquireLink,
            CommandId::EnquireLinkResp => Pdu::EnquireLinkResp,
            CommandId::Unbind => Pdu::Unbind,
            CommandId::UnbindResp => Pdu::UnbindResp,
            CommandId::GenericNack => Pdu::GenericNack,
        };
        Ok(pdu)
    }

    fn encode_body(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        match self {
            Pdu::BindReceiver(body) | Pdu::BindTransmitter(body) | Pdu::BindTransceiver(body) => {
                body.encode(buf)
            }
            Pdu::BindReceiverResp(body)
            | Pdu::BindTransmitterResp(body)
            | Pdu::BindTransceiverResp(body) => body.encode(buf),
            Pdu::SubmitSm(body) => body.encode(buf),
            Pdu::SubmitSmResp(body) => body.encode(buf),
            Pdu::DeliverSm(body) => body.encode(buf),
            Pdu::DeliverSmResp(body) => body.encode(buf),
            Pdu::EnquireLink
            | Pdu::EnquireLinkResp
            | Pdu::Unbind
            | Pdu::UnbindResp
            | Pdu::GenericNack => Ok(()),
            Pdu::Unknown => Err(CodecError::UnencodableCommand(0)),
        }
    }
}

/// One SMPP frame: header plus decoded body.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub header: PduHeader,
    pub pdu: Pdu,
}

impl Frame {
    /// A request (or unsolicited response) with status 0.
    pub fn new(sequence_number: u32, pdu: Pdu) -> Frame {
        Frame::with_status(sequence_number, CommandStatus::Ok.code(), pdu)
    }

    /// A frame carrying an explicit command_status.
    pub fn with_status(sequence_number: u32, command_status: u32, pdu: Pdu) -> Frame {
        let command_id = pdu.command_id().map(|id| id as u32).unwrap_or(0);
        Frame {
            header: PduHeader {
                command_length: 0,
                command_id,
                command_status,
                sequence_number,
            },
            pdu,
        }
    }

    pub fn generic_nack(sequence_number: u32, status: CommandStatus) -> Frame {
        Frame::with_status(sequence_number, status.code(), Pdu::GenericNack)
    }

    pub fn command_id(&self) -> Option<CommandId> {
        self.pdu.command_id()
    }

    pub fn sequence_number(&self) -> u32 {
        self.header.sequence_number
    }

    pub fn command_status(&self) -> u32 {
        self.header.command_status
    }

    pub fn is_response(&self) -> bool {
        self.header.is_response()
    }

    /// Name used in logs; unknown commands print their raw id.
    pub fn name(&self) -> String {
        match self.command_id() {
            Some(id) => id.name().to_string(),
            None => format!("unknown({:#010x})", self.header.command_id),
        }
    }

    /// Checks whether `buf` holds a complete frame and returns its length.
    ///
    /// `Incomplete` means more bytes are needed; any other error means the
    /// byte stream can no longer be trusted.
    pub fn check(buf: &mut Cursor<&[u8]>) -> Result<usize, CodecError> {
        if buf.remaining() < PduHeader::SIZE {
            return Err(CodecError::Incomplete);
        }

        let start = buf.position();
        let command_length = buf.get_u32();
        buf.set_position(start);

        if command_length < PduHeader::SIZE as u32 || command_length > MAX_PDU_SIZE {
            return Err(CodecError::InvalidPduLength {
                length: command_length,
                min: PduHeader::SIZE as u32,
                max: MAX_PDU_SIZE,
            });
        }

        if buf.remaining() < command_length as usize {
            return Err(CodecError::Incomplete);
        }

        Ok(command_length as usize)
    }

    /// Writes header and body, leaving command_length for the caller to patch.
    pub fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        let command_id = self
            .pdu
            .command_id()
            .ok_or(CodecError::UnencodableCommand(self.header.command_id))?;
        let header = PduHeader {
            command_id: command_id as u32,
            ..self.header
        };
        header.encode(buf);
        self.pdu.encode_body(buf)
    }

    /// Encodes the frame and backpatches `command_length`.
    pub fn to_bytes(&self) -> Result<Bytes, CodecError> {
        let mut buf = BytesMut::with_capacity(64);
        self.encode(&mut buf)?;

        let length = buf.len() as u32;
        buf[0..4].copy_from_slice(&length.to_be_bytes());
        Ok(buf.freeze())
    }
}

/// Decodes exactly one frame from `buf`.
///
/// The buffer must hold the whole frame and nothing else: a declared
/// `command_length` that differs from `buf.len()` is rejected. Unknown
/// command ids decode to `Pdu::Unknown` rather than failing.
pub fn decode(buf: &[u8]) -> Result<Frame, CodecError> {
    if buf.len() < PduHeader::SIZE {
        return Err(CodecError::FrameTooShort(buf.len()));
    }

    let mut cursor = Cursor::new(buf);
    let header = PduHeader {
        command_length: cursor.get_u32(),
        command_id: cursor.get_u32(),
        command_status: cursor.get_u32(),
        sequence_number: cursor.get_u32(),
    };

    if header.command_length as usize != buf.len() {
        return Err(CodecError::LengthMismatch {
            declared: header.command_length,
            actual: buf.len(),
        });
    }
    if header.command_length > MAX_PDU_SIZE {
        return Err(CodecError::InvalidPduLength {
            length: header.command_length,
            min: PduHeader::SIZE as u32,
            max: MAX_PDU_SIZE,
        });
    }

    let mut body = Cursor::new(&buf[PduHeader::SIZE..]);
    let pdu = match header.command() {
        Some(command_id) => Pdu::decode_body(command_id, &mut body)?,
        None => {
            tracing::debug!(
                command_id = format_args!("{:#010x}", header.command_id),
                "unknown command, body left undecoded"
            );
            Pdu::Unknown
        }
    };

    Ok(Frame { header, pdu })
}

/// Encodes one frame. Shorthand for [`Frame::to_bytes`].
pub fn encode(frame: &Frame) -> Result<Bytes, CodecError> {
    frame.to_bytes()
}

/// Reads the sequence number from a buffered header without decoding it.
pub fn peek_sequence_number(buf: &[u8]) -> Option<u32> {
    let bytes = buf.get(12..16)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::DataCoding;

    fn header_bytes(length: u32, command_id: u32, status: u32, sequence: u32) -> Vec<u8> {
        let mut v = Vec::new();
        v.extend_from_slice(&length.to_be_bytes());
        v.extend_from_slice(&command_id.to_be_bytes());
        v.extend_from_slice(&status.to_be_bytes());
        v.extend_from_slice(&sequence.to_be_bytes());
        v
    }

    #[test]
    fn short_buffers_fail_with_length_error() {
        for len in 0..PduHeader::SIZE {
            let buf = vec![0u8; len];
            assert!(matches!(decode(&buf), Err(CodecError::FrameTooShort(n)) if n == len));
        }
    }

    #[test]
    fn declared_length_must_match_buffer() {
        let mut buf = header_bytes(20, 0x15, 0, 1);
        assert!(matches!(
            decode(&buf),
            Err(CodecError::LengthMismatch { declared: 20, actual: 16 })
        ));

        buf[3] = 12;
        assert!(matches!(decode(&buf), Err(CodecError::LengthMismatch { .. })));
    }

    #[test]
    fn enquire_link_is_header_only() {
        let bytes = Frame::new(7, Pdu::EnquireLink).to_bytes().unwrap();
        assert_eq!(&bytes[..], &header_bytes(16, 0x15, 0, 7)[..]);

        let frame = decode(&bytes).unwrap();
        assert_eq!(frame.pdu, Pdu::EnquireLink);
        assert_eq!(frame.sequence_number(), 7);
    }

    #[test]
    fn unknown_command_decodes_header_only() {
        let mut buf = header_bytes(20, 0x0000_0003, 0, 9);
        buf.extend_from_slice(&[1, 2, 3, 4]);

        let frame = decode(&buf).unwrap();
        assert_eq!(frame.pdu, Pdu::Unknown);
        assert_eq!(frame.header.command_id, 3);
        assert_eq!(frame.sequence_number(), 9);
        assert!(frame.command_id().is_none());
    }

    #[test]
    fn unknown_command_cannot_be_encoded() {
        let mut buf = header_bytes(16, 0x0000_0003, 0, 9);
        buf.truncate(16);
        let frame = decode(&buf).unwrap();
        assert!(matches!(
            frame.to_bytes(),
            Err(CodecError::UnencodableCommand(3))
        ));
    }

    #[test]
    fn bind_round_trip_preserves_fields() {
        let bind = BindRequest::new("mtn_smpp_user", "secret");
        let bytes = Frame::new(1, Pdu::BindTransceiver(bind.clone()))
            .to_bytes()
            .unwrap();

        assert_eq!(
            u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize,
            bytes.len()
        );

        let frame = decode(&bytes).unwrap();
        assert_eq!(frame.command_id(), Some(CommandId::BindTransceiver));
        assert_eq!(frame.pdu, Pdu::BindTransceiver(bind));
    }

    #[test]
    fn submit_sm_round_trip_preserves_fields() {
        let mut submit = SubmitSm::new("233241234567", "233501234567", "Hello").unwrap();
        submit.registered_delivery = 1;
        submit.service_type = "SMS".to_string();
        submit.validity_period = "000003000000000R".to_string();

        let bytes = Frame::new(42, Pdu::SubmitSm(Box::new(submit.clone())))
            .to_bytes()
            .unwrap();
        let frame = decode(&bytes).unwrap();

        match frame.pdu {
            Pdu::SubmitSm(decoded) => {
                assert_eq!(*decoded, submit);
                assert_eq!(decoded.text(), "Hello");
                assert_eq!(decoded.data_coding, DataCoding::SmscDefault);
            }
            other => panic!("expected submit_sm, got {other:?}"),
        }
    }

    #[test]
    fn error_response_without_body_decodes() {
        let buf = header_bytes(16, 0x8000_0004, 0x58, 3);
        let frame = decode(&buf).unwrap();
        assert_eq!(frame.command_status(), 0x58);
        assert_eq!(
            frame.pdu,
            Pdu::SubmitSmResp(SubmitSmResponse {
                message_id: String::new()
            })
        );
    }

    #[test]
    fn unterminated_string_is_rejected() {
        let mut buf = header_bytes(0, 0x0000_0009, 0, 1);
        buf.extend_from_slice(b"no_terminator");
        let len = buf.len() as u32;
        buf[0..4].copy_from_slice(&len.to_be_bytes());

        assert!(matches!(
            decode(&buf),
            Err(CodecError::UnterminatedString { field: "system_id" })
        ));
    }

    #[test]
    fn short_message_longer_than_frame_is_rejected() {
        let submit = SubmitSm::new("1234", "5678", "Hi").unwrap();
        let bytes = Frame::new(1, Pdu::SubmitSm(Box::new(submit)))
            .to_bytes()
            .unwrap();

        // sm_length is the octet just before the two message bytes
        let mut tampered = bytes.to_vec();
        let sm_length_at = tampered.len() - 3;
        tampered[sm_length_at] = 50;

        assert!(matches!(
            decode(&tampered),
            Err(CodecError::ShortMessageOverrun { declared: 50, remaining: 2 })
        ));
    }

    #[test]
    fn oversized_short_message_is_not_encoded() {
        let mut submit = SubmitSm::new("1234", "5678", "x").unwrap();
        submit.short_message = Bytes::from(vec![b'a'; 255]);
        let err = Frame::new(1, Pdu::SubmitSm(Box::new(submit)))
            .to_bytes()
            .unwrap_err();
        assert_eq!(err.to_command_status(), CommandStatus::InvalidMsgLength);
    }

    #[test]
    fn check_waits_for_whole_frame() {
        let bytes = Frame::new(5, Pdu::Unbind).to_bytes().unwrap();
        let mut partial = Cursor::new(&bytes[..10]);
        assert!(matches!(Frame::check(&mut partial), Err(CodecError::Incomplete)));

        let mut whole = Cursor::new(&bytes[..]);
        assert_eq!(Frame::check(&mut whole).unwrap(), 16);
        assert_eq!(whole.position(), 0);

        let bad = header_bytes(4, 0x15, 0, 1);
        let mut cursor = Cursor::new(&bad[..]);
        assert!(matches!(
            Frame::check(&mut cursor),
            Err(CodecError::InvalidPduLength { length: 4, .. })
        ));
    }

    #[test]
    fn generic_nack_carries_status() {
        let bytes = Frame::generic_nack(11, CommandStatus::InvalidCommandId)
            .to_bytes()
            .unwrap();
        assert_eq!(&bytes[..], &header_bytes(16, 0x8000_0000, 3, 11)[..]);
        assert_eq!(peek_sequence_number(&bytes), Some(11));
    }
}
