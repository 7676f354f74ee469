// ABOUTME: SMPP data_coding scheme and conversion between message text and short_message octets
// ABOUTME: Covers the alphabets the gateway exchanges with carriers: default, IA5, Latin-1, UCS-2, binary

use crate::codec::CodecError;
use bytes::Bytes;
use std::fmt;

/// Data coding scheme of a short message.
///
/// The SMSC default alphabet is carried one octet per character, which is
/// what the carriers behind this gateway accept for plain ASCII text.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DataCoding {
    /// SMSC Default Alphabet
    #[default]
    SmscDefault,
    /// IA5 (CCITT T.50)/ASCII
    Ascii,
    /// 8-bit binary data
    Binary,
    /// Latin-1 (ISO-8859-1)
    Latin1,
    /// UCS-2 (ISO/IEC-10646), big-endian
    Ucs2,
    /// Any other scheme, passed through untouched
    Other(u8),
}

impl DataCoding {
    pub fn from_byte(value: u8) -> Self {
        match value {
            0x00 => DataCoding::SmscDefault,
            0x01 => DataCoding::Ascii,
            0x02 | 0x04 => DataCoding::Binary,
            0x03 => DataCoding::Latin1,
            0x08 => DataCoding::Ucs2,
            other => DataCoding::Other(other),
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            DataCoding::SmscDefault => 0x00,
            DataCoding::Ascii => 0x01,
            DataCoding::Binary => 0x02,
            DataCoding::Latin1 => 0x03,
            DataCoding::Ucs2 => 0x08,
            DataCoding::Other(value) => value,
        }
    }

    /// Picks the narrowest scheme able to carry `text`.
    pub fn for_text(text: &str) -> Self {
        if text.is_ascii() {
            DataCoding::SmscDefault
        } else {
            DataCoding::Ucs2
        }
    }

    /// Encodes message text into short_message octets.
    pub fn encode_text(self, text: &str) -> Result<Bytes, CodecError> {
        match self {
            DataCoding::SmscDefault | DataCoding::Ascii | DataCoding::Latin1 => {
                let mut out = Vec::with_capacity(text.len());
                for ch in text.chars() {
                    let code = u32::from(ch);
                    if code > 0xFF || (self == DataCoding::Ascii && code > 0x7F) {
                        return Err(CodecError::FieldValidation {
                            field: "short_message",
                            reason: format!("character {ch:?} not representable in {self}"),
                        });
                    }
                    out.push(code as u8);
                }
                Ok(Bytes::from(out))
            }
            DataCoding::Ucs2 => {
                let mut out = Vec::with_capacity(text.len() * 2);
                for unit in text.encode_utf16() {
                    out.extend_from_slice(&unit.to_be_bytes());
                }
                Ok(Bytes::from(out))
            }
            DataCoding::Binary | DataCoding::Other(_) => {
                Ok(Bytes::copy_from_slice(text.as_bytes()))
            }
        }
    }

    /// Decodes short_message octets into text. Never fails: undecodable
    /// input is replaced rather than rejected.
    pub fn decode_text(self, octets: &[u8]) -> String {
        match self {
            DataCoding::SmscDefault | DataCoding::Ascii | DataCoding::Latin1 => {
                octets.iter().map(|&b| char::from(b)).collect()
            }
            DataCoding::Ucs2 => {
                let units: Vec<u16> = octets
                    .chunks(2)
                    .map(|pair| match pair {
                        [hi, lo] => u16::from_be_bytes([*hi, *lo]),
                        [hi] => u16::from_be_bytes([*hi, 0]),
                        _ => 0,
                    })
                    .collect();
                String::from_utf16_lossy(&units)
            }
            DataCoding::Binary | DataCoding::Other(_) => {
                String::from_utf8_lossy(octets).into_owned()
            }
        }
    }
}

impl fmt::Debug for DataCoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DataCoding({self}, {:#04x})", self.to_byte())
    }
}

impl fmt::Display for DataCoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataCoding::SmscDefault => f.write_str("SMSC default"),
            DataCoding::Ascii => f.write_str("IA5/ASCII"),
            DataCoding::Binary => f.write_str("binary"),
            DataCoding::Latin1 => f.write_str("Latin-1"),
            DataCoding::Ucs2 => f.write_str("UCS-2"),
            DataCoding::Other(value) => write!(f, "scheme {value:#04x}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_text_uses_default_alphabet() {
        assert_eq!(DataCoding::for_text("Hello"), DataCoding::SmscDefault);
        assert_eq!(DataCoding::for_text("Akwaaba ɛ"), DataCoding::Ucs2);
    }

    #[test]
    fn ucs2_is_big_endian_utf16() {
        let octets = DataCoding::Ucs2.encode_text("hé").unwrap();
        assert_eq!(&octets[..], &[0x00, b'h', 0x00, 0xE9]);
        assert_eq!(DataCoding::Ucs2.decode_text(&octets), "hé");
    }

    #[test]
    fn default_alphabet_rejects_wide_characters() {
        let err = DataCoding::SmscDefault.encode_text("ɛ").unwrap_err();
        assert!(matches!(err, CodecError::FieldValidation { field: "short_message", .. }));
    }

    #[test]
    fn unknown_scheme_survives_byte_round_trip() {
        assert_eq!(DataCoding::from_byte(0xF0).to_byte(), 0xF0);
        assert_eq!(DataCoding::from_byte(0x04), DataCoding::Binary);
    }
}
