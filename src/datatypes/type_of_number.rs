use num_enum::TryFromPrimitive;

/// Type of Number (TON) for an SMPP address.
#[derive(TryFromPrimitive)]
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TypeOfNumber {
    Unknown = 0b0000_0000,
    International = 0b0000_0001,
    National = 0b0000_0010,
    NetworkSpecific = 0b0000_0011,
    SubscriberNumber = 0b0000_0100,
    Alphanumeric = 0b0000_0101,
    Abbreviated = 0b0000_0110,
}

impl TypeOfNumber {
    /// Lenient conversion for carrier tables and decoded PDUs: unassigned
    /// values read as `Unknown`. The mapping is lossy, so a PDU decoded with
    /// an unassigned TON re-encodes it as 0.
    pub fn from_byte(value: u8) -> Self {
        Self::try_from(value).unwrap_or(Self::Unknown)
    }
}
