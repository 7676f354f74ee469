use num_enum::TryFromPrimitive;
use std::fmt;

/// The command_status field of an SMPP response.
///
/// Requests carry `Ok`. Carriers may return vendor-specific values outside
/// this table, so headers keep the raw `u32` and convert on demand.
#[derive(TryFromPrimitive)]
#[repr(u32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CommandStatus {
    /// No Error
    Ok = 0x0000_0000,

    /// Message Length is invalid
    InvalidMsgLength = 0x0000_0001,

    /// Command Length is invalid
    InvalidCommandLength = 0x0000_0002,

    /// Invalid Command ID
    InvalidCommandId = 0x0000_0003,

    /// Incorrect BIND Status for given command
    IncorrectBindStatus = 0x0000_0004,

    /// ESME Already in Bound State
    AlreadyBoundState = 0x0000_0005,

    /// Invalid Priority Flag
    InvalidPriorityFlag = 0x0000_0006,

    /// Invalid Registered Delivery Flag
    InvalidRegisteredDeliveryFlag = 0x0000_0007,

    /// System Error
    SystemError = 0x0000_0008,

    /// Invalid Source Address
    InvalidSourceAddress = 0x0000_000A,

    /// Invalid Dest Addr
    InvalidDestinationAddress = 0x0000_000B,

    /// Message ID is invalid
    InvalidMessageId = 0x0000_000C,

    /// Bind Failed
    BindFailed = 0x0000_000D,

    /// Invalid Password
    InvalidPassword = 0x0000_000E,

    /// Invalid System ID
    InvalidSystemId = 0x0000_000F,

    /// Message Queue Full
    MessageQueueFull = 0x0000_0014,

    /// Invalid Service Type
    InvalidServiceType = 0x0000_0015,

    /// Invalid esm_class field data
    InvalidEsmClassFieldData = 0x0000_0043,

    /// submit_sm or submit_multi failed
    SubmitFailed = 0x0000_0045,

    /// Invalid Source address TON
    InvalidSourceAddressTon = 0x0000_0048,

    /// Invalid Source address NPI
    InvalidSourceAddressNpi = 0x0000_0049,

    /// Invalid Destination address TON
    InvalidDestinationAddressTon = 0x0000_0050,

    /// Invalid Destination address NPI
    InvalidDestinationAddressNpi = 0x0000_0051,

    /// Invalid system_type field
    InvalidSystemTypeField = 0x0000_0053,

    /// Throttling error (ESME has exceeded allowed message limits)
    ThrottlingError = 0x0000_0058,

    /// Invalid Scheduled Delivery Time
    InvalidScheduledDeliveryTime = 0x0000_0061,

    /// Invalid message validity period (Expiry time)
    InvalidExpiryTime = 0x0000_0062,

    /// ESME Receiver Temporary App Error Code
    ReceiverTemporaryAppError = 0x0000_0064,

    /// ESME Receiver Permanent App Error Code
    ReceiverPermanentAppError = 0x0000_0065,

    /// ESME Receiver Reject Message Error Code
    ReceiverRejectMessageError = 0x0000_0066,

    /// Optional Parameter not allowed
    OptionalParameterNotAllowed = 0x0000_00C1,

    /// Invalid Parameter Length.
    InvalidParameterLength = 0x0000_00C2,

    /// Delivery Failure
    DeliveryFailed = 0x0000_00FE,

    /// Unknown Error
    UnknownError = 0x0000_00FF,
}

impl CommandStatus {
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Statuses a carrier uses to signal temporary congestion.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            CommandStatus::ThrottlingError
                | CommandStatus::MessageQueueFull
                | CommandStatus::ReceiverTemporaryAppError
        )
    }
}

impl From<CommandStatus> for u32 {
    fn from(status: CommandStatus) -> u32 {
        status as u32
    }
}

/// Formats a raw status the way logs and errors print it: the known name
/// followed by the hex code, or just the code for vendor values.
pub fn describe_status(raw: u32) -> String {
    match CommandStatus::try_from(raw) {
        Ok(status) => format!("{status:?} ({raw:#010x})"),
        Err(_) => format!("{raw:#010x}"),
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({:#010x})", self, *self as u32)
    }
}
