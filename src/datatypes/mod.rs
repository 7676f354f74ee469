mod bind;
mod command_id;
mod command_status;
mod data_coding;
mod deliver_sm;
mod numeric_plan_indicator;
mod submit_sm;
mod tlv;
mod type_of_number;

pub use bind::{BindRequest, BindResponse, BindType, INTERFACE_VERSION_34};
pub use command_id::CommandId;
pub use command_status::{CommandStatus, describe_status};
pub use data_coding::DataCoding;
pub use deliver_sm::{
    DeliverSm, DeliverSmResponse, DeliveryReceipt, ESM_CLASS_DELIVERY_RECEIPT, MessageState,
};
pub use numeric_plan_indicator::NumericPlanIndicator;
pub use submit_sm::{SubmitSm, SubmitSmResponse};
pub use tlv::{Tlv, find_tlv, tags};
pub use type_of_number::TypeOfNumber;
