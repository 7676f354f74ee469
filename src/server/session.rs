// ABOUTME: Per-connection SMPP state machine for inbound ESME sessions
// ABOUTME: Pure frame handling decides replies and closure; a single task drives it over the socket

use crate::codec::{Frame, Pdu};
use crate::connection::{Connection, ReadError};
use crate::datatypes::{
    BindRequest, BindResponse, BindType, CommandId, CommandStatus, DeliverSm, DeliverSmResponse,
    SubmitSm, SubmitSmResponse,
};
use crate::event::{DeliveryReportEvent, GatewayEvent, MessageEvent};
use crate::sequence::SequenceCounter;
use crate::server::SessionContext;
use crate::server::listener::SessionRegistry;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Longest accepted message, in characters of decoded text.
pub const MAX_MESSAGE_CHARS: usize = 160;

/// Longest accepted address, in digits.
const MAX_ADDRESS_DIGITS: usize = 15;

/// Bind state of an inbound session.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Accepted, not yet bound.
    Open,
    BoundRx,
    BoundTx,
    BoundTrx,
    /// Unbound by the peer; binds are accepted again.
    Unbound,
    Closed,
}

impl SessionState {
    /// Whether a request with `command` may be handled in this state.
    pub fn allows(self, command: CommandId) -> bool {
        match self {
            SessionState::Open | SessionState::Unbound => matches!(
                command,
                CommandId::BindReceiver | CommandId::BindTransmitter | CommandId::BindTransceiver
            ),
            SessionState::BoundRx => matches!(
                command,
                CommandId::DeliverSm | CommandId::EnquireLink | CommandId::Unbind
            ),
            SessionState::BoundTx => matches!(
                command,
                CommandId::SubmitSm | CommandId::EnquireLink | CommandId::Unbind
            ),
            SessionState::BoundTrx => matches!(
                command,
                CommandId::SubmitSm
                    | CommandId::DeliverSm
                    | CommandId::EnquireLink
                    | CommandId::Unbind
            ),
            SessionState::Closed => false,
        }
    }

    pub fn is_bound(self) -> bool {
        matches!(
            self,
            SessionState::BoundRx | SessionState::BoundTx | SessionState::BoundTrx
        )
    }

    fn bound_as(bind_type: BindType) -> Self {
        match bind_type {
            BindType::Receiver => SessionState::BoundRx,
            BindType::Transmitter => SessionState::BoundTx,
            BindType::Transceiver => SessionState::BoundTrx,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Open => "OPEN",
            SessionState::BoundRx => "BOUND_RX",
            SessionState::BoundTx => "BOUND_TX",
            SessionState::BoundTrx => "BOUND_TRX",
            SessionState::Unbound => "UNBOUND",
            SessionState::Closed => "CLOSED",
        };
        f.write_str(name)
    }
}

/// What the driver must do after the session handled a frame.
#[derive(Debug, Default, PartialEq)]
pub struct Action {
    pub reply: Option<Frame>,
    /// Close the socket once the reply is written.
    pub close: bool,
}

impl Action {
    fn none() -> Self {
        Self::default()
    }

    fn reply(frame: Frame) -> Self {
        Self {
            reply: Some(frame),
            close: false,
        }
    }

    fn then_close(mut self) -> Self {
        self.close = true;
        self
    }
}

/// Protocol state of one inbound connection.
///
/// Owned by the task that reads the connection; nothing else mutates it.
pub struct Session {
    peer: SocketAddr,
    state: SessionState,
    system_id: Option<String>,
    carrier: Option<String>,
    sequence: SequenceCounter,
    ctx: Arc<SessionContext>,
}

impl Session {
    pub fn new(peer: SocketAddr, ctx: Arc<SessionContext>) -> Self {
        Self {
            peer,
            state: SessionState::Open,
            system_id: None,
            carrier: None,
            sequence: SequenceCounter::new(),
            ctx,
        }
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn system_id(&self) -> Option<&str> {
        self.system_id.as_deref()
    }

    /// Carrier resolved from the bind credentials.
    pub fn carrier(&self) -> Option<&str> {
        self.carrier.as_deref()
    }

    /// Handles one decoded frame from the peer.
    pub fn handle(&mut self, frame: Frame) -> Action {
        let sequence_number = frame.sequence_number();
        let Some(command) = frame.command_id() else {
            warn!(peer = %self.peer, command = %frame.name(), "unknown command");
            return Action::reply(Frame::generic_nack(
                sequence_number,
                CommandStatus::InvalidCommandId,
            ));
        };

        // Answers to our own enquire_link or deliver_sm
        if matches!(
            command,
            CommandId::EnquireLinkResp | CommandId::DeliverSmResp | CommandId::GenericNack
        ) {
            debug!(peer = %self.peer, %command, sequence = sequence_number, "absorbed response");
            return Action::none();
        }

        if !self.state.allows(command) {
            warn!(
                peer = %self.peer,
                %command,
                state = %self.state,
                sequence = sequence_number,
                "command not allowed in current state"
            );
            return Action::reply(Frame::generic_nack(
                sequence_number,
                CommandStatus::IncorrectBindStatus,
            ));
        }

        match frame.pdu {
            Pdu::BindReceiver(bind) => self.bind(sequence_number, BindType::Receiver, bind),
            Pdu::BindTransmitter(bind) => self.bind(sequence_number, BindType::Transmitter, bind),
            Pdu::BindTransceiver(bind) => self.bind(sequence_number, BindType::Transceiver, bind),
            Pdu::SubmitSm(submit) => self.submit(sequence_number, &submit),
            Pdu::DeliverSm(deliver) => self.deliver(sequence_number, &deliver),
            Pdu::EnquireLink => Action::reply(Frame::new(sequence_number, Pdu::EnquireLinkResp)),
            Pdu::Unbind => {
                info!(
                    peer = %self.peer,
                    system_id = self.system_id().unwrap_or_default(),
                    "unbind requested"
                );
                self.state = SessionState::Unbound;
                Action::reply(Frame::new(sequence_number, Pdu::UnbindResp)).then_close()
            }
            _ => Action::reply(Frame::generic_nack(
                sequence_number,
                CommandStatus::InvalidCommandId,
            )),
        }
    }

    /// Handles a failed read. Framing is lost, so the session always closes.
    pub fn handle_read_error(&mut self, err: &ReadError) -> Action {
        match err {
            ReadError::Malformed {
                sequence_number,
                source,
            } => {
                warn!(peer = %self.peer, error = %source, "malformed PDU, closing");
                Action::reply(Frame::generic_nack(
                    sequence_number.unwrap_or(0),
                    source.to_command_status(),
                ))
                .then_close()
            }
            other => {
                debug!(peer = %self.peer, error = %other, "read failed");
                Action::none().then_close()
            }
        }
    }

    /// Keep-alive check, issued only while bound.
    pub fn enquire_link(&mut self) -> Option<Frame> {
        if !self.state.is_bound() {
            return None;
        }
        let sequence_number = self.sequence.next(|_| false);
        Some(Frame::new(sequence_number, Pdu::EnquireLink))
    }

    pub fn close(&mut self) {
        self.state = SessionState::Closed;
    }

    fn bind(&mut self, sequence_number: u32, bind_type: BindType, bind: BindRequest) -> Action {
        let response = |system_id: String| {
            let body = BindResponse::new(system_id);
            match bind_type {
                BindType::Receiver => Pdu::BindReceiverResp(body),
                BindType::Transmitter => Pdu::BindTransmitterResp(body),
                BindType::Transceiver => Pdu::BindTransceiverResp(body),
            }
        };

        match self
            .ctx
            .authenticator
            .authenticate(&bind.system_id, &bind.password)
        {
            Some(carrier) => {
                self.state = SessionState::bound_as(bind_type);
                info!(
                    peer = %self.peer,
                    system_id = %bind.system_id,
                    carrier = %carrier,
                    state = %self.state,
                    "bound"
                );
                self.carrier = Some(carrier);
                self.system_id = Some(bind.system_id.clone());
                Action::reply(Frame::new(sequence_number, response(bind.system_id)))
            }
            None => {
                warn!(peer = %self.peer, system_id = %bind.system_id, "bind rejected: invalid credentials");
                Action::reply(Frame::with_status(
                    sequence_number,
                    CommandStatus::InvalidPassword.code(),
                    response(String::new()),
                ))
                .then_close()
            }
        }
    }

    fn submit(&mut self, sequence_number: u32, submit: &SubmitSm) -> Action {
        let body = match validate_submit(submit) {
            Ok(body) => body,
            Err(status) => {
                warn!(
                    peer = %self.peer,
                    source = %submit.source_addr,
                    destination = %submit.destination_addr,
                    %status,
                    "submit_sm rejected"
                );
                return Action::reply(Frame::with_status(
                    sequence_number,
                    status.code(),
                    Pdu::SubmitSmResp(SubmitSmResponse::default()),
                ));
            }
        };

        let message_id = self.ctx.message_ids.next_id();
        debug!(
            peer = %self.peer,
            message_id = %message_id,
            destination = %submit.destination_addr,
            "message accepted"
        );
        self.ctx.events.emit(GatewayEvent::Message(MessageEvent {
            carrier: self.carrier.clone().unwrap_or_default(),
            source: submit.source_addr.clone(),
            destination: submit.destination_addr.clone(),
            body,
            message_id: message_id.clone(),
            data_coding: submit.data_coding.to_byte(),
            registered_delivery: submit.registered_delivery,
        }));

        Action::reply(Frame::new(
            sequence_number,
            Pdu::SubmitSmResp(SubmitSmResponse::new(message_id)),
        ))
    }

    fn deliver(&mut self, sequence_number: u32, deliver: &DeliverSm) -> Action {
        let receipt = deliver.delivery_receipt();
        debug!(
            peer = %self.peer,
            message_id = %receipt.message_id,
            state = %receipt.state,
            "delivery report"
        );
        self.ctx
            .events
            .emit(GatewayEvent::DeliveryReport(DeliveryReportEvent {
                carrier: self.carrier.clone().unwrap_or_default(),
                message_id: receipt.message_id,
                state: receipt.state,
                error_code: receipt.error_code,
            }));

        Action::reply(Frame::new(
            sequence_number,
            Pdu::DeliverSmResp(DeliverSmResponse::new(self.ctx.message_ids.next_id())),
        ))
    }
}

fn is_valid_address(address: &str) -> bool {
    (1..=MAX_ADDRESS_DIGITS).contains(&address.len())
        && address.bytes().all(|b| b.is_ascii_digit())
}

/// Checks addresses and length, returning the decoded text.
fn validate_submit(submit: &SubmitSm) -> Result<String, CommandStatus> {
    if !is_valid_address(&submit.source_addr) {
        return Err(CommandStatus::InvalidSourceAddress);
    }
    if !is_valid_address(&submit.destination_addr) {
        return Err(CommandStatus::InvalidDestinationAddress);
    }
    let text = submit.text();
    if text.is_empty() || text.chars().count() > MAX_MESSAGE_CHARS {
        return Err(CommandStatus::InvalidMsgLength);
    }
    Ok(text)
}

async fn tick(keep_alive: &mut Option<Interval>) {
    match keep_alive {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Drives `session` over `connection` until the peer leaves or the session
/// closes it. Keeps the session's entry in `registry` current.
pub(crate) async fn run<R, W>(
    mut session: Session,
    mut connection: Connection<R, W>,
    registry: &SessionRegistry,
) where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let period = session.ctx.config.enquire_link_interval;
    let mut keep_alive: Option<Interval> = None;

    loop {
        let action = tokio::select! {
            read = connection.read_frame() => match read {
                Ok(Some(frame)) => {
                    debug!(
                        peer = %session.peer,
                        command = %frame.name(),
                        sequence = frame.sequence_number(),
                        "received"
                    );
                    session.handle(frame)
                }
                Ok(None) => {
                    debug!(peer = %session.peer, "peer closed the connection");
                    break;
                }
                Err(err) => session.handle_read_error(&err),
            },
            _ = tick(&mut keep_alive) => Action {
                reply: session.enquire_link(),
                close: false,
            },
        };

        registry.update(&session);
        if let Some(frame) = &action.reply {
            if let Err(e) = connection.write_frame(frame).await {
                warn!(peer = %session.peer, error = %e, "write failed");
                break;
            }
        }

        if action.close {
            break;
        }
        if keep_alive.is_none() && session.state.is_bound() && !period.is_zero() {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            keep_alive = Some(interval);
        }
    }

    drop(keep_alive);
    if let Err(e) = connection.shutdown().await {
        debug!(peer = %session.peer, error = %e, "socket shutdown failed");
    }
    session.close();
    registry.update(&session);
    info!(peer = %session.peer, system_id = session.system_id().unwrap_or_default(), "session closed");
}
