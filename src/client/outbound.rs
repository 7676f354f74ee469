// ABOUTME: Transceiver link to a carrier SMSC with concurrent, sequence-correlated requests
// ABOUTME: A reader task demultiplexes responses, answers carrier requests and surfaces delivery reports

use crate::client::error::{SmppError, SmppResult};
use crate::client::pending::{PendingRequests, PendingResponse};
use crate::client::types::{
    BindCredentials, ClientConfig, SubmitParams, SubmitRequest, SubmitResponse,
};
use crate::codec::{Frame, Pdu};
use crate::connection::{FrameReader, FrameWriter, ReadError};
use crate::datatypes::{BindRequest, CommandStatus, DeliverSmResponse};
use crate::event::{DeliveryReportEvent, EventSender, GatewayEvent};
use crate::sequence::SequenceCounter;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Where and how to reach one carrier.
#[derive(Debug, Clone)]
pub struct CarrierLink {
    /// Name used in logs and events.
    pub carrier: String,
    /// `host:port` of the SMSC.
    pub address: String,
    pub credentials: BindCredentials,
    pub params: SubmitParams,
}

// Sequence allocation and the socket write happen under one lock, so frames
// leave in the order their numbers were assigned.
struct LinkWriter {
    frames: FrameWriter<OwnedWriteHalf>,
    sequence: SequenceCounter,
}

struct Shared {
    carrier: String,
    params: SubmitParams,
    config: ClientConfig,
    writer: tokio::sync::Mutex<LinkWriter>,
    pending: Arc<PendingRequests>,
    connected: AtomicBool,
    bound: AtomicBool,
    events: Option<EventSender>,
}

impl Shared {
    /// Sends `pdu` and waits for its response. `deadline` covers the whole
    /// exchange: waiting for a slot, the writer and the socket included.
    async fn request(&self, pdu: Pdu, deadline: Duration) -> SmppResult<Frame> {
        if !self.connected.load(Ordering::Acquire) {
            return Err(SmppError::ConnectionClosed);
        }
        let started = Instant::now();
        let waiter = match tokio::time::timeout(deadline, self.send(pdu)).await {
            Ok(sent) => sent?,
            Err(_) => {
                debug!(carrier = %self.carrier, "request timed out before it was written");
                return Err(SmppError::Timeout);
            }
        };

        let response = waiter
            .wait(deadline.saturating_sub(started.elapsed()))
            .await?;
        if response.command_status() != CommandStatus::Ok.code() {
            return Err(SmppError::CarrierStatus(response.command_status()));
        }
        Ok(response)
    }

    async fn send(&self, pdu: Pdu) -> SmppResult<PendingResponse> {
        let slot = self.pending.reserve().await?;

        let mut link = self.writer.lock().await;
        let sequence_number = link.sequence.next(|seq| self.pending.contains(seq));
        let frame = Frame::new(sequence_number, pdu);
        let bytes = frame.to_bytes()?;

        let waiter = self.pending.register(sequence_number, slot)?;
        let torn = TornWrite::arm(self);
        link.frames.write_encoded(&bytes).await?;
        torn.disarm();
        debug!(
            carrier = %self.carrier,
            command = %frame.name(),
            sequence = sequence_number,
            "sent request"
        );
        Ok(waiter)
    }

    async fn reply(&self, frame: Frame) {
        let mut link = self.writer.lock().await;
        if let Err(e) = link.frames.write_frame(&frame).await {
            warn!(carrier = %self.carrier, command = %frame.name(), error = %e, "failed to answer carrier");
        }
    }

    fn mark_closed(&self) -> usize {
        self.connected.store(false, Ordering::Release);
        self.bound.store(false, Ordering::Release);
        self.pending.fail_all()
    }
}

// A write that fails or is cancelled part way leaves a partial PDU on the
// wire, after which nothing the link sends can be framed by the carrier.
struct TornWrite<'a> {
    shared: Option<&'a Shared>,
}

impl<'a> TornWrite<'a> {
    fn arm(shared: &'a Shared) -> Self {
        Self {
            shared: Some(shared),
        }
    }

    fn disarm(mut self) {
        self.shared = None;
    }
}

impl Drop for TornWrite<'_> {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.take() {
            let failed = shared.mark_closed();
            warn!(carrier = %shared.carrier, failed, "write interrupted, link unusable");
        }
    }
}

/// A bound transceiver link to one carrier SMSC.
///
/// Cheap to share behind an `Arc`: `submit` takes `&self` and any number of
/// submissions may be in flight at once, each matched to its response by
/// sequence number.
pub struct OutboundClient {
    shared: Arc<Shared>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    disconnecting: AtomicBool,
}

impl std::fmt::Debug for OutboundClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutboundClient")
            .field("carrier", &self.shared.carrier)
            .field("connected", &self.is_connected())
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

impl OutboundClient {
    /// Opens the TCP connection and binds as transceiver.
    ///
    /// Resolves once the carrier accepts the bind. A nonzero bind status,
    /// a timeout or a dropped connection fails the whole connect.
    pub async fn connect(
        link: CarrierLink,
        config: ClientConfig,
        events: Option<EventSender>,
    ) -> SmppResult<OutboundClient> {
        let socket = tokio::time::timeout(config.request_timeout, TcpStream::connect(&link.address))
            .await
            .map_err(|_| SmppError::Timeout)??;
        let (read, write) = socket.into_split();

        let shared = Arc::new(Shared {
            carrier: link.carrier,
            params: link.params,
            pending: PendingRequests::new(config.max_in_flight),
            config,
            writer: tokio::sync::Mutex::new(LinkWriter {
                frames: FrameWriter::new(write),
                sequence: SequenceCounter::new(),
            }),
            connected: AtomicBool::new(true),
            bound: AtomicBool::new(false),
            events,
        });

        let reader = tokio::spawn(read_loop(Arc::clone(&shared), FrameReader::new(read)));
        let client = OutboundClient {
            shared,
            tasks: Mutex::new(vec![reader]),
            disconnecting: AtomicBool::new(false),
        };

        let credentials = link.credentials;
        let bind = BindRequest::new(credentials.system_id.as_str(), credentials.password.as_str())
            .with_system_type(credentials.system_type.as_str());
        let deadline = client.shared.config.request_timeout;

        match client.shared.request(Pdu::BindTransceiver(bind), deadline).await {
            Ok(Frame {
                pdu: Pdu::BindTransceiverResp(resp),
                ..
            }) => {
                client.shared.bound.store(true, Ordering::Release);
                info!(
                    carrier = %client.shared.carrier,
                    system_id = %credentials.system_id,
                    smsc = %resp.system_id,
                    "bound as transceiver"
                );
            }
            Ok(other) => {
                client.teardown();
                return Err(SmppError::UnexpectedPdu {
                    expected: "bind_transceiver_resp".to_string(),
                    actual: other.name(),
                });
            }
            Err(e) => {
                warn!(carrier = %client.shared.carrier, error = %e, "bind failed");
                client.teardown();
                return Err(e);
            }
        }

        if let Some(period) = client.shared.config.keep_alive.active_interval() {
            let keep_alive = tokio::spawn(keep_alive(Arc::clone(&client.shared), period));
            client.tasks().push(keep_alive);
        }
        Ok(client)
    }

    pub fn carrier(&self) -> &str {
        &self.shared.carrier
    }

    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::Acquire)
    }

    /// Requests currently awaiting a response.
    pub fn in_flight(&self) -> usize {
        self.shared.pending.len()
    }

    /// Sends one submit_sm and waits for the carrier's submit_sm_resp.
    ///
    /// A timeout abandons only this request; the link stays up and a late
    /// response is discarded.
    pub async fn submit(&self, request: SubmitRequest) -> SmppResult<SubmitResponse> {
        let submit = self.shared.params.build(&request)?;
        let deadline = self.shared.config.request_timeout;

        let response = self
            .shared
            .request(Pdu::SubmitSm(Box::new(submit)), deadline)
            .await?;
        match response.pdu {
            Pdu::SubmitSmResp(resp) => {
                let message_id = match (resp.message_id.is_empty(), request.reference) {
                    (true, Some(reference)) => reference,
                    _ => resp.message_id,
                };
                Ok(SubmitResponse {
                    message_id,
                    status: response.header.command_status,
                })
            }
            _ => Err(SmppError::UnexpectedPdu {
                expected: "submit_sm_resp".to_string(),
                actual: response.name(),
            }),
        }
    }

    /// Unbinds (best effort, bounded by `unbind_timeout`) and closes the link.
    ///
    /// Every request still pending fails with `ConnectionClosed`. Calling
    /// this more than once is a no-op.
    pub async fn disconnect(&self) -> SmppResult<()> {
        if self.disconnecting.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        if self.shared.bound.load(Ordering::Acquire) && self.is_connected() {
            let deadline = self.shared.config.unbind_timeout;
            match self.shared.request(Pdu::Unbind, deadline).await {
                Ok(_) => debug!(carrier = %self.shared.carrier, "unbound"),
                Err(e) => warn!(carrier = %self.shared.carrier, error = %e, "unbind failed"),
            }
        }

        self.shared.connected.store(false, Ordering::Release);
        let close = async {
            let mut link = self.shared.writer.lock().await;
            link.frames.shutdown().await
        };
        match tokio::time::timeout(self.shared.config.unbind_timeout, close).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                debug!(carrier = %self.shared.carrier, error = %e, "socket shutdown failed")
            }
            Err(_) => debug!(carrier = %self.shared.carrier, "socket shutdown timed out"),
        }
        self.teardown();
        info!(carrier = %self.shared.carrier, "disconnected");
        Ok(())
    }

    fn tasks(&self) -> std::sync::MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn teardown(&self) {
        for task in self.tasks().drain(..) {
            task.abort();
        }
        let failed = self.shared.mark_closed();
        if failed > 0 {
            debug!(carrier = %self.shared.carrier, failed, "failed pending requests");
        }
    }
}

impl Drop for OutboundClient {
    fn drop(&mut self) {
        self.teardown();
    }
}

async fn read_loop(shared: Arc<Shared>, mut reader: FrameReader<OwnedReadHalf>) {
    loop {
        let frame = match reader.read_frame().await {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                info!(carrier = %shared.carrier, "carrier closed the connection");
                break;
            }
            Err(ReadError::Malformed {
                sequence_number,
                source,
            }) => {
                warn!(carrier = %shared.carrier, error = %source, "malformed PDU from carrier");
                let nack = Frame::generic_nack(sequence_number.unwrap_or(0), source.to_command_status());
                shared.reply(nack).await;
                break;
            }
            Err(e) => {
                warn!(carrier = %shared.carrier, error = %e, "read failed");
                break;
            }
        };

        let sequence_number = frame.sequence_number();
        debug!(
            carrier = %shared.carrier,
            command = %frame.name(),
            sequence = sequence_number,
            status = frame.command_status(),
            "received"
        );

        if frame.is_response() {
            let keep_alive_ack = frame.pdu == Pdu::EnquireLinkResp;
            if !shared.pending.complete(frame) && !keep_alive_ack {
                debug!(carrier = %shared.carrier, sequence = sequence_number, "dropping late response");
            }
            continue;
        }

        match frame.pdu {
            Pdu::EnquireLink => {
                shared
                    .reply(Frame::new(sequence_number, Pdu::EnquireLinkResp))
                    .await;
            }
            Pdu::DeliverSm(deliver) => {
                shared
                    .reply(Frame::new(
                        sequence_number,
                        Pdu::DeliverSmResp(DeliverSmResponse::default()),
                    ))
                    .await;

                let receipt = deliver.delivery_receipt();
                debug!(
                    carrier = %shared.carrier,
                    message_id = %receipt.message_id,
                    state = %receipt.state,
                    "delivery report"
                );
                if let Some(events) = &shared.events {
                    events.emit(GatewayEvent::DeliveryReport(DeliveryReportEvent {
                        carrier: shared.carrier.clone(),
                        message_id: receipt.message_id,
                        state: receipt.state,
                        error_code: receipt.error_code,
                    }));
                }
            }
            Pdu::Unbind => {
                info!(carrier = %shared.carrier, "carrier requested unbind");
                shared
                    .reply(Frame::new(sequence_number, Pdu::UnbindResp))
                    .await;
                break;
            }
            _ => {
                shared
                    .reply(Frame::generic_nack(
                        sequence_number,
                        CommandStatus::InvalidCommandId,
                    ))
                    .await;
            }
        }
    }

    let failed = shared.mark_closed();
    if failed > 0 {
        warn!(carrier = %shared.carrier, failed, "link closed with requests pending");
    }
}

async fn keep_alive(shared: Arc<Shared>, period: Duration) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if !shared.connected.load(Ordering::Acquire) {
            break;
        }

        let ping = async {
            let mut link = shared.writer.lock().await;
            let sequence_number = link.sequence.next(|seq| shared.pending.contains(seq));
            let torn = TornWrite::arm(&shared);
            link.frames
                .write_frame(&Frame::new(sequence_number, Pdu::EnquireLink))
                .await?;
            torn.disarm();
            Ok::<_, std::io::Error>(sequence_number)
        };
        match tokio::time::timeout(shared.config.request_timeout, ping).await {
            Ok(Ok(sequence_number)) => {
                debug!(carrier = %shared.carrier, sequence = sequence_number, "sent enquire_link")
            }
            Ok(Err(e)) => {
                warn!(carrier = %shared.carrier, error = %e, "enquire_link failed");
                break;
            }
            Err(_) => {
                warn!(carrier = %shared.carrier, "enquire_link timed out");
                break;
            }
        }
    }
}
