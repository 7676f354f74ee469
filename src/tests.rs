//! Loopback integration tests: ESMEs against the gateway server, the
//! outbound client and dispatcher against a scripted SMSC.

#[cfg(test)]
mod integration_tests {
    use crate::client::{
        BindCredentials, CarrierLink, ClientConfig, KeepAliveConfig, OutboundClient, SmppError,
        SubmitParams, SubmitRequest,
    };
    use crate::codec::{Frame, Pdu};
    use crate::connection::Connection;
    use crate::datatypes::{
        BindRequest, BindResponse, CommandStatus, DeliverSm, MessageState, SubmitSm,
        SubmitSmResponse,
    };
    use crate::dispatch::{
        BatchItem, BatchJob, CarrierRegistry, ContentPolicy, DispatchError, Dispatcher, DndRegistry,
        GatewayConfig, PolicyVerdict, SendJob,
    };
    use crate::event::{EventReceiver, EventSender, GatewayEvent};
    use crate::server::{Server, ServerConfig, SessionState};
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::net::{TcpListener, TcpStream};
    use tokio::sync::mpsc;
    use tokio::task::JoinSet;

    fn gateway_yaml(smsc: SocketAddr, throughput: u64) -> String {
        format!(
            r#"
dispatch:
  defaultCarrier: mtn
  requestTimeout: 2s
  batchDelay: 10ms
  keepAliveInterval: 0s
carriers:
  mtn:
    systemId: mtn_smpp_user
    password: mtnpass1
    host: "{host}"
    port: {port}
    throughput: {throughput}
    numberPrefixes: ["24", "25", "53", "54", "55", "59"]
  vodafone:
    systemId: vf_smpp_user
    password: vfpass12
    host: "{host}"
    port: {port}
    throughput: {throughput}
    numberPrefixes: ["20", "50"]
"#,
            host = smsc.ip(),
            port = smsc.port(),
        )
    }

    async fn gateway() -> (Server, SocketAddr, EventReceiver) {
        let unused: SocketAddr = "127.0.0.1:9".parse().unwrap();
        let config = GatewayConfig::from_yaml(&gateway_yaml(unused, 10)).unwrap();
        let (events, rx) = EventSender::channel(64);
        let server = Server::new(
            ServerConfig::default(),
            Arc::new(CarrierRegistry::from_config(&config)),
            events,
        );
        let addr = server
            .start_on("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        (server, addr, rx)
    }

    async fn esme(addr: SocketAddr) -> Connection {
        Connection::new(TcpStream::connect(addr).await.unwrap())
    }

    async fn request(conn: &mut Connection, frame: Frame) -> Frame {
        conn.write_frame(&frame).await.unwrap();
        conn.read_frame().await.unwrap().unwrap()
    }

    async fn eventually(mut check: impl FnMut() -> bool) {
        for _ in 0..200 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached");
    }

    #[derive(Clone, Copy, PartialEq)]
    enum Mode {
        /// Answers every submit_sm at once.
        Answer,
        /// Binds, then never answers a submit_sm.
        Silent,
        /// Holds two submit_sm and answers them newest first.
        Reverse,
        /// Pushes a delivery receipt right after the bind.
        Receipt,
        /// Binds, then stops reading from the socket.
        Stall,
    }

    struct FakeSmsc {
        addr: SocketAddr,
        accepted: Arc<AtomicUsize>,
        seen: mpsc::UnboundedReceiver<Frame>,
    }

    impl FakeSmsc {
        async fn start(mode: Mode) -> FakeSmsc {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let accepted = Arc::new(AtomicUsize::new(0));
            let (seen_tx, seen) = mpsc::unbounded_channel();

            let counter = Arc::clone(&accepted);
            tokio::spawn(async move {
                while let Ok((socket, _)) = listener.accept().await {
                    counter.fetch_add(1, Ordering::SeqCst);
                    tokio::spawn(serve(Connection::new(socket), mode, seen_tx.clone()));
                }
            });
            FakeSmsc {
                addr,
                accepted,
                seen,
            }
        }

        fn link(&self) -> CarrierLink {
            CarrierLink {
                carrier: "mtn".to_string(),
                address: self.addr.to_string(),
                credentials: BindCredentials::new("gateway", "secret"),
                params: SubmitParams::default(),
            }
        }

        /// Next frame of `command` the SMSC received.
        async fn received(&mut self, command: &str) -> Frame {
            loop {
                let frame = tokio::time::timeout(Duration::from_secs(2), self.seen.recv())
                    .await
                    .expect("SMSC saw nothing in time")
                    .expect("SMSC stopped");
                if frame.name() == command {
                    return frame;
                }
            }
        }
    }

    async fn serve(mut conn: Connection, mode: Mode, seen: mpsc::UnboundedSender<Frame>) {
        let mut held = Vec::new();
        while let Ok(Some(frame)) = conn.read_frame().await {
            let seq = frame.sequence_number();
            let _ = seen.send(frame.clone());

            let reply = match &frame.pdu {
                Pdu::BindTransceiver(_) => Some(Frame::new(
                    seq,
                    Pdu::BindTransceiverResp(BindResponse::new("SMSC")),
                )),
                Pdu::SubmitSm(submit) => {
                    let resp = Frame::new(
                        seq,
                        Pdu::SubmitSmResp(SubmitSmResponse::new(format!(
                            "MSG-{}",
                            submit.destination_addr
                        ))),
                    );
                    match mode {
                        Mode::Silent => None,
                        Mode::Reverse => {
                            held.push(resp);
                            if held.len() == 2 {
                                for resp in held.drain(..).rev() {
                                    conn.write_frame(&resp).await.unwrap();
                                }
                            }
                            None
                        }
                        Mode::Answer | Mode::Receipt | Mode::Stall => Some(resp),
                    }
                }
                Pdu::EnquireLink => Some(Frame::new(seq, Pdu::EnquireLinkResp)),
                Pdu::Unbind => Some(Frame::new(seq, Pdu::UnbindResp)),
                _ => None,
            };

            if let Some(reply) = reply {
                if conn.write_frame(&reply).await.is_err() {
                    break;
                }
            }
            match frame.pdu {
                Pdu::Unbind => break,
                Pdu::BindTransceiver(_) if mode == Mode::Receipt => {
                    let receipt = DeliverSm::receipt(
                        "233241234567",
                        "MyBrand",
                        "MSG-1",
                        MessageState::Delivered,
                        "000",
                    );
                    let push = Frame::new(77, Pdu::DeliverSm(Box::new(receipt)));
                    conn.write_frame(&push).await.unwrap();
                }
                Pdu::BindTransceiver(_) if mode == Mode::Stall => {
                    std::future::pending::<()>().await;
                }
                _ => {}
            }
        }
    }

    fn quick_config() -> ClientConfig {
        ClientConfig::default()
            .with_request_timeout(Duration::from_millis(300))
            .with_keep_alive(KeepAliveConfig::disabled())
    }

    #[tokio::test]
    async fn test_bind_and_submit_through_the_gateway() {
        let (server, addr, mut events) = gateway().await;
        let mut conn = esme(addr).await;

        let bind = Frame::new(
            1,
            Pdu::BindTransceiver(BindRequest::new("mtn_smpp_user", "mtnpass1")),
        );
        let resp = request(&mut conn, bind).await;
        assert_eq!(resp.sequence_number(), 1);
        assert_eq!(resp.command_status(), 0);
        assert!(matches!(&resp.pdu, Pdu::BindTransceiverResp(b) if b.system_id == "mtn_smpp_user"));

        let sessions = server.sessions().snapshot();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].state, SessionState::BoundTrx);
        assert_eq!(sessions[0].carrier.as_deref(), Some("mtn"));

        let submit = SubmitSm::new("5000", "233501234567", "Hello").unwrap();
        let resp = request(&mut conn, Frame::new(2, Pdu::SubmitSm(Box::new(submit)))).await;
        assert_eq!(resp.command_status(), 0);
        let Pdu::SubmitSmResp(ack) = resp.pdu else {
            panic!("expected submit_sm_resp, got {}", resp.name());
        };
        assert!(ack.message_id.starts_with("ID"));

        match events.recv().await {
            Some(GatewayEvent::Message(message)) => {
                assert_eq!(message.carrier, "mtn");
                assert_eq!(message.destination, "233501234567");
                assert_eq!(message.body, "Hello");
                assert_eq!(message.message_id, ack.message_id);
            }
            other => panic!("expected message event, got {other:?}"),
        }
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_bad_credentials_close_the_session() {
        let (server, addr, _events) = gateway().await;
        let mut conn = esme(addr).await;

        let bind = Frame::new(
            1,
            Pdu::BindTransceiver(BindRequest::new("mtn_smpp_user", "wrong")),
        );
        let resp = request(&mut conn, bind).await;
        assert_ne!(resp.command_status(), 0);
        assert_eq!(resp.command_status(), CommandStatus::InvalidPassword.code());

        assert!(conn.read_frame().await.unwrap().is_none());
        eventually(|| server.sessions().is_empty()).await;
    }

    #[tokio::test]
    async fn test_unbind_ends_the_session() {
        let (server, addr, _events) = gateway().await;
        let mut conn = esme(addr).await;

        let bind = Frame::new(
            1,
            Pdu::BindTransmitter(BindRequest::new("vf_smpp_user", "vfpass12")),
        );
        assert_eq!(request(&mut conn, bind).await.command_status(), 0);

        let resp = request(&mut conn, Frame::new(2, Pdu::Unbind)).await;
        assert_eq!(resp.pdu, Pdu::UnbindResp);
        assert!(conn.read_frame().await.unwrap().is_none());
        eventually(|| server.sessions().is_empty()).await;
    }

    #[tokio::test]
    async fn test_submit_times_out_without_leaking() {
        let smsc = FakeSmsc::start(Mode::Silent).await;
        let client = OutboundClient::connect(smsc.link(), quick_config(), None)
            .await
            .unwrap();

        let err = client
            .submit(SubmitRequest::new("MyBrand", "233241234567", "Hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, SmppError::Timeout), "{err}");
        assert!(err.is_retryable());
        assert_eq!(client.in_flight(), 0);
        assert!(client.is_connected());
    }

    #[tokio::test]
    async fn test_stalled_carrier_cannot_hold_submits_past_the_deadline() {
        let smsc = FakeSmsc::start(Mode::Stall).await;
        let config = quick_config().with_unbind_timeout(Duration::from_millis(300));
        let client = Arc::new(
            OutboundClient::connect(smsc.link(), config, None)
                .await
                .unwrap(),
        );

        // Enough payload to fill both socket buffers, so writes block.
        let body = "x".repeat(60_000);
        let started = tokio::time::Instant::now();
        let mut submits = JoinSet::new();
        for n in 0..200 {
            let client = Arc::clone(&client);
            let request = SubmitRequest::new("MyBrand", format!("233241{n:06}"), body.as_str());
            submits.spawn(async move { client.submit(request).await });
        }
        while let Some(joined) = submits.join_next().await {
            let err = joined.unwrap().unwrap_err();
            assert!(
                matches!(err, SmppError::Timeout | SmppError::ConnectionClosed),
                "{err}"
            );
            assert!(err.is_retryable());
        }
        let elapsed = started.elapsed();
        assert!(elapsed < Duration::from_millis(1500), "took {elapsed:?}");
        assert_eq!(client.in_flight(), 0);

        tokio::time::timeout(Duration::from_secs(2), client.disconnect())
            .await
            .expect("disconnect hung on a stalled carrier")
            .unwrap();
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn test_keep_alive_does_not_disturb_pending_submits() {
        let mut smsc = FakeSmsc::start(Mode::Reverse).await;
        let config = ClientConfig::default()
            .with_request_timeout(Duration::from_secs(2))
            .with_keep_alive(KeepAliveConfig::new(Duration::from_millis(100)));
        let client = Arc::new(
            OutboundClient::connect(smsc.link(), config, None)
                .await
                .unwrap(),
        );

        let first = {
            let client = Arc::clone(&client);
            tokio::spawn(async move {
                client
                    .submit(SubmitRequest::new("MyBrand", "233241111111", "one"))
                    .await
            })
        };
        smsc.received("submit_sm").await;
        smsc.received("enquire_link").await;
        smsc.received("enquire_link").await;
        assert_eq!(client.in_flight(), 1);
        assert!(client.is_connected());

        let second = client
            .submit(SubmitRequest::new("MyBrand", "233242222222", "two"))
            .await
            .unwrap();
        assert_eq!(second.message_id, "MSG-233242222222");
        let first = first.await.unwrap().unwrap();
        assert_eq!(first.message_id, "MSG-233241111111");
        assert_eq!(client.in_flight(), 0);
        assert!(client.is_connected());
    }

    #[tokio::test]
    async fn test_out_of_order_responses_are_correlated() {
        let smsc = FakeSmsc::start(Mode::Reverse).await;
        let client = OutboundClient::connect(smsc.link(), quick_config(), None)
            .await
            .unwrap();

        let (first, second) = tokio::join!(
            client.submit(SubmitRequest::new("MyBrand", "233241111111", "one")),
            client.submit(SubmitRequest::new("MyBrand", "233242222222", "two")),
        );
        assert_eq!(first.unwrap().message_id, "MSG-233241111111");
        assert_eq!(second.unwrap().message_id, "MSG-233242222222");
        assert_eq!(client.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_submits_use_distinct_sequence_numbers() {
        let mut smsc = FakeSmsc::start(Mode::Answer).await;
        let client = OutboundClient::connect(smsc.link(), quick_config(), None)
            .await
            .unwrap();

        let (a, b) = tokio::join!(
            client.submit(SubmitRequest::new("MyBrand", "233241111111", "one")),
            client.submit(SubmitRequest::new("MyBrand", "233242222222", "two")),
        );
        assert!(a.is_ok() && b.is_ok());

        let bind = smsc.received("bind_transceiver").await;
        let x = smsc.received("submit_sm").await;
        let y = smsc.received("submit_sm").await;
        let mut seqs = vec![bind.sequence_number(), x.sequence_number(), y.sequence_number()];
        seqs.sort_unstable();
        seqs.dedup();
        assert_eq!(seqs.len(), 3);
    }

    #[tokio::test]
    async fn test_carrier_receipts_are_acked_and_reported() {
        let mut smsc = FakeSmsc::start(Mode::Receipt).await;
        let (events, mut rx) = EventSender::channel(8);
        let _client = OutboundClient::connect(smsc.link(), quick_config(), Some(events))
            .await
            .unwrap();

        let ack = smsc.received("deliver_sm_resp").await;
        assert_eq!(ack.sequence_number(), 77);
        assert_eq!(ack.command_status(), 0);

        match rx.recv().await {
            Some(GatewayEvent::DeliveryReport(report)) => {
                assert_eq!(report.carrier, "mtn");
                assert_eq!(report.message_id, "MSG-1");
                assert_eq!(report.state, MessageState::Delivered);
                assert_eq!(report.error_code.as_deref(), Some("000"));
            }
            other => panic!("expected delivery report, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_disconnect_unbinds_and_closes() {
        let mut smsc = FakeSmsc::start(Mode::Answer).await;
        let client = OutboundClient::connect(smsc.link(), quick_config(), None)
            .await
            .unwrap();

        client.disconnect().await.unwrap();
        smsc.received("unbind").await;
        assert!(!client.is_connected());

        let err = client
            .submit(SubmitRequest::new("MyBrand", "233241234567", "late"))
            .await
            .unwrap_err();
        assert!(matches!(err, SmppError::ConnectionClosed));
        client.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn test_bind_rejected_by_carrier_fails_connect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut conn = Connection::new(socket);
            let bind = conn.read_frame().await.unwrap().unwrap();
            let reject = Frame::with_status(
                bind.sequence_number(),
                CommandStatus::InvalidPassword.code(),
                Pdu::BindTransceiverResp(BindResponse::new("")),
            );
            conn.write_frame(&reject).await.unwrap();
        });

        let link = CarrierLink {
            carrier: "mtn".to_string(),
            address: addr.to_string(),
            credentials: BindCredentials::new("gateway", "wrong"),
            params: SubmitParams::default(),
        };
        let err = OutboundClient::connect(link, quick_config(), None)
            .await
            .unwrap_err();
        assert_eq!(
            err.carrier_status(),
            Some(CommandStatus::InvalidPassword.code())
        );
    }

    fn dispatcher(smsc: &FakeSmsc, throughput: u64) -> Dispatcher {
        let config = GatewayConfig::from_yaml(&gateway_yaml(smsc.addr, throughput)).unwrap();
        Dispatcher::builder(&config).build()
    }

    fn job(id: &str, to: &str) -> SendJob {
        SendJob {
            message_id: id.to_string(),
            from: "MyBrand".to_string(),
            to: to.to_string(),
            content: "Hello".to_string(),
            client_id: None,
        }
    }

    #[tokio::test]
    async fn test_concurrent_first_use_opens_one_link() {
        let smsc = FakeSmsc::start(Mode::Answer).await;
        let dispatcher = dispatcher(&smsc, 100);

        let mut submits = JoinSet::new();
        for n in 0..20 {
            let dispatcher = dispatcher.clone();
            submits.spawn(async move {
                dispatcher
                    .submit(job(&format!("m-{n}"), &format!("024123{n:04}")))
                    .await
            });
        }
        while let Some(joined) = submits.join_next().await {
            assert_eq!(joined.unwrap().unwrap().carrier, "mtn");
        }
        assert_eq!(smsc.accepted.load(Ordering::SeqCst), 1);
        dispatcher.shutdown().await;
    }

    #[tokio::test]
    async fn test_dispatch_routes_and_reuses_the_link() {
        let smsc = FakeSmsc::start(Mode::Answer).await;
        let dispatcher = dispatcher(&smsc, 100);

        let sent = dispatcher.submit(job("m-1", "0241234567")).await.unwrap();
        assert_eq!(sent.carrier, "mtn");
        assert_eq!(sent.message_id, "MSG-233241234567");

        let again = dispatcher.submit(job("m-2", "233551234567")).await.unwrap();
        assert_eq!(again.carrier, "mtn");
        assert_eq!(smsc.accepted.load(Ordering::SeqCst), 1);

        // No prefix matches 99, so the default carrier takes it.
        let fallback = dispatcher.submit(job("m-3", "0991234567")).await.unwrap();
        assert_eq!(fallback.carrier, "mtn");

        let vodafone = dispatcher.submit(job("m-4", "0201234567")).await.unwrap();
        assert_eq!(vodafone.carrier, "vodafone");
        assert_eq!(smsc.accepted.load(Ordering::SeqCst), 2);

        dispatcher.shutdown().await;
    }

    #[tokio::test]
    async fn test_dispatch_rate_limit_is_retryable() {
        let smsc = FakeSmsc::start(Mode::Answer).await;
        let dispatcher = dispatcher(&smsc, 1);

        dispatcher.submit(job("m-1", "0241234567")).await.unwrap();
        let err = dispatcher
            .submit(job("m-2", "0241234567"))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::RateLimited(ref c) if c == "mtn"));
        assert!(err.is_retryable());

        // Other carriers have their own buckets.
        dispatcher.submit(job("m-3", "0501234567")).await.unwrap();
        dispatcher.shutdown().await;
    }

    struct NoSpam;

    impl ContentPolicy for NoSpam {
        fn check(&self, content: &str) -> PolicyVerdict {
            if content.contains("win prize") {
                PolicyVerdict::deny("fraud")
            } else {
                PolicyVerdict::allow()
            }
        }
    }

    struct OptedOut;

    impl DndRegistry for OptedOut {
        fn is_blocked(&self, msisdn: &str) -> bool {
            msisdn == "233249999999"
        }
    }

    #[tokio::test]
    async fn test_compliance_refusals_never_reach_the_carrier() {
        let smsc = FakeSmsc::start(Mode::Answer).await;
        let config = GatewayConfig::from_yaml(&gateway_yaml(smsc.addr, 100)).unwrap();
        let dispatcher = Dispatcher::builder(&config)
            .content_policy(Arc::new(NoSpam))
            .dnd_registry(Arc::new(OptedOut))
            .build();

        let mut spam = job("m-1", "0241234567");
        spam.content = "You win prize money".to_string();
        let err = dispatcher.submit(spam).await.unwrap_err();
        assert!(matches!(err, DispatchError::ContentRejected(ref r) if r == "fraud"));

        let err = dispatcher.submit(job("m-2", "0249999999")).await.unwrap_err();
        assert!(matches!(err, DispatchError::DoNotDisturb(_)));
        assert!(!err.is_retryable());

        assert_eq!(smsc.accepted.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_batch_reports_every_message_in_order() {
        let smsc = FakeSmsc::start(Mode::Answer).await;
        let dispatcher = dispatcher(&smsc, 100);

        let item = |id: &str, to: &str| BatchItem {
            recipient: to.to_string(),
            content: "Hi".to_string(),
            message_id: id.to_string(),
        };
        let report = dispatcher
            .submit_batch(BatchJob {
                batch_id: "b-1".to_string(),
                from: "MyBrand".to_string(),
                messages: vec![
                    item("m-1", "0241234567"),
                    item("m-2", "123"),
                    item("m-3", "0501234567"),
                    item("m-4", "0551234567"),
                ],
                client_id: None,
            })
            .await;

        assert_eq!(report.batch_id, "b-1");
        let ids: Vec<&str> = report.outcomes.iter().map(|o| o.message_id.as_str()).collect();
        assert_eq!(ids, ["m-1", "m-2", "m-3", "m-4"]);
        assert_eq!(report.accepted(), 3);
        assert_eq!(report.failed(), 1);

        assert!(matches!(
            report.outcomes[1].result,
            Err(DispatchError::InvalidNumber(_))
        ));
        assert_eq!(report.outcomes[1].carrier, None);
        assert_eq!(report.outcomes[2].carrier.as_deref(), Some("vodafone"));
        assert_eq!(
            report.outcomes[3].result.as_ref().unwrap().message_id,
            "MSG-233551234567"
        );
        dispatcher.shutdown().await;
    }

    #[tokio::test]
    async fn test_batch_chunks_follow_throughput() {
        let smsc = FakeSmsc::start(Mode::Answer).await;
        // Two per chunk; the limiter admits only two per second.
        let dispatcher = dispatcher(&smsc, 2);

        let messages = (0..3)
            .map(|n| BatchItem {
                recipient: format!("024123456{n}"),
                content: "Hi".to_string(),
                message_id: format!("m-{n}"),
            })
            .collect();
        let report = dispatcher
            .submit_batch(BatchJob {
                batch_id: "b-2".to_string(),
                from: "MyBrand".to_string(),
                messages,
                client_id: None,
            })
            .await;

        assert_eq!(report.accepted(), 2);
        assert!(matches!(
            report.outcomes[2].result,
            Err(DispatchError::RateLimited(_))
        ));
        dispatcher.shutdown().await;
    }

    #[tokio::test]
    async fn test_session_message_is_dispatched_with_its_flags() {
        let mut smsc = FakeSmsc::start(Mode::Answer).await;
        let dispatcher = dispatcher(&smsc, 100);
        let (_server, addr, mut events) = gateway().await;

        let mut conn = esme(addr).await;
        let bind = Frame::new(
            1,
            Pdu::BindTransceiver(BindRequest::new("vf_smpp_user", "vfpass12")),
        );
        assert_eq!(request(&mut conn, bind).await.command_status(), 0);

        let mut submit = SubmitSm::new("5000", "233241234567", "Hello").unwrap();
        submit.registered_delivery = 0;
        request(&mut conn, Frame::new(2, Pdu::SubmitSm(Box::new(submit)))).await;

        let Some(GatewayEvent::Message(message)) = events.recv().await else {
            panic!("expected message event");
        };
        // Bound as a vodafone ESME, so vodafone carries it despite the prefix.
        let sent = dispatcher.submit_message(message).await.unwrap();
        assert_eq!(sent.carrier, "vodafone");

        let forwarded = smsc.received("submit_sm").await;
        let Pdu::SubmitSm(forwarded) = forwarded.pdu else {
            unreachable!()
        };
        assert_eq!(forwarded.registered_delivery, 0);
        assert_eq!(forwarded.destination_addr, "233241234567");
        assert_eq!(forwarded.text(), "Hello");
        dispatcher.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_unbinds_and_refuses_new_work() {
        let mut smsc = FakeSmsc::start(Mode::Answer).await;
        let dispatcher = dispatcher(&smsc, 100);

        dispatcher.submit(job("m-1", "0241234567")).await.unwrap();
        dispatcher.shutdown().await;
        smsc.received("unbind").await;

        let err = dispatcher.submit(job("m-2", "0241234567")).await.unwrap_err();
        assert!(matches!(err, DispatchError::ShutDown));
        assert!(dispatcher.pool().get("mtn").await.is_none());
    }
}
