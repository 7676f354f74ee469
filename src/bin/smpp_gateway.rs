// ABOUTME: Gateway process: accepts ESME binds and forwards accepted messages to carrier SMSCs
// ABOUTME: Wires configuration, the listener, the dispatcher and the event loop; Ctrl-C shuts down cleanly

use argh::FromArgs;
use smpp_gateway::dispatch::{CarrierRegistry, Dispatcher, GatewayConfig};
use smpp_gateway::event::{DEFAULT_EVENT_CAPACITY, EventReceiver, EventSender, GatewayEvent};
use smpp_gateway::ratelimit::RateLimiterRegistry;
use smpp_gateway::server::Server;
use std::sync::Arc;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// SMPP gateway between ESMEs and carrier SMSCs
#[derive(FromArgs)]
struct CliArgs {
    /// whether or not to enable debugging
    #[argh(switch, short = 'd')]
    debug: bool,

    /// path to the gateway configuration (default: config/gateway.yaml)
    #[argh(option, short = 'c')]
    config: Option<String>,

    /// inbound port, overriding the configuration
    #[argh(option, short = 'p')]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> smpp_gateway::Result<()> {
    let cli_args: CliArgs = argh::from_env();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if cli_args.debug {
            Level::DEBUG
        } else {
            Level::INFO
        })
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let path = cli_args
        .config
        .unwrap_or_else(|| "config/gateway.yaml".to_owned());
    let config = GatewayConfig::load(&path).inspect_err(|e| error!("{e}"))?;
    let port = cli_args.port.unwrap_or(config.server.port);

    let (events, receiver) = EventSender::channel(DEFAULT_EVENT_CAPACITY);
    let dispatcher = Dispatcher::builder(&config)
        .events(events.clone())
        .rate_limiters(Arc::new(RateLimiterRegistry::new()))
        .build();

    let registry = Arc::new(CarrierRegistry::from_config(&config));
    let server = Server::new(config.server.server_config(), registry, events);
    let addr = server.start(port).await?;
    info!(address = %addr, carriers = config.carriers.len(), "gateway running");

    let forwarding = tokio::spawn(forward_events(receiver, dispatcher.clone()));

    tokio::signal::ctrl_c().await?;
    info!("shutting down");

    server.stop().await;
    dispatcher.shutdown().await;
    forwarding.abort();

    info!("gateway stopped");
    Ok(())
}

/// Hands session messages to the dispatcher and logs delivery reports.
async fn forward_events(mut receiver: EventReceiver, dispatcher: Dispatcher) {
    while let Some(event) = receiver.recv().await {
        match event {
            GatewayEvent::Message(message) => {
                let dispatcher = dispatcher.clone();
                tokio::spawn(async move {
                    let message_id = message.message_id.clone();
                    match dispatcher.submit_message(message).await {
                        Ok(sent) => debug!(
                            message_id = %message_id,
                            carrier = %sent.carrier,
                            carrier_id = %sent.message_id,
                            "forwarded"
                        ),
                        Err(e) => warn!(
                            message_id = %message_id,
                            retryable = e.is_retryable(),
                            error = %e,
                            "forwarding failed"
                        ),
                    }
                });
            }
            GatewayEvent::DeliveryReport(report) => info!(
                carrier = %report.carrier,
                message_id = %report.message_id,
                state = %report.state,
                final_state = report.state.is_final(),
                error_code = report.error_code.as_deref().unwrap_or("-"),
                "delivery report"
            ),
        }
    }
}
