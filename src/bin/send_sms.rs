// ABOUTME: Command-line tool that binds to an SMSC as transceiver and submits one message
// ABOUTME: Useful for checking carrier credentials and routing parameters by hand

use argh::FromArgs;
use smpp_gateway::client::{
    BindCredentials, CarrierLink, ClientConfig, KeepAliveConfig, OutboundClient, SubmitParams,
    SubmitRequest,
};
use smpp_gateway::event::{EventSender, GatewayEvent};
use std::time::Duration;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

/// Send a single SMS through an SMSC
#[derive(FromArgs)]
struct CliArgs {
    /// whether or not to enable debugging
    #[argh(switch, short = 'd')]
    debugging: bool,

    /// the system id
    #[argh(option)]
    system_id: Option<String>,

    /// the password
    #[argh(option)]
    password: Option<String>,

    /// the hostname of IP address of the SMSC (default: localhost)
    #[argh(option)]
    host: Option<String>,

    /// the port to use when connecting to the SMSC (default: 2775)
    #[argh(option, short = 'p')]
    port: Option<u16>,

    /// the message to send
    #[argh(option, short = 'm')]
    message: String,

    /// the recipient telephone number
    #[argh(option, short = 't')]
    to: String,

    /// the sender id or number the message will be from
    #[argh(option, short = 'f')]
    from: String,

    /// seconds to wait for a delivery receipt after submitting (default: 0)
    #[argh(option)]
    wait_receipt: Option<u64>,
}

#[tokio::main]
async fn main() -> smpp_gateway::Result<()> {
    let cli_args: CliArgs = argh::from_env();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if cli_args.debugging {
            Level::DEBUG
        } else {
            Level::INFO
        })
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let host = cli_args.host.unwrap_or_else(|| "localhost".to_owned());
    let port = cli_args.port.unwrap_or(2775);
    let link = CarrierLink {
        carrier: host.clone(),
        address: format!("{host}:{port}"),
        credentials: BindCredentials::new(
            cli_args.system_id.unwrap_or_default(),
            cli_args.password.unwrap_or_default(),
        ),
        params: SubmitParams::default(),
    };
    let config = ClientConfig::default().with_keep_alive(KeepAliveConfig::disabled());
    let (events, mut receipts) = EventSender::channel(16);

    info!("Connecting to {host}:{port}");
    let client = OutboundClient::connect(link, config, Some(events))
        .await
        .inspect_err(|e| error!("Connection/bind failed: {e}"))?;

    let request = SubmitRequest::new(cli_args.from, cli_args.to, cli_args.message);
    let outcome = client.submit(request).await;
    match &outcome {
        Ok(response) => {
            info!("Message sent successfully! Message ID: {}", response.message_id);

            if let Some(secs) = cli_args.wait_receipt.filter(|secs| *secs > 0) {
                match tokio::time::timeout(Duration::from_secs(secs), receipts.recv()).await {
                    Ok(Some(GatewayEvent::DeliveryReport(report))) => {
                        info!("Receipt for {}: {}", report.message_id, report.state);
                    }
                    Ok(_) => info!("Link closed before a receipt arrived"),
                    Err(_) => info!("No receipt within {secs}s"),
                }
            }
        }
        Err(e) => error!("Failed to send message: {e}"),
    }

    // Still attempt to unbind cleanly
    if let Err(e) = client.disconnect().await {
        error!("Warning: Disconnect failed: {e}");
    }

    outcome.map(|_| ()).map_err(Into::into)
}
