// ABOUTME: TCP listener that accepts ESME connections and spawns one session task per socket
// ABOUTME: Tracks live sessions by remote address; stopping closes the listener and lets sessions drain

use crate::connection::Connection;
use crate::event::EventSender;
use crate::server::session::{self, Session, SessionState};
use crate::server::{Authenticator, ServerConfig, SessionContext};
use std::collections::HashMap;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Snapshot of one live session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub peer: SocketAddr,
    pub state: SessionState,
    pub system_id: Option<String>,
    pub carrier: Option<String>,
}

impl From<&Session> for SessionInfo {
    fn from(session: &Session) -> Self {
        Self {
            peer: session.peer(),
            state: session.state(),
            system_id: session.system_id().map(str::to_owned),
            carrier: session.carrier().map(str::to_owned),
        }
    }
}

/// Live-session table keyed by remote address and port.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<SocketAddr, SessionInfo>>,
}

impl SessionRegistry {
    fn sessions(&self) -> std::sync::MutexGuard<'_, HashMap<SocketAddr, SessionInfo>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert(&self, info: SessionInfo) {
        self.sessions().insert(info.peer, info);
    }

    /// Refreshes the entry of `session`. Sessions already removed stay removed.
    pub fn update(&self, session: &Session) {
        if let Some(entry) = self.sessions().get_mut(&session.peer()) {
            *entry = SessionInfo::from(session);
        }
    }

    pub fn remove(&self, peer: &SocketAddr) -> Option<SessionInfo> {
        self.sessions().remove(peer)
    }

    pub fn get(&self, peer: &SocketAddr) -> Option<SessionInfo> {
        self.sessions().get(peer).cloned()
    }

    pub fn contains(&self, peer: &SocketAddr) -> bool {
        self.sessions().contains_key(peer)
    }

    pub fn len(&self) -> usize {
        self.sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions().is_empty()
    }

    pub fn snapshot(&self) -> Vec<SessionInfo> {
        self.sessions().values().cloned().collect()
    }
}

// Removes the entry when the session task ends, including by panic.
struct Registration {
    registry: Arc<SessionRegistry>,
    peer: SocketAddr,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.remove(&self.peer);
    }
}

struct Running {
    local_addr: SocketAddr,
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Inbound SMPP server.
///
/// ```rust,no_run
/// use smpp_gateway::event::EventSender;
/// use smpp_gateway::server::{Authenticator, Server, ServerConfig};
/// use std::sync::Arc;
///
/// struct Static;
///
/// impl Authenticator for Static {
///     fn authenticate(&self, system_id: &str, password: &str) -> Option<String> {
///         (system_id == "mtn_smpp_user" && password == "secret").then(|| "mtn".to_string())
///     }
/// }
///
/// # async fn example() -> std::io::Result<()> {
/// let (events, mut rx) = EventSender::channel(1024);
/// let server = Server::new(ServerConfig::default(), Arc::new(Static), events);
/// let addr = server.start(2775).await?;
/// println!("listening on {addr}");
///
/// while let Some(event) = rx.recv().await {
///     println!("{event:?}");
/// }
/// server.stop().await;
/// # Ok(())
/// # }
/// ```
pub struct Server {
    ctx: Arc<SessionContext>,
    sessions: Arc<SessionRegistry>,
    running: Mutex<Option<Running>>,
}

impl Server {
    pub fn new(
        config: ServerConfig,
        authenticator: Arc<dyn Authenticator>,
        events: EventSender,
    ) -> Self {
        Self {
            ctx: SessionContext::new(config, authenticator, events),
            sessions: Arc::new(SessionRegistry::default()),
            running: Mutex::new(None),
        }
    }

    /// Listens on every interface at `port`. Port 0 picks a free one.
    pub async fn start(&self, port: u16) -> io::Result<SocketAddr> {
        self.start_on(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)))
            .await
    }

    /// Binds `addr` and starts accepting. Returns the bound address.
    pub async fn start_on(&self, addr: SocketAddr) -> io::Result<SocketAddr> {
        if self.running().is_some() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                "server already started",
            ));
        }

        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let (stop, stopped) = oneshot::channel();
        let task = tokio::spawn(accept_loop(
            listener,
            Arc::clone(&self.ctx),
            Arc::clone(&self.sessions),
            stopped,
        ));

        let mut running = self.running();
        if running.is_some() {
            task.abort();
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                "server already started",
            ));
        }
        *running = Some(Running {
            local_addr,
            stop,
            task,
        });
        info!(address = %local_addr, "listener started");
        Ok(local_addr)
    }

    /// Closes the listening socket. Sessions already accepted keep running
    /// until their peers unbind or disconnect.
    pub async fn stop(&self) {
        let Some(running) = self.running().take() else {
            return;
        };
        // The accept loop may already have ended on its own.
        let _ = running.stop.send(());
        if let Err(e) = running.task.await {
            if !e.is_cancelled() {
                error!(error = %e, "accept loop failed");
            }
        }
        info!(
            address = %running.local_addr,
            sessions = self.sessions.len(),
            "listener stopped"
        );
    }

    /// Address being listened on, while started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running().as_ref().map(|running| running.local_addr)
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    fn running(&self) -> std::sync::MutexGuard<'_, Option<Running>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        if let Some(running) = self.running().take() {
            running.task.abort();
        }
    }
}

async fn accept_loop(
    listener: TcpListener,
    ctx: Arc<SessionContext>,
    sessions: Arc<SessionRegistry>,
    mut stopped: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            biased;

            _ = &mut stopped => break,

            accepted = listener.accept() => {
                let (socket, peer) = match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        error!(error = %e, "accept error");
                        continue;
                    }
                };
                if let Err(e) = socket.set_nodelay(true) {
                    debug!(peer = %peer, error = %e, "failed to set TCP_NODELAY");
                }
                debug!(peer = %peer, "accepted connection");

                let session = Session::new(peer, Arc::clone(&ctx));
                sessions.insert(SessionInfo::from(&session));
                let registration = Registration {
                    registry: Arc::clone(&sessions),
                    peer,
                };
                tokio::spawn(async move {
                    session::run(session, Connection::new(socket), &registration.registry).await;
                    drop(registration);
                });
            }
        }
    }
    // Dropping the listener here closes the socket.
}
