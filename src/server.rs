use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::command::ServerCommand;
use crate::config::{self, ServerConfig};
use crate::connection::{self, ConnectionHandle, Inbound};
use crate::error::ChatError;
use crate::message::{Input, ServerNotice};
use crate::session::{Flow, SessionHooks};
use crate::types::ClientId;
use crate::ui::Ui;

/// Everything the server reacts to, in arrival order.
///
/// Console lines and connection events share one queue, so a `setport`
/// typed at the console is serialized against a client attaching.
#[derive(Debug)]
pub enum ServerEvent {
    Console(String),
    ConsoleClosed,
    /// `epoch` is the close count when the connection was accepted.
    Connected { epoch: u64, handle: ConnectionHandle },
    Inbound { id: ClientId, inbound: Inbound },
    ListenFailed(ChatError),
}

/// The accept loop of a listening server. Dropping it stops accepting.
struct Listening {
    local_addr: SocketAddr,
    task: JoinHandle<()>,
}

impl Drop for Listening {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// The echo server. Owns the set of attached clients; only the task that
/// drains the event queue touches it.
pub struct Server {
    config: ServerConfig,
    clients: HashMap<ClientId, ConnectionHandle>,
    listening: Option<Listening>,
    closes: u64,
    next_id: Arc<AtomicU64>,
    events: mpsc::UnboundedSender<ServerEvent>,
    ui: Box<dyn Ui>,
}

impl Server {
    pub fn new(config: ServerConfig, ui: Box<dyn Ui>) -> (Self, mpsc::UnboundedReceiver<ServerEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let server = Self {
            config,
            clients: HashMap::new(),
            listening: None,
            closes: 0,
            next_id: Arc::new(AtomicU64::new(0)),
            events,
            ui,
        };
        (server, rx)
    }

    /// A sender for feeding console lines into the queue.
    pub fn events(&self) -> mpsc::UnboundedSender<ServerEvent> {
        self.events.clone()
    }

    pub fn port(&self) -> u16 {
        self.config.port
    }

    pub fn is_listening(&self) -> bool {
        self.listening.is_some()
    }

    /// The address actually bound, which differs from the configured one
    /// when the configured port is 0.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listening.as_ref().map(|l| l.local_addr)
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Drain the queue until a handler asks to quit.
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<ServerEvent>) {
        while let Some(event) = events.recv().await {
            if self.handle_event(event).await == Flow::Quit {
                break;
            }
        }
    }

    pub async fn handle_event(&mut self, event: ServerEvent) -> Flow {
        match event {
            ServerEvent::Console(line) => return self.handle_console(&line).await,
            ServerEvent::ConsoleClosed => {
                warn!("console input closed, still serving attached clients");
            }
            ServerEvent::Connected { epoch, handle } => {
                if epoch != self.closes {
                    debug!(client = %handle, "accepted before close, dropping");
                    handle.close();
                    return Flow::Continue;
                }
                self.clients.insert(handle.id(), handle.clone());
                self.connection_established(&handle);
            }
            ServerEvent::Inbound { id, inbound } => self.handle_inbound(id, inbound),
            ServerEvent::ListenFailed(e) => {
                error!("accept loop failed: {e}");
                self.ui.display(&format!("Server stopped accepting connections: {e}"));
                if self.listening.take().is_some() {
                    self.listening_stopped();
                }
            }
        }
        Flow::Continue
    }

    /// One line typed at the server console.
    pub async fn handle_console(&mut self, line: &str) -> Flow {
        match Input::classify(line) {
            Input::Empty => Flow::Continue,
            Input::Payload(text) => {
                let notice = ServerNotice(text).to_string();
                self.ui.display(&notice);
                self.broadcast(&notice);
                Flow::Continue
            }
            Input::Command(command) => match ServerCommand::parse(command) {
                Ok(command) => self.execute(command).await,
                Err(e) => {
                    self.report(&e);
                    Flow::Continue
                }
            },
        }
    }

    async fn execute(&mut self, command: ServerCommand) -> Flow {
        debug!(?command, "console command");
        match command {
            ServerCommand::Quit => return self.quit(),
            ServerCommand::Stop => {
                if !self.stop_listening() {
                    self.ui.display("Server is not listening.");
                }
            }
            ServerCommand::Close => self.close(),
            ServerCommand::SetPort(arg) => {
                if let Err(e) = self.set_port(arg.as_deref()) {
                    self.report(&e);
                }
            }
            ServerCommand::Start => {
                if let Err(e) = self.listen().await {
                    error!("listen on {} failed: {e}", self.config.bind_addr());
                    self.ui.display("Unable to start server.");
                }
            }
            ServerCommand::GetPort => self.ui.display(&format!("Port: {}", self.port())),
        }
        Flow::Continue
    }

    fn handle_inbound(&mut self, id: ClientId, inbound: Inbound) {
        match inbound {
            Inbound::Line(msg) => {
                let Some(handle) = self.clients.get(&id) else {
                    debug!(%id, "dropping line from detached client");
                    return;
                };
                self.ui.display(&format!("Message received: {msg} from {handle}"));
                self.broadcast(&msg);
            }
            Inbound::Closed => {
                if let Some(handle) = self.clients.remove(&id) {
                    self.connection_closed(&handle);
                }
            }
            Inbound::Failed(e) => {
                if let Some(handle) = self.clients.remove(&id) {
                    // A lost client only leaves the broadcast set.
                    if self.connection_exception(&handle, &e) == Flow::Quit {
                        warn!(client = %handle, "ignoring quit from exception hook");
                    }
                }
            }
        }
    }

    /// Send `line` to every attached client, the originator included.
    /// Returns how many deliveries succeeded; a failed one does not stop
    /// the rest.
    pub fn broadcast(&self, line: &str) -> usize {
        let mut delivered = 0;
        for handle in self.clients.values() {
            match handle.send(line) {
                Ok(()) => delivered += 1,
                Err(e) => warn!("broadcast to {handle} failed: {e}"),
            }
        }
        debug!(delivered, attached = self.clients.len(), "broadcast");
        delivered
    }

    /// Start accepting connections. Already listening is reported, not an
    /// error.
    pub async fn listen(&mut self) -> Result<(), ChatError> {
        if let Some(listening) = &self.listening {
            self.ui.display(&format!(
                "Server is already listening on port {}.",
                listening.local_addr.port()
            ));
            return Ok(());
        }

        let listener = TcpListener::bind(self.config.bind_addr()).await?;
        let local_addr = listener.local_addr()?;
        let task = tokio::spawn(accept_loop(
            listener,
            self.closes,
            Arc::clone(&self.next_id),
            self.events.clone(),
        ));
        self.listening = Some(Listening { local_addr, task });

        info!(%local_addr, "listening");
        self.listening_started();
        Ok(())
    }

    /// Stop accepting new connections; attached clients stay. Returns
    /// whether the server was listening.
    pub fn stop_listening(&mut self) -> bool {
        match self.listening.take() {
            Some(_) => {
                self.listening_stopped();
                true
            }
            None => false,
        }
    }

    /// Stop listening and detach every client.
    pub fn close(&mut self) {
        self.stop_listening();
        self.closes += 1;

        let mut detached: Vec<ConnectionHandle> = self.clients.drain().map(|(_, h)| h).collect();
        detached.sort_by_key(ConnectionHandle::id);
        for handle in detached {
            handle.close();
            self.connection_closed(&handle);
        }

        self.server_closed();
    }

    pub fn set_port(&mut self, arg: Option<&str>) -> Result<(), ChatError> {
        if self.is_listening() {
            return Err(ChatError::SettingLocked {
                setting: "port",
                reason: "the server is closed",
            });
        }
        self.config.port = config::parse_port(arg)?;
        info!(port = self.config.port, "port changed");
        Ok(())
    }

    fn quit(&mut self) -> Flow {
        self.close();
        self.ui.display("Server is quitting.");
        Flow::Quit
    }

    fn report(&self, error: &ChatError) {
        debug!("command rejected: {error}");
        self.ui.display(&error.to_string());
    }
}

impl SessionHooks for Server {
    type Peer = ConnectionHandle;

    fn connection_established(&mut self, peer: &ConnectionHandle) {
        info!(client = %peer, attached = self.client_count(), "attached");
        self.ui.display("A new client has connected.");
    }

    fn connection_closed(&mut self, peer: &ConnectionHandle) {
        info!(client = %peer, attached = self.client_count(), "detached");
        self.ui.display("A client has disconnected.");
    }

    fn connection_exception(&mut self, peer: &ConnectionHandle, error: &ChatError) -> Flow {
        warn!(client = %peer, "unexpected disconnect: {error}");
        self.ui.display("A client has unexpectedly disconnected.");
        Flow::Continue
    }

    fn listening_started(&mut self) {
        let port = self.local_addr().map_or(self.config.port, |addr| addr.port());
        self.ui.display(&format!("Server listening for connections on port {port}"));
    }

    fn listening_stopped(&mut self) {
        self.ui.display("Server has stopped listening for connections.");
    }

    fn server_closed(&mut self) {
        self.ui.display("Server has closed.");
    }
}

async fn accept_loop(
    listener: TcpListener,
    epoch: u64,
    next_id: Arc<AtomicU64>,
    events: mpsc::UnboundedSender<ServerEvent>,
) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                let _ = events.send(ServerEvent::ListenFailed(e.into()));
                return;
            }
        };

        let id = ClientId::new(next_id.fetch_add(1, Ordering::Relaxed));
        let (handle, pending) = match connection::attach(id, stream) {
            Ok(attached) => attached,
            Err(e) => {
                warn!(%peer, "could not attach connection: {e}");
                continue;
            }
        };

        if events.send(ServerEvent::Connected { epoch, handle }).is_err() {
            return;
        }
        let inbound_events = events.clone();
        pending.start(move |inbound| inbound_events.send(ServerEvent::Inbound { id, inbound }).is_ok());
    }
}
