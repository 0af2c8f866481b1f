use std::io;

use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::command::ClientCommand;
use crate::config::{self, ClientConfig};
use crate::connection::{self, ConnectionHandle, Inbound};
use crate::error::ChatError;
use crate::message::{COMMAND_MARKER, Input};
use crate::session::{Flow, SessionHooks};
use crate::types::ClientId;
use crate::ui::Ui;

const SEND_FAILED: &str = "Could not send message to server. Terminating client.";

/// Everything the client reacts to, in arrival order.
#[derive(Debug)]
pub enum ClientEvent {
    Console(String),
    ConsoleClosed,
    /// Tagged with the session it came from, so a late event from an
    /// earlier connection cannot end the current one.
    Inbound { session: u64, inbound: Inbound },
}

/// The live connection to the server.
struct Session {
    id: u64,
    handle: ConnectionHandle,
    task: JoinHandle<()>,
}

/// The chat client. Holds at most one connection at a time.
pub struct Client {
    config: ClientConfig,
    session: Option<Session>,
    sessions_opened: u64,
    events: mpsc::UnboundedSender<ClientEvent>,
    ui: Box<dyn Ui>,
}

impl Client {
    pub fn new(config: ClientConfig, ui: Box<dyn Ui>) -> (Self, mpsc::UnboundedReceiver<ClientEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let client = Self {
            config,
            session: None,
            sessions_opened: 0,
            events,
            ui,
        };
        (client, rx)
    }

    pub fn events(&self) -> mpsc::UnboundedSender<ClientEvent> {
        self.events.clone()
    }

    pub fn host(&self) -> &str {
        &self.config.host
    }

    pub fn port(&self) -> u16 {
        self.config.port
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Connect, then drain the queue until a handler asks to quit.
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<ClientEvent>) {
        if self.start().await == Flow::Quit {
            return;
        }
        while let Some(event) = events.recv().await {
            if self.handle_event(event).await == Flow::Quit {
                break;
            }
        }
    }

    /// Open the first connection and announce the login id, the only time
    /// it is sent. The client does not retry; any failure here ends it.
    pub async fn start(&mut self) -> Flow {
        if let Err(e) = self.open_connection().await {
            warn!("cannot reach {}: {e}", self.config.server_addr());
            self.ui.display("Cannot open connection to server. Terminating client.");
            return Flow::Quit;
        }
        self.announce().await
    }

    pub async fn handle_event(&mut self, event: ClientEvent) -> Flow {
        match event {
            ClientEvent::Console(line) => self.handle_console(&line).await,
            ClientEvent::ConsoleClosed => {
                info!("console input closed");
                self.quit().await
            }
            ClientEvent::Inbound { session, inbound } => {
                if self.session.as_ref().map(|s| s.id) != Some(session) {
                    debug!(session, "dropping event from an earlier connection");
                    return Flow::Continue;
                }
                match inbound {
                    Inbound::Line(msg) => {
                        self.ui.display(&msg);
                        Flow::Continue
                    }
                    Inbound::Closed => {
                        let eof = io::Error::new(io::ErrorKind::UnexpectedEof, "server closed the connection");
                        self.connection_lost(eof.into())
                    }
                    Inbound::Failed(e) => self.connection_lost(e),
                }
            }
        }
    }

    /// One line typed at the client console.
    pub async fn handle_console(&mut self, line: &str) -> Flow {
        match Input::classify(line) {
            Input::Empty => Flow::Continue,
            Input::Payload(text) => match self.send_to_server(text) {
                Ok(()) => Flow::Continue,
                Err(e) => {
                    warn!("send failed: {e}");
                    self.ui.display(SEND_FAILED);
                    self.quit().await
                }
            },
            Input::Command(command) => match ClientCommand::parse(command) {
                Ok(command) => self.execute(command).await,
                Err(e) => {
                    self.report(&e);
                    Flow::Continue
                }
            },
        }
    }

    async fn execute(&mut self, command: ClientCommand) -> Flow {
        debug!(?command, "console command");
        match command {
            ClientCommand::Quit => return self.quit().await,
            ClientCommand::Logoff => match self.close_connection().await {
                Ok(()) => {}
                Err(ChatError::NotConnected) => debug!("logoff while already logged off"),
                Err(e) => self.ui.display(&format!("Client was unable to logoff: {e}")),
            },
            ClientCommand::SetHost(arg) => {
                if let Err(e) = self.set_host(arg) {
                    self.report(&e);
                }
            }
            ClientCommand::SetPort(arg) => {
                if let Err(e) = self.set_port(arg.as_deref()) {
                    self.report(&e);
                }
            }
            ClientCommand::Login => {
                if let Err(e) = self.open_connection().await {
                    self.ui.display(&format!("Client was unable to login: {e}"));
                }
            }
            ClientCommand::GetHost => self.ui.display(&format!("Host: {}", self.host())),
            ClientCommand::GetPort => self.ui.display(&format!("Port: {}", self.port())),
        }
        Flow::Continue
    }

    pub async fn open_connection(&mut self) -> Result<(), ChatError> {
        if self.is_connected() {
            return Err(ChatError::AlreadyConnected);
        }

        let stream = TcpStream::connect(self.config.server_addr()).await?;
        self.sessions_opened += 1;
        let id = self.sessions_opened;
        let (handle, pending) = connection::attach(ClientId::new(id), stream)?;

        let events = self.events.clone();
        let task = pending.start(move |inbound| events.send(ClientEvent::Inbound { session: id, inbound }).is_ok());
        self.session = Some(Session {
            id,
            handle: handle.clone(),
            task,
        });

        self.connection_established(&handle);
        Ok(())
    }

    /// Shut the connection down and wait for its task to finish.
    pub async fn close_connection(&mut self) -> Result<(), ChatError> {
        let session = self.session.take().ok_or(ChatError::NotConnected)?;
        session.handle.close();
        session.task.await?;
        self.connection_closed(&session.handle);
        Ok(())
    }

    pub fn send_to_server(&self, line: &str) -> Result<(), ChatError> {
        self.session
            .as_ref()
            .ok_or(ChatError::NotConnected)?
            .handle
            .send(line)
    }

    pub fn set_host(&mut self, arg: Option<String>) -> Result<(), ChatError> {
        if self.is_connected() {
            return Err(ChatError::SettingLocked {
                setting: "host",
                reason: "the client is logged off",
            });
        }
        self.config.host = arg.ok_or(ChatError::MissingArgument("Host"))?;
        info!(host = %self.config.host, "host changed");
        Ok(())
    }

    pub fn set_port(&mut self, arg: Option<&str>) -> Result<(), ChatError> {
        if self.is_connected() {
            return Err(ChatError::SettingLocked {
                setting: "port",
                reason: "the client is logged off",
            });
        }
        self.config.port = config::parse_port(arg)?;
        info!(port = self.config.port, "port changed");
        Ok(())
    }

    /// Send the session identity; it must precede any chat text.
    async fn announce(&mut self) -> Flow {
        let login = format!("{COMMAND_MARKER}login {}", self.config.login_id);
        match self.send_to_server(&login) {
            Ok(()) => Flow::Continue,
            Err(e) => {
                warn!("login announcement failed: {e}");
                self.ui.display(SEND_FAILED);
                self.quit().await
            }
        }
    }

    fn connection_lost(&mut self, error: ChatError) -> Flow {
        match self.session.take() {
            Some(session) => self.connection_exception(&session.handle, &error),
            None => Flow::Continue,
        }
    }

    /// Best-effort close, then stop. Close failures are only logged.
    async fn quit(&mut self) -> Flow {
        if let Err(e) = self.close_connection().await {
            debug!("close during quit: {e}");
        }
        self.ui.display("The client has quit.");
        Flow::Quit
    }

    fn report(&self, error: &ChatError) {
        debug!("command rejected: {error}");
        self.ui.display(&error.to_string());
    }
}

impl SessionHooks for Client {
    type Peer = ConnectionHandle;

    fn connection_established(&mut self, peer: &ConnectionHandle) {
        info!(server = %peer.peer(), login_id = %self.config.login_id, "connected");
    }

    fn connection_closed(&mut self, _peer: &ConnectionHandle) {
        self.ui.display("Connection to server has closed.");
    }

    fn connection_exception(&mut self, peer: &ConnectionHandle, error: &ChatError) -> Flow {
        warn!(server = %peer.peer(), "connection lost: {error}");
        self.ui.display("Server has unexpectedly shut down. Client is quitting.");
        Flow::Quit
    }
}
