use std::fmt;
use std::net::SocketAddr;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::ChatError;
use crate::types::ClientId;

/// What a connection task reports to its owner.
#[derive(Debug)]
pub enum Inbound {
    /// One line from the peer, newline stripped.
    Line(String),
    /// The peer closed its end cleanly.
    Closed,
    /// Reading or writing failed; the connection is gone.
    Failed(ChatError),
}

/// What the owner asks a connection task to do.
#[derive(Debug)]
pub enum Outbound {
    Line(String),
    Close,
}

/// Reference to one live connection. Cloning it does not clone the
/// socket; the socket belongs to the connection task.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ClientId,
    peer: SocketAddr,
    tx: mpsc::UnboundedSender<Outbound>,
}

impl ConnectionHandle {
    pub fn new(id: ClientId, peer: SocketAddr, tx: mpsc::UnboundedSender<Outbound>) -> Self {
        Self { id, peer, tx }
    }

    pub fn id(&self) -> ClientId {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Queue a line for the peer. Fails once the connection task has ended.
    pub fn send(&self, line: &str) -> Result<(), ChatError> {
        self.tx
            .send(Outbound::Line(line.to_string()))
            .map_err(|_| ChatError::ConnectionGone(self.id))
    }

    /// Ask the connection task to shut the socket down. A task that has
    /// already ended needs nothing more.
    pub fn close(&self) {
        let _ = self.tx.send(Outbound::Close);
    }
}

impl fmt::Display for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.peer)
    }
}

/// A connected socket whose task has not been started yet. Register the
/// handle first, then call `start`; no inbound line arrives before that.
pub struct PendingConnection {
    stream: TcpStream,
    rx: mpsc::UnboundedReceiver<Outbound>,
}

/// Wrap `stream` and return the handle that will feed it.
pub fn attach(id: ClientId, stream: TcpStream) -> Result<(ConnectionHandle, PendingConnection), ChatError> {
    let peer = stream.peer_addr()?;
    let (tx, rx) = mpsc::unbounded_channel();
    Ok((ConnectionHandle::new(id, peer, tx), PendingConnection { stream, rx }))
}

impl PendingConnection {
    /// Run the connection on its own task.
    ///
    /// `emit` is called for every inbound line and once more when the
    /// connection ends on the peer's side; it returns `false` when its owner
    /// no longer listens. A `Close` requested through the handle ends the
    /// task without emitting anything, since the owner already knows.
    pub fn start<F>(self, emit: F) -> JoinHandle<()>
    where
        F: FnMut(Inbound) -> bool + Send + 'static,
    {
        tokio::spawn(serve(self.stream, self.rx, emit))
    }
}

async fn serve<F>(stream: TcpStream, mut rx: mpsc::UnboundedReceiver<Outbound>, mut emit: F)
where
    F: FnMut(Inbound) -> bool,
{
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if !emit(Inbound::Line(line)) {
                        break;
                    }
                }
                Ok(None) => {
                    emit(Inbound::Closed);
                    break;
                }
                Err(e) => {
                    emit(Inbound::Failed(e.into()));
                    break;
                }
            },
            out = rx.recv() => match out {
                Some(Outbound::Line(line)) => {
                    if let Err(e) = writer.write_all(format!("{line}\n").as_bytes()).await {
                        emit(Inbound::Failed(e.into()));
                        break;
                    }
                }
                Some(Outbound::Close) | None => {
                    if let Err(e) = writer.shutdown().await {
                        tracing::debug!("shutdown failed: {e}");
                    }
                    break;
                }
            },
        }
    }
}
