use thiserror::Error;

use crate::types::ClientId;

/// Every failure the chat core can report. The `Display` text is the line
/// the user sees on the console.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("network error: {0}")]
    Network(#[from] std::io::Error),

    #[error("{0} was not entered.")]
    MissingArgument(&'static str),

    #[error("Invalid port number: {0:?}.")]
    InvalidPort(String),

    #[error("Error message: cannot set {setting} unless {reason}.")]
    SettingLocked {
        setting: &'static str,
        reason: &'static str,
    },

    #[error("Command not recognized: #{0}")]
    UnknownCommand(String),

    #[error("not connected to a server")]
    NotConnected,

    #[error("already connected to a server")]
    AlreadyConnected,

    #[error("connection {0} is gone")]
    ConnectionGone(ClientId),

    #[error("connection task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
