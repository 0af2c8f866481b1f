//! Command-line interface definitions and parsing

use clap::{Parser, Subcommand};

use crate::config::{DEFAULT_HOST, DEFAULT_PORT};

#[derive(Parser, Debug)]
#[command(author, version, about = "A small echo chat server and client", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub role: Role,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Role {
    /// Listen for chat clients and echo every message to all of them
    Server {
        /// Port to listen on; 5555 when absent or not a valid port
        port: Option<String>,
    },
    /// Connect to a chat server
    Client {
        /// Host to connect to
        #[arg(default_value = DEFAULT_HOST)]
        host: String,

        /// Port to connect on
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,

        /// Login id announced to the server after connecting
        #[arg(short, long)]
        login_id: u64,
    },
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn server_port_stays_raw() {
        let cli = Cli::try_parse_from(["echo-chat", "server", "not-a-port"]).unwrap();
        assert!(matches!(cli.role, Role::Server { port: Some(p) } if p == "not-a-port"));

        let cli = Cli::try_parse_from(["echo-chat", "-v", "server"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.role, Role::Server { port: None }));
    }

    #[test]
    fn client_defaults() {
        let cli = Cli::try_parse_from(["echo-chat", "client", "--login-id", "7"]).unwrap();
        let Role::Client { host, port, login_id } = cli.role else {
            panic!("expected client");
        };
        assert_eq!(host, "localhost");
        assert_eq!(port, 5555);
        assert_eq!(login_id, 7);

        assert!(Cli::try_parse_from(["echo-chat", "client"]).is_err());
    }
}
