mod cli;
mod client;
mod command;
mod config;
mod connection;
mod error;
mod message;
mod server;
mod session;
mod types;
mod ui;

use clap::Parser;
use tracing::{error, info};

use cli::{Cli, Role};
use client::{Client, ClientEvent};
use config::{ClientConfig, ServerConfig};
use server::{Server, ServerEvent};
use types::LoginId;
use ui::{Terminal, Ui};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.role {
        Role::Server { port } => run_server(port.as_deref()).await,
        Role::Client {
            host,
            port,
            login_id,
        } => run_client(host, port, login_id).await,
    }

    info!("exiting");
    // The console reader may still be parked on stdin.
    std::process::exit(0);
}

/// Setup logging based on verbosity level
fn setup_logging(verbose: bool) {
    let log_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run_server(port: Option<&str>) {
    let config = ServerConfig::builder()
        .port(config::port_or_default(port))
        .build();
    let (mut server, events) = Server::new(config, Box::new(Terminal));

    if let Err(e) = server.listen().await {
        error!("initial listen failed: {e}");
        Terminal.display("ERROR - Could not listen for clients!");
    }

    ui::spawn_console(server.events(), ServerEvent::Console, ServerEvent::ConsoleClosed);
    server.run(events).await;
}

async fn run_client(host: String, port: u16, login_id: u64) {
    let config = ClientConfig::builder(LoginId::new(login_id))
        .host(host)
        .port(port)
        .build();
    let (client, events) = Client::new(config, Box::new(Terminal));

    ui::spawn_console(client.events(), ClientEvent::Console, ClientEvent::ConsoleClosed);
    client.run(events).await;
}
