use crate::error::ChatError;
use crate::types::LoginId;

/// The port both sides use when none is given.
pub const DEFAULT_PORT: u16 = 5555;

/// The host a client connects to when none is given.
pub const DEFAULT_HOST: &str = "localhost";

/// Where the server listens. The listening state itself lives on the
/// server; the port may only change while it is stopped.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: String,
    pub port: u16,
}

pub struct ServerConfigBuilder {
    addr: String,
    port: u16,
}

impl ServerConfig {
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder {
            addr: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.addr, self.port)
    }
}

impl ServerConfigBuilder {
    pub fn addr(mut self, addr: impl Into<String>) -> Self {
        self.addr = addr.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn build(self) -> ServerConfig {
        ServerConfig {
            addr: self.addr,
            port: self.port,
        }
    }
}

/// Where a client connects, and who it says it is once connected.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub login_id: LoginId,
}

pub struct ClientConfigBuilder {
    host: String,
    port: u16,
    login_id: LoginId,
}

impl ClientConfig {
    pub fn builder(login_id: LoginId) -> ClientConfigBuilder {
        ClientConfigBuilder {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            login_id,
        }
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl ClientConfigBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn build(self) -> ClientConfig {
        ClientConfig {
            host: self.host,
            port: self.port,
            login_id: self.login_id,
        }
    }
}

/// Parse the argument of a `setport` command.
pub fn parse_port(arg: Option<&str>) -> Result<u16, ChatError> {
    let arg = arg.ok_or(ChatError::MissingArgument("Port number"))?;
    arg.parse()
        .map_err(|_| ChatError::InvalidPort(arg.to_string()))
}

/// Port from the server's first process argument, falling back to the
/// default when it is absent or unparsable.
pub fn port_or_default(arg: Option<&str>) -> u16 {
    match arg.map(str::parse::<u16>) {
        Some(Ok(port)) => port,
        Some(Err(_)) => {
            tracing::warn!(arg = arg.unwrap_or_default(), "unparsable port, using {DEFAULT_PORT}");
            DEFAULT_PORT
        }
        None => DEFAULT_PORT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_start_from_defaults() {
        let server = ServerConfig::builder().build();
        assert_eq!(server.port, DEFAULT_PORT);
        assert_eq!(server.bind_addr(), "0.0.0.0:5555");

        let client = ClientConfig::builder(LoginId::new(7)).port(6000).build();
        assert_eq!(client.host, "localhost");
        assert_eq!(client.server_addr(), "localhost:6000");
        assert_eq!(client.login_id, LoginId::new(7));
    }

    #[test]
    fn parse_port_reports_missing_and_invalid() {
        assert_eq!(parse_port(Some("6000")).unwrap(), 6000);
        assert!(matches!(
            parse_port(None),
            Err(ChatError::MissingArgument("Port number"))
        ));
        assert!(matches!(parse_port(Some("abc")), Err(ChatError::InvalidPort(_))));
        assert!(matches!(parse_port(Some("")), Err(ChatError::InvalidPort(_))));
        assert!(matches!(parse_port(Some("70000")), Err(ChatError::InvalidPort(_))));
    }

    #[test]
    fn server_port_falls_back_to_default() {
        assert_eq!(port_or_default(Some("4444")), 4444);
        assert_eq!(port_or_default(Some("nope")), DEFAULT_PORT);
        assert_eq!(port_or_default(None), DEFAULT_PORT);
    }
}
