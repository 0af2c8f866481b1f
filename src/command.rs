use crate::error::ChatError;

/// Split a command line on single spaces.
///
/// Trailing empty tokens are dropped, so `setport ` carries no argument,
/// while `setport  6000` carries an empty one.
pub fn split_command(input: &str) -> Vec<&str> {
    let mut tokens: Vec<&str> = input.split(' ').collect();
    while tokens.last().is_some_and(|t| t.is_empty()) {
        tokens.pop();
    }
    tokens
}

/// Commands accepted at the server console. Arguments stay raw until
/// execution, because the listening check comes before argument checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerCommand {
    Quit,
    Stop,
    Close,
    SetPort(Option<String>),
    Start,
    GetPort,
}

impl ServerCommand {
    /// Parse a command with the leading marker already stripped.
    pub fn parse(input: &str) -> Result<Self, ChatError> {
        let tokens = split_command(input);
        let arg = tokens.get(1).map(|s| s.to_string());

        match tokens.first().copied().unwrap_or_default() {
            "quit" => Ok(ServerCommand::Quit),
            "stop" => Ok(ServerCommand::Stop),
            "close" => Ok(ServerCommand::Close),
            "setport" => Ok(ServerCommand::SetPort(arg)),
            "start" => Ok(ServerCommand::Start),
            "getport" => Ok(ServerCommand::GetPort),
            other => Err(ChatError::UnknownCommand(other.to_string())),
        }
    }
}

/// Commands accepted at the client console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    Quit,
    Logoff,
    SetHost(Option<String>),
    SetPort(Option<String>),
    Login,
    GetHost,
    GetPort,
}

impl ClientCommand {
    /// Parse a command with the leading marker already stripped.
    pub fn parse(input: &str) -> Result<Self, ChatError> {
        let tokens = split_command(input);
        let arg = tokens.get(1).map(|s| s.to_string());

        match tokens.first().copied().unwrap_or_default() {
            "quit" => Ok(ClientCommand::Quit),
            "logoff" => Ok(ClientCommand::Logoff),
            "sethost" => Ok(ClientCommand::SetHost(arg)),
            "setport" => Ok(ClientCommand::SetPort(arg)),
            "login" => Ok(ClientCommand::Login),
            "gethost" => Ok(ClientCommand::GetHost),
            "getport" => Ok(ClientCommand::GetPort),
            other => Err(ChatError::UnknownCommand(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_drops_only_trailing_empties() {
        assert_eq!(split_command("setport 6000"), vec!["setport", "6000"]);
        assert_eq!(split_command("setport "), vec!["setport"]);
        assert_eq!(split_command("setport  6000"), vec!["setport", "", "6000"]);
        assert!(split_command("").is_empty());
    }

    #[test]
    fn server_vocabulary() {
        assert_eq!(ServerCommand::parse("quit").unwrap(), ServerCommand::Quit);
        assert_eq!(ServerCommand::parse("stop").unwrap(), ServerCommand::Stop);
        assert_eq!(ServerCommand::parse("close").unwrap(), ServerCommand::Close);
        assert_eq!(ServerCommand::parse("start").unwrap(), ServerCommand::Start);
        assert_eq!(ServerCommand::parse("getport").unwrap(), ServerCommand::GetPort);
        assert_eq!(
            ServerCommand::parse("setport 6000 extra").unwrap(),
            ServerCommand::SetPort(Some("6000".into()))
        );
        assert_eq!(
            ServerCommand::parse("setport").unwrap(),
            ServerCommand::SetPort(None)
        );
    }

    #[test]
    fn client_vocabulary() {
        assert_eq!(ClientCommand::parse("logoff").unwrap(), ClientCommand::Logoff);
        assert_eq!(ClientCommand::parse("login").unwrap(), ClientCommand::Login);
        assert_eq!(
            ClientCommand::parse("sethost example.org").unwrap(),
            ClientCommand::SetHost(Some("example.org".into()))
        );
        assert_eq!(
            ClientCommand::parse("sethost ").unwrap(),
            ClientCommand::SetHost(None)
        );
        assert_eq!(ClientCommand::parse("gethost").unwrap(), ClientCommand::GetHost);
    }

    #[test]
    fn names_are_case_sensitive_and_role_specific() {
        assert!(matches!(
            ServerCommand::parse("QUIT"),
            Err(ChatError::UnknownCommand(name)) if name == "QUIT"
        ));
        assert!(matches!(
            ServerCommand::parse("login"),
            Err(ChatError::UnknownCommand(_))
        ));
        assert!(matches!(
            ClientCommand::parse("start"),
            Err(ChatError::UnknownCommand(_))
        ));
        assert!(matches!(
            ClientCommand::parse(""),
            Err(ChatError::UnknownCommand(name)) if name.is_empty()
        ));
    }
}
