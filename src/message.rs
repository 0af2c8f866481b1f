use std::fmt;

/// Lines starting with this marker are commands, everything else is chat.
pub const COMMAND_MARKER: char = '#';

/// A line typed at the console, sorted by what should happen to it.
///
/// Borrows from the input line; nothing is copied until a payload is
/// actually sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input<'a> {
    /// Marker stripped, ready for the command parser.
    Command(&'a str),
    /// Chat text, forwarded unchanged.
    Payload(&'a str),
    Empty,
}

impl<'a> Input<'a> {
    pub fn classify(line: &'a str) -> Self {
        if line.is_empty() {
            Input::Empty
        } else if let Some(command) = line.strip_prefix(COMMAND_MARKER) {
            Input::Command(command)
        } else {
            Input::Payload(line)
        }
    }
}

/// Chat text typed at the server console.
///
/// Display format: `SERVER MSG > text`
#[derive(Debug, Clone, Copy)]
pub struct ServerNotice<'a>(pub &'a str);

impl fmt::Display for ServerNotice<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SERVER MSG > {}", self.0)
    }
}
