use serde::Deserialize;

/// A protocol command, decoded once at the datagram boundary and then
/// matched exhaustively against the session state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Connect,
    /// Carries the raw JSON payload that followed the command word.
    StartStream(String),
    StopStream,
    Stats,
    Ping,
    Disconnect,
    /// Unrecognized datagram text, kept for diagnostics.
    Unknown(String),
}

impl Command {
    /// Decodes one datagram's text into a command.
    ///
    /// Surrounding whitespace is ignored. `START_STREAM` keeps the rest of
    /// the datagram as its payload; every other command must match exactly.
    pub fn parse(text: &str) -> Command {
        let trimmed = text.trim();

        if let Some(rest) = trimmed.strip_prefix("START_STREAM") {
            if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                return Command::StartStream(rest.trim().to_string());
            }
        }

        match trimmed {
            "CONNECT" => Command::Connect,
            "STOP_STREAM" => Command::StopStream,
            "STATS" => Command::Stats,
            "PING" => Command::Ping,
            "DISCONNECT" => Command::Disconnect,
            _ => Command::Unknown(trimmed.to_string()),
        }
    }
}

/// JSON payload of a `START_STREAM` command.
#[derive(Debug, Deserialize)]
pub struct CaptureRequest {
    /// Tokens to pass to `hackrf_sweep`, exactly as the client supplied them.
    #[serde(default)]
    pub args: Vec<String>,
}
