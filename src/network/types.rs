use serde::Serialize;

use crate::sweep::types::ArgumentError;

/// Raw (non-JSON) reply to PING, by protocol contract.
pub const PONG_REPLY: &[u8] = b"PONG";
/// Raw (non-JSON) reply to DISCONNECT, by protocol contract.
pub const DISCONNECTED_REPLY: &[u8] = b"DISCONNECTED";

pub const VALID_COMMANDS: [&str; 6] = [
    "CONNECT",
    "START_STREAM",
    "STOP_STREAM",
    "STATS",
    "PING",
    "DISCONNECT",
];

const USAGE_EXAMPLE_ARGS: &[&str] = &["-f", "88:108", "-g", "20", "-l", "16"];
const FULL_EXAMPLE_ARGS: &[&str] = &["-f", "88:108", "-g", "20", "-l", "16", "-w", "1000000"];

#[derive(Serialize)]
pub struct ConnectResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub server_info: ServerInfo,
    pub usage: Usage,
}

#[derive(Serialize)]
pub struct ServerInfo {
    pub version: &'static str,
    pub clients: usize,
}

#[derive(Serialize)]
pub struct Usage {
    pub commands: UsageCommands,
    pub start_stream_format: StartStreamFormat,
}

#[derive(Serialize)]
pub struct UsageCommands {
    #[serde(rename = "CONNECT")]
    pub connect: &'static str,
    #[serde(rename = "START_STREAM")]
    pub start_stream: &'static str,
    #[serde(rename = "STOP_STREAM")]
    pub stop_stream: &'static str,
    #[serde(rename = "STATS")]
    pub stats: &'static str,
    #[serde(rename = "PING")]
    pub ping: &'static str,
    #[serde(rename = "DISCONNECT")]
    pub disconnect: &'static str,
}

#[derive(Serialize)]
pub struct StartStreamFormat {
    pub command: &'static str,
    pub args: &'static [&'static str],
}

impl ConnectResponse {
    pub fn new(clients: usize) -> Self {
        ConnectResponse {
            status: "connected",
            message: "Successfully connected to HackRF server",
            server_info: ServerInfo {
                version: env!("CARGO_PKG_VERSION"),
                clients,
            },
            usage: Usage {
                commands: UsageCommands {
                    connect: "Connect to the server",
                    start_stream: "Start hackrf_sweep with options (JSON format)",
                    stop_stream: "Stop current stream",
                    stats: "Get server statistics",
                    ping: "Keep-alive ping",
                    disconnect: "Disconnect from server",
                },
                start_stream_format: StartStreamFormat {
                    command: "START_STREAM",
                    args: USAGE_EXAMPLE_ARGS,
                },
            },
        }
    }
}

#[derive(Serialize)]
pub struct StreamStartedResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub args: Vec<String>,
}

impl StreamStartedResponse {
    pub fn new(args: Vec<String>) -> Self {
        StreamStartedResponse {
            status: "stream_started",
            message: "Stream started successfully",
            args,
        }
    }
}

#[derive(Serialize)]
pub struct StreamStoppedResponse {
    pub status: &'static str,
    pub message: &'static str,
}

impl StreamStoppedResponse {
    pub fn stopped() -> Self {
        StreamStoppedResponse {
            status: "stream_stopped",
            message: "Stream stopped successfully",
        }
    }

    /// STOP_STREAM is idempotent; stopping with nothing running is still a
    /// success, just an honest one.
    pub fn no_active_stream() -> Self {
        StreamStoppedResponse {
            status: "stream_stopped",
            message: "No active stream",
        }
    }
}

/// One-time notification that a capture process ended on its own.
#[derive(Serialize)]
pub struct StreamEndedResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub exit_code: Option<i32>,
}

impl StreamEndedResponse {
    pub fn new(exit_code: Option<i32>) -> Self {
        StreamEndedResponse {
            status: "stream_ended",
            message: "Capture process ended",
            exit_code,
        }
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        ErrorResponse {
            error: error.into(),
        }
    }
}

#[derive(Serialize)]
pub struct ServerFullResponse {
    pub error: &'static str,
    pub max_sessions: usize,
}

impl ServerFullResponse {
    pub fn new(max_sessions: usize) -> Self {
        ServerFullResponse {
            error: "Server at capacity, try again later",
            max_sessions,
        }
    }
}

/// Structured argument rejection: the offending option and reason broken out
/// alongside a composed `error` line.
#[derive(Serialize)]
pub struct RejectionResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub reason: String,
    pub provided_args: Vec<String>,
}

impl RejectionResponse {
    pub fn new(rejection: ArgumentError, provided_args: Vec<String>) -> Self {
        let error = match &rejection.option {
            Some(option) => format!(
                "Invalid hackrf_sweep arguments: {}: {}",
                option, rejection.reason
            ),
            None => format!("Invalid hackrf_sweep arguments: {}", rejection.reason),
        };
        RejectionResponse {
            error,
            option: rejection.option,
            value: rejection.value,
            reason: rejection.reason,
            provided_args,
        }
    }
}

#[derive(Serialize)]
pub struct UnknownCommandResponse {
    pub error: &'static str,
    pub valid_commands: [&'static str; 6],
    pub example_start_stream: StartStreamFormat,
}

impl UnknownCommandResponse {
    pub fn new() -> Self {
        UnknownCommandResponse {
            error: "Unknown command",
            valid_commands: VALID_COMMANDS,
            example_start_stream: StartStreamFormat {
                command: "START_STREAM",
                args: FULL_EXAMPLE_ARGS,
            },
        }
    }
}

impl Default for UnknownCommandResponse {
    fn default() -> Self {
        Self::new()
    }
}
