use std::fmt;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    BadBindAddress(String),
    NotInRange(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::BadBindAddress(e) => write!(f, "Bind address error: {}", e),
            ConfigError::NotInRange(e) => write!(f, "Value out of range: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::TomlError(err.to_string())
    }
}

/// Client-visible protocol violations. The `Display` text is sent back to the
/// client verbatim inside an error response, so keep it actionable.
#[derive(Debug, PartialEq, Eq)]
pub enum ProtocolError {
    NotConnected,
    AlreadyStreaming,
    InvalidPayload(String),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::NotConnected => write!(f, "Not connected. Send CONNECT first."),
            ProtocolError::AlreadyStreaming => {
                write!(f, "Stream already active. Send STOP_STREAM first.")
            }
            ProtocolError::InvalidPayload(e) => write!(f, "Invalid JSON format: {}", e),
        }
    }
}

impl std::error::Error for ProtocolError {}

#[derive(Debug)]
pub enum SessionError {
    LimitReached(usize),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::LimitReached(max) => {
                write!(f, "Session limit reached ({} max)", max)
            }
        }
    }
}

impl std::error::Error for SessionError {}

#[derive(Debug)]
pub enum SweepError {
    SpawnFailed(std::io::Error),
    SignalFailed(std::io::Error),
    WaitFailed(std::io::Error),
}

impl fmt::Display for SweepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SweepError::SpawnFailed(e) => write!(f, "Failed to spawn capture process: {}", e),
            SweepError::SignalFailed(e) => write!(f, "Failed to signal capture process: {}", e),
            SweepError::WaitFailed(e) => write!(f, "Failed to reap capture process: {}", e),
        }
    }
}

impl std::error::Error for SweepError {}

#[derive(Debug)]
pub enum NetworkError {
    BindFailed(std::io::Error),
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::BindFailed(e) => write!(f, "Network bind error: {}", e),
        }
    }
}

impl std::error::Error for NetworkError {}

#[derive(Debug)]
pub enum ControllerError {
    ConfigurationError(ConfigError),
    NetworkError(NetworkError),
    TaskFailed(String),
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::ConfigurationError(e) => write!(f, "Configuration error: {}", e),
            ControllerError::NetworkError(e) => write!(f, "Network error: {}", e),
            ControllerError::TaskFailed(e) => write!(f, "Controller task error: {}", e),
        }
    }
}

impl std::error::Error for ControllerError {}

impl From<ConfigError> for ControllerError {
    fn from(err: ConfigError) -> Self {
        ControllerError::ConfigurationError(err)
    }
}

impl From<NetworkError> for ControllerError {
    fn from(err: NetworkError) -> Self {
        ControllerError::NetworkError(err)
    }
}
