pub mod types;

pub use types::{
    ConfigError, ControllerError, NetworkError, ProtocolError, SessionError, SweepError,
};
