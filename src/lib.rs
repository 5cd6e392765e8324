pub mod configuration;
pub mod controller;
pub mod error_handling;
pub mod network;
pub mod session_management;
pub mod stats;
pub mod streaming;
pub mod sweep;
