use log::{error, info};
use tokio::sync::mpsc;

use crate::configuration::config::Config;
use crate::error_handling::types::ControllerError;
use crate::network::dispatcher::Dispatcher;

/// Top-level lifecycle: owns the configuration, starts the dispatcher and
/// turns Ctrl-C into an orderly shutdown.
#[derive(Debug)]
pub struct Controller {
    // Fields for the Controller struct
    pub config: Config,
}

impl Controller {
    /// Builds a controller from an already-loaded configuration, rejecting
    /// values the server cannot run with.
    pub fn new(config: Config) -> Result<Self, ControllerError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Runs the server until a shutdown signal arrives.
    ///
    /// Binds the dispatcher, spawns its loop, then waits for Ctrl-C. The
    /// shutdown channel gives the dispatcher the chance to stop every
    /// capture process before this returns.
    pub async fn run(&mut self) -> Result<(), ControllerError> {
        let addr = self.config.socket_addr()?;
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let dispatcher = Dispatcher::bind(addr, self.config.clone(), shutdown_rx).await?;
        info!("Server ready on udp://{}", dispatcher.local_addr());
        let task = tokio::spawn(dispatcher.run());

        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Ctrl-C received, shutting down"),
            Err(e) => error!("[!] Failed to listen for shutdown signal: {}", e),
        }

        let _ = shutdown_tx.send(()).await;
        task.await
            .map_err(|e| ControllerError::TaskFailed(e.to_string()))
    }
}
