use balai::configuration::config::Config;
use balai::controller::controller_handler::Controller;
use clap::Parser;
use log::{error, info};
use std::path::Path;

#[derive(Parser)]
#[command(name = "balai")]
#[command(version = "0.1.0")]
#[command(about = "A multi-client UDP streaming server for hackrf_sweep")]
struct Args {
    /// Optional TOML configuration file; defaults apply without one.
    config_file: Option<String>,

    /// Override the bind address from the configuration.
    #[arg(long)]
    host: Option<String>,

    /// Override the UDP port from the configuration.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() {
    // Example how to log
    // https://docs.rs/env_logger/latest/env_logger/
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .init();

    println!(
        "
██████╗  █████╗ ██╗      █████╗ ██╗
██╔══██╗██╔══██╗██║     ██╔══██╗██║
██████╔╝███████║██║     ███████║██║
██╔══██╗██╔══██║██║     ██╔══██║██║
██████╔╝██║  ██║███████╗██║  ██║██║
╚═════╝ ╚═╝  ╚═╝╚══════╝╚═╝  ╚═╝╚═╝
================================================================
       Multi-client UDP streaming for hackrf_sweep v0.1.0
================================================================
"
    );

    let args = Args::parse();

    let mut config = match &args.config_file {
        Some(path) => {
            info!("Importing configuration from {}", path);
            match Config::from_file(Path::new(path)) {
                Ok(config) => {
                    info!("Configuration imported successfully");
                    config
                }
                Err(e) => {
                    error!("Unable to import configuration from file: {:?}", e);
                    std::process::exit(1);
                }
            }
        }
        None => {
            info!("No configuration file given, using defaults");
            Config::default()
        }
    };

    if let Some(host) = args.host {
        config.bind_address = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    let mut controller = match Controller::new(config) {
        Ok(controller) => controller,
        Err(e) => {
            error!(
                "Unable to create a controller instance: {:?}, exiting...",
                e
            );
            std::process::exit(1);
        }
    };

    if let Err(e) = controller.run().await {
        error!(
            "Error occured in the controller process: {:?}, exiting...",
            e
        );
        std::process::exit(1);
    }
}
