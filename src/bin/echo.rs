//! Line echo server binary.

use clap::Parser;
use fd_registry::echo::Server;
use fd_registry::{Config, logging, signal};
use std::path::PathBuf;

const DEFAULT_CONFIG: &str = r#"[registry]
capacity = 1024

[logging]
level = "info"
format = "pretty"

[echo]
listen = "127.0.0.1:7000"
max_line = 512
"#;

#[derive(Parser)]
#[command(name = "fd-registry-echo")]
#[command(about = "Line echo server driven by the descriptor registry")]
struct Args {
    /// Path to configuration file
    config: Option<PathBuf>,

    /// Print default configuration and exit
    #[arg(long)]
    print_config: bool,
}

fn main() {
    let args = Args::parse();

    if args.print_config {
        print!("{DEFAULT_CONFIG}");
        return;
    }

    let config = match &args.config {
        Some(path) => match Config::load(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to load config: {}", e);
                std::process::exit(1);
            }
        },
        None => {
            eprintln!("No config file specified. Pass a config path or use --print-config");
            std::process::exit(1);
        }
    };

    logging::init(&config.logging);

    let shutdown = match signal::install_signal_handler() {
        Ok(flag) => flag,
        Err(e) => {
            tracing::error!(error = %e, "Failed to install signal handler");
            std::process::exit(1);
        }
    };

    let mut server = match Server::bind(&config) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %e, listen = %config.echo.listen, "Failed to start server");
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run(&shutdown) {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
