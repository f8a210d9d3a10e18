use clap::Parser;
use std::path::Path;

use treewatch::Settings;
use treewatch::cli::commands;
use treewatch::cli::{Cli, Commands};

fn load_settings(config: Option<&Path>) -> Settings {
    let loaded = match config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };

    loaded.unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        eprintln!("Using default configuration for now.");
        Settings::default()
    })
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Some(path) = cli.config.as_deref().filter(|p| !p.exists()) {
        eprintln!("Config file not found: {}", path.display());
        std::process::exit(1);
    }

    let mut settings = load_settings(cli.config.as_deref());
    if let Commands::Watch(args) = &cli.command {
        args.apply(&mut settings);
    }

    treewatch::logging::init_with_config(&settings.logging);

    match cli.command {
        Commands::Init { force } => commands::init::run_init(force),
        Commands::Config => commands::init::run_config(&settings),
        Commands::Watch(args) => match commands::watch::run_watch(&settings, args.json).await {
            Ok(exit) => {
                treewatch::log_event!("watch", "finished", "{exit}");
            }
            Err(e) => {
                eprintln!("Error: {e:#}");
                std::process::exit(1);
            }
        },
    }
}
