#![forbid(unsafe_code)]

mod cli;

use anyhow::Context;
use clap::Parser;

use driverstage::commands;
use driverstage::{AppController, CompletionCode, Overrides};

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let elevation = cli.command.elevation();
    let overrides = Overrides::from(cli.overrides);

    let controller = match AppController::new(cli.config, &overrides) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to initialize driverstage: {}", e);
            std::process::exit(CompletionCode::ConfigurationFault.exit_code());
        }
    };

    match cli.command {
        Commands::Run { json, .. } => {
            let code = commands::run(&controller, elevation, json).await;
            drop(controller);
            std::process::exit(code.exit_code());
        }
        Commands::Config { save } => {
            let text = commands::config(&controller, save).context("rendering configuration")?;
            print!("{}", text);
        }
        Commands::Paths { json } => {
            let paths = commands::paths(&controller);
            if json {
                println!("{}", serde_json::to_string_pretty(&paths)?);
            } else {
                println!("config: {}", paths.config_path);
                println!("logs:   {}", paths.logs_dir);
                println!("audit:  {}", paths.audit_dir);
            }
        }
    }

    Ok(())
}
