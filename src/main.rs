use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod app;
mod chat;
mod cli;
mod commands;
mod config;
mod core;
mod display;
mod input;
mod service;
mod utils;

use crate::app::Application;
use crate::chat::RequestMode;
use crate::cli::Args;
use crate::commands::create_command_registry;
use crate::config::Config;
use crate::core::error::DocChatError;

const LOG_ENV: &str = "DOCCHAT_LOG";

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "docchat=debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Command-line flags win over the config file.
fn apply_overrides(config: &mut Config, args: &Args) {
    if let Some(base_url) = &args.base_url {
        config.service.base_url = base_url.clone();
    }
    if let Some(category) = &args.category {
        config.chat.category = category.clone();
    }
    if args.stream {
        config.chat.mode = RequestMode::Stream;
    } else if args.sync {
        config.chat.mode = RequestMode::Sync;
    }
}

async fn run(args: Args) -> Result<ExitCode, DocChatError> {
    let mut config = Config::load()?;
    apply_overrides(&mut config, &args);
    config.validate()?;

    let command_dispatcher = create_command_registry();
    let mut app = Application::new(args, config, command_dispatcher)?;
    app.run().await
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            display::display_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}
