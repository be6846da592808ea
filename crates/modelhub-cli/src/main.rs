//! modelhub command-line tool.
//!
//! Loads a directory of model definitions and reports on the assembled
//! schema graph.

mod args;
mod commands;
mod formatter;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use args::{Args, Command};
use modelhub::ModelHub;

fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "modelhub=info,modelhub_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let formatter = formatter::create_formatter(args.format);

    match run(args) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{}", formatter.format_error(&e.to_string()));
            std::process::exit(1);
        }
    }
}

/// Run the selected command. Returns `false` when `check` found problems.
fn run(args: Args) -> Result<bool, modelhub::Error> {
    let (config, command, format) = args.into_config()?;
    let formatter = formatter::create_formatter(format);

    tracing::debug!(
        url = %config.url,
        types = ?config.types,
        model_path = ?config.model_path,
        "configuration loaded"
    );

    let hub = ModelHub::new();
    hub.init(&config)?;

    match command {
        Command::List => {
            println!("{}", formatter.format_models(&commands::list(&hub)));
            Ok(true)
        }
        Command::Show { model } => {
            let description = commands::show(&hub, &model)?;
            println!("{}", formatter.format_model(&description));
            Ok(true)
        }
        Command::Check => {
            let report = commands::check(&hub);
            println!("{}", formatter.format_check(&report));
            Ok(report.is_ok())
        }
    }
}
