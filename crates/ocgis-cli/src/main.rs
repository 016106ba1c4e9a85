//! OcGis CLI - Sync locate-ticket notices into an ArcGIS feature layer.

use clap::Parser;
use ocgis_cli::commands;
use ocgis_cli::config::OutputFormat;
use ocgis_cli::{Cli, Command, Config, Formatter};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // Log to stderr so stdout stays clean for reports
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

async fn run() -> ocgis_cli::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // Init runs before a configuration exists
    let command = match cli.command {
        Command::Init(args) => {
            let formatter = Formatter::new(OutputFormat::Table, !cli.no_color);
            return commands::execute_init(args, cli.config.as_deref(), &formatter);
        }
        command => command,
    };

    let config = Config::load(cli.config.as_deref())?;
    config.validate()?;

    // Determine output format
    let format = cli
        .format
        .map(Into::into)
        .unwrap_or(config.settings.format);

    // Determine color setting
    let color_enabled = !cli.no_color && config.settings.color;

    let formatter = Formatter::new(format, color_enabled);

    match command {
        Command::Run(args) => commands::execute_run(args, &config, &formatter).await?,
        Command::Watch(args) => commands::execute_watch(args, &config, &formatter).await?,
        Command::Extract(args) => commands::execute_extract(args, &config, &formatter)?,
        Command::Init(_) => {}
    }

    Ok(())
}
