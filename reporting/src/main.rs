use clap::{Arg, Command};
use std::process;

use common::config::Settings;
use common::telemetry::init_tracing;
use tracing::error;

#[tokio::main]
async fn main() {
    let matches = Command::new("Reporting API")
        .version("1.0")
        .about("Serves sales and OLAP reports from the warehouse")
        .subcommand(
            Command::new("serve")
                .about("Start the reporting API")
                .arg(
                    Arg::new("config")
                        .short('c')
                        .long("config")
                        .value_name("FILE")
                        .help("Sets a custom config file"),
                ),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("serve", serve_matches)) => {
            let config_path = serve_matches
                .get_one::<String>("config")
                .map(|s| s.as_str())
                .unwrap_or("config/etl.toml");

            let settings = match Settings::new(config_path) {
                Ok(settings) => settings,
                Err(e) => {
                    eprintln!("Invalid configuration in {}: {}", config_path, e);
                    process::exit(1);
                }
            };
            if let Err(e) = init_tracing(&settings.logging) {
                eprintln!("Logging setup failed: {}", e);
                process::exit(1);
            }

            if let Err(e) = reporting::run_reporting_api(&settings).await {
                error!(error = %e, "Reporting API error");
                process::exit(1);
            }
        }
        _ => {
            println!("No subcommand specified. Use --help for usage information.");
            process::exit(1);
        }
    }
}
