use clap::{Arg, ArgAction, ArgMatches, Command};
use std::process;

use common::config::{LoadStrategy, Settings};
use common::telemetry::init_tracing;
use etl::EtlOptions;
use tracing::error;

fn run_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Sets a custom config file"),
        )
        .arg(
            Arg::new("strategy")
                .short('s')
                .long("strategy")
                .value_name("STRATEGY")
                .help("Load strategy: chunked_upsert or bulk_copy"),
        )
        .arg(
            Arg::new("halt-on-failure")
                .long("halt-on-failure")
                .action(ArgAction::SetTrue)
                .help("Skip the remaining steps after the first failed one"),
        )
        .arg(
            Arg::new("no-index-rebuild")
                .long("no-index-rebuild")
                .action(ArgAction::SetTrue)
                .help("Keep fact indexes in place during a bulk fact load"),
        )
}

fn options_from(settings: &Settings, matches: &ArgMatches) -> common::Result<EtlOptions> {
    let mut options = EtlOptions::from(&settings.etl);
    if let Some(strategy) = matches.get_one::<String>("strategy") {
        options.strategy = strategy.parse::<LoadStrategy>()?;
    }
    if matches.get_flag("halt-on-failure") {
        options.halt_on_failure = true;
    }
    if matches.get_flag("no-index-rebuild") {
        options.rebuild_indexes = false;
    }
    Ok(options)
}

#[tokio::main]
async fn main() {
    let matches = run_args(
        Command::new("ETL Pipeline Manager")
            .version("1.0")
            .about("Loads the delivery star schema from the transactional store")
            .subcommand(run_args(Command::new("etl").about("Run the ETL pipeline"))),
    )
    .get_matches();

    // No subcommand runs the pipeline with whatever top-level flags were given.
    let run_matches = match matches.subcommand() {
        Some(("etl", etl_matches)) => etl_matches,
        Some(_) => {
            eprintln!("Please specify a valid subcommand");
            process::exit(1);
        }
        None => &matches,
    };

    let config_path = run_matches
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

    let options = match options_from(&settings, run_matches) {
        Ok(options) => options,
        Err(e) => {
            error!(error = %e, "Invalid command line");
            process::exit(1);
        }
    };

    match etl::run_etl_pipeline(&settings, options).await {
        Ok(summary) if summary.is_success() => {}
        Ok(_) => process::exit(1),
        Err(e) => {
            error!(error = %e, fatal = e.is_fatal(), "ETL run could not complete");
            process::exit(1);
        }
    }
}
