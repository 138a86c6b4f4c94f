mod args;
mod backend;
mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use log::{LevelFilter, debug};
use phyto_utils::{configure_telemetry, init_logging};

use crate::{
    args::{Cli, Command},
    config::{apply_cli_overrides, load_settings},
};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_filter = match cli.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    init_logging(default_filter)?;

    let mut settings = load_settings(cli.config.as_ref())?;
    apply_cli_overrides(&mut settings, &cli);
    configure_telemetry(
        settings.telemetry.enabled,
        settings.telemetry.level_filter(),
    );
    debug!("Running {:?} with {:?}", cli.command, settings);

    match &cli.command {
        Command::Split(args) => commands::run_split(&settings, args.json.as_deref()),
        Command::DatasetConfig(_) => commands::run_dataset_config(&settings),
        Command::Describe(args) => {
            let table = commands::load_class_table(&settings)?;
            commands::run_describe(&table, args.index)
        }
        Command::Classes(args) => {
            let table = commands::load_class_table(&settings)?;
            commands::run_classes(&table, args.validate.as_deref(), args.json)
        }
        Command::Report(args) => {
            let table = commands::load_class_table(&settings)?;
            commands::run_report(&table, &args.detections, args.json.as_deref())
        }
        Command::Export(_) => commands::run_export(&settings),
        Command::Summary(args) => commands::run_summary(&settings, args.results.as_deref()),
        Command::Eval(args) => commands::run_eval(&args.confusion, args.json.as_deref()),
        Command::Predict(args) => backend::run_predict(&settings.backend, &args.image),
    }
}
