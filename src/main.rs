use log::{debug, LevelFilter};
use snafu::ErrorCompat;

use crate::args::{Args, Command};
use crate::survey::config_reader::{load_settings, SettingsOverrides};
use crate::survey::{InputType, ScoreOptions, SurveyResult};
use clap::Parser;

mod args;
mod survey;

fn run(args: Args) -> SurveyResult<()> {
    let (tracking_store, state_path) = match &args.command {
        Command::Take { track, state } => (track.clone(), state.clone()),
        Command::Stats { store } => (store.clone(), None),
        Command::Score { .. } => (None, None),
    };
    let overrides = SettingsOverrides {
        dataset_path: args.dataset.clone(),
        tracking_store,
        state_path,
    };
    let settings = load_settings(args.config.as_deref(), &overrides)?;
    debug!("settings: {:?}", settings);

    match args.command {
        Command::Score {
            input,
            input_type,
            answered,
            excel_worksheet_name,
            out,
            reference,
        } => {
            let options = ScoreOptions {
                input,
                input_type: InputType::parse(input_type.as_deref())?,
                answered,
                excel_worksheet_name,
                out,
                reference,
            };
            survey::run_score(&settings, &options)?;
            Ok(())
        }
        Command::Take { .. } => survey::run_take(&settings),
        Command::Stats { .. } => survey::run_stats(&settings),
    }
}

fn main() {
    let args = Args::parse();

    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("trace: {}", bt);
        }
        std::process::exit(1);
    }
}
