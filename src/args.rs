use clap::{Parser, Subcommand};

/// Matches survey answers with the positions of political parties.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A JSON configuration file. Paths inside it are relative to the file.
    /// See the manual of the party_match library for the keys.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path) The dataset with the questions and the parties. Setting this option overrides
    /// the path that may be specified with the --config option.
    #[clap(short, long, value_parser)]
    pub dataset: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Scores a file of answers.
    Score {
        /// (file path) The answers, one per question.
        #[clap(short, long, value_parser)]
        input: String,

        /// (default json) The type of the input: json, csv or xlsx.
        #[clap(long, value_parser)]
        input_type: Option<String>,

        /// (number, default all) Only the first questions are scored, as when finishing early.
        #[clap(short, long, value_parser)]
        answered: Option<usize>,

        /// (default: first worksheet) When using an Excel file, indicates the name of the worksheet to use.
        #[clap(long, value_parser)]
        excel_worksheet_name: Option<String>,

        /// (file path, 'stdout' or empty) If specified, the results will be written in JSON format to
        /// the given location.
        #[clap(short, long, value_parser)]
        out: Option<String>,

        /// (file path) A reference file containing results in JSON format. If provided, partymatch
        /// will check that the computed results match the reference.
        #[clap(short, long, value_parser)]
        reference: Option<String>,
    },
    /// Runs the survey in the terminal.
    Take {
        /// (file path) The CSV file where events are recorded. Tracking is off when neither this
        /// option nor the configuration sets a store.
        #[clap(long, value_parser)]
        track: Option<String>,

        /// (file path) Where the progress is kept between two runs.
        #[clap(long, value_parser)]
        state: Option<String>,
    },
    /// Summarizes a tracking store.
    Stats {
        /// (file path) The CSV tracking store.
        #[clap(long, value_parser)]
        store: Option<String>,
    },
}
