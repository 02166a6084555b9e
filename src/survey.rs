use log::{debug, info, warn};

use party_match::session::{summarize, EarlyFinishPolicy, ResultsSummary};
use party_match::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::io::Write;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::survey::config_reader::Settings;
use crate::survey::tracking::{CsvEventStore, Tracker};

pub mod config_reader;
pub mod identity;
pub mod interactive;
pub mod io_common;
pub mod io_csv;
pub mod io_json;
pub mod io_xlsx;
pub mod state;
pub mod store_stats;
pub mod tracking;

#[derive(Debug, Snafu)]
pub enum SurveyError {
    #[snafu(display("Error opening file {path}"))]
    OpeningFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing file {path}"))]
    WritingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing to the terminal"))]
    WritingOutput { source: std::io::Error },
    #[snafu(display("Error reading from the terminal"))]
    ReadingInput { source: std::io::Error },
    #[snafu(display("Error parsing the JSON content of {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error producing JSON"))]
    WritingJson { source: serde_json::Error },
    #[snafu(display("Error opening Excel file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("No worksheet {name:?} in {path}"))]
    MissingWorksheet { name: String, path: String },
    #[snafu(display("Error opening CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading line {lineno} of {path}"))]
    CsvLineParse {
        source: csv::Error,
        lineno: usize,
        path: String,
    },
    #[snafu(display("Error appending to the tracking store {path}"))]
    CsvWrite { source: csv::Error, path: String },
    #[snafu(display("Line {lineno}: missing column {column}"))]
    MissingColumn { lineno: usize, column: String },
    #[snafu(display("Line {lineno}: {content:?} is not a valid value for {column}"))]
    InvalidCell {
        lineno: usize,
        column: String,
        content: String,
    },
    #[snafu(display("{source}"))]
    Matching { source: MatchErrors },
    #[snafu(display(
        "The survey data could not be loaded from {path} ({reason}). Check that the file is available and try again."
    ))]
    DatasetUnavailable { path: String, reason: String },
    #[snafu(display("No {key} was given, either on the command line or in the configuration"))]
    MissingSetting { key: String },
    #[snafu(display("Unknown input type {input_type:?} (expected json, csv or xlsx)"))]
    UnknownInputType { input_type: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type SurveyResult<T> = Result<T, SurveyError>;

/// The formats in which answers can be provided.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum InputType {
    Json,
    Csv,
    Xlsx,
}

impl InputType {
    pub fn parse(s: Option<&str>) -> SurveyResult<InputType> {
        match s {
            None | Some("json") => Ok(InputType::Json),
            Some("csv") => Ok(InputType::Csv),
            Some("xlsx") | Some("excel") => Ok(InputType::Xlsx),
            Some(x) => UnknownInputTypeSnafu { input_type: x }.fail(),
        }
    }
}

/// What `score` should read and produce.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ScoreOptions {
    pub input: String,
    pub input_type: InputType,
    /// Number of leading questions to score. All of them by default.
    pub answered: Option<usize>,
    pub excel_worksheet_name: Option<String>,
    /// A path, or `stdout`.
    pub out: Option<String>,
    pub reference: Option<String>,
}

/// The document written by `score --out`: everything needed to reproduce and
/// display the results.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRecord {
    pub timestamp: String,
    #[serde(rename = "quiz_version")]
    pub quiz_version: Option<Metadata>,
    pub answers: AnswerSet,
    #[serde(flatten)]
    pub summary: ResultsSummary,
}

/// Loads and checks the dataset. Any failure is reported as the dataset being
/// unavailable: nothing can be done without it.
pub fn load_dataset(path: &str) -> SurveyResult<Dataset> {
    info!("Loading survey data from {:?}", path);
    let dataset = io_json::read_dataset(path).map_err(|e| SurveyError::DatasetUnavailable {
        path: path.to_string(),
        reason: e.to_string(),
    })?;
    let unknown = dataset.unknown_party_ids();
    if !unknown.is_empty() {
        warn!(
            "The questions of {} refer to unknown parties, they will be ignored: {:?}",
            path, unknown
        );
    }
    info!(
        "Loaded {} questions and {} parties",
        dataset.questions.len(),
        dataset.parties.len()
    );
    Ok(dataset)
}

fn dataset_path(settings: &Settings) -> SurveyResult<String> {
    settings
        .dataset_path
        .clone()
        .context(MissingSettingSnafu {
            key: "dataset (--dataset or datasetPath)",
        })
}

fn read_answers(
    options: &ScoreOptions,
    num_questions: usize,
) -> SurveyResult<AnswerSet> {
    info!("Attempting to read answers file {:?}", options.input);
    match options.input_type {
        InputType::Json => io_json::read_answers(&options.input, num_questions),
        InputType::Csv => {
            let parsed = io_csv::read_csv_answers(&options.input)?;
            io_common::assemble_answers(&parsed, num_questions)
        }
        InputType::Xlsx => {
            let parsed =
                io_xlsx::read_excel_answers(&options.input, options.excel_worksheet_name.as_deref())?;
            io_common::assemble_answers(&parsed, num_questions)
        }
    }
}

/// Scores a file of answers against the dataset.
pub fn run_score(settings: &Settings, options: &ScoreOptions) -> SurveyResult<ResultsSummary> {
    let dataset = load_dataset(&dataset_path(settings)?)?;
    let answers = read_answers(options, dataset.questions.len())?;
    let answered_count = options.answered.unwrap_or(dataset.questions.len());
    debug!("run_score: answers: {:?}", answers);

    let summary = summarize(&dataset, &answers, answered_count, &settings.policy)
        .context(MatchingSnafu {})?;

    print!("{}", format_summary(&summary));

    let record = ExportRecord {
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        quiz_version: dataset.metadata.clone(),
        answers,
        summary: summary.clone(),
    };
    let record_js = serde_json::to_value(&record).context(WritingJsonSnafu {})?;
    let pretty_js = serde_json::to_string_pretty(&record_js).context(WritingJsonSnafu {})?;

    match options.out.as_deref() {
        Some("stdout") => println!("{}", pretty_js),
        Some(path) => {
            fs::write(path, &pretty_js).context(WritingFileSnafu { path })?;
            info!("Results written to {:?}", path);
        }
        None => {}
    }

    if let Some(reference_p) = &options.reference {
        check_reference(reference_p, &record_js)?;
    }

    Ok(summary)
}

/// Compares the computed record to a reference record. The timestamps are left
/// out of the comparison.
fn check_reference(reference_path: &str, computed: &JSValue) -> SurveyResult<()> {
    let reference = io_json::read_json_value(reference_path)?;
    info!("Comparing results with reference {:?}", reference_path);
    let pretty_ref = serde_json::to_string_pretty(&without_timestamp(reference))
        .context(WritingJsonSnafu {})?;
    let pretty_computed = serde_json::to_string_pretty(&without_timestamp(computed.clone()))
        .context(WritingJsonSnafu {})?;
    if pretty_ref != pretty_computed {
        warn!("Found differences with the reference results");
        print_diff(pretty_ref.as_str(), pretty_computed.as_str(), "\n");
        whatever!("Difference detected between computed results and reference results")
    }
    Ok(())
}

fn without_timestamp(mut js: JSValue) -> JSValue {
    if let Some(obj) = js.as_object_mut() {
        obj.remove("timestamp");
    }
    js
}

/// Runs the survey on the terminal.
pub fn run_take(settings: &Settings) -> SurveyResult<()> {
    let dataset = load_dataset(&dataset_path(settings)?)?;
    let tracker = match &settings.tracking_store {
        Some(p) => Tracker::spawn(Box::new(CsvEventStore::new(p))),
        None => {
            info!("Tracking disabled - no tracking store configured");
            Tracker::disabled()
        }
    };
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    interactive::run_interactive(&dataset, settings, &tracker, stdin.lock(), &mut stdout)?;
    stdout.flush().context(WritingOutputSnafu {})?;
    Ok(())
}

/// Prints the statistics of a tracking store.
pub fn run_stats(settings: &Settings) -> SurveyResult<()> {
    let path = settings
        .tracking_store
        .clone()
        .context(MissingSettingSnafu {
            key: "tracking store (--store or trackingStore)",
        })?;
    let stats = store_stats::compute_stats(&path)?;
    let pretty = serde_json::to_string_pretty(&stats).context(WritingJsonSnafu {})?;
    println!("{}", pretty);
    Ok(())
}

/// A human-readable ranking, with the completion information first.
pub fn format_summary(summary: &ResultsSummary) -> String {
    let mut s = String::new();
    if summary.early_finish {
        s.push_str(&format!(
            "Completed: {}% ({}/{} questions), actively answered: {}\n",
            summary.completion_rate,
            summary.questions_answered,
            summary.total_questions,
            summary.answered_questions
        ));
        if summary.is_representative {
            s.push_str("These results are based on enough answers to be representative.\n");
        } else {
            s.push_str("Answer more questions for more accurate results.\n");
        }
    } else {
        s.push_str(&format!(
            "Survey complete ({}/{} questions)\n",
            summary.total_questions, summary.total_questions
        ));
    }
    for (idx, r) in summary.results.iter().enumerate() {
        if r.party.leader.is_empty() {
            s.push_str(&format!("{:>3}. {:<40} {:>3}%\n", idx + 1, r.party.name, r.percentage));
        } else {
            s.push_str(&format!(
                "{:>3}. {:<40} {:>3}%  (leader: {})\n",
                idx + 1,
                r.party.name,
                r.percentage,
                r.party.leader
            ));
        }
    }
    s
}
