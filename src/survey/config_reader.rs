use crate::survey::*;

use party_match::session::EarlyFinishPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_SESSION_TIMEOUT_HOURS: i64 = 4;

/// The content of the `--config` file. Every key is optional.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct SurveyConfig {
    #[serde(rename = "datasetPath")]
    pub dataset_path: Option<String>,
    #[serde(rename = "trackingStore")]
    pub tracking_store: Option<String>,
    #[serde(rename = "statePath")]
    pub state_path: Option<String>,
    #[serde(rename = "earlyFinishMinQuestions")]
    pub early_finish_min_questions: Option<usize>,
    #[serde(rename = "representativeAnswers")]
    pub representative_answers: Option<usize>,
    #[serde(rename = "sessionTimeoutHours")]
    pub session_timeout_hours: Option<i64>,
}

/// Values given on the command line. They take precedence over the file.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub dataset_path: Option<String>,
    pub tracking_store: Option<String>,
    pub state_path: Option<String>,
}

/// The resolved settings of a run.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Settings {
    pub dataset_path: Option<String>,
    pub tracking_store: Option<String>,
    pub state_path: Option<String>,
    pub policy: EarlyFinishPolicy,
    pub session_timeout_hours: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            dataset_path: None,
            tracking_store: None,
            state_path: None,
            policy: EarlyFinishPolicy::DEFAULT_POLICY,
            session_timeout_hours: DEFAULT_SESSION_TIMEOUT_HOURS,
        }
    }
}

pub fn read_config(path: &str) -> SurveyResult<SurveyConfig> {
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
    debug!("read_config: {:?}", contents);
    serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })
}

/// Reads the configuration file, if any, and applies the overrides.
pub fn load_settings(
    config_path: Option<&str>,
    overrides: &SettingsOverrides,
) -> SurveyResult<Settings> {
    let (config, root) = match config_path {
        Some(p) => {
            let config = read_config(p)?;
            info!("config: {:?}", config);
            let root = Path::new(p)
                .parent()
                .map(|d| d.to_path_buf())
                .unwrap_or_default();
            (config, root)
        }
        None => (SurveyConfig::default(), PathBuf::new()),
    };
    Ok(resolve_settings(&config, &root, overrides))
}

pub fn resolve_settings(
    config: &SurveyConfig,
    root: &Path,
    overrides: &SettingsOverrides,
) -> Settings {
    let from_config = |p: &Option<String>| p.as_ref().map(|s| relative_to(root, s));
    let defaults = Settings::default();
    Settings {
        dataset_path: overrides
            .dataset_path
            .clone()
            .or_else(|| from_config(&config.dataset_path)),
        tracking_store: overrides
            .tracking_store
            .clone()
            .or_else(|| from_config(&config.tracking_store)),
        state_path: overrides
            .state_path
            .clone()
            .or_else(|| from_config(&config.state_path)),
        policy: EarlyFinishPolicy {
            min_questions: config
                .early_finish_min_questions
                .unwrap_or(defaults.policy.min_questions),
            representative_answers: config
                .representative_answers
                .unwrap_or(defaults.policy.representative_answers),
        },
        session_timeout_hours: config
            .session_timeout_hours
            .unwrap_or(defaults.session_timeout_hours),
    }
}

fn relative_to(root: &Path, p: &str) -> String {
    let path = Path::new(p);
    if path.is_absolute() {
        p.to_string()
    } else {
        root.join(path).display().to_string()
    }
}
