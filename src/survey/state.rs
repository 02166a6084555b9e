//! Progress saved between two runs of `take`.

use party_match::AnswerSet;

use crate::survey::identity::UserIdentity;
use crate::survey::*;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedState {
    pub identity: UserIdentity,
    /// Absent when no survey is in progress.
    pub answers: Option<AnswerSet>,
    #[serde(default)]
    pub current_question: usize,
}

impl SavedState {
    pub fn clear_progress(&mut self) {
        self.answers = None;
        self.current_question = 0;
    }
}

/// Reads the saved state. A missing file is not an error.
pub fn load_state(path: &str) -> SurveyResult<Option<SavedState>> {
    if !std::path::Path::new(path).exists() {
        debug!("load_state: no saved state at {:?}", path);
        return Ok(None);
    }
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
    let state: SavedState = serde_json::from_str(&contents).context(ParsingJsonSnafu { path })?;
    debug!("load_state: {:?}", state);
    Ok(Some(state))
}

pub fn save_state(path: &str, state: &SavedState) -> SurveyResult<()> {
    let js = serde_json::to_string_pretty(state).context(WritingJsonSnafu {})?;
    fs::write(path, js).context(WritingFileSnafu { path })
}
