// ********* Input data structures ***********

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::error::Error;
use std::fmt::Display;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

/// Lowest position a party may take on a question (authored scale).
pub const MIN_POSITION: f64 = 1.0;
/// Highest position a party may take on a question (authored scale).
pub const MAX_POSITION: f64 = 10.0;
/// Upper bound of the agreement and importance scales.
pub const MAX_ANSWER_VALUE: u8 = 100;
/// The value every slider starts at.
pub const NEUTRAL_ANSWER_VALUE: u8 = 50;

/// A party the respondent is matched against.
///
/// Parties are reference data: the engine never creates or modifies them.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Serialize, Deserialize)]
pub struct Party {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub leader: String,
    #[serde(default)]
    pub color: String,
}

impl Party {
    /// A party with only an identifier. The display name is the identifier.
    pub fn with_id(id: &str) -> Party {
        Party {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            leader: String::new(),
            color: String::new(),
        }
    }
}

/// The stance of each party on one question, on the 1-10 scale.
///
/// A party that has no entry takes no part in the question: it neither gains nor
/// loses anything from the answer to it.
#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartyPositions(BTreeMap<String, f64>);

impl PartyPositions {
    pub fn new() -> PartyPositions {
        PartyPositions(BTreeMap::new())
    }

    pub fn insert(&mut self, party_id: &str, position: f64) -> Option<f64> {
        self.0.insert(party_id.to_string(), position)
    }

    /// The raw position of the party, if the question covers it.
    pub fn get(&self, party_id: &str) -> Option<f64> {
        self.0.get(party_id).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &f64)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, f64)> for PartyPositions {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        PartyPositions(iter.into_iter().collect())
    }
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    #[serde(default)]
    pub category: String,
    /// The statement presented to the respondent.
    #[serde(rename = "question")]
    pub text: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub party_positions: PartyPositions,
}

/// Descriptive data about a dataset. It is carried into exports untouched.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    pub title: Option<String>,
    pub version: Option<String>,
    pub date: Option<String>,
    pub description: Option<String>,
}

/// The questions and parties of a survey. Loaded once, never mutated.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub metadata: Option<Metadata>,
    pub questions: Vec<Question>,
    pub parties: Vec<Party>,
}

impl Dataset {
    /// Checks the structural integrity of the dataset.
    ///
    /// Positions referring to parties that do not exist are tolerated: they
    /// are ignored by the scoring.
    pub fn validate(&self) -> Result<(), MatchErrors> {
        if self.parties.is_empty() {
            return Err(MatchErrors::EmptyDataset);
        }
        let mut seen: HashSet<&str> = HashSet::new();
        for p in self.parties.iter() {
            if !seen.insert(p.id.as_str()) {
                return Err(MatchErrors::DuplicateParty(p.id.clone()));
            }
        }
        for (idx, q) in self.questions.iter().enumerate() {
            for (party_id, position) in q.party_positions.iter() {
                check_position(idx, party_id, *position)?;
            }
        }
        Ok(())
    }

    /// The parties referenced by the questions but absent from the party list.
    pub fn unknown_party_ids(&self) -> Vec<String> {
        let known: HashSet<&str> = self.parties.iter().map(|p| p.id.as_str()).collect();
        let mut unknown: Vec<String> = Vec::new();
        for q in self.questions.iter() {
            for (party_id, _) in q.party_positions.iter() {
                if !known.contains(party_id.as_str()) && !unknown.contains(party_id) {
                    unknown.push(party_id.clone());
                }
            }
        }
        unknown
    }

    pub fn party(&self, party_id: &str) -> Option<&Party> {
        self.parties.iter().find(|p| p.id == party_id)
    }
}

pub(crate) fn check_position(question: usize, party_id: &str, position: f64) -> Result<(), MatchErrors> {
    if position.is_finite() && (MIN_POSITION..=MAX_POSITION).contains(&position) {
        Ok(())
    } else {
        Err(MatchErrors::PositionOutOfScale {
            question,
            party_id: party_id.to_string(),
            position,
        })
    }
}

/// The two sliders attached to every question.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum AnswerField {
    Agreement,
    Importance,
}

impl FromStr for AnswerField {
    type Err = MatchErrors;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "agreement" => Ok(AnswerField::Agreement),
            "importance" => Ok(AnswerField::Importance),
            x => Err(MatchErrors::UnknownField(x.to_string())),
        }
    }
}

impl Display for AnswerField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnswerField::Agreement => write!(f, "agreement"),
            AnswerField::Importance => write!(f, "importance"),
        }
    }
}

fn answered_when_unspecified() -> bool {
    true
}

/// The answer of the respondent to one question.
///
/// `answered` records whether the respondent touched this slot. The default
/// value of the sliders is also a valid neutral answer, so the flag is the
/// only way to tell the two apart. An answer read from a file without the
/// flag was written by someone, and counts as answered.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Serialize, Deserialize)]
pub struct Answer {
    pub agreement: u8,
    pub importance: u8,
    #[serde(default = "answered_when_unspecified")]
    pub answered: bool,
}

impl Answer {
    pub const UNANSWERED: Answer = Answer {
        agreement: NEUTRAL_ANSWER_VALUE,
        importance: NEUTRAL_ANSWER_VALUE,
        answered: false,
    };

    pub fn new(agreement: u8, importance: u8) -> Result<Answer, MatchErrors> {
        check_value(AnswerField::Agreement, agreement)?;
        check_value(AnswerField::Importance, importance)?;
        Ok(Answer {
            agreement,
            importance,
            answered: true,
        })
    }

    pub fn get(&self, field: AnswerField) -> u8 {
        match field {
            AnswerField::Agreement => self.agreement,
            AnswerField::Importance => self.importance,
        }
    }

    pub(crate) fn check(&self) -> Result<(), MatchErrors> {
        check_value(AnswerField::Agreement, self.agreement)?;
        check_value(AnswerField::Importance, self.importance)
    }
}

impl Default for Answer {
    fn default() -> Self {
        Answer::UNANSWERED
    }
}

fn check_value(field: AnswerField, value: u8) -> Result<(), MatchErrors> {
    if value > MAX_ANSWER_VALUE {
        Err(MatchErrors::ValueOutOfScale { field, value })
    } else {
        Ok(())
    }
}

/// One answer slot per question, aligned with the question order.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerSet(pub(crate) Vec<Answer>);

impl AnswerSet {
    /// A set of `len` unanswered slots.
    pub fn new(len: usize) -> AnswerSet {
        AnswerSet(vec![Answer::UNANSWERED; len])
    }

    pub fn from_answers(answers: Vec<Answer>) -> Result<AnswerSet, MatchErrors> {
        for a in answers.iter() {
            a.check()?;
        }
        Ok(AnswerSet(answers))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Answer> {
        self.0.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Answer> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Answer] {
        &self.0
    }

    /// Overwrites one field of one slot and marks the slot as answered.
    pub fn set(&mut self, index: usize, field: AnswerField, value: u8) -> Result<(), MatchErrors> {
        check_value(field, value)?;
        let len = self.0.len();
        let slot = self
            .0
            .get_mut(index)
            .ok_or(MatchErrors::QuestionIndexOutOfRange { index, len })?;
        match field {
            AnswerField::Agreement => slot.agreement = value,
            AnswerField::Importance => slot.importance = value,
        }
        slot.answered = true;
        Ok(())
    }

    /// Replaces a whole slot.
    pub fn put(&mut self, index: usize, answer: Answer) -> Result<(), MatchErrors> {
        answer.check()?;
        let len = self.0.len();
        let slot = self
            .0
            .get_mut(index)
            .ok_or(MatchErrors::QuestionIndexOutOfRange { index, len })?;
        *slot = answer;
        Ok(())
    }

    /// Number of slots the respondent actually touched among the first `prefix` ones.
    pub fn answered_in_prefix(&self, prefix: usize) -> usize {
        self.0.iter().take(prefix).filter(|a| a.answered).count()
    }
}

// ******** Output data structures *********

/// The accumulated score of one party.
///
/// `total` is the weighted closeness gathered so far, `max_possible` what a
/// perfect match would have gathered with the same weights.
#[derive(PartialEq, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Score {
    pub total: f64,
    pub max_possible: f64,
}

impl Score {
    pub const EMPTY: Score = Score {
        total: 0.0,
        max_possible: 0.0,
    };

    /// The normalized match, rounded half away from zero. Zero when no weight
    /// was ever gathered.
    pub fn percentage(&self) -> u32 {
        if self.max_possible > 0.0 {
            (self.total / self.max_possible * 100.0).round() as u32
        } else {
            0
        }
    }
}

impl Default for Score {
    fn default() -> Self {
        Score::EMPTY
    }
}

impl std::iter::Sum for Score {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Score::EMPTY, |acc, s| acc + s)
    }
}

impl AddAssign for Score {
    fn add_assign(&mut self, rhs: Score) {
        self.total += rhs.total;
        self.max_possible += rhs.max_possible;
    }
}

impl Add for Score {
    type Output = Score;
    fn add(self: Score, rhs: Score) -> Score {
        Score {
            total: self.total + rhs.total,
            max_possible: self.max_possible + rhs.max_possible,
        }
    }
}

/// Accumulators of one party, before normalization.
#[derive(PartialEq, Debug, Clone)]
pub struct PartyTally {
    pub party_id: String,
    pub score: Score,
}

/// The match of the respondent with one party.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    pub party: Party,
    pub percentage: u32,
}

/// Errors that prevent the matching from completing.
#[derive(PartialEq, Debug, Clone)]
pub enum MatchErrors {
    /// The dataset does not contain any party.
    EmptyDataset,
    DuplicateParty(String),
    PositionOutOfScale {
        question: usize,
        party_id: String,
        position: f64,
    },
    /// More questions were requested for scoring than there are answers or questions.
    AnsweredCountOutOfRange {
        answered_count: usize,
        answers: usize,
        questions: usize,
    },
    ValueOutOfScale {
        field: AnswerField,
        value: u8,
    },
    QuestionIndexOutOfRange {
        index: usize,
        len: usize,
    },
    UnknownField(String),
    AnswerCountMismatch {
        expected: usize,
        found: usize,
    },
    SessionNotStarted,
    EarlyFinishNotAllowed {
        seen: usize,
        required: usize,
    },
}

impl Error for MatchErrors {}

impl Display for MatchErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchErrors::EmptyDataset => write!(f, "the dataset does not contain any party"),
            MatchErrors::DuplicateParty(id) => write!(f, "party {:?} is declared twice", id),
            MatchErrors::PositionOutOfScale {
                question,
                party_id,
                position,
            } => write!(
                f,
                "question {}: position {} of party {:?} is outside of the {}-{} scale",
                question + 1,
                position,
                party_id,
                MIN_POSITION,
                MAX_POSITION
            ),
            MatchErrors::AnsweredCountOutOfRange {
                answered_count,
                answers,
                questions,
            } => write!(
                f,
                "cannot score {} questions: only {} answers and {} questions available",
                answered_count, answers, questions
            ),
            MatchErrors::ValueOutOfScale { field, value } => {
                write!(f, "{} must be between 0 and {}, got {}", field, MAX_ANSWER_VALUE, value)
            }
            MatchErrors::QuestionIndexOutOfRange { index, len } => {
                write!(f, "question index {} is out of range ({} questions)", index, len)
            }
            MatchErrors::UnknownField(s) => {
                write!(f, "unknown answer field {:?}, expected agreement or importance", s)
            }
            MatchErrors::AnswerCountMismatch { expected, found } => {
                write!(f, "expected {} answers, found {}", expected, found)
            }
            MatchErrors::SessionNotStarted => write!(f, "the survey has not been started"),
            MatchErrors::EarlyFinishNotAllowed { seen, required } => write!(
                f,
                "results are available after {} questions, only {} seen",
                required, seen
            ),
        }
    }
}
