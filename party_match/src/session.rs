//! The state of one respondent going through the survey.
//!
//! A [`Session`] owns the answers and the position in the questionnaire. Every
//! operation that the outside world may want to record returns a
//! [`SessionEvent`]; the session itself never performs any I/O.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{completion_rate, compute_matches};
pub use crate::config::*;

/// When results may be requested before the last question, and when they are
/// considered representative.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct EarlyFinishPolicy {
    /// Number of questions that must have been shown.
    pub min_questions: usize,
    /// Number of answered questions above which the results are representative.
    pub representative_answers: usize,
}

impl EarlyFinishPolicy {
    pub const DEFAULT_POLICY: EarlyFinishPolicy = EarlyFinishPolicy {
        min_questions: 10,
        representative_answers: 5,
    };
}

impl Default for EarlyFinishPolicy {
    fn default() -> Self {
        EarlyFinishPolicy::DEFAULT_POLICY
    }
}

/// The outcome of a finished (or cut short) survey.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsSummary {
    pub results: Vec<MatchResult>,
    /// The number of leading questions that took part in the matching.
    pub questions_answered: usize,
    /// Among those, the ones the respondent actually answered.
    pub answered_questions: usize,
    pub total_questions: usize,
    pub completion_rate: u32,
    #[serde(rename = "isEarlyFinish")]
    pub early_finish: bool,
    pub is_representative: bool,
}

impl ResultsSummary {
    pub fn top(&self) -> Option<&MatchResult> {
        self.results.first()
    }
}

/// Something that happened in a session and that may be worth recording.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum SessionEvent {
    SurveyStart {
        total_questions: usize,
    },
    QuestionAnswer {
        /// 1-based
        question_number: usize,
        agreement: u8,
        importance: u8,
    },
    SurveyComplete(ResultsSummary),
    SurveyEarlyFinish(ResultsSummary),
    Restart,
}

/// Scores the first `answered_count` questions and gathers the completion figures.
pub fn summarize(
    dataset: &Dataset,
    answers: &AnswerSet,
    answered_count: usize,
    policy: &EarlyFinishPolicy,
) -> Result<ResultsSummary, MatchErrors> {
    let total_questions = dataset.questions.len();
    let results = compute_matches(dataset, answers, answered_count)?;
    let answered_questions = answers.answered_in_prefix(answered_count);
    Ok(ResultsSummary {
        results,
        questions_answered: answered_count,
        answered_questions,
        total_questions,
        completion_rate: completion_rate(answered_count, total_questions),
        early_finish: answered_count < total_questions,
        is_representative: answered_questions >= policy.representative_answers,
    })
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Stage {
    Intro,
    InProgress,
    Finished,
}

#[derive(Debug, Clone)]
pub struct Session<'a> {
    dataset: &'a Dataset,
    answers: AnswerSet,
    current: usize,
    stage: Stage,
}

impl<'a> Session<'a> {
    pub fn new(dataset: &'a Dataset) -> Result<Session<'a>, MatchErrors> {
        dataset.validate()?;
        Ok(Session {
            dataset,
            answers: AnswerSet::new(dataset.questions.len()),
            current: 0,
            stage: Stage::Intro,
        })
    }

    /// Resumes a session from saved answers. The session is in progress at the
    /// given question.
    pub fn restore(
        dataset: &'a Dataset,
        answers: AnswerSet,
        current: usize,
    ) -> Result<Session<'a>, MatchErrors> {
        dataset.validate()?;
        let expected = dataset.questions.len();
        if answers.len() != expected {
            return Err(MatchErrors::AnswerCountMismatch {
                expected,
                found: answers.len(),
            });
        }
        if current >= expected.max(1) {
            return Err(MatchErrors::QuestionIndexOutOfRange {
                index: current,
                len: expected,
            });
        }
        debug!(
            "restore: {} answers, {} answered, at question {}",
            answers.len(),
            answers.answered_in_prefix(answers.len()),
            current + 1
        );
        Ok(Session {
            dataset,
            answers,
            current,
            stage: Stage::InProgress,
        })
    }

    pub fn dataset(&self) -> &Dataset {
        self.dataset
    }

    pub fn answers(&self) -> &AnswerSet {
        &self.answers
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Index of the question currently shown.
    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_question(&self) -> Option<&Question> {
        match self.stage {
            Stage::InProgress => self.dataset.questions.get(self.current),
            _ => None,
        }
    }

    pub fn total_questions(&self) -> usize {
        self.dataset.questions.len()
    }

    /// Number of questions the respondent has gone through, including the current one.
    pub fn questions_seen(&self) -> usize {
        if self.dataset.questions.is_empty() {
            0
        } else {
            self.current + 1
        }
    }

    pub fn is_last_question(&self) -> bool {
        self.questions_seen() == self.total_questions()
    }

    /// Starts the survey at the first question. Starting again after a finished
    /// survey begins with fresh answers.
    pub fn start(&mut self) -> SessionEvent {
        if self.stage == Stage::Finished {
            self.answers = AnswerSet::new(self.total_questions());
        }
        self.current = 0;
        self.stage = Stage::InProgress;
        info!("Survey started with {} questions", self.total_questions());
        SessionEvent::SurveyStart {
            total_questions: self.total_questions(),
        }
    }

    /// Sets one slider of the current question.
    pub fn set_answer(&mut self, field: AnswerField, value: u8) -> Result<SessionEvent, MatchErrors> {
        self.set_answer_at(self.current, field, value)
    }

    /// Sets one slider of any question.
    pub fn set_answer_at(
        &mut self,
        index: usize,
        field: AnswerField,
        value: u8,
    ) -> Result<SessionEvent, MatchErrors> {
        if self.stage != Stage::InProgress {
            return Err(MatchErrors::SessionNotStarted);
        }
        self.answers.set(index, field, value)?;
        let answer = self.answers.get(index).cloned().unwrap_or_default();
        debug!("set_answer_at: question {}: {} = {}", index + 1, field, value);
        Ok(SessionEvent::QuestionAnswer {
            question_number: index + 1,
            agreement: answer.agreement,
            importance: answer.importance,
        })
    }

    /// Moves to the next question. Returns false on the last one.
    pub fn next(&mut self) -> bool {
        if self.stage == Stage::InProgress && self.current + 1 < self.total_questions() {
            self.current += 1;
            true
        } else {
            false
        }
    }

    /// Moves to the previous question. Returns false on the first one.
    pub fn previous(&mut self) -> bool {
        if self.stage == Stage::InProgress && self.current > 0 {
            self.current -= 1;
            true
        } else {
            false
        }
    }

    pub fn can_finish_early(&self, policy: &EarlyFinishPolicy) -> bool {
        self.stage == Stage::InProgress
            && (self.is_last_question() || self.questions_seen() >= policy.min_questions)
    }

    /// Scores the questions seen so far. The summary is also contained in the
    /// returned event.
    pub fn finish(
        &mut self,
        policy: &EarlyFinishPolicy,
    ) -> Result<(ResultsSummary, SessionEvent), MatchErrors> {
        if self.stage != Stage::InProgress {
            return Err(MatchErrors::SessionNotStarted);
        }
        if !self.can_finish_early(policy) {
            return Err(MatchErrors::EarlyFinishNotAllowed {
                seen: self.questions_seen(),
                required: policy.min_questions,
            });
        }
        let summary = self.summary(policy)?;
        self.stage = Stage::Finished;
        info!(
            "Survey finished: {}/{} questions, {} answered",
            summary.questions_answered, summary.total_questions, summary.answered_questions
        );
        let event = if summary.early_finish {
            SessionEvent::SurveyEarlyFinish(summary.clone())
        } else {
            SessionEvent::SurveyComplete(summary.clone())
        };
        Ok((summary, event))
    }

    /// The results for the questions seen so far, without changing the session.
    pub fn summary(&self, policy: &EarlyFinishPolicy) -> Result<ResultsSummary, MatchErrors> {
        summarize(self.dataset, &self.answers, self.questions_seen(), policy)
    }

    /// Drops all the answers and goes back to the introduction.
    pub fn restart(&mut self) -> SessionEvent {
        self.answers = AnswerSet::new(self.total_questions());
        self.current = 0;
        self.stage = Stage::Intro;
        info!("Survey restarted");
        SessionEvent::Restart
    }
}
