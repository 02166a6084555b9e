//! Fire-and-forget recording of what respondents do.
//!
//! The survey never waits for the store: [`Tracker::track`] hands the event to a
//! worker thread and returns. A failure to record is logged and dropped.

use std::fs::OpenOptions;
use std::sync::mpsc::{channel, Sender};
use std::thread::JoinHandle;

use chrono::{DateTime, Utc};
use party_match::session::{ResultsSummary, SessionEvent};

use crate::survey::*;

// ********* Events ***********

/// The figures recorded when a survey ends, early or not.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionData {
    pub results: Vec<MatchResult>,
    /// In seconds.
    pub session_duration: i64,
    pub questions_answered: usize,
    pub answered_questions: usize,
    pub total_questions: usize,
    pub completion_rate: u32,
    pub early_finish: bool,
}

impl CompletionData {
    pub fn new(summary: ResultsSummary, session_duration: i64) -> CompletionData {
        CompletionData {
            results: summary.results,
            session_duration,
            questions_answered: summary.questions_answered,
            answered_questions: summary.answered_questions,
            total_questions: summary.total_questions,
            completion_rate: summary.completion_rate,
            early_finish: summary.early_finish,
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "eventType", rename_all = "snake_case")]
pub enum EventKind {
    PageLoad,
    #[serde(rename_all = "camelCase")]
    SurveyStart {
        session_start: DateTime<Utc>,
        total_questions: usize,
    },
    #[serde(rename_all = "camelCase")]
    QuestionAnswer {
        question_number: usize,
        agreement: u8,
        importance: u8,
    },
    SurveyComplete(CompletionData),
    SurveyEarlyFinish(CompletionData),
    Restart,
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::PageLoad => "page_load",
            EventKind::SurveyStart { .. } => "survey_start",
            EventKind::QuestionAnswer { .. } => "question_answer",
            EventKind::SurveyComplete(_) => "survey_complete",
            EventKind::SurveyEarlyFinish(_) => "survey_early_finish",
            EventKind::Restart => "restart",
        }
    }

    /// Converts an event of the session. `started_at` is when the survey was
    /// started, if known; the duration is 0 otherwise.
    pub fn from_session_event(
        event: SessionEvent,
        started_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> EventKind {
        let duration = started_at
            .map(|t| (now - t).num_seconds().max(0))
            .unwrap_or(0);
        match event {
            SessionEvent::SurveyStart { total_questions } => EventKind::SurveyStart {
                session_start: started_at.unwrap_or(now),
                total_questions,
            },
            SessionEvent::QuestionAnswer {
                question_number,
                agreement,
                importance,
            } => EventKind::QuestionAnswer {
                question_number,
                agreement,
                importance,
            },
            SessionEvent::SurveyComplete(s) => {
                EventKind::SurveyComplete(CompletionData::new(s, duration))
            }
            SessionEvent::SurveyEarlyFinish(s) => {
                EventKind::SurveyEarlyFinish(CompletionData::new(s, duration))
            }
            SessionEvent::Restart => EventKind::Restart,
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedEvent {
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    pub user_agent: String,
    #[serde(flatten)]
    pub kind: EventKind,
}

// ********* Tabular store ***********

/// One line of the tracking store. Every cell is text; the cells that do not
/// apply to an event are empty.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventRow {
    #[serde(rename = "User ID")]
    pub user_id: String,
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "Event Type")]
    pub event_type: String,
    #[serde(rename = "Browser Info")]
    pub browser_info: String,
    #[serde(rename = "IP Address")]
    pub ip_address: String,
    #[serde(rename = "Question Number")]
    pub question_number: String,
    #[serde(rename = "Agreement %")]
    pub agreement: String,
    #[serde(rename = "Importance %")]
    pub importance: String,
    #[serde(rename = "Final Results")]
    pub final_results: String,
    #[serde(rename = "Top Party")]
    pub top_party: String,
    #[serde(rename = "Top Party Score")]
    pub top_party_score: String,
    #[serde(rename = "All Parties Scores")]
    pub all_parties_scores: String,
    #[serde(rename = "Session Duration")]
    pub session_duration: String,
    #[serde(rename = "Total Questions")]
    pub total_questions: String,
    #[serde(rename = "Completion Rate")]
    pub completion_rate: String,
}

#[derive(Serialize)]
struct PartyScore<'a> {
    party: &'a str,
    score: u32,
}

impl EventRow {
    pub fn from_event(event: &TrackedEvent) -> EventRow {
        let base = EventRow {
            user_id: event.user_id.clone(),
            timestamp: event.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            event_type: event.kind.name().to_string(),
            browser_info: event.user_agent.clone(),
            ip_address: "Unknown".to_string(),
            ..EventRow::default()
        };
        match &event.kind {
            EventKind::PageLoad | EventKind::Restart => base,
            EventKind::SurveyStart {
                session_start,
                total_questions,
            } => EventRow {
                session_duration: session_start.to_rfc3339_opts(SecondsFormat::Millis, true),
                total_questions: total_questions.to_string(),
                ..base
            },
            EventKind::QuestionAnswer {
                question_number,
                agreement,
                importance,
            } => EventRow {
                question_number: question_number.to_string(),
                agreement: agreement.to_string(),
                importance: importance.to_string(),
                ..base
            },
            EventKind::SurveyComplete(data) | EventKind::SurveyEarlyFinish(data) => {
                let top = data.results.first();
                let scores: Vec<PartyScore> = data
                    .results
                    .iter()
                    .map(|r| PartyScore {
                        party: r.party.name.as_str(),
                        score: r.percentage,
                    })
                    .collect();
                EventRow {
                    final_results: serde_json::to_string(&data.results).unwrap_or_default(),
                    top_party: top.map(|r| r.party.name.clone()).unwrap_or_default(),
                    top_party_score: top
                        .map(|r| format!("{}%", r.percentage))
                        .unwrap_or_default(),
                    all_parties_scores: serde_json::to_string(&scores).unwrap_or_default(),
                    session_duration: format!("{} seconds", data.session_duration),
                    total_questions: data.total_questions.to_string(),
                    completion_rate: format!("{}%", data.completion_rate),
                    ..base
                }
            }
        }
    }
}

/// Where the tracked events end up.
pub trait EventSink: Send {
    fn record(&mut self, event: &TrackedEvent) -> SurveyResult<()>;
}

/// Appends one line per event to a CSV file. The header is written when the
/// file is created.
#[derive(Debug, Clone)]
pub struct CsvEventStore {
    path: String,
}

impl CsvEventStore {
    pub fn new(path: &str) -> CsvEventStore {
        CsvEventStore {
            path: path.to_string(),
        }
    }
}

impl EventSink for CsvEventStore {
    fn record(&mut self, event: &TrackedEvent) -> SurveyResult<()> {
        let path = self.path.as_str();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .context(WritingFileSnafu { path })?;
        let is_new = file.metadata().context(WritingFileSnafu { path })?.len() == 0;
        if is_new {
            info!("Creating tracking store {:?}", path);
        }
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(is_new)
            .from_writer(file);
        wtr.serialize(EventRow::from_event(event))
            .context(CsvWriteSnafu { path })?;
        wtr.flush().context(WritingFileSnafu { path })?;
        Ok(())
    }
}

// ********* Tracker ***********

/// Sends events to a sink on a background thread.
///
/// Dropping the tracker waits for the events already sent to be recorded.
pub struct Tracker {
    sender: Option<Sender<TrackedEvent>>,
    worker: Option<JoinHandle<()>>,
    user_agent: String,
}

impl Tracker {
    /// A tracker that records nothing.
    pub fn disabled() -> Tracker {
        Tracker {
            sender: None,
            worker: None,
            user_agent: default_user_agent(),
        }
    }

    pub fn spawn(mut sink: Box<dyn EventSink>) -> Tracker {
        let (sender, receiver) = channel::<TrackedEvent>();
        let worker = std::thread::spawn(move || {
            for event in receiver {
                match sink.record(&event) {
                    Ok(()) => debug!(
                        "Event tracked: {} for user {}",
                        event.kind.name(),
                        event.user_id
                    ),
                    Err(e) => warn!("Error tracking event {}: {}", event.kind.name(), e),
                }
            }
        });
        Tracker {
            sender: Some(sender),
            worker: Some(worker),
            user_agent: default_user_agent(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.sender.is_some()
    }

    /// Records an event. Never fails and never blocks on the store.
    pub fn track(&self, user_id: &str, kind: EventKind) {
        let sender = match &self.sender {
            Some(s) => s,
            None => return,
        };
        let event = TrackedEvent {
            user_id: user_id.to_string(),
            timestamp: Utc::now(),
            user_agent: self.user_agent.clone(),
            kind,
        };
        if let Err(e) = sender.send(event) {
            warn!("Error tracking event {}: worker stopped", e.0.kind.name());
        }
    }
}

impl Drop for Tracker {
    fn drop(&mut self) {
        // Closing the channel ends the worker loop.
        self.sender = None;
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("The tracking worker panicked, some events may be lost");
            }
        }
    }
}

fn default_user_agent() -> String {
    format!(
        "partymatch/{} ({})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS
    )
}

/// Keeps the events in memory.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub(crate) struct MemorySink {
    pub events: std::sync::Arc<std::sync::Mutex<Vec<TrackedEvent>>>,
}

#[cfg(test)]
impl EventSink for MemorySink {
    fn record(&mut self, event: &TrackedEvent) -> SurveyResult<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn summary(early_finish: bool) -> ResultsSummary {
        let mut a = Party::with_id("A");
        a.name = "Party A".to_string();
        ResultsSummary {
            results: vec![
                MatchResult {
                    party: a,
                    percentage: 70,
                },
                MatchResult {
                    party: Party::with_id("B"),
                    percentage: 40,
                },
            ],
            questions_answered: 10,
            answered_questions: 8,
            total_questions: 20,
            completion_rate: 50,
            early_finish,
            is_representative: true,
        }
    }

    fn event(kind: EventKind) -> TrackedEvent {
        TrackedEvent {
            user_id: "user_1_abc".to_string(),
            timestamp: Utc.with_ymd_and_hms(2025, 9, 1, 10, 0, 0).unwrap(),
            user_agent: "test".to_string(),
            kind,
        }
    }

    #[test]
    fn event_json_is_flat() {
        let e = event(EventKind::QuestionAnswer {
            question_number: 3,
            agreement: 70,
            importance: 100,
        });
        let js = serde_json::to_value(&e).unwrap();
        assert_eq!(js["eventType"], "question_answer");
        assert_eq!(js["userId"], "user_1_abc");
        assert_eq!(js["questionNumber"], 3);
        assert_eq!(js["importance"], 100);
    }

    #[test]
    fn completion_rows() {
        let start = Utc.with_ymd_and_hms(2025, 9, 1, 9, 58, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 9, 1, 10, 0, 0).unwrap();
        let kind = EventKind::from_session_event(
            SessionEvent::SurveyEarlyFinish(summary(true)),
            Some(start),
            now,
        );
        let row = EventRow::from_event(&event(kind));
        assert_eq!(row.event_type, "survey_early_finish");
        assert_eq!(row.timestamp, "2025-09-01T10:00:00.000Z");
        assert_eq!(row.ip_address, "Unknown");
        assert_eq!(row.top_party, "Party A");
        assert_eq!(row.top_party_score, "70%");
        assert_eq!(
            row.all_parties_scores,
            r#"[{"party":"Party A","score":70},{"party":"B","score":40}]"#
        );
        assert_eq!(row.session_duration, "120 seconds");
        assert_eq!(row.total_questions, "20");
        assert_eq!(row.completion_rate, "50%");
        assert_eq!(row.question_number, "");
    }

    #[test]
    fn page_load_row_is_mostly_empty() {
        let row = EventRow::from_event(&event(EventKind::PageLoad));
        assert_eq!(
            row,
            EventRow {
                user_id: "user_1_abc".to_string(),
                timestamp: "2025-09-01T10:00:00.000Z".to_string(),
                event_type: "page_load".to_string(),
                browser_info: "test".to_string(),
                ip_address: "Unknown".to_string(),
                ..EventRow::default()
            }
        );
    }

    #[test]
    fn store_appends_with_one_header() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("events.csv").display().to_string();
        let mut store = CsvEventStore::new(&p);
        store.record(&event(EventKind::PageLoad)).unwrap();
        store
            .record(&event(EventKind::QuestionAnswer {
                question_number: 1,
                agreement: 0,
                importance: 50,
            }))
            .unwrap();
        let content = fs::read_to_string(&p).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("User ID,Timestamp,Event Type,Browser Info,IP Address,"));
        assert!(lines[0].ends_with("Session Duration,Total Questions,Completion Rate"));
        assert!(lines[2].contains(",question_answer,"));
        assert_eq!(lines[2].split(',').count(), 15);
    }

    #[test]
    fn tracker_delivers_before_drop() {
        let sink = MemorySink::default();
        let events = sink.events.clone();
        let tracker = Tracker::spawn(Box::new(sink));
        assert!(tracker.is_enabled());
        tracker.track("u1", EventKind::PageLoad);
        tracker.track("u1", EventKind::Restart);
        drop(tracker);
        let kinds: Vec<EventKind> = events.lock().unwrap().iter().map(|e| e.kind.clone()).collect();
        assert_eq!(kinds, vec![EventKind::PageLoad, EventKind::Restart]);
    }

    struct FailingSink;

    impl EventSink for FailingSink {
        fn record(&mut self, _event: &TrackedEvent) -> SurveyResult<()> {
            whatever!("store unavailable")
        }
    }

    #[test]
    fn failures_do_not_reach_the_caller() {
        let tracker = Tracker::spawn(Box::new(FailingSink));
        tracker.track("u1", EventKind::PageLoad);
        drop(tracker);

        let disabled = Tracker::disabled();
        assert!(!disabled.is_enabled());
        disabled.track("u1", EventKind::PageLoad);
    }
}
