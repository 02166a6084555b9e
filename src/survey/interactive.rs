//! The line-oriented survey behind `partymatch take`.

use std::io::BufRead;

use chrono::DateTime;
use party_match::session::{Session, SessionEvent, Stage};

use crate::survey::identity::{self, UserIdentity};
use crate::survey::state::{load_state, save_state, SavedState};
use crate::survey::tracking::EventKind;
use crate::survey::*;

const HELP: &str = "Commands:
  s        start the survey
  a <n>    agreement with the statement, from 0 (disagree) to 100 (agree)
  i <n>    importance of the topic, from 0 to 100
           (also: agreement <n>, importance <n>)
  n        next question
  p        previous question
  f        see the results (from the last question, or early once enough questions were seen)
  r        restart from scratch
  q        quit, the progress is kept
  ?        this help
";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Start,
    Set(AnswerField, u8),
    Next,
    Previous,
    Finish,
    Restart,
    Quit,
    Help,
    Show,
}

fn parse_command(line: &str) -> Result<Command, String> {
    let mut words = line.split_whitespace();
    let cmd = match words.next() {
        Some(c) => c,
        None => return Ok(Command::Show),
    };
    let value = words.next();
    let field = match cmd {
        "s" => return Ok(Command::Start),
        "n" => return Ok(Command::Next),
        "p" => return Ok(Command::Previous),
        "f" => return Ok(Command::Finish),
        "r" => return Ok(Command::Restart),
        "q" => return Ok(Command::Quit),
        "?" | "h" => return Ok(Command::Help),
        "a" => AnswerField::Agreement,
        "i" => AnswerField::Importance,
        x => x
            .parse::<AnswerField>()
            .map_err(|_| format!("Unknown command {:?}, type ? for help", x))?,
    };
    match value.and_then(|v| v.trim_end_matches('%').parse::<u8>().ok()) {
        Some(v) if v <= MAX_ANSWER_VALUE => Ok(Command::Set(field, v)),
        _ => Err(format!("The {} must be a number between 0 and 100", field)),
    }
}

fn say<W: Write>(out: &mut W, text: &str) -> SurveyResult<()> {
    out.write_all(text.as_bytes()).context(WritingOutputSnafu {})?;
    out.flush().context(WritingOutputSnafu {})
}

fn format_question(session: &Session, policy: &EarlyFinishPolicy) -> String {
    let question = match session.current_question() {
        Some(q) => q,
        None => return String::new(),
    };
    let idx = session.current_index();
    let answer = session.answers().get(idx).cloned().unwrap_or_default();
    let mut s = format!("\nQuestion {}/{}", idx + 1, session.total_questions());
    if !question.category.is_empty() {
        s.push_str(&format!(" [{}]", question.category));
    }
    s.push_str(&format!("\n{}\n", question.text));
    if !question.explanation.is_empty() {
        s.push_str(&format!("  {}\n", question.explanation));
    }
    s.push_str(&format!(
        "agreement: {}%  importance: {}%\n",
        answer.agreement, answer.importance
    ));
    if session.is_last_question() {
        s.push_str("This is the last question: f shows the results.\n");
    } else if session.can_finish_early(policy) {
        s.push_str("You can see the results now with f, or continue.\n");
    }
    s
}

/// Where a run of the survey stands, beyond the session itself.
struct Run<'a> {
    session: Session<'a>,
    identity: UserIdentity,
    started_at: Option<DateTime<Utc>>,
    settings: &'a Settings,
}

impl<'a> Run<'a> {
    fn track(&self, tracker: &Tracker, event: SessionEvent) {
        let kind = EventKind::from_session_event(event, self.started_at, Utc::now());
        tracker.track(&self.identity.user_id, kind);
    }

    fn save(&self) -> SurveyResult<()> {
        let path = match &self.settings.state_path {
            Some(p) => p,
            None => return Ok(()),
        };
        let mut state = SavedState {
            identity: self.identity.clone(),
            answers: Some(self.session.answers().clone()),
            current_question: self.session.current_index(),
        };
        if self.session.stage() != Stage::InProgress {
            state.clear_progress();
        }
        save_state(path, &state)
    }
}

fn open_session<'a>(dataset: &'a Dataset, saved: Option<&SavedState>) -> SurveyResult<Session<'a>> {
    if let Some(SavedState {
        answers: Some(answers),
        current_question,
        ..
    }) = saved
    {
        match Session::restore(dataset, answers.clone(), *current_question) {
            Ok(s) => return Ok(s),
            Err(e) => warn!("The saved progress does not match the survey, starting over: {}", e),
        }
    }
    Session::new(dataset).context(MatchingSnafu {})
}

/// Runs the survey on `input`/`output` until the respondent quits or the input
/// ends. Returns the last results shown, if any.
pub fn run_interactive<R: BufRead, W: Write>(
    dataset: &Dataset,
    settings: &Settings,
    tracker: &Tracker,
    input: R,
    output: &mut W,
) -> SurveyResult<Option<ResultsSummary>> {
    let saved = match &settings.state_path {
        Some(p) => load_state(p)?,
        None => None,
    };
    let identity = identity::resolve(
        saved.as_ref().map(|s| s.identity.clone()),
        Utc::now(),
        settings.session_timeout_hours,
    );
    debug!(
        "run_interactive: user {} tracking enabled: {}",
        identity.user_id,
        tracker.is_enabled()
    );
    tracker.track(&identity.user_id, EventKind::PageLoad);

    let session = open_session(dataset, saved.as_ref())?;
    let mut run = Run {
        session,
        identity,
        started_at: None,
        settings,
    };
    let policy = settings.policy;
    let mut last_summary: Option<ResultsSummary> = None;

    let title = dataset
        .metadata
        .as_ref()
        .and_then(|m| m.title.clone())
        .unwrap_or_else(|| "Survey".to_string());
    say(
        output,
        &format!(
            "{}\n{} questions. Type s to start, ? for help.\n",
            title,
            dataset.questions.len()
        ),
    )?;
    if run.session.stage() == Stage::InProgress {
        say(output, "Resuming where you left off.\n")?;
        say(output, &format_question(&run.session, &policy))?;
    }
    run.save()?;

    for line_r in input.lines() {
        let line = line_r.context(ReadingInputSnafu {})?;
        let command = match parse_command(&line) {
            Ok(c) => c,
            Err(msg) => {
                say(output, &format!("{}\n", msg))?;
                continue;
            }
        };
        debug!("run_interactive: {:?}", command);
        match command {
            Command::Quit => break,
            Command::Help => say(output, HELP)?,
            Command::Show => say(output, &format_question(&run.session, &policy))?,
            Command::Start => {
                if run.session.stage() == Stage::InProgress {
                    say(output, "The survey is already started.\n")?;
                } else {
                    let event = run.session.start();
                    run.started_at = Some(Utc::now());
                    run.track(tracker, event);
                    last_summary = None;
                    say(output, &format_question(&run.session, &policy))?;
                }
            }
            Command::Set(field, value) => match run.session.set_answer(field, value) {
                Ok(event) => {
                    run.track(tracker, event);
                    say(output, &format!("{}: {}%\n", field, value))?;
                }
                Err(e) => say(output, &format!("{}\n", e))?,
            },
            Command::Next => {
                if run.session.next() {
                    say(output, &format_question(&run.session, &policy))?;
                } else if run.session.stage() == Stage::InProgress {
                    say(output, "This is the last question: f shows the results.\n")?;
                } else {
                    say(output, "The survey is not in progress.\n")?;
                }
            }
            Command::Previous => {
                if run.session.previous() {
                    say(output, &format_question(&run.session, &policy))?;
                } else {
                    say(output, "There is no previous question.\n")?;
                }
            }
            Command::Finish => match run.session.finish(&policy) {
                Ok((summary, event)) => {
                    run.track(tracker, event);
                    say(output, &format!("\n{}", format_summary(&summary)))?;
                    say(output, "Type r to take the survey again, q to quit.\n")?;
                    last_summary = Some(summary);
                }
                Err(e) => say(output, &format!("{}\n", e))?,
            },
            Command::Restart => {
                let event = run.session.restart();
                run.started_at = None;
                run.identity = identity::resolve(
                    Some(run.identity.clone()),
                    Utc::now(),
                    settings.session_timeout_hours,
                );
                run.track(tracker, event);
                last_summary = None;
                say(output, "Answers cleared. Type s to start.\n")?;
            }
        }
        run.save()?;
    }
    run.save()?;
    Ok(last_summary)
}
