use crate::survey::*;

pub fn read_json_value(path: &str) -> SurveyResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
    serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })
}

/// Reads and validates a dataset file.
pub fn read_dataset(path: &str) -> SurveyResult<Dataset> {
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
    let dataset: Dataset =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    dataset.validate().context(MatchingSnafu {})?;
    Ok(dataset)
}

/// Reads a list of answers, one entry per question. `null` entries and missing
/// trailing entries are unanswered questions.
pub fn read_answers(path: &str, num_questions: usize) -> SurveyResult<AnswerSet> {
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
    let entries: Vec<Option<Answer>> =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    if entries.len() > num_questions {
        return Err(SurveyError::Matching {
            source: MatchErrors::AnswerCountMismatch {
                expected: num_questions,
                found: entries.len(),
            },
        });
    }
    let mut answers = AnswerSet::new(num_questions);
    for (idx, entry) in entries.into_iter().enumerate() {
        if let Some(answer) = entry {
            answers.put(idx, answer).context(MatchingSnafu {})?;
        }
    }
    debug!("read_answers: {:?}", answers);
    Ok(answers)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &std::path::Path, content: &str) -> String {
        let p = dir.join("answers.json");
        fs::write(&p, content).unwrap();
        p.display().to_string()
    }

    #[test]
    fn nulls_and_missing_entries_are_unanswered() {
        let dir = tempfile::tempdir().unwrap();
        let p = write(
            dir.path(),
            r#"[null, {"agreement": 20, "importance": 80}, {"agreement": 50, "importance": 50, "answered": false}]"#,
        );
        let answers = read_answers(&p, 4).unwrap();
        assert_eq!(answers.get(0), Some(&Answer::UNANSWERED));
        assert_eq!(answers.get(1), Some(&Answer::new(20, 80).unwrap()));
        assert_eq!(answers.get(2), Some(&Answer::UNANSWERED));
        assert_eq!(answers.get(3), Some(&Answer::UNANSWERED));
        assert_eq!(answers.answered_in_prefix(4), 1);
    }

    #[test]
    fn too_many_answers() {
        let dir = tempfile::tempdir().unwrap();
        let p = write(dir.path(), r#"[null, null, null]"#);
        assert!(matches!(
            read_answers(&p, 2),
            Err(SurveyError::Matching {
                source: MatchErrors::AnswerCountMismatch {
                    expected: 2,
                    found: 3
                }
            })
        ));
    }

    #[test]
    fn values_off_scale() {
        let dir = tempfile::tempdir().unwrap();
        let p = write(dir.path(), r#"[{"agreement": 120, "importance": 10}]"#);
        assert!(read_answers(&p, 1).is_err());
        let p = write(dir.path(), r#"[{"agreement": -1, "importance": 10}]"#);
        assert!(matches!(
            read_answers(&p, 1),
            Err(SurveyError::ParsingJson { .. })
        ));
    }
}
