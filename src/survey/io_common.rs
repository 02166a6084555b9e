use crate::survey::*;

use std::path::Path;

/// An answer as read from a tabular file, before it is checked against the dataset.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ParsedAnswer {
    /// 1-based, as in the files.
    pub question: usize,
    pub agreement: u8,
    pub importance: u8,
}

pub const QUESTION_COLUMN: &str = "question";
pub const AGREEMENT_COLUMN: &str = "agreement";
pub const IMPORTANCE_COLUMN: &str = "importance";

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

/// Places the parsed answers in their slots. The questions that are not
/// mentioned keep the default, unanswered value.
pub fn assemble_answers(parsed: &[ParsedAnswer], num_questions: usize) -> SurveyResult<AnswerSet> {
    let mut answers = AnswerSet::new(num_questions);
    for pa in parsed.iter() {
        let index = pa.question.checked_sub(1).context(InvalidCellSnafu {
            lineno: 0usize,
            column: QUESTION_COLUMN,
            content: pa.question.to_string(),
        })?;
        if answers.get(index).map(|a| a.answered).unwrap_or(false) {
            warn!(
                "assemble_answers: question {} is answered twice, keeping the last answer",
                pa.question
            );
        }
        let answer = Answer::new(pa.agreement, pa.importance).context(MatchingSnafu {})?;
        answers.put(index, answer).context(MatchingSnafu {})?;
    }
    debug!(
        "assemble_answers: {} of {} questions answered",
        answers.answered_in_prefix(num_questions),
        num_questions
    );
    Ok(answers)
}

/// Reads a slider value: an integer between 0 and 100, with an optional
/// trailing percent sign.
pub fn parse_percentage(s: &str) -> Option<u8> {
    let trimmed = s.trim();
    let digits = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
    match digits.parse::<u8>() {
        Ok(x) if x <= party_match::MAX_ANSWER_VALUE => Some(x),
        _ => None,
    }
}

/// Maps the header names to column indices. Header names are not case sensitive.
pub fn find_columns(header: &[String]) -> Option<(usize, usize, usize)> {
    let position = |name: &str| {
        header
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    };
    Some((
        position(QUESTION_COLUMN)?,
        position(AGREEMENT_COLUMN)?,
        position(IMPORTANCE_COLUMN)?,
    ))
}

/// Reads one data row, given the column indices found by [`find_columns`].
pub fn parse_answer_row(
    lineno: usize,
    cells: &[String],
    columns: (usize, usize, usize),
) -> SurveyResult<ParsedAnswer> {
    let (q_idx, a_idx, i_idx) = columns;
    let cell = |col: usize, name: &str| cell_at(cells, col, lineno, name);
    let question_s = cell(q_idx, QUESTION_COLUMN)?;
    let question = question_s
        .parse::<usize>()
        .ok()
        .context(InvalidCellSnafu {
            lineno,
            column: QUESTION_COLUMN,
            content: question_s,
        })?;
    let agreement_s = cell(a_idx, AGREEMENT_COLUMN)?;
    let agreement = parse_percentage(agreement_s).context(InvalidCellSnafu {
        lineno,
        column: AGREEMENT_COLUMN,
        content: agreement_s,
    })?;
    let importance_s = cell(i_idx, IMPORTANCE_COLUMN)?;
    let importance = parse_percentage(importance_s).context(InvalidCellSnafu {
        lineno,
        column: IMPORTANCE_COLUMN,
        content: importance_s,
    })?;
    Ok(ParsedAnswer {
        question,
        agreement,
        importance,
    })
}

fn cell_at<'a>(cells: &'a [String], col: usize, lineno: usize, name: &str) -> SurveyResult<&'a str> {
    cells
        .get(col)
        .map(|s| s.trim())
        .context(MissingColumnSnafu {
            lineno,
            column: name,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentages() {
        assert_eq!(parse_percentage("70"), Some(70));
        assert_eq!(parse_percentage(" 70% "), Some(70));
        assert_eq!(parse_percentage("0"), Some(0));
        assert_eq!(parse_percentage("101"), None);
        assert_eq!(parse_percentage("-1"), None);
        assert_eq!(parse_percentage("high"), None);
    }

    #[test]
    fn columns_in_any_order() {
        let header: Vec<String> = vec!["Importance", "Question", "Agreement"]
            .into_iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(find_columns(&header), Some((1, 2, 0)));
        assert_eq!(find_columns(&header[..2]), None);
    }

    #[test]
    fn assemble_fills_slots() {
        let parsed = vec![
            ParsedAnswer {
                question: 3,
                agreement: 10,
                importance: 90,
            },
            ParsedAnswer {
                question: 1,
                agreement: 100,
                importance: 0,
            },
        ];
        let answers = assemble_answers(&parsed, 4).unwrap();
        assert_eq!(answers.len(), 4);
        assert_eq!(answers.get(0), Some(&Answer::new(100, 0).unwrap()));
        assert_eq!(answers.get(1), Some(&Answer::UNANSWERED));
        assert_eq!(answers.get(2), Some(&Answer::new(10, 90).unwrap()));
        assert_eq!(answers.answered_in_prefix(4), 2);
    }

    #[test]
    fn assemble_rejects_unknown_question() {
        let parsed = vec![ParsedAnswer {
            question: 5,
            agreement: 10,
            importance: 90,
        }];
        assert!(matches!(
            assemble_answers(&parsed, 4),
            Err(SurveyError::Matching {
                source: MatchErrors::QuestionIndexOutOfRange { index: 4, len: 4 }
            })
        ));
        let parsed = vec![ParsedAnswer {
            question: 0,
            agreement: 10,
            importance: 90,
        }];
        assert!(assemble_answers(&parsed, 4).is_err());
    }

    #[test]
    fn rows() {
        let cells: Vec<String> = vec!["40%", " 2", "x"].into_iter().map(|s| s.to_string()).collect();
        assert!(matches!(
            parse_answer_row(4, &cells, (1, 0, 2)),
            Err(SurveyError::InvalidCell { lineno: 4, .. })
        ));
        let cells: Vec<String> = vec!["40%", "2", "100"].into_iter().map(|s| s.to_string()).collect();
        assert_eq!(
            parse_answer_row(4, &cells, (1, 0, 2)).unwrap(),
            ParsedAnswer {
                question: 2,
                agreement: 40,
                importance: 100
            }
        );
        assert!(matches!(
            parse_answer_row(4, &cells, (1, 0, 3)),
            Err(SurveyError::MissingColumn { lineno: 4, .. })
        ));
    }
}
