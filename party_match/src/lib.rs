mod config;
use log::{debug, info};

pub mod builder;
pub mod manual;
pub mod quick_start;
pub mod session;

pub use crate::config::*;

// A party position of 1-10 is compared to an agreement of 0-100.
const POSITION_SCALE_FACTOR: f64 = 10.0;
const MAX_DISTANCE: f64 = 100.0;

/// Matches the answers of a respondent against the parties of the dataset.
///
/// Arguments:
/// * `dataset` the questions and parties
/// * `answers` the current answers, one slot per question
/// * `answered_count` how many leading questions take part in the matching. This
///   is what allows showing results before the end of the survey.
///
/// The result contains every party, sorted by decreasing percentage. Parties with
/// the same percentage keep the order of the dataset.
///
/// ```
/// use party_match::builder::DatasetBuilder;
/// use party_match::{compute_matches, Answer, AnswerSet};
/// # use party_match::MatchErrors;
///
/// let mut builder = DatasetBuilder::new().parties(&["A".to_string(), "B".to_string()])?;
/// builder.add_question_simple("Lower taxes", &[("A".to_string(), 10.0), ("B".to_string(), 1.0)])?;
/// let dataset = builder.build()?;
///
/// let answers = AnswerSet::from_answers(vec![Answer::new(100, 100)?])?;
/// let results = compute_matches(&dataset, &answers, 1)?;
/// assert_eq!(results[0].party.id, "A");
/// assert_eq!(results[0].percentage, 100);
/// assert_eq!(results[1].percentage, 10);
/// # Ok::<(), MatchErrors>(())
/// ```
pub fn compute_matches(
    dataset: &Dataset,
    answers: &AnswerSet,
    answered_count: usize,
) -> Result<Vec<MatchResult>, MatchErrors> {
    let tallies = accumulate(dataset, answers, answered_count)?;
    let mut results: Vec<MatchResult> = dataset
        .parties
        .iter()
        .zip(tallies.iter())
        .map(|(party, tally)| MatchResult {
            party: party.clone(),
            percentage: tally.score.percentage(),
        })
        .collect();
    // The sort is stable: ties stay in dataset order.
    results.sort_by(|a, b| b.percentage.cmp(&a.percentage));
    for (rank, r) in results.iter().enumerate() {
        debug!(
            "compute_matches: {:>2}. {} {}%",
            rank + 1,
            r.party.name,
            r.percentage
        );
    }
    Ok(results)
}

/// The raw accumulators of every party, in dataset order, for the first
/// `answered_count` questions.
pub fn accumulate(
    dataset: &Dataset,
    answers: &AnswerSet,
    answered_count: usize,
) -> Result<Vec<PartyTally>, MatchErrors> {
    checks(dataset, answers, answered_count)?;
    info!(
        "Matching {} of {} questions against {} parties",
        answered_count,
        dataset.questions.len(),
        dataset.parties.len()
    );

    let mut scores: Vec<Score> = vec![Score::EMPTY; dataset.parties.len()];
    for (question, answer) in dataset
        .questions
        .iter()
        .zip(answers.iter())
        .take(answered_count)
    {
        for (acc, s) in scores.iter_mut().zip(contribution(dataset, question, answer)) {
            *acc += s;
        }
    }

    Ok(dataset
        .parties
        .iter()
        .zip(scores)
        .map(|(p, score)| PartyTally {
            party_id: p.id.clone(),
            score,
        })
        .collect())
}

/// What a single answered question adds to each party, in dataset order.
///
/// A party without a position on the question gets an empty score.
pub fn question_contribution(
    dataset: &Dataset,
    question: &Question,
    answer: &Answer,
) -> Vec<PartyTally> {
    dataset
        .parties
        .iter()
        .zip(contribution(dataset, question, answer))
        .map(|(p, score)| PartyTally {
            party_id: p.id.clone(),
            score,
        })
        .collect()
}

/// The share of the questions that have been gone through, in percent.
pub fn completion_rate(answered_count: usize, total_questions: usize) -> u32 {
    if total_questions == 0 {
        return 0;
    }
    (answered_count as f64 / total_questions as f64 * 100.0).round() as u32
}

fn contribution(dataset: &Dataset, question: &Question, answer: &Answer) -> Vec<Score> {
    let importance_weight = answer.importance as f64 / 100.0;
    let agreement = answer.agreement as f64;
    dataset
        .parties
        .iter()
        .map(|p| match question.party_positions.get(&p.id) {
            Some(raw_position) => {
                let distance = (agreement - raw_position * POSITION_SCALE_FACTOR).abs();
                Score {
                    total: (MAX_DISTANCE - distance) * importance_weight,
                    max_possible: MAX_DISTANCE * importance_weight,
                }
            }
            None => Score::EMPTY,
        })
        .collect()
}

fn checks(dataset: &Dataset, answers: &AnswerSet, answered_count: usize) -> Result<(), MatchErrors> {
    dataset.validate()?;
    if answered_count > answers.len() || answered_count > dataset.questions.len() {
        return Err(MatchErrors::AnsweredCountOutOfRange {
            answered_count,
            answers: answers.len(),
            questions: dataset.questions.len(),
        });
    }
    for a in answers.iter().take(answered_count) {
        a.check()?;
    }
    let unknown = dataset.unknown_party_ids();
    if !unknown.is_empty() {
        debug!("checks: positions for unknown parties are ignored: {:?}", unknown);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::builder::DatasetBuilder;
    use super::*;
    use proptest::prelude::*;

    fn two_parties() -> DatasetBuilder {
        match DatasetBuilder::new().parties(&["A".to_string(), "B".to_string()]) {
            Ok(b) => b,
            Err(e) => panic!("builder failed: {}", e),
        }
    }

    fn positions(ps: &[(&str, f64)]) -> Vec<(String, f64)> {
        ps.iter().map(|(id, p)| (id.to_string(), *p)).collect()
    }

    fn percentages(results: &[MatchResult]) -> Vec<(String, u32)> {
        results
            .iter()
            .map(|r| (r.party.id.clone(), r.percentage))
            .collect()
    }

    #[test]
    fn full_importance_single_question() {
        let mut b = two_parties();
        b.add_question_simple("q", &positions(&[("A", 10.0), ("B", 1.0)]))
            .unwrap();
        let dataset = b.build().unwrap();
        let answers = AnswerSet::from_answers(vec![Answer::new(100, 100).unwrap()]).unwrap();

        let res = compute_matches(&dataset, &answers, 1).unwrap();
        assert_eq!(
            percentages(&res),
            vec![("A".to_string(), 100), ("B".to_string(), 10)]
        );
    }

    #[test]
    fn zero_importance_gives_zero() {
        let mut b = two_parties();
        b.add_question_simple("q", &positions(&[("A", 10.0), ("B", 1.0)]))
            .unwrap();
        let dataset = b.build().unwrap();
        let answers = AnswerSet::from_answers(vec![Answer::new(50, 0).unwrap()]).unwrap();

        let res = compute_matches(&dataset, &answers, 1).unwrap();
        assert_eq!(
            percentages(&res),
            vec![("A".to_string(), 0), ("B".to_string(), 0)]
        );
    }

    #[test]
    fn missing_position_only_counts_covered_questions() {
        let mut b = two_parties();
        b.add_question_simple("q1", &positions(&[("A", 5.0), ("B", 5.0)]))
            .unwrap();
        b.add_question_simple("q2", &positions(&[("A", 1.0)]))
            .unwrap();
        let dataset = b.build().unwrap();
        let answers = AnswerSet::from_answers(vec![
            Answer::new(50, 100).unwrap(),
            Answer::new(100, 100).unwrap(),
        ])
        .unwrap();

        let tallies = accumulate(&dataset, &answers, 2).unwrap();
        assert_eq!(tallies[1].party_id, "B");
        assert_eq!(
            tallies[1].score,
            Score {
                total: 100.0,
                max_possible: 100.0
            }
        );
        // A: 100 on q1, 10 on q2.
        assert_eq!(
            tallies[0].score,
            Score {
                total: 110.0,
                max_possible: 200.0
            }
        );

        let res = compute_matches(&dataset, &answers, 2).unwrap();
        assert_eq!(
            percentages(&res),
            vec![("B".to_string(), 100), ("A".to_string(), 55)]
        );
    }

    #[test]
    fn no_answered_question_gives_zero() {
        let mut b = two_parties();
        b.add_question_simple("q", &positions(&[("A", 3.0), ("B", 7.0)]))
            .unwrap();
        let dataset = b.build().unwrap();
        let answers = AnswerSet::new(1);

        let res = compute_matches(&dataset, &answers, 0).unwrap();
        assert!(res.iter().all(|r| r.percentage == 0));
        assert_eq!(res[0].party.id, "A");
    }

    #[test]
    fn rounds_half_away_from_zero() {
        // A is at 0.5 distance units: total 87.5 of 100.
        let mut b = two_parties();
        b.add_question_simple("q", &positions(&[("A", 3.75), ("B", 5.0)]))
            .unwrap();
        let dataset = b.build().unwrap();
        let answers = AnswerSet::from_answers(vec![Answer::new(25, 100).unwrap()]).unwrap();

        let res = compute_matches(&dataset, &answers, 1).unwrap();
        assert_eq!(
            percentages(&res),
            vec![("A".to_string(), 88), ("B".to_string(), 75)]
        );
    }

    #[test]
    fn unknown_parties_are_skipped() {
        let mut b = two_parties();
        b.add_question_simple("q", &positions(&[("A", 10.0), ("Z", 1.0)]))
            .unwrap();
        let dataset = b.build().unwrap();
        let answers = AnswerSet::from_answers(vec![Answer::new(100, 100).unwrap()]).unwrap();

        let res = compute_matches(&dataset, &answers, 1).unwrap();
        assert_eq!(res.len(), 2);
        assert_eq!(
            percentages(&res),
            vec![("A".to_string(), 100), ("B".to_string(), 0)]
        );
        assert_eq!(dataset.unknown_party_ids(), vec!["Z".to_string()]);
    }

    #[test]
    fn answered_count_out_of_range_fails() {
        let mut b = two_parties();
        b.add_question_simple("q", &positions(&[("A", 10.0)]))
            .unwrap();
        let dataset = b.build().unwrap();

        let res = compute_matches(&dataset, &AnswerSet::new(1), 2);
        assert_eq!(
            res,
            Err(MatchErrors::AnsweredCountOutOfRange {
                answered_count: 2,
                answers: 1,
                questions: 1
            })
        );
        // Fewer answers than questions is also a violation.
        let res = compute_matches(&dataset, &AnswerSet::new(0), 1);
        assert!(matches!(
            res,
            Err(MatchErrors::AnsweredCountOutOfRange { .. })
        ));
    }

    #[test]
    fn empty_dataset_fails() {
        let dataset = Dataset {
            metadata: None,
            questions: vec![],
            parties: vec![],
        };
        assert_eq!(
            compute_matches(&dataset, &AnswerSet::new(0), 0),
            Err(MatchErrors::EmptyDataset)
        );
    }

    #[test]
    fn out_of_scale_answer_fails() {
        let mut b = two_parties();
        b.add_question_simple("q", &positions(&[("A", 10.0)]))
            .unwrap();
        let dataset = b.build().unwrap();
        let answers = AnswerSet(vec![Answer {
            agreement: 101,
            importance: 50,
            answered: true,
        }]);
        assert_eq!(
            compute_matches(&dataset, &answers, 1),
            Err(MatchErrors::ValueOutOfScale {
                field: AnswerField::Agreement,
                value: 101
            })
        );
    }

    #[test]
    fn completion_rate_rounds() {
        assert_eq!(completion_rate(0, 0), 0);
        assert_eq!(completion_rate(1, 3), 33);
        assert_eq!(completion_rate(2, 3), 67);
        assert_eq!(completion_rate(1, 8), 13);
        assert_eq!(completion_rate(40, 40), 100);
    }

    #[test]
    fn results_serialize_with_party() {
        let r = MatchResult {
            party: Party::with_id("A"),
            percentage: 42,
        };
        let js = serde_json::to_value(&r).unwrap();
        assert_eq!(js["party"]["id"], "A");
        assert_eq!(js["percentage"], 42);
    }

    // ********* Properties **********

    // Positions of every party on every question (None = not covered) and the answers.
    fn dataset_and_answers() -> impl Strategy<Value = (Dataset, AnswerSet)> {
        (1usize..6, 0usize..10).prop_flat_map(|(num_parties, num_questions)| {
            (
                prop::collection::vec(
                    prop::collection::vec(prop::option::of(1u8..=10), num_parties),
                    num_questions,
                ),
                prop::collection::vec((0u8..=100, 0u8..=100), num_questions),
            )
                .prop_map(|(grid, raw_answers)| build(&grid, &raw_answers))
        })
    }

    fn build(grid: &[Vec<Option<u8>>], raw_answers: &[(u8, u8)]) -> (Dataset, AnswerSet) {
        let num_parties = grid.first().map(|row| row.len()).unwrap_or(1);
        let ids: Vec<String> = (0..num_parties).map(|i| format!("P{}", i)).collect();
        let mut b = DatasetBuilder::new().parties(&ids).unwrap();
        for (qidx, row) in grid.iter().enumerate() {
            let ps: Vec<(String, f64)> = row
                .iter()
                .zip(ids.iter())
                .filter_map(|(p, id)| p.map(|x| (id.clone(), x as f64)))
                .collect();
            b.add_question_simple(&format!("q{}", qidx), &ps).unwrap();
        }
        let answers: Vec<Answer> = raw_answers
            .iter()
            .map(|(a, i)| Answer::new(*a, *i).unwrap())
            .collect();
        (b.build().unwrap(), AnswerSet::from_answers(answers).unwrap())
    }

    proptest! {
        #[test]
        fn nothing_answered_means_zero((dataset, answers) in dataset_and_answers()) {
            let res = compute_matches(&dataset, &answers, 0).unwrap();
            prop_assert_eq!(res.len(), dataset.parties.len());
            prop_assert!(res.iter().all(|r| r.percentage == 0));
        }

        #[test]
        fn zero_importance_everywhere_means_zero((dataset, answers) in dataset_and_answers()) {
            let muted: Vec<Answer> = answers
                .iter()
                .map(|a| Answer { importance: 0, ..*a })
                .collect();
            let muted = AnswerSet::from_answers(muted).unwrap();
            let res = compute_matches(&dataset, &muted, muted.len()).unwrap();
            prop_assert!(res.iter().all(|r| r.percentage == 0));
        }

        #[test]
        fn exact_agreement_means_full_match(
            grid in prop::collection::vec(prop::collection::vec(1u8..=10, 3), 1..10),
            importances in prop::collection::vec(1u8..=100, 10),
        ) {
            let grid: Vec<Vec<Option<u8>>> = grid
                .iter()
                .map(|row| row.iter().map(|x| Some(*x)).collect())
                .collect();
            // The respondent agrees exactly with party P1 on every question.
            let raw_answers: Vec<(u8, u8)> = grid
                .iter()
                .zip(importances.iter())
                .map(|(row, imp)| (row[1].unwrap() * 10, *imp))
                .collect();
            let (dataset, answers) = build(&grid, &raw_answers);
            let tallies = accumulate(&dataset, &answers, answers.len()).unwrap();
            prop_assert_eq!(tallies[1].score.percentage(), 100);
        }

        #[test]
        fn idempotent((dataset, answers) in dataset_and_answers()) {
            let first = compute_matches(&dataset, &answers, answers.len()).unwrap();
            let second = compute_matches(&dataset, &answers, answers.len()).unwrap();
            prop_assert_eq!(first, second);
        }

        #[test]
        fn extension_adds_exactly_one_contribution((dataset, answers) in dataset_and_answers()) {
            for k in 0..answers.len() {
                let before = accumulate(&dataset, &answers, k).unwrap();
                let after = accumulate(&dataset, &answers, k + 1).unwrap();
                let added = question_contribution(&dataset, &dataset.questions[k], &answers.as_slice()[k]);
                for ((b, a), c) in before.iter().zip(after.iter()).zip(added.iter()) {
                    prop_assert_eq!(&b.party_id, &a.party_id);
                    prop_assert_eq!(b.score + c.score, a.score);
                }
            }
        }

        #[test]
        fn sorted_with_stable_ties((dataset, answers) in dataset_and_answers()) {
            let res = compute_matches(&dataset, &answers, answers.len()).unwrap();
            let order = |id: &str| dataset.parties.iter().position(|p| p.id == id).unwrap();
            for w in res.windows(2) {
                prop_assert!(w[0].percentage >= w[1].percentage);
                if w[0].percentage == w[1].percentage {
                    prop_assert!(order(&w[0].party.id) < order(&w[1].party.id));
                }
            }
        }

        #[test]
        fn percentages_in_range((dataset, answers) in dataset_and_answers()) {
            let res = compute_matches(&dataset, &answers, answers.len()).unwrap();
            prop_assert!(res.iter().all(|r| r.percentage <= 100));
        }
    }
}
