use crate::config::check_position;
pub use crate::config::*;

/// A builder for assembling a dataset in code.
///
/// The datasets read from files do not need it. It is convenient for tests and for
/// programs that generate their questions.
///
/// ```
/// pub use party_match::builder::DatasetBuilder;
/// # use party_match::MatchErrors;
///
/// let mut builder = DatasetBuilder::new()
///     .parties(&["Greens".to_string(), "Liberals".to_string()])?;
///
/// builder.add_question_simple(
///     "Public transport should be free.",
///     &[("Greens".to_string(), 9.0), ("Liberals".to_string(), 2.0)],
/// )?;
///
/// let dataset = builder.build()?;
/// assert_eq!(dataset.questions.len(), 1);
///
/// # Ok::<(), MatchErrors>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct DatasetBuilder {
    pub(crate) _metadata: Option<Metadata>,
    pub(crate) _parties: Vec<Party>,
    pub(crate) _questions: Vec<Question>,
}

impl DatasetBuilder {
    pub fn new() -> DatasetBuilder {
        DatasetBuilder::default()
    }

    /// Replaces the parties with bare parties named after their identifiers.
    pub fn parties(self, ids: &[String]) -> Result<DatasetBuilder, MatchErrors> {
        let mut builder = DatasetBuilder {
            _metadata: self._metadata,
            _parties: Vec::new(),
            _questions: self._questions,
        };
        for id in ids {
            builder.add_party(Party::with_id(id))?;
        }
        Ok(builder)
    }

    pub fn metadata(self, metadata: Metadata) -> DatasetBuilder {
        DatasetBuilder {
            _metadata: Some(metadata),
            ..self
        }
    }

    pub fn add_party(&mut self, party: Party) -> Result<(), MatchErrors> {
        if self._parties.iter().any(|p| p.id == party.id) {
            return Err(MatchErrors::DuplicateParty(party.id));
        }
        self._parties.push(party);
        Ok(())
    }

    /// Adds a question that only has a statement and the positions of the parties.
    pub fn add_question_simple(
        &mut self,
        text: &str,
        positions: &[(String, f64)],
    ) -> Result<(), MatchErrors> {
        self.add_question(Question {
            category: String::new(),
            text: text.to_string(),
            explanation: String::new(),
            party_positions: positions.iter().cloned().collect(),
        })
    }

    /// Adds a question at the end of the sequence.
    ///
    /// The positions must be on the 1-10 scale. They may refer to parties that are
    /// added later.
    pub fn add_question(&mut self, question: Question) -> Result<(), MatchErrors> {
        let idx = self._questions.len();
        for (party_id, position) in question.party_positions.iter() {
            check_position(idx, party_id, *position)?;
        }
        self._questions.push(question);
        Ok(())
    }

    pub fn build(self) -> Result<Dataset, MatchErrors> {
        let dataset = Dataset {
            metadata: self._metadata,
            questions: self._questions,
            parties: self._parties,
        };
        dataset.validate()?;
        Ok(dataset)
    }
}
