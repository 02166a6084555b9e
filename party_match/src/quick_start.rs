/*!

# Quick start

This walks through a small survey end to end: writing the dataset, taking the
survey in a terminal, scoring answers collected elsewhere and looking at the
tracked events.

**The dataset** Write the questions and the parties in `dataset.json`. The
position of a party is between 1 (strongly against the statement) and 10
(strongly for it):

```json
{
  "metadata": { "title": "Town council 2025", "version": "1" },
  "questions": [
    { "category": "Transport", "question": "Buses should be free.", "explanation": "",
      "party_positions": { "green": 9, "civic": 3 } },
    { "category": "Housing", "question": "The town should build social housing.", "explanation": "",
      "party_positions": { "green": 8, "civic": 6 } }
  ],
  "parties": [
    { "id": "green", "name": "Greens", "leader": "A. Moss" },
    { "id": "civic", "name": "Civic List", "leader": "B. Stone" }
  ]
}
```

**Taking the survey** Run:

```bash
partymatch --dataset dataset.json take --track events.csv --state state.json
```

Type `s` to start, then `a 80` and `i 100` to set the agreement and the
importance of the current question, `n` to move on and `f` to see the results.
Quitting with `q` keeps the progress in `state.json` for the next run.

**Scoring a file** Answers gathered with a form can be scored directly. With a
CSV file such as:

```text
question,agreement,importance
1,90,100
2,40,50
```

run:

```bash
partymatch --dataset dataset.json score --input answers.csv --input-type csv --out stdout
```

The same file can be given as a reference later with `--reference`, to check
that the results did not change.

**Statistics** Every run of `take` with `--track` appends events to the store.
They are summarized with:

```bash
partymatch stats --store events.csv
```

The same scoring is available from Rust:

```
use party_match::builder::DatasetBuilder;
use party_match::{compute_matches, Answer, AnswerSet};
# use party_match::MatchErrors;

let mut builder = DatasetBuilder::new().parties(&["green".to_string(), "civic".to_string()])?;
builder.add_question_simple(
    "Buses should be free.",
    &[("green".to_string(), 9.0), ("civic".to_string(), 3.0)],
)?;
let dataset = builder.build()?;
let answers = AnswerSet::from_answers(vec![Answer::new(90, 100)?])?;
let results = compute_matches(&dataset, &answers, 1)?;
assert_eq!(results[0].party.id, "green");
# Ok::<(), MatchErrors>(())
```

*/
