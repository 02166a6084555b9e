/*!

This is the long-form manual for `party_match` and the `partymatch` command line.

## Matching

Every question carries the position of each party on a scale from 1 to 10. The
respondent answers with two sliders between 0 and 100:
* `agreement`: 0 is strong disagreement, 50 neutral and 100 strong agreement.
* `importance`: how much the topic matters. It is used as a weight.

For each of the first `answered_count` questions and each party that has a
position on it:

```text
distance      = |agreement - 10 * position|
score        += (100 - distance) * importance / 100
max_possible += 100 * importance / 100
```

The match of a party is `round(score / max_possible * 100)`, rounded half away
from zero, or 0 if `max_possible` is 0. A question answered with an importance of
0 is left out of the matching entirely. Parties are sorted by decreasing match;
parties with the same match keep the order of the dataset.

## Dataset format

The dataset is a JSON file:

```json
{
  "metadata": { "title": "Elections 2025", "version": "1.2" },
  "questions": [
    {
      "category": "Economy",
      "question": "Income tax should be flat.",
      "explanation": "A single rate for all incomes.",
      "party_positions": { "lib": 9, "soc": 2 }
    }
  ],
  "parties": [
    { "id": "lib", "name": "Liberals", "description": "", "leader": "", "color": "#ffcc00" },
    { "id": "soc", "name": "Socialists", "description": "", "leader": "", "color": "#cc0000" }
  ]
}
```

A party may be missing from the `party_positions` of a question: that question is
then ignored for this party.

## Answer formats

The following formats are supported by `partymatch score --input-type`:
* `json` (default) a list with one entry per question. `null` is a question that
  was skipped, otherwise `{"agreement": 70, "importance": 100}`.
* `csv` a header line, then one line per answered question with the columns
  `question` (starting at 1), `agreement` and `importance`.
* `xlsx` the same columns as `csv`, in the first worksheet of an Excel file (or
  in the worksheet given by `--excel-worksheet-name`). Cells formatted as
  percentages are read as such (`70%` is 70), except `0%` and `100%` which Excel
  stores as 0 and 1: write plain integers from 0 to 100 to be safe.

Questions that do not appear in the input keep the neutral default answer.

## Configuration

`--config` points to a JSON file. All the keys are optional, and paths are
relative to the configuration file:

```json
{
  "datasetPath": "dataset.json",
  "trackingStore": "events.csv",
  "statePath": "state.json",
  "earlyFinishMinQuestions": 10,
  "representativeAnswers": 5,
  "sessionTimeoutHours": 4
}
```

The command line options take precedence over the configuration file.

## Tracking

When a tracking store is configured, `partymatch take` records the following
events: `page_load`, `survey_start`, `question_answer`, `survey_complete`,
`survey_early_finish` and `restart`. The store is a CSV file with one line per
event. Recording happens in the background: a failure to write is logged and
otherwise ignored. `partymatch stats` summarizes a store.

*/
