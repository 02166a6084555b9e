// Primitives for reading answers from CSV files.

use crate::survey::{
    io_common::{find_columns, parse_answer_row, simplify_file_name, ParsedAnswer},
    *,
};

/// Reads a CSV file with the columns `question`, `agreement` and `importance`
/// (in any order). Empty lines are skipped.
pub fn read_csv_answers(path: &str) -> SurveyResult<Vec<ParsedAnswer>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;

    let mut records = rdr.records();
    let header: Vec<String> = match records.next() {
        Some(line_r) => line_r
            .context(CsvLineParseSnafu { lineno: 1usize, path })?
            .iter()
            .map(|s| s.to_string())
            .collect(),
        None => return Ok(vec![]),
    };
    debug!("read_csv_answers: header: {:?}", header);
    let columns = find_columns(&header).context(MissingColumnSnafu {
        lineno: 1usize,
        column: "question, agreement or importance",
    })?;

    let mut res: Vec<ParsedAnswer> = Vec::new();
    for (idx, line_r) in records.enumerate() {
        // The header is line 1.
        let lineno = idx + 2;
        let line = line_r.context(CsvLineParseSnafu { lineno, path })?;
        if line.iter().all(|s| s.is_empty()) {
            continue;
        }
        let cells: Vec<String> = line.iter().map(|s| s.to_string()).collect();
        let answer = parse_answer_row(lineno, &cells, columns)?;
        debug!("read_csv_answers: lineno: {:?} answer: {:?}", lineno, answer);
        res.push(answer);
    }
    info!("Read {} answers from {}", res.len(), simplify_file_name(path));
    Ok(res)
}
