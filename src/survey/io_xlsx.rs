use calamine::{open_workbook, DataType, Reader, Xlsx};

use crate::survey::{
    io_common::{find_columns, parse_answer_row, simplify_file_name, ParsedAnswer},
    *,
};

/// Reads answers from an Excel file. The layout is the same as for CSV: a header
/// row with `question`, `agreement` and `importance`, then one row per answer.
pub fn read_excel_answers(path: &str, worksheet_name: Option<&str>) -> SurveyResult<Vec<ParsedAnswer>> {
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;
    let wrange = match worksheet_name {
        Some(name) => workbook
            .worksheet_range(name)
            .context(MissingWorksheetSnafu { name, path })?
            .context(OpeningExcelSnafu { path })?,
        None => workbook
            .worksheet_range_at(0)
            .context(MissingWorksheetSnafu { name: "#1", path })?
            .context(OpeningExcelSnafu { path })?,
    };

    let mut rows = wrange.rows();
    let header: Vec<String> = match rows.next() {
        Some(row) => row.iter().map(cell_to_string).collect(),
        None => return Ok(vec![]),
    };
    debug!("read_excel_answers: header: {:?}", header);
    let columns = find_columns(&header).context(MissingColumnSnafu {
        lineno: 1usize,
        column: "question, agreement or importance",
    })?;

    let mut res: Vec<ParsedAnswer> = Vec::new();
    for (idx, row) in rows.enumerate() {
        let lineno = idx + 2;
        if row.iter().all(|c| matches!(c, DataType::Empty)) {
            continue;
        }
        debug!("read_excel_answers: lineno: {:?} row: {:?}", lineno, row);
        let (_, a_idx, i_idx) = columns;
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(col, c)| {
                if col == a_idx || col == i_idx {
                    slider_cell_to_string(c)
                } else {
                    cell_to_string(c)
                }
            })
            .collect();
        res.push(parse_answer_row(lineno, &cells, columns)?);
    }
    info!("Read {} answers from {}", res.len(), simplify_file_name(path));
    Ok(res)
}

// Spreadsheets store whole numbers as floats.
fn cell_to_string(cell: &DataType) -> String {
    match cell {
        DataType::String(s) => s.trim().to_string(),
        DataType::Int(i) => i.to_string(),
        DataType::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        DataType::Float(f) => f.to_string(),
        DataType::Bool(b) => b.to_string(),
        DataType::Empty => "".to_string(),
        x => format!("{:?}", x),
    }
}

// A cell formatted as a percentage holds a fraction: 70% is stored as 0.7.
// 0% and 100% are stored as 0 and 1 and cannot be told apart from plain values.
fn slider_cell_to_string(cell: &DataType) -> String {
    match cell {
        DataType::Float(f) if *f > 0.0 && *f < 1.0 => format!("{}", (f * 100.0).round() as i64),
        x => cell_to_string(x),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_floats_are_integers() {
        assert_eq!(cell_to_string(&DataType::Float(70.0)), "70");
        assert_eq!(cell_to_string(&DataType::Float(70.5)), "70.5");
        assert_eq!(cell_to_string(&DataType::Int(3)), "3");
        assert_eq!(cell_to_string(&DataType::String(" 40% ".to_string())), "40%");
        assert_eq!(cell_to_string(&DataType::Empty), "");
    }

    #[test]
    fn percentage_cells_are_scaled() {
        assert_eq!(slider_cell_to_string(&DataType::Float(0.7)), "70");
        assert_eq!(slider_cell_to_string(&DataType::Float(0.125)), "13");
        assert_eq!(slider_cell_to_string(&DataType::Float(70.0)), "70");
        assert_eq!(slider_cell_to_string(&DataType::Float(1.0)), "1");
        assert_eq!(slider_cell_to_string(&DataType::Int(40)), "40");
        assert_eq!(slider_cell_to_string(&DataType::String("0.7".to_string())), "0.7");
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("answers.xlsx").display().to_string();
        assert!(matches!(
            read_excel_answers(&p, None),
            Err(SurveyError::OpeningExcel { .. })
        ));
    }
}
