use std::collections::HashSet;

use chrono::DateTime;

use crate::survey::tracking::EventRow;
use crate::survey::*;

/// A summary of the content of a tracking store.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub total_entries: usize,
    pub unique_users: usize,
    pub page_loads: usize,
    pub surveys_started: usize,
    pub surveys_completed: usize,
    pub early_finishes: usize,
    /// The most recent timestamp, or `Never`.
    pub last_update: String,
    /// Completed over started, as a rounded percentage: `75%`.
    pub completion_rate: String,
}

pub fn compute_stats(path: &str) -> SurveyResult<StoreStats> {
    if !std::path::Path::new(path).exists() {
        info!("The tracking store {:?} does not exist yet", path);
        return Ok(stats_of(&[]));
    }
    let mut rdr = csv::Reader::from_path(path).context(CsvOpenSnafu { path })?;
    let mut rows: Vec<EventRow> = Vec::new();
    for (idx, row_r) in rdr.deserialize().enumerate() {
        let row: EventRow = row_r.context(CsvLineParseSnafu {
            lineno: idx + 2,
            path,
        })?;
        rows.push(row);
    }
    debug!("compute_stats: {} rows in {:?}", rows.len(), path);
    check_timestamps(&rows)?;
    Ok(stats_of(&rows))
}

fn check_timestamps(rows: &[EventRow]) -> SurveyResult<()> {
    for (idx, row) in rows.iter().enumerate() {
        if DateTime::parse_from_rfc3339(&row.timestamp).is_err() {
            return InvalidCellSnafu {
                lineno: idx + 2,
                column: "Timestamp",
                content: row.timestamp.clone(),
            }
            .fail();
        }
    }
    Ok(())
}

fn stats_of(rows: &[EventRow]) -> StoreStats {
    let count = |event_type: &str| rows.iter().filter(|r| r.event_type == event_type).count();
    let surveys_started = count("survey_start");
    let surveys_completed = count("survey_complete");
    let last_update = rows
        .iter()
        .filter_map(|r| DateTime::parse_from_rfc3339(&r.timestamp).ok())
        .map(|t| t.with_timezone(&Utc))
        .max()
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| "Never".to_string());
    let completion_rate = if surveys_started > 0 {
        let pct = (surveys_completed as f64 / surveys_started as f64 * 100.0).round();
        format!("{}%", pct as u64)
    } else {
        "0%".to_string()
    };
    StoreStats {
        total_entries: rows.len(),
        unique_users: rows
            .iter()
            .map(|r| r.user_id.as_str())
            .collect::<HashSet<&str>>()
            .len(),
        page_loads: count("page_load"),
        surveys_started,
        surveys_completed,
        early_finishes: count("survey_early_finish"),
        last_update,
        completion_rate,
    }
}
