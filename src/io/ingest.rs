//! CSV ingest and column resolution.
//!
//! This module turns a small numeric table into `(t, x, y)` observations.
//!
//! Design goals:
//! - **One policy function** decides which columns mean what (`resolve_layout`)
//! - **Strict rows**: a bad cell or ragged row fails the whole load with its line
//! - **Deterministic behavior**: row order is preserved, nothing is reordered
//! - **Separation of concerns**: no fitting logic here

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use tracing::info;

use crate::domain::{DatasetStats, FALLBACK_T_RANGE, Observations, TimeSource};
use crate::error::DataError;
use crate::math::lin_space;

/// Which column indices feed `t`, `x` and `y`.
///
/// `t` is `None` when the time axis is synthesized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    pub t: Option<usize>,
    pub x: usize,
    pub y: usize,
    pub time_source: TimeSource,
}

/// Ingest output: observations + the headers and layout that produced them.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub observations: Observations,
    pub headers: Vec<String>,
    pub layout: ColumnLayout,
    pub stats: DatasetStats,
}

/// Load observations from a CSV file.
pub fn load_observations(path: &Path) -> Result<IngestedData, DataError> {
    let file = File::open(path)
        .map_err(|e| DataError::Format(format!("failed to open '{}': {e}", path.display())))?;
    parse_observations(file)
}

/// Parse observations from any CSV source.
pub fn parse_observations<R: Read>(source: R) -> Result<IngestedData, DataError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| DataError::Format(format!("failed to read header row: {e}")))?
        .iter()
        .map(normalize_header_name)
        .collect();

    if headers.is_empty() {
        return Err(DataError::Format("input has no header row".to_string()));
    }

    info!(columns = ?headers, "loaded data columns");
    let layout = resolve_layout(&headers)?;

    let mut t = Vec::new();
    let mut x = Vec::new();
    let mut y = Vec::new();

    for result in reader.records() {
        let record = result.map_err(|e| DataError::Format(format!("CSV parse error: {e}")))?;
        let line = record.position().map_or(0, |p| p.line());

        if let Some(t_idx) = layout.t {
            t.push(parse_cell(&record, t_idx, &headers, line)?);
        }
        x.push(parse_cell(&record, layout.x, &headers, line)?);
        y.push(parse_cell(&record, layout.y, &headers, line)?);
    }

    if x.is_empty() {
        return Err(DataError::Format("input has no data rows".to_string()));
    }

    if layout.t.is_none() {
        let (lo, hi) = FALLBACK_T_RANGE;
        t = lin_space(lo, hi, x.len());
        info!(
            n = x.len(),
            "no `t` column found, assuming uniform t in [{lo}, {hi}]"
        );
    }

    let observations = Observations::new(t, x, y, layout.time_source);
    let stats = compute_stats(&observations)
        .ok_or_else(|| DataError::Format("input has no data rows".to_string()))?;

    Ok(IngestedData {
        observations,
        headers,
        layout,
        stats,
    })
}

/// Decide which columns hold `t`, `x` and `y`.
///
/// Fewer than two columns is always `InsufficientColumns`, whatever the
/// header says. Otherwise, in priority order:
/// 1. a column literally named `t`, paired with the columns named `x` and `y`
/// 2. three or more columns: the first three, positionally, as `(t, x, y)`
/// 3. exactly two columns: `(x, y)` positionally, `t` synthesized later
pub fn resolve_layout(headers: &[String]) -> Result<ColumnLayout, DataError> {
    if headers.len() < 2 {
        return Err(DataError::InsufficientColumns { found: headers.len() });
    }

    let position = |name: &str| headers.iter().position(|h| h == name);

    if let Some(t) = position("t") {
        let x = position("x").ok_or_else(|| {
            DataError::Format("column `t` found but no column named `x`".to_string())
        })?;
        let y = position("y").ok_or_else(|| {
            DataError::Format("column `t` found but no column named `y`".to_string())
        })?;
        return Ok(ColumnLayout {
            t: Some(t),
            x,
            y,
            time_source: TimeSource::Named,
        });
    }

    if headers.len() >= 3 {
        Ok(ColumnLayout {
            t: Some(0),
            x: 1,
            y: 2,
            time_source: TimeSource::Positional,
        })
    } else {
        Ok(ColumnLayout {
            t: None,
            x: 0,
            y: 1,
            time_source: TimeSource::Synthesized,
        })
    }
}

fn normalize_header_name(name: &str) -> String {
    // Excel and other tools sometimes emit UTF-8 CSVs with a BOM prefix on the
    // first header. If we don't strip it, a leading `t` column is missed.
    name.trim().trim_start_matches('\u{feff}').to_string()
}

fn parse_cell(record: &StringRecord, idx: usize, headers: &[String], line: u64) -> Result<f64, DataError> {
    let column = headers.get(idx).map_or("?", String::as_str);
    let raw = record
        .get(idx)
        .ok_or_else(|| DataError::Format(format!("line {line}: missing value for `{column}`")))?;
    raw.parse::<f64>().map_err(|_| {
        DataError::Format(format!(
            "line {line}: invalid number '{raw}' in column `{column}`"
        ))
    })
}

fn compute_stats(obs: &Observations) -> Option<DatasetStats> {
    if obs.is_empty() {
        return None;
    }

    let range = |v: &[f64]| {
        v.iter()
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
    };
    let (t_min, t_max) = range(&obs.t);
    let (x_min, x_max) = range(&obs.x);
    let (y_min, y_max) = range(&obs.y);

    Some(DatasetStats {
        n_points: obs.len(),
        t_min,
        t_max,
        x_min,
        x_max,
        y_min,
        y_max,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[derive(Clone, Default)]
    struct CapturedLog(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Run `f` under a thread-local fmt subscriber and return what it logged.
    fn logged_during<T>(f: impl FnOnce() -> T) -> (T, String) {
        let log = CapturedLog::default();
        let writer = log.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let out = tracing::subscriber::with_default(subscriber, f);
        let text = String::from_utf8(log.0.lock().unwrap().clone()).unwrap();
        (out, text)
    }

    #[test]
    fn named_t_column_wins_over_position() {
        let layout = resolve_layout(&headers(&["y", "x", "t", "extra"])).unwrap();
        assert_eq!(layout.t, Some(2));
        assert_eq!(layout.x, 1);
        assert_eq!(layout.y, 0);
        assert_eq!(layout.time_source, TimeSource::Named);
    }

    #[test]
    fn three_unnamed_columns_are_positional() {
        let layout = resolve_layout(&headers(&["time", "a", "b"])).unwrap();
        assert_eq!(layout.t, Some(0));
        assert_eq!((layout.x, layout.y), (1, 2));
        assert_eq!(layout.time_source, TimeSource::Positional);
    }

    #[test]
    fn two_columns_synthesize_time() {
        let layout = resolve_layout(&headers(&["x", "y"])).unwrap();
        assert_eq!(layout.t, None);
        assert_eq!(layout.time_source, TimeSource::Synthesized);
    }

    #[test]
    fn one_column_is_insufficient() {
        let err = resolve_layout(&headers(&["x"])).unwrap_err();
        assert_eq!(err, DataError::InsufficientColumns { found: 1 });
    }

    #[test]
    fn lone_t_column_is_insufficient_not_malformed() {
        let err = resolve_layout(&headers(&["t"])).unwrap_err();
        assert_eq!(err, DataError::InsufficientColumns { found: 1 });
        assert_eq!(
            parse_observations("t\n1\n2\n".as_bytes()).unwrap_err(),
            DataError::InsufficientColumns { found: 1 }
        );
    }

    #[test]
    fn named_t_without_xy_is_a_format_error() {
        let err = resolve_layout(&headers(&["t", "a", "b"])).unwrap_err();
        assert!(matches!(err, DataError::Format(_)));
    }

    #[test]
    fn parses_three_columns_in_row_order() {
        let csv = "t,x,y\n9.0,1.5,2.5\n6.0,0.5,1.0\n7.5,3.0,4.0\n";
        let data = parse_observations(csv.as_bytes()).unwrap();
        let obs = &data.observations;
        assert_eq!(obs.t, vec![9.0, 6.0, 7.5]);
        assert_eq!(obs.x, vec![1.5, 0.5, 3.0]);
        assert_eq!(obs.y, vec![2.5, 1.0, 4.0]);
        assert_eq!(data.stats.n_points, 3);
        assert_eq!(data.stats.t_min, 6.0);
        assert_eq!(data.stats.t_max, 9.0);
    }

    #[test]
    fn strips_bom_from_first_header() {
        let csv = "\u{feff}t,x,y\n1,2,3\n";
        let data = parse_observations(csv.as_bytes()).unwrap();
        assert_eq!(data.layout.time_source, TimeSource::Named);
    }

    #[test]
    fn two_columns_get_uniform_time_over_fallback_range() {
        let mut csv = String::from("x,y\n");
        for i in 0..20 {
            csv.push_str(&format!("{i},{}\n", i * 2));
        }
        let data = parse_observations(csv.as_bytes()).unwrap();
        let t = &data.observations.t;
        assert_eq!(t.len(), 20);
        assert_eq!(t[0], 6.0);
        assert_eq!(t[19], 60.0);
        assert!(t.windows(2).all(|w| w[1] > w[0]));
        assert_eq!(data.observations.time_source, TimeSource::Synthesized);
    }

    #[test]
    fn bad_cell_reports_line() {
        let csv = "t,x,y\n1,2,3\n4,oops,6\n";
        match parse_observations(csv.as_bytes()).unwrap_err() {
            DataError::Format(msg) => {
                assert!(msg.contains("line 3"), "{msg}");
                assert!(msg.contains("oops"), "{msg}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn ragged_row_is_a_format_error() {
        let csv = "t,x,y\n1,2,3\n4,5\n";
        assert!(matches!(
            parse_observations(csv.as_bytes()),
            Err(DataError::Format(_))
        ));
    }

    #[test]
    fn header_only_is_a_format_error() {
        assert!(matches!(
            parse_observations("t,x,y\n".as_bytes()),
            Err(DataError::Format(_))
        ));
    }

    #[test]
    fn single_column_fails_with_insufficient_columns() {
        let csv = "x\n1\n2\n";
        assert_eq!(
            parse_observations(csv.as_bytes()).unwrap_err(),
            DataError::InsufficientColumns { found: 1 }
        );
    }

    #[test]
    fn fallback_notice_is_logged_only_when_time_is_synthesized() {
        const NOTICE: &str = "no `t` column found, assuming uniform t in [6, 60]";

        let (two, log) = logged_during(|| parse_observations("x,y\n1,2\n3,4\n".as_bytes()));
        assert_eq!(two.unwrap().layout.time_source, TimeSource::Synthesized);
        assert!(log.contains(NOTICE), "{log}");
        assert!(log.contains("n=2"), "{log}");

        let (three, log) = logged_during(|| parse_observations("t,x,y\n6,1,2\n7,3,4\n".as_bytes()));
        assert_eq!(three.unwrap().layout.time_source, TimeSource::Named);
        assert!(log.contains("loaded data columns"), "{log}");
        assert!(!log.contains("no `t` column"), "{log}");

        let (positional, log) = logged_during(|| parse_observations("a,b,c\n6,1,2\n".as_bytes()));
        assert_eq!(positional.unwrap().layout.time_source, TimeSource::Positional);
        assert!(!log.contains("no `t` column"), "{log}");
    }
}
