//! Reading inputs and writing run artifacts.
//!
//! Contour files are plain `x r` rows. Results go into one run directory
//! per design run: JSON laminate snapshots, comma separated tables and
//! `key: value` reports.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{DesignError, DesignResult};

/// Laminate state after one design iteration. A snapshot can be fed back
/// as the initial stack of a new run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub iteration: usize,
    pub angles_shifts: Vec<(f64, f64)>,
    /// largest exposure of the evaluated laminate, absent after a failure
    pub puck_max: Option<f64>,
    pub criterion: String,
    pub burst_pressure: f64,
    pub converged: bool,
}

pub fn write_snapshot(dir: &Path, name: &str, snapshot: &Snapshot) -> DesignResult<PathBuf> {
    let path = dir.join(name);
    let writer = BufWriter::new(File::create(&path)?);
    serde_json::to_writer_pretty(writer, snapshot)?;
    debug!("wrote {}", path.display());
    Ok(path)
}

pub fn read_snapshot(path: &Path) -> DesignResult<Snapshot> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// Read a dome contour of whitespace separated `x r` rows, keeping every
/// n-th row. The first and last rows are always kept. Blank lines and
/// lines starting with `#` are skipped.
pub fn read_contour_file(path: &Path, every_nth: usize) -> DesignResult<(Vec<f64>, Vec<f64>)> {
    let reader = BufReader::new(File::open(path)?);
    let mut rows = Vec::new();
    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let values: Vec<f64> = line
            .split_whitespace()
            .map(|v| v.parse::<f64>())
            .collect::<Result<_, _>>()
            .map_err(|e| {
                DesignError::Geometry(format!("{}: line {}: {}", path.display(), number + 1, e))
            })?;
        if values.len() < 2 {
            return Err(DesignError::Geometry(format!(
                "{}: line {} needs an x and an r value",
                path.display(),
                number + 1
            )));
        }
        rows.push((values[0], values[1]));
    }
    Ok(thin_rows(&rows, every_nth).into_iter().unzip())
}

fn thin_rows(rows: &[(f64, f64)], every_nth: usize) -> Vec<(f64, f64)> {
    let step = every_nth.max(1);
    let last = rows.len().saturating_sub(1);
    rows.iter()
        .enumerate()
        .filter(|&(i, _)| i % step == 0 || i == last)
        .map(|(_, &row)| row)
        .collect()
}

/// Parse comma separated numbers into pairs, e.g. `"0,200,50,180"`.
pub fn parse_pairs(line: &str) -> DesignResult<Vec<(f64, f64)>> {
    let values = line
        .split(',')
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(|v| v.parse::<f64>())
        .collect::<Result<Vec<f64>, _>>()
        .map_err(|e| DesignError::Configuration(format!("'{}' is not a list of numbers: {}", line, e)))?;
    if values.len() % 2 != 0 {
        return Err(DesignError::Configuration(format!(
            "'{}' holds an odd number of values, expected pairs",
            line
        )));
    }
    Ok(values.chunks(2).map(|pair| (pair[0], pair[1])).collect())
}

/// Create `run_<seconds>` below `base`, with a counter appended if a run
/// of the same second exists.
pub fn create_run_dir(base: &Path) -> DesignResult<PathBuf> {
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let mut dir = base.join(format!("run_{}", seconds));
    let mut counter = 1;
    while dir.exists() {
        dir = base.join(format!("run_{}_{}", seconds, counter));
        counter += 1;
    }
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Write a comma separated table with one header line.
pub fn write_table(path: &Path, header: &[&str], rows: &[Vec<f64>]) -> DesignResult<()> {
    let mut f = BufWriter::new(File::create(path)?);
    writeln!(f, "{}", header.join(","))?;
    for row in rows {
        if row.len() != header.len() {
            warn!(
                "{}: row with {} values under a header of {} columns",
                path.display(),
                row.len(),
                header.len()
            );
        }
        let line: Vec<String> = row.iter().map(|v| format!("{:.6e}", v)).collect();
        writeln!(f, "{}", line.join(","))?;
    }
    Ok(())
}

/// Write a whitespace aligned text table.
pub fn write_columns(path: &Path, header: &[&str], rows: &[Vec<f64>]) -> DesignResult<()> {
    let mut f = BufWriter::new(File::create(path)?);
    let width = header.iter().map(|h| h.len()).max().unwrap_or(0).max(12);
    for h in header {
        write!(f, "{:>width$} ", h, width = width)?;
    }
    writeln!(f)?;
    for row in rows {
        for v in row {
            write!(f, "{:>width$.4} ", v, width = width)?;
        }
        writeln!(f)?;
    }
    Ok(())
}

/// Write `key: value` lines.
pub fn write_report(path: &Path, entries: &[(String, String)]) -> DesignResult<()> {
    let mut f = BufWriter::new(File::create(path)?);
    let width = entries.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    for (key, value) in entries {
        writeln!(f, "{:width$}: {}", key, value, width = width)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn snapshot_survives_a_file() {
        let dir = TempDir::new("copv").unwrap();
        let snapshot = Snapshot {
            iteration: 3,
            angles_shifts: vec![(7.5, 0.0), (90.0, 12.5)],
            puck_max: Some(0.97),
            criterion: "FF".to_string(),
            burst_pressure: 140.0,
            converged: true,
        };
        let path = write_snapshot(dir.path(), "snapshot_003.json", &snapshot).unwrap();
        assert_eq!(read_snapshot(&path).unwrap(), snapshot);
    }

    #[test]
    fn partial_snapshot_has_no_exposure() {
        let json = r#"{"iteration":1,"anglesShifts":[[8.0,0.0]],"puckMax":null,
                       "criterion":"IFF","burstPressure":70.0,"converged":false}"#;
        let snapshot: Snapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.puck_max, None);
        assert_eq!(snapshot.angles_shifts, vec![(8.0, 0.0)]);
    }

    #[test]
    fn contour_file_is_thinned() {
        let dir = TempDir::new("copv").unwrap();
        let path = dir.path().join("dome.txt");
        let mut f = File::create(&path).unwrap();
        writeln!(f, "# x r").unwrap();
        for i in 0..10 {
            writeln!(f, "{} {}", i as f64, 100.0 - 5.0 * i as f64).unwrap();
        }
        drop(f);
        let (x, r) = read_contour_file(&path, 4).unwrap();
        assert_eq!(x, vec![0.0, 4.0, 8.0, 9.0]);
        assert_eq!(r, vec![100.0, 80.0, 60.0, 55.0]);
        let (x, _) = read_contour_file(&path, 1).unwrap();
        assert_eq!(x.len(), 10);
    }

    #[test]
    fn bad_contour_row() {
        let dir = TempDir::new("copv").unwrap();
        let path = dir.path().join("dome.txt");
        fs::write(&path, "0 100\n1\n").unwrap();
        assert!(read_contour_file(&path, 1).is_err());
        fs::write(&path, "0 100\n1 x\n").unwrap();
        assert!(read_contour_file(&path, 1).is_err());
    }

    #[test]
    fn pairs() {
        assert_eq!(parse_pairs("0, 200,50,180").unwrap(), vec![(0.0, 200.0), (50.0, 180.0)]);
        assert!(parse_pairs("1,2,3").is_err());
        assert!(parse_pairs("1,a").is_err());
        assert!(parse_pairs("").unwrap().is_empty());
    }

    #[test]
    fn run_dirs_are_distinct() {
        let base = TempDir::new("copv").unwrap();
        let a = create_run_dir(base.path()).unwrap();
        let b = create_run_dir(base.path()).unwrap();
        assert_ne!(a, b);
        assert!(a.is_dir() && b.is_dir());
    }

    #[test]
    fn table_and_report() {
        let dir = TempDir::new("copv").unwrap();
        let path = dir.path().join("t.csv");
        write_table(&path, &["a", "b"], &[vec![1.0, 2.0]]).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("a,b\n1.000000e0,2.000000e0"));

        let path = dir.path().join("book.txt");
        write_columns(&path, &["angle", "shift"], &[vec![7.25, 0.0]]).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0].split_whitespace().collect::<Vec<_>>(), vec!["angle", "shift"]);
        assert_eq!(lines[1].split_whitespace().collect::<Vec<_>>(), vec!["7.2500", "0.0000"]);

        let path = dir.path().join("r.txt");
        write_report(&path, &[("mass".to_string(), "1.5".to_string())]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "mass: 1.5\n");
    }
}
