use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use csv::{ReaderBuilder, Writer};
use serde::Serialize;

use crate::config::GeneratorConfig;
use crate::dataset::Dataset;
use crate::jitter::{Histogram, JitterSummary};
use crate::ReproError;

pub const TIME_COLUMN: &str = "Time_us";

#[derive(Debug, Clone, Serialize)]
pub struct Manifest {
    pub corner: String,
    pub model: String,
    pub seed: u64,
    pub runs: usize,
    pub points: usize,
    pub target_freq_ghz: f64,
    pub waveform_file: String,
    pub measured: JitterSummary,
}

/// Per-run jitter as measured on a waveform file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunJitterRow {
    pub run: String,
    pub jitter_fs: f64,
}

/// Wide waveform table as stored on disk
#[derive(Debug, Clone, PartialEq)]
pub struct WaveformTable {
    pub time_us: Vec<f64>,
    /// `(column name, frequency in GHz)`
    pub runs: Vec<(String, Vec<f64>)>,
}

/// Fresh `analysis_<UTC stamp>` directory under `root`; repeated calls within
/// the same second get a `_2`, `_3`, ... suffix.
pub fn create_analysis_dir(root: &Path) -> Result<PathBuf, ReproError> {
    let stamp = format!("analysis_{}", Utc::now().format("%Y%m%d_%H%M%S"));
    let dir = std::iter::once(root.join(&stamp))
        .chain((2_u32..).map(|n| root.join(format!("{stamp}_{n}"))))
        .find(|candidate| !candidate.exists())
        .ok_or_else(|| ReproError::InvalidConfig(format!("no free directory under {}", root.display())))?;

    fs::create_dir_all(&dir)?;
    Ok(dir)
}

fn check_run_len(context: &'static str, expected: usize, got: usize) -> Result<(), ReproError> {
    if expected != got {
        return Err(ReproError::LengthMismatch {
            context,
            expected,
            got,
        });
    }
    Ok(())
}

/// Jitter and histogram edges in femtoseconds, 10 decimals
fn format_fs(value: f64) -> String {
    format!("{value:.10}")
}

/// `Time_us,Run_1,...,Run_N`, one row per sample.
pub fn write_waveform_csv(
    path: &Path,
    dataset: &Dataset,
    precision: usize,
) -> Result<(), ReproError> {
    for run in &dataset.runs {
        check_run_len("waveform run", dataset.time_us.len(), run.freq_ghz.len())?;
    }

    let mut writer = Writer::from_path(path)?;
    let mut header = Vec::with_capacity(dataset.runs.len() + 1);
    header.push(TIME_COLUMN.to_string());
    header.extend(dataset.runs.iter().map(|run| format!("Run_{}", run.run_id)));
    writer.write_record(&header)?;

    let mut record = Vec::with_capacity(header.len());
    for (idx, t) in dataset.time_us.iter().enumerate() {
        record.clear();
        record.push(format!("{t:.precision$}"));
        for run in &dataset.runs {
            record.push(format!("{:.precision$}", run.freq_ghz[idx]));
        }
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

pub fn write_run_targets_csv(path: &Path, dataset: &Dataset) -> Result<(), ReproError> {
    let mut writer = Writer::from_path(path)?;
    writer.write_record(["run_id", "target_jitter_fs", "measured_jitter_fs"])?;

    for run in &dataset.runs {
        writer.write_record([
            run.run_id.to_string(),
            format_fs(run.target_jitter_fs),
            format_fs(run.measured_jitter_fs),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ReproError> {
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

/// Write the waveform table, per-run targets and manifest into `output_dir`.
pub fn write_dataset(
    output_dir: &Path,
    config: &GeneratorConfig,
    dataset: &Dataset,
) -> Result<PathBuf, ReproError> {
    fs::create_dir_all(output_dir)?;

    let waveform_file = config.waveform_filename();
    let waveform_path = output_dir.join(&waveform_file);
    write_waveform_csv(&waveform_path, dataset, config.float_precision)?;
    write_run_targets_csv(
        &output_dir.join(format!("run_targets_{}_corner.csv", config.corner)),
        dataset,
    )?;

    let manifest = Manifest {
        corner: config.corner.to_string(),
        model: config.model.to_string(),
        seed: config.seed,
        runs: dataset.runs.len(),
        points: dataset.time_us.len(),
        target_freq_ghz: config.target_freq_ghz,
        waveform_file,
        measured: dataset.summary(),
    };
    write_json(
        &output_dir.join(format!("manifest_{}_corner.json", config.corner)),
        &manifest,
    )?;

    Ok(waveform_path)
}

/// Read a wide waveform CSV back. The first column must be `Time_us`.
pub fn read_waveform_csv(path: &Path) -> Result<WaveformTable, ReproError> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let headers = reader.headers()?.clone();

    match headers.get(0) {
        Some(TIME_COLUMN) => {}
        other => {
            return Err(ReproError::InvalidConfig(format!(
                "expected first column '{TIME_COLUMN}', found '{}'",
                other.unwrap_or_default()
            )))
        }
    }

    let mut time_us = Vec::new();
    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); headers.len() - 1];

    for (row_idx, record) in reader.records().enumerate() {
        let record = record?;
        check_run_len("waveform row", headers.len(), record.len())?;

        let mut values = record.iter().map(|field| {
            field.trim().parse::<f64>().map_err(|e| {
                ReproError::InvalidConfig(format!(
                    "row {}: cannot parse '{field}' as a number: {e}",
                    row_idx + 1
                ))
            })
        });

        // first field is the time column
        if let Some(t) = values.next() {
            time_us.push(t?);
        }
        for (column, value) in columns.iter_mut().zip(values) {
            column.push(value?);
        }
    }

    let runs = headers
        .iter()
        .skip(1)
        .map(str::to_string)
        .zip(columns)
        .collect();

    Ok(WaveformTable { time_us, runs })
}

pub fn write_run_jitter_csv(path: &Path, rows: &[RunJitterRow]) -> Result<(), ReproError> {
    let mut writer = Writer::from_path(path)?;
    writer.write_record(["run", "jitter_fs"])?;

    for row in rows {
        writer.write_record([row.run.clone(), format_fs(row.jitter_fs)])?;
    }

    writer.flush()?;
    Ok(())
}

pub fn write_histogram_csv(path: &Path, histogram: &Histogram) -> Result<(), ReproError> {
    let mut writer = Writer::from_path(path)?;
    writer.write_record(["lower_fs", "upper_fs", "count"])?;

    for bin in &histogram.bins {
        writer.write_record([
            format_fs(bin.lower_fs),
            format_fs(bin.upper_fs),
            bin.count.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Corner, RunRecord};
    use approx::assert_relative_eq;

    fn tiny_dataset() -> Dataset {
        Dataset {
            corner: Corner::TT,
            time_us: vec![80.0, 80.1, 80.2],
            runs: vec![
                RunRecord {
                    run_id: 1,
                    target_jitter_fs: 19.0,
                    measured_jitter_fs: 19.0,
                    freq_ghz: vec![0.2, 0.2000001, 0.1999999],
                },
                RunRecord {
                    run_id: 2,
                    target_jitter_fs: 21.0,
                    measured_jitter_fs: 21.0,
                    freq_ghz: vec![0.2000002, 0.2, 0.2],
                },
            ],
        }
    }

    #[test]
    fn waveform_csv_round_trips_through_reader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wave.csv");
        write_waveform_csv(&path, &tiny_dataset(), 7).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        let mut lines = raw.lines();
        assert_eq!(lines.next(), Some("Time_us,Run_1,Run_2"));
        assert_eq!(lines.next(), Some("80.0000000,0.2000000,0.2000002"));

        let table = read_waveform_csv(&path).unwrap();
        assert_eq!(table.time_us.len(), 3);
        assert_eq!(table.runs.len(), 2);
        assert_eq!(table.runs[1].0, "Run_2");
        assert_relative_eq!(table.runs[0].1[2], 0.1999999);
    }

    #[test]
    fn rejects_ragged_run() {
        let mut dataset = tiny_dataset();
        dataset.runs[1].freq_ghz.pop();
        let dir = tempfile::tempdir().unwrap();
        let err = write_waveform_csv(&dir.path().join("bad.csv"), &dataset, 7).unwrap_err();
        assert!(matches!(err, ReproError::LengthMismatch { .. }));
    }

    #[test]
    fn reader_requires_time_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no_time.csv");
        fs::write(&path, "t,Run_1\n1,2\n").unwrap();
        assert!(read_waveform_csv(&path).is_err());
    }

    #[test]
    fn reader_reports_bad_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad_number.csv");
        fs::write(&path, "Time_us,Run_1\n80.0,abc\n").unwrap();
        let err = read_waveform_csv(&path).unwrap_err();
        assert!(err.to_string().contains("abc"));
    }

    #[test]
    fn analysis_dirs_do_not_collide() {
        let root = tempfile::tempdir().unwrap();
        let a = create_analysis_dir(&root.path().join("nested")).unwrap();
        let b = create_analysis_dir(&root.path().join("nested")).unwrap();
        assert_ne!(a, b);
        assert!(a.is_dir() && b.is_dir());
    }

    #[test]
    fn dataset_writer_emits_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let config = GeneratorConfig {
            num_runs: 2,
            ..GeneratorConfig::default()
        };
        let path = write_dataset(dir.path(), &config, &tiny_dataset()).unwrap();
        assert!(path.ends_with("stress_test_TT_corner_2_runs.csv"));

        let manifest: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(dir.path().join("manifest_TT_corner.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(manifest["runs"], 2);
        assert_eq!(manifest["measured"]["count"], 2);
        assert!(dir.path().join("run_targets_TT_corner.csv").exists());
    }
}
