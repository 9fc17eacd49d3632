use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use log::{debug, error};
use serde::Deserialize;
use std::{collections::BTreeMap, fmt, path::Path};

/// # Description
///
/// One row of the processing-time CSV: the latency of encoding a payload of
/// `size` bytes with `algorithm`, averaged over many trials.
///
/// The header written by the benchmark harness is:
/// `algo,size(bytes),avg_proc_time(ms),std_err(ms),std_dev(ms)`
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Measurement {
    #[serde(rename = "algo")]
    pub algorithm: String,
    #[serde(rename = "size(bytes)")]
    pub size: f64,
    #[serde(rename = "avg_proc_time(ms)")]
    pub avg_latency_ms: f64,
    #[serde(rename = "std_err(ms)", default)]
    pub std_err_ms: Option<f64>,
    #[serde(rename = "std_dev(ms)")]
    pub std_dev_ms: f64,
}

/// Column indices for CSV files that are read by position instead of by
/// header name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColumnIndices {
    pub algorithm: usize,
    pub size: usize,
    pub avg_latency: usize,
    pub std_dev: usize,
}

impl Default for ColumnIndices {
    fn default() -> Self {
        Self {
            algorithm: 0,
            size: 1,
            avg_latency: 2,
            std_dev: 4,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Schema {
    Named,
    Positional(ColumnIndices),
}

/// Records grouped by algorithm key. Keys iterate in sorted order, and each
/// group keeps the row order of the CSV.
pub type Groups = BTreeMap<String, Vec<Measurement>>;

pub fn load(path: &Path, schema: Schema) -> Result<Vec<Measurement>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_path(path)
        .with_context(|| format!("error opening CSV file (path={})", path.display()))?;

    let mut records = Vec::new();
    match schema {
        Schema::Named => {
            for (row, result) in reader.deserialize::<Measurement>().enumerate() {
                let record = result.with_context(|| {
                    format!(
                        "malformed record (path={}, row={})",
                        path.display(),
                        row + 1
                    )
                })?;
                records.push(record);
            }
        }
        Schema::Positional(columns) => {
            for (row, result) in reader.records().enumerate() {
                let raw = result.with_context(|| {
                    format!(
                        "malformed record (path={}, row={})",
                        path.display(),
                        row + 1
                    )
                })?;
                records.push(
                    from_positional(&raw, &columns)
                        .with_context(|| format!("path={}, row={}", path.display(), row + 1))?,
                );
            }
        }
    }

    debug!(
        "loaded {} records from {}",
        records.len(),
        path.display()
    );

    Ok(records)
}

fn positional_field(raw: &StringRecord, idx: usize) -> Result<&str> {
    match raw.get(idx) {
        Some(value) => Ok(value),
        None => {
            let reason = format!("missing column (index={idx}, num_columns={})", raw.len());
            error!("{reason}");
            anyhow::bail!(reason);
        }
    }
}

fn positional_number(raw: &StringRecord, idx: usize) -> Result<f64> {
    let value = positional_field(raw, idx)?;
    value.parse::<f64>().map_err(|e| {
        let reason = format!("non-numeric value (index={idx}, value={value}, error={e:?})");
        error!("{reason}");
        anyhow::anyhow!(reason)
    })
}

fn from_positional(raw: &StringRecord, columns: &ColumnIndices) -> Result<Measurement> {
    Ok(Measurement {
        algorithm: positional_field(raw, columns.algorithm)?.to_string(),
        size: positional_number(raw, columns.size)?,
        avg_latency_ms: positional_number(raw, columns.avg_latency)?,
        std_err_ms: None,
        std_dev_ms: positional_number(raw, columns.std_dev)?,
    })
}

pub fn group_by_algorithm(records: Vec<Measurement>) -> Groups {
    let mut groups = Groups::new();
    for record in records {
        groups
            .entry(record.algorithm.clone())
            .or_default()
            .push(record);
    }

    groups
}

/// Return the rows for `algorithm`. An unknown or empty group is an error
/// rather than an empty series.
pub fn select<'a>(groups: &'a Groups, algorithm: &str) -> Result<&'a [Measurement]> {
    match groups.get(algorithm) {
        Some(records) if !records.is_empty() => Ok(records),
        _ => {
            let known: Vec<&str> = groups.keys().map(String::as_str).collect();
            error!("no measurements for algorithm (algo={algorithm}, known={known:?})");
            anyhow::bail!("no measurements for algorithm (algo={algorithm})");
        }
    }
}

pub fn truncate(records: &[Measurement], n: usize) -> &[Measurement] {
    &records[..n.min(records.len())]
}

pub fn filter<P>(records: &[Measurement], predicate: P) -> Vec<Measurement>
where
    P: Fn(&Measurement) -> bool,
{
    records.iter().filter(|r| predicate(*r)).cloned().collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SizeUnit {
    Bytes,
    Kilobytes,
}

impl SizeUnit {
    pub fn divisor(&self) -> f64 {
        match self {
            SizeUnit::Bytes => 1.0,
            SizeUnit::Kilobytes => 1000.0,
        }
    }

    pub fn rescale(&self, size: f64) -> f64 {
        size / self.divisor()
    }
}

/// A point of a mean curve together with its +/- one standard deviation
/// band.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BandPoint {
    pub x: f64,
    pub mean: f64,
    pub lower: f64,
    pub upper: f64,
}

pub fn band_points(records: &[Measurement], unit: SizeUnit) -> Vec<BandPoint> {
    records
        .iter()
        .map(|r| BandPoint {
            x: unit.rescale(r.size),
            mean: r.avg_latency_ms,
            lower: r.avg_latency_ms - r.std_dev_ms,
            upper: r.avg_latency_ms + r.std_dev_ms,
        })
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AxisLimits {
    pub x_max: f64,
    pub y_max: f64,
}

/// `x_max` is the largest x, `y_max` the largest mean clamped below at zero.
pub fn axis_limits(points: &[BandPoint]) -> Result<AxisLimits> {
    if points.is_empty() {
        error!("cannot derive axis limits from an empty series");
        anyhow::bail!("cannot derive axis limits from an empty series");
    }

    let x_max = points.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
    let y_max = points.iter().map(|p| p.mean).fold(0.0, f64::max);

    Ok(AxisLimits { x_max, y_max })
}

#[derive(Clone, Debug, PartialEq)]
pub struct GroupSummary {
    pub algorithm: String,
    pub rows: usize,
    pub min_size: f64,
    pub max_size: f64,
    pub min_avg_ms: f64,
    pub max_avg_ms: f64,
}

impl fmt::Display for GroupSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} rows, size {}..{} bytes, avg latency {:.4}..{:.4} ms",
            self.algorithm,
            self.rows,
            self.min_size,
            self.max_size,
            self.min_avg_ms,
            self.max_avg_ms
        )
    }
}

pub fn summarize(groups: &Groups) -> Vec<GroupSummary> {
    groups
        .iter()
        .filter(|(_, records)| !records.is_empty())
        .map(|(algorithm, records)| {
            let sizes = records.iter().map(|r| r.size);
            let avgs = records.iter().map(|r| r.avg_latency_ms);
            GroupSummary {
                algorithm: algorithm.clone(),
                rows: records.len(),
                min_size: sizes.clone().fold(f64::INFINITY, f64::min),
                max_size: sizes.fold(f64::NEG_INFINITY, f64::max),
                min_avg_ms: avgs.clone().fold(f64::INFINITY, f64::min),
                max_avg_ms: avgs.fold(f64::NEG_INFINITY, f64::max),
            }
        })
        .collect()
}
