use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, Trim};
use log::{debug, warn};
use serde::Deserialize;

use crate::error::{Result, TrackerError};

/// One hourly heart-rate sample.
#[derive(Debug, Clone, PartialEq)]
pub struct HeartRateRow {
    pub heart_rate: f64,
    pub hour_timestamp: String,
}

/// One hourly heart-rate-variability sample.
#[derive(Debug, Clone, PartialEq)]
pub struct HrvRow {
    pub value: f64,
    pub hour_timestamp: String,
}

#[derive(Debug, Deserialize)]
struct RawHeartRate {
    #[serde(default)]
    heart_rate: String,
    #[serde(default)]
    hour_timestamp: String,
}

#[derive(Debug, Deserialize)]
struct RawHrv {
    #[serde(default)]
    value: String,
    #[serde(default)]
    hour_timestamp: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesSummary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    ReaderBuilder::new()
        .trim(Trim::Headers)
        .flexible(true)
        .from_reader(reader)
}

pub fn read_heart_rate<R: Read>(reader: R) -> Result<Vec<HeartRateRow>> {
    let mut rows = Vec::new();
    for record in csv_reader(reader).deserialize() {
        let raw: RawHeartRate = record?;
        let Ok(heart_rate) = raw.heart_rate.trim().parse::<f64>() else {
            debug!("skipping heart rate row with value '{}'", raw.heart_rate);
            continue;
        };
        rows.push(HeartRateRow {
            heart_rate,
            hour_timestamp: raw.hour_timestamp,
        });
    }
    Ok(rows)
}

/// Rows missing either the value or the timestamp are dropped.
pub fn read_hrv<R: Read>(reader: R) -> Result<Vec<HrvRow>> {
    let mut rows = Vec::new();
    for record in csv_reader(reader).deserialize() {
        let raw: RawHrv = record?;
        if raw.value.trim().is_empty() || raw.hour_timestamp.trim().is_empty() {
            continue;
        }
        let Ok(value) = raw.value.trim().parse::<f64>() else {
            debug!("skipping HRV row with value '{}'", raw.value);
            continue;
        };
        rows.push(HrvRow {
            value,
            hour_timestamp: raw.hour_timestamp,
        });
    }
    Ok(rows)
}

pub fn load_heart_rate(path: &Path) -> Result<Vec<HeartRateRow>> {
    let file = File::open(path).map_err(|e| TrackerError::io(path, e))?;
    read_heart_rate(file)
}

pub fn load_hrv(path: &Path) -> Result<Vec<HrvRow>> {
    let file = File::open(path).map_err(|e| TrackerError::io(path, e))?;
    read_hrv(file)
}

/// `HH:MM` out of a `YYYY-MM-DD HH:MM:SS` stamp; shorter stamps are returned whole.
pub fn hour_label(timestamp: &str) -> String {
    if timestamp.chars().count() < 16 {
        return timestamp.to_string();
    }
    timestamp.chars().skip(11).take(5).collect()
}

pub fn summarize(values: impl IntoIterator<Item = f64>) -> Option<SeriesSummary> {
    let mut count = 0;
    let mut sum = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;

    for value in values {
        count += 1;
        sum += value;
        min = min.min(value);
        max = max.max(value);
    }

    (count > 0).then(|| SeriesSummary {
        count,
        min,
        max,
        mean: sum / count as f64,
    })
}

fn print_series<'a>(title: &str, points: impl Iterator<Item = (&'a str, f64)> + Clone) {
    println!("\n{}", title);
    println!("{}", "=".repeat(60));

    let Some(summary) = summarize(points.clone().map(|(_, v)| v)) else {
        println!("  No data.");
        return;
    };

    for (timestamp, value) in points {
        println!("  {:>5}  {:>6.1}", hour_label(timestamp), value);
    }
    println!(
        "\n  Samples: {}  Min: {:.1}  Max: {:.1}  Mean: {:.1}",
        summary.count, summary.min, summary.max, summary.mean
    );
}

/// Prints both series. A file that cannot be read is reported and skipped so
/// the other series still shows.
pub fn print_overview(heart_rate_file: &Path, hrv_file: &Path) {
    match load_heart_rate(heart_rate_file) {
        Ok(rows) => print_series(
            "Heart rate",
            rows.iter().map(|r| (r.hour_timestamp.as_str(), r.heart_rate)),
        ),
        Err(e) => warn!("CSV load error: {}", e),
    }

    match load_hrv(hrv_file) {
        Ok(rows) => print_series(
            "Heart rate variability",
            rows.iter().map(|r| (r.hour_timestamp.as_str(), r.value)),
        ),
        Err(e) => warn!("CSV load error: {}", e),
    }
    println!();
}
