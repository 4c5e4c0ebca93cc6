use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use crate::error::ImportError;
use crate::import::ImportFormat;
use crate::models::{Activity, ActivityRecord};

/// Columns the power CSV reader understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Column {
    Timestamp,
    Power,
    HeartRate,
}

/// CSV importer with flexible column mapping.
///
/// A `power` column is required. Without a time column, samples are assumed
/// to be 1 second apart starting at the Unix epoch.
pub struct PowerCsvReader {
    column_mapping: HashMap<String, Column>,
}

impl PowerCsvReader {
    pub fn new() -> Self {
        let mut column_mapping = HashMap::new();

        // Common column name variations
        Self::add_mapping(
            &mut column_mapping,
            Column::Timestamp,
            &["timestamp", "time", "elapsed_time", "elapsed", "seconds", "secs"],
        );
        Self::add_mapping(
            &mut column_mapping,
            Column::Power,
            &["power", "watts", "power_watts", "poweroriginal", "power_original"],
        );
        Self::add_mapping(
            &mut column_mapping,
            Column::HeartRate,
            &["heart_rate", "hr", "heartrate", "bpm"],
        );

        Self { column_mapping }
    }

    fn add_mapping(mapping: &mut HashMap<String, Column>, column: Column, variations: &[&str]) {
        for variation in variations {
            mapping.insert(variation.to_string(), column);
        }
    }

    fn normalize_column_name(&self, name: &str) -> Option<Column> {
        let normalized = name.trim().to_lowercase().replace([' ', '-'], "_");
        self.column_mapping.get(&normalized).copied()
    }

    /// Absolute time of a sample.
    ///
    /// Numeric values are seconds since the Unix epoch, which also covers
    /// elapsed-seconds columns starting at zero.
    fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
        if let Ok(seconds) = value.parse::<f64>() {
            if !seconds.is_finite() {
                return None;
            }
            let whole = seconds.floor();
            let nanos = ((seconds - whole) * 1e9).round() as u32;
            return DateTime::from_timestamp(whole as i64, nanos.min(999_999_999));
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
            return Some(dt.with_timezone(&Utc));
        }

        let formats = [
            "%Y-%m-%d %H:%M:%S",
            "%Y-%m-%dT%H:%M:%S",
            "%Y-%m-%d %H:%M:%S%.f",
            "%Y-%m-%dT%H:%M:%S%.f",
            "%d/%m/%Y %H:%M:%S",
            "%m/%d/%Y %H:%M:%S",
        ];

        formats.iter().find_map(|format| {
            NaiveDateTime::parse_from_str(value, format)
                .ok()
                .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
        })
    }

    /// Empty or unparseable readings are treated as missing
    fn parse_reading(value: Option<&str>) -> Option<f64> {
        value
            .filter(|v| !v.is_empty())
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite())
    }

    /// Read power records from any CSV source
    pub fn read_from<R: Read>(&self, reader: R) -> Result<Vec<ActivityRecord>> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        let columns: HashMap<Column, usize> = headers
            .iter()
            .enumerate()
            .filter_map(|(i, header)| self.normalize_column_name(header).map(|c| (c, i)))
            .fold(HashMap::new(), |mut acc, (column, index)| {
                // First matching header wins
                acc.entry(column).or_insert(index);
                acc
            });

        let power_index = *columns.get(&Column::Power).ok_or_else(|| ImportError::MissingData {
            field: "power column".to_string(),
        })?;
        let time_index = columns.get(&Column::Timestamp).copied();
        let hr_index = columns.get(&Column::HeartRate).copied();

        let mut records = Vec::new();
        let mut row = StringRecord::new();
        let mut sample_index: i64 = 0;
        while reader.read_record(&mut row)? {
            let line = row.position().map(|p| p.line() as usize).unwrap_or(0);

            let timestamp = match time_index {
                Some(index) => {
                    let raw = row.get(index).unwrap_or("");
                    Self::parse_timestamp(raw).ok_or_else(|| ImportError::ParseError {
                        format: "CSV".to_string(),
                        line,
                        reason: format!("unable to parse time '{}'", raw),
                    })?
                }
                None => DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::seconds(sample_index),
            };

            records.push(ActivityRecord {
                timestamp,
                power: Self::parse_reading(row.get(power_index)),
                heart_rate: hr_index.and_then(|index| Self::parse_reading(row.get(index))),
            });
            sample_index += 1;
        }

        Ok(records)
    }
}

impl Default for PowerCsvReader {
    fn default() -> Self {
        Self::new()
    }
}

impl ImportFormat for PowerCsvReader {
    fn can_import(&self, file_path: &Path) -> bool {
        super::has_extension(file_path, "csv")
    }

    fn import_file(&self, file_path: &Path) -> Result<Activity> {
        if !file_path.exists() {
            return Err(ImportError::FileNotFound {
                path: file_path.to_path_buf(),
            }
            .into());
        }

        let file = std::fs::File::open(file_path)
            .with_context(|| format!("Failed to open CSV file: {}", file_path.display()))?;
        let records = self
            .read_from(file)
            .with_context(|| format!("Failed to read CSV file: {}", file_path.display()))?;

        if records.is_empty() {
            anyhow::bail!("No data rows found in CSV file: {}", file_path.display());
        }

        Ok(Activity::new(Some(file_path.to_path_buf()), records))
    }

    fn get_format_name(&self) -> &'static str {
        "CSV"
    }
}
