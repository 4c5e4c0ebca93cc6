use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use fitparser::profile::MesgNum;
use fitparser::{FitDataRecord, Value};
use std::io::Read;
use std::path::Path;

use crate::error::ImportError;
use crate::import::ImportFormat;
use crate::models::{Activity, ActivityRecord};

/// FIT file importer reading the `record` messages of an activity
pub struct FitReader;

impl FitReader {
    pub fn new() -> Self {
        Self
    }

    /// Decode FIT data from any reader
    pub fn read_from<R: Read>(&self, mut reader: R) -> Result<Vec<ActivityRecord>, ImportError> {
        let messages: Vec<FitDataRecord> =
            fitparser::from_reader(&mut reader).map_err(|e| ImportError::CorruptedFit {
                path: Default::default(),
                reason: e.to_string(),
            })?;

        Ok(Self::extract_records(messages))
    }

    /// Keep `record` messages that carry a timestamp
    fn extract_records(messages: Vec<FitDataRecord>) -> Vec<ActivityRecord> {
        messages
            .into_iter()
            .filter(|message| message.kind() == MesgNum::Record)
            .filter_map(|message| {
                let mut timestamp: Option<DateTime<Utc>> = None;
                let mut power = None;
                let mut heart_rate = None;

                for field in message.fields() {
                    match field.name() {
                        "timestamp" => {
                            if let Value::Timestamp(ts) = field.value() {
                                timestamp = Some(ts.with_timezone(&Utc));
                            }
                        }
                        "power" => power = fit_value_to_f64(field.value()),
                        "heart_rate" => heart_rate = fit_value_to_f64(field.value()),
                        _ => {}
                    }
                }

                timestamp.map(|timestamp| ActivityRecord {
                    timestamp,
                    power,
                    heart_rate,
                })
            })
            .collect()
    }
}

impl Default for FitReader {
    fn default() -> Self {
        Self::new()
    }
}

fn fit_value_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Float32(v) => Some(*v as f64),
        Value::Float64(v) => Some(*v),
        Value::SInt8(v) => Some(*v as f64),
        Value::UInt8(v) => Some(*v as f64),
        Value::UInt8z(v) => Some(*v as f64),
        Value::Byte(v) => Some(*v as f64),
        Value::SInt16(v) => Some(*v as f64),
        Value::UInt16(v) => Some(*v as f64),
        Value::UInt16z(v) => Some(*v as f64),
        Value::SInt32(v) => Some(*v as f64),
        Value::UInt32(v) => Some(*v as f64),
        Value::UInt32z(v) => Some(*v as f64),
        Value::SInt64(v) => Some(*v as f64),
        Value::UInt64(v) => Some(*v as f64),
        Value::UInt64z(v) => Some(*v as f64),
        Value::Array(values) => values.iter().find_map(fit_value_to_f64),
        _ => None,
    }
}

impl ImportFormat for FitReader {
    fn can_import(&self, file_path: &Path) -> bool {
        super::has_extension(file_path, "fit")
    }

    fn import_file(&self, file_path: &Path) -> Result<Activity> {
        if !file_path.exists() {
            return Err(ImportError::FileNotFound {
                path: file_path.to_path_buf(),
            }
            .into());
        }

        let file = std::fs::File::open(file_path)
            .with_context(|| format!("Failed to open FIT file: {}", file_path.display()))?;
        let records = self
            .read_from(std::io::BufReader::new(file))
            .map_err(|e| match e {
                ImportError::CorruptedFit { reason, .. } => ImportError::CorruptedFit {
                    path: file_path.to_path_buf(),
                    reason,
                },
                other => other,
            })?;

        if records.is_empty() {
            return Err(ImportError::MissingData {
                field: format!("timestamped records in {}", file_path.display()),
            }
            .into());
        }

        tracing::debug!(
            file = %file_path.display(),
            records = records.len(),
            with_power = records.iter().filter(|r| r.power.is_some()).count(),
            "Decoded FIT activity"
        );

        Ok(Activity::new(Some(file_path.to_path_buf()), records))
    }

    fn get_format_name(&self) -> &'static str {
        "FIT"
    }
}
