//! Headerless EKG recordings: one `voltage_mv, elapsed_ms` pair per line.
//!
//! `.txt` recordings are tab-separated, `.csv` exports use commas.

use anyhow::{Context, Result};
use csv::{ReaderBuilder, Trim};
use std::io::Read;
use std::path::Path;

use crate::error::ImportError;
use crate::models::EkgTrace;

/// Reader for raw EKG recordings
#[derive(Debug, Clone, Default)]
pub struct EkgTextReader;

impl EkgTextReader {
    pub fn new() -> Self {
        Self
    }

    fn delimiter_for(file_path: &Path) -> u8 {
        if super::has_extension(file_path, "csv") {
            b','
        } else {
            b'\t'
        }
    }

    /// Read an EKG recording from disk
    pub fn read_file(&self, file_path: &Path) -> Result<EkgTrace> {
        if !file_path.exists() {
            return Err(ImportError::FileNotFound {
                path: file_path.to_path_buf(),
            }
            .into());
        }

        let file = std::fs::File::open(file_path)
            .with_context(|| format!("Failed to open EKG file: {}", file_path.display()))?;
        let trace = Self::parse(file, Self::delimiter_for(file_path))
            .with_context(|| format!("Failed to read EKG file: {}", file_path.display()))?;

        tracing::debug!(
            file = %file_path.display(),
            samples = trace.len(),
            "Loaded EKG recording"
        );
        Ok(trace)
    }

    /// Read a tab-separated EKG recording from any reader
    pub fn read_from<R: Read>(&self, reader: R) -> Result<EkgTrace> {
        Self::parse(reader, b'\t')
    }

    fn parse<R: Read>(reader: R, delimiter: u8) -> Result<EkgTrace> {
        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        let mut samples = Vec::new();
        for result in reader.records() {
            let record = result?;
            let line = record.position().map(|p| p.line() as usize).unwrap_or(0);

            if record.iter().all(|field| field.is_empty()) {
                continue;
            }

            let voltage = parse_field(record.get(0), line, "voltage")?;
            let elapsed = parse_field(record.get(1), line, "elapsed time")?;
            samples.push((voltage, elapsed));
        }

        if samples.is_empty() {
            return Err(ImportError::MissingData {
                field: "EKG samples".to_string(),
            }
            .into());
        }

        Ok(EkgTrace::from_samples(samples))
    }
}

fn parse_field(field: Option<&str>, line: usize, name: &str) -> Result<f64, ImportError> {
    let raw = field.ok_or_else(|| ImportError::ParseError {
        format: "EKG".to_string(),
        line,
        reason: format!("missing {} column", name),
    })?;

    // "nan" and "inf" parse as f64 but are not readings
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ImportError::ParseError {
            format: "EKG".to_string(),
            line,
            reason: format!("invalid {} '{}'", name, raw),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_read_tab_separated() {
        let data = "0.5\t0\n0.7\t2\n\n1.2\t4\n";
        let trace = EkgTextReader::new().read_from(data.as_bytes()).unwrap();
        assert_eq!(trace.voltages_mv, vec![0.5, 0.7, 1.2]);
        assert_eq!(trace.elapsed_ms, vec![0.0, 2.0, 4.0]);
    }

    #[test]
    fn test_rejects_malformed_line() {
        let data = "0.5\t0\nabc\t2\n";
        let err = EkgTextReader::new().read_from(data.as_bytes()).unwrap_err();
        let import_err = err.downcast_ref::<ImportError>().unwrap();
        assert!(matches!(import_err, ImportError::ParseError { line: 2, .. }));
    }

    #[test]
    fn test_rejects_non_finite_voltage() {
        let data = "0.5\t0\nnan\t2\n0.7\t4\n";
        let err = EkgTextReader::new().read_from(data.as_bytes()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ImportError>(),
            Some(ImportError::ParseError { line: 2, .. })
        ));

        let data = "0.5\tinf\n";
        assert!(EkgTextReader::new().read_from(data.as_bytes()).is_err());
    }

    #[test]
    fn test_empty_input() {
        assert!(EkgTextReader::new().read_from("".as_bytes()).is_err());
    }

    #[test]
    fn test_delimiter_from_extension() {
        let dir = tempdir().unwrap();
        let csv_path = dir.path().join("ekg.csv");
        fs::write(&csv_path, "1.0,0\n2.0,2\n").unwrap();
        let trace = EkgTextReader::new().read_file(&csv_path).unwrap();
        assert_eq!(trace.len(), 2);

        let missing = dir.path().join("missing.txt");
        let err = EkgTextReader::new().read_file(&missing).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ImportError>(),
            Some(ImportError::FileNotFound { .. })
        ));
    }
}
