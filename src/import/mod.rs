use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

use crate::error::ImportError;
use crate::models::Activity;

pub mod csv;
pub mod ekg;
pub mod fit;

pub use self::csv::PowerCsvReader;
pub use self::ekg::EkgTextReader;
pub use self::fit::FitReader;

/// Trait for reading activity files of one format
pub trait ImportFormat: Send + Sync {
    /// Check if this importer can handle the given file
    fn can_import(&self, file_path: &Path) -> bool;

    /// Read the activity stored in the file
    fn import_file(&self, file_path: &Path) -> Result<Activity>;

    /// Get the format name for this importer
    fn get_format_name(&self) -> &'static str;
}

/// Case-insensitive extension check shared by the importers
pub(crate) fn has_extension(file_path: &Path, expected: &str) -> bool {
    file_path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(expected))
        .unwrap_or(false)
}

/// Outcome of importing a whole directory
#[derive(Debug, Default)]
pub struct DirectoryImport {
    /// Activities in file-name order
    pub activities: Vec<Activity>,

    /// Files that could not be read, with the reason
    pub failures: Vec<(PathBuf, String)>,
}

/// Manager for coordinating different import formats
pub struct ImportManager {
    importers: Vec<Box<dyn ImportFormat>>,
}

impl ImportManager {
    /// Create a new import manager with all available importers
    pub fn new() -> Self {
        let importers: Vec<Box<dyn ImportFormat>> = vec![
            Box::new(PowerCsvReader::new()),
            Box::new(FitReader::new()),
        ];

        Self { importers }
    }

    /// Import a single file, auto-detecting the format
    pub fn import_file(&self, file_path: &Path) -> Result<Activity> {
        let importer = self
            .importers
            .iter()
            .find(|importer| importer.can_import(file_path))
            .ok_or_else(|| ImportError::UnsupportedFormat {
                format: file_path
                    .extension()
                    .map(|ext| ext.to_string_lossy().to_lowercase())
                    .unwrap_or_else(|| "<none>".to_string()),
            })?;

        tracing::debug!(
            file = %file_path.display(),
            format = importer.get_format_name(),
            "Importing activity"
        );
        importer.import_file(file_path)
    }

    /// Check if any importer handles the file
    pub fn can_import_file(&self, file_path: &Path) -> bool {
        self.importers.iter().any(|importer| importer.can_import(file_path))
    }

    /// Import every supported file in a directory in parallel.
    ///
    /// Unreadable files are logged and reported in `failures`; they never
    /// abort the rest of the import.
    pub fn import_directory(&self, dir_path: &Path, show_progress: bool) -> Result<DirectoryImport> {
        let files = self.collect_importable_files(dir_path)?;

        if files.is_empty() {
            tracing::info!(dir = %dir_path.display(), "No importable files found");
            return Ok(DirectoryImport::default());
        }

        let pb = if show_progress {
            let pb = ProgressBar::new(files.len() as u64);
            if let Ok(style) = ProgressStyle::default_bar().template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({msg})",
            ) {
                pb.set_style(style.progress_chars("#>-"));
            }
            pb
        } else {
            ProgressBar::hidden()
        };

        let results: Vec<(PathBuf, Result<Activity>)> = files
            .into_par_iter()
            .map(|file_path| {
                let result = self.import_file(&file_path);
                pb.inc(1);
                (file_path, result)
            })
            .collect();

        pb.finish_with_message("Import complete");

        let mut import = DirectoryImport::default();
        for (file_path, result) in results {
            match result {
                Ok(activity) => {
                    tracing::debug!(
                        file = %file_path.display(),
                        records = activity.records.len(),
                        "Imported activity"
                    );
                    import.activities.push(activity);
                }
                Err(e) => {
                    tracing::warn!(file = %file_path.display(), error = %e, "Skipping unreadable file");
                    import.failures.push((file_path, format!("{:#}", e)));
                }
            }
        }

        Ok(import)
    }

    /// Collect all files that can be imported from a directory, sorted by path
    fn collect_importable_files(&self, dir_path: &Path) -> Result<Vec<PathBuf>> {
        if !dir_path.is_dir() {
            anyhow::bail!("Path is not a directory: {}", dir_path.display());
        }

        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir_path)? {
            let path = entry?.path();
            if path.is_file() && self.can_import_file(&path) {
                files.push(path);
            }
        }
        files.sort();

        Ok(files)
    }
}

impl Default for ImportManager {
    fn default() -> Self {
        Self::new()
    }
}
