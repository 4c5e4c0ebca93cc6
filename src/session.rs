//! Accumulated analyses across many activities
//!
//! Activities come from an [`ActivitySource`] handed to the analyzer, so the
//! same summary runs over a directory of files, an embedded store or a fixed
//! list in tests.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::{AppConfig, PowerCurveSettings};
use crate::import::ImportManager;
use crate::models::{Activity, PowerCurve, PowerSummary, PowerTrace};
use crate::power::{self, MergeStrategy, PowerCurveBuilder};

/// Supplier of activities for a session summary
pub trait ActivitySource {
    fn activities(&self) -> Result<Vec<Activity>>;
}

/// Every importable activity file in one directory
pub struct DirectorySource {
    dir: PathBuf,
    manager: ImportManager,
    show_progress: bool,
}

impl DirectorySource {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            manager: ImportManager::new(),
            show_progress: false,
        }
    }

    /// Show a progress bar while files are parsed
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ActivitySource for DirectorySource {
    fn activities(&self) -> Result<Vec<Activity>> {
        let import = self
            .manager
            .import_directory(&self.dir, self.show_progress)
            .with_context(|| format!("Failed to read activities from {}", self.dir.display()))?;

        if !import.failures.is_empty() {
            tracing::warn!(
                dir = %self.dir.display(),
                skipped = import.failures.len(),
                imported = import.activities.len(),
                "Some activity files were skipped"
            );
        }

        Ok(import.activities)
    }
}

/// Fixed list of activities
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    activities: Vec<Activity>,
}

impl InMemorySource {
    pub fn new(activities: Vec<Activity>) -> Self {
        Self { activities }
    }
}

impl ActivitySource for InMemorySource {
    fn activities(&self) -> Result<Vec<Activity>> {
        Ok(self.activities.clone())
    }
}

/// Best efforts and peaks across all activities of a source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub activity_count: usize,

    /// Highest heart rate measured in any activity
    pub max_heart_rate: Option<f64>,

    pub power_curve: PowerCurve,

    /// Mean and peak over every power sample of every activity
    pub power_summary: Option<PowerSummary>,
}

/// Builds a [`SessionSummary`] from an injected activity source
#[derive(Debug, Clone, Default)]
pub struct SessionAnalyzer {
    builder: PowerCurveBuilder,
}

impl SessionAnalyzer {
    pub fn new(settings: PowerCurveSettings) -> Self {
        Self {
            builder: PowerCurveBuilder::new(settings),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.power.clone())
    }

    /// Include the extended long windows in the curve
    pub fn extended(mut self, extended: bool) -> Self {
        self.builder = self.builder.extended(extended);
        self
    }

    /// Pull every activity from `source` and summarize it
    pub fn summarize(&self, source: &dyn ActivitySource) -> Result<SessionSummary> {
        let activities = source.activities().context("Failed to load activities")?;
        Ok(self.summarize_activities(&activities))
    }

    /// Summary with an explicit merge strategy
    pub fn summarize_with(
        &self,
        source: &dyn ActivitySource,
        strategy: MergeStrategy,
    ) -> Result<SessionSummary> {
        let activities = source.activities().context("Failed to load activities")?;
        let traces = Self::traces(&activities);
        Ok(self.build_summary(&activities, self.builder.accumulate_with(&traces, strategy)))
    }

    pub fn summarize_activities(&self, activities: &[Activity]) -> SessionSummary {
        let traces = Self::traces(activities);
        self.build_summary(activities, self.builder.accumulate(&traces))
    }

    fn traces(activities: &[Activity]) -> Vec<PowerTrace> {
        activities
            .iter()
            .map(Activity::power_trace)
            .filter(PowerTrace::has_power)
            .collect()
    }

    fn build_summary(&self, activities: &[Activity], power_curve: PowerCurve) -> SessionSummary {
        let max_heart_rate = activities
            .iter()
            .filter_map(Activity::max_heart_rate)
            .fold(None, |acc: Option<f64>, hr| Some(acc.map_or(hr, |a| a.max(hr))));

        let all_power: Vec<Option<f64>> = activities
            .iter()
            .flat_map(|a| a.records.iter().map(|r| r.power))
            .collect();

        tracing::debug!(
            activities = activities.len(),
            windows = power_curve.len(),
            "Session summarized"
        );

        SessionSummary {
            activity_count: activities.len(),
            max_heart_rate,
            power_curve,
            power_summary: power::summarize_power(&all_power),
        }
    }
}
