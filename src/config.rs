use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::EffortError;
use crate::logging::LogConfig;
use crate::power::MergeStrategy;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application metadata
    pub metadata: ConfigMetadata,

    /// EKG peak detection and heart-rate estimation
    pub ekg: EkgSettings,

    /// Power curve windows and merge behaviour
    pub power: PowerCurveSettings,

    /// Heart rate zone boundaries
    pub zones: ZoneSettings,

    /// Logging output
    pub logging: LogConfig,
}

/// Configuration metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigMetadata {
    /// Configuration format version
    pub version: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

/// Empirical constants of the EKG estimator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EkgSettings {
    /// Recording sample rate used to turn sample deltas into seconds
    pub sample_rate_hz: f64,

    /// Subsampling stride applied before peak detection
    pub respacing_factor: usize,

    /// Standard deviations above the mean for the peak threshold
    pub std_multiplier: f64,

    /// Fixed offset added to the threshold (mV) for baseline drift
    pub threshold_offset_mv: f64,

    /// Number of BPM values in the smoothing window
    pub window_size: usize,

    /// BPM values above this are detection artifacts
    pub max_bpm: f64,
}

/// Power curve window configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerCurveSettings {
    /// Canonical window durations in seconds
    pub window_sizes: Vec<u32>,

    /// Extra long windows appended for the extended curve
    pub extended_window_sizes: Vec<u32>,

    /// How several traces are merged into one curve
    pub merge_strategy: MergeStrategy,
}

/// Heart rate zone configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneSettings {
    /// Base of the age-predicted max HR formula (base - age)
    pub max_hr_base: u16,

    /// Upper bound (exclusive) of zones 1-4 as fractions of max HR
    pub zone_upper_fractions: Vec<Decimal>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let now = Utc::now();

        AppConfig {
            metadata: ConfigMetadata {
                version: "1.0".to_string(),
                created_at: now,
                updated_at: now,
            },
            ekg: EkgSettings::default(),
            power: PowerCurveSettings::default(),
            zones: ZoneSettings::default(),
            logging: LogConfig::default(),
        }
    }
}

impl Default for EkgSettings {
    fn default() -> Self {
        EkgSettings {
            sample_rate_hz: 500.0,
            respacing_factor: 5,
            std_multiplier: 2.0,
            threshold_offset_mv: 5.0,
            window_size: 10,
            max_bpm: 300.0,
        }
    }
}

impl Default for PowerCurveSettings {
    fn default() -> Self {
        PowerCurveSettings {
            window_sizes: vec![
                1, 5, 10, 30, 60, 120, 300, 600, 900, 1200, 1500, 1800, 3600,
            ],
            extended_window_sizes: vec![6000, 7200, 9000],
            merge_strategy: MergeStrategy::Concatenate,
        }
    }
}

impl Default for ZoneSettings {
    fn default() -> Self {
        ZoneSettings {
            max_hr_base: 220,
            zone_upper_fractions: vec![dec!(0.60), dec!(0.75), dec!(0.85), dec!(0.95)],
        }
    }
}

impl PowerCurveSettings {
    /// Windows to evaluate, ascending and deduplicated
    pub fn windows(&self, extended: bool) -> Vec<u32> {
        let mut windows = self.window_sizes.clone();
        if extended {
            windows.extend_from_slice(&self.extended_window_sizes);
        }
        crate::power::normalize_windows(&windows)
    }
}

/// Configuration management implementation
impl AppConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;

        config
            .validate()
            .map_err(|e| EffortError::Configuration(e.to_string()))?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.metadata.updated_at = Utc::now();

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let toml_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".effortrs")
            .join("config.toml")
    }

    /// Load configuration with fallback to defaults
    pub fn load_or_default() -> Self {
        let config_path = Self::default_config_path();

        match Self::load_from_file(&config_path) {
            Ok(config) => config,
            Err(err) => {
                tracing::debug!(
                    path = %config_path.display(),
                    error = %err,
                    "Config file not usable, using defaults"
                );
                Self::default()
            }
        }
    }

    /// Reject settings the analyses cannot work with
    pub fn validate(&self) -> Result<()> {
        let ekg = &self.ekg;
        if !(ekg.sample_rate_hz > 0.0) {
            anyhow::bail!("ekg.sample_rate_hz must be positive, got {}", ekg.sample_rate_hz);
        }
        if ekg.respacing_factor == 0 {
            anyhow::bail!("ekg.respacing_factor must be at least 1");
        }
        if ekg.window_size == 0 {
            anyhow::bail!("ekg.window_size must be at least 1");
        }
        if !(ekg.max_bpm > 0.0) {
            anyhow::bail!("ekg.max_bpm must be positive, got {}", ekg.max_bpm);
        }

        if self.power.windows(true).is_empty() {
            anyhow::bail!("power.window_sizes must contain at least one non-zero window");
        }

        let fractions = &self.zones.zone_upper_fractions;
        if fractions.len() != 4 {
            anyhow::bail!(
                "zones.zone_upper_fractions needs 4 boundaries, got {}",
                fractions.len()
            );
        }
        if fractions.windows(2).any(|w| w[0] >= w[1]) || fractions[0] <= Decimal::ZERO {
            anyhow::bail!("zones.zone_upper_fractions must be positive and strictly ascending");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.metadata.version, deserialized.metadata.version);
        assert_eq!(config.ekg, deserialized.ekg);
        assert_eq!(config.power, deserialized.power);
        assert_eq!(config.zones, deserialized.zones);
    }

    #[test]
    fn test_default_windows() {
        let settings = PowerCurveSettings::default();
        let canonical = settings.windows(false);
        assert_eq!(canonical.first(), Some(&1));
        assert_eq!(canonical.last(), Some(&3600));

        let extended = settings.windows(true);
        assert_eq!(extended.last(), Some(&9000));
        assert!(extended.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_config_file_io() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let mut original = AppConfig::default();
        original.ekg.threshold_offset_mv = 7.5;
        original.power.merge_strategy = MergeStrategy::PerTraceMax;

        original.save_to_file(&config_path).unwrap();
        let loaded = AppConfig::load_from_file(&config_path).unwrap();

        assert_eq!(loaded.ekg.threshold_offset_mv, 7.5);
        assert_eq!(loaded.power.merge_strategy, MergeStrategy::PerTraceMax);
    }

    #[test]
    fn test_validation_rejects_bad_settings() {
        let mut config = AppConfig::default();
        assert!(config.validate().is_ok());

        config.ekg.respacing_factor = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.zones.zone_upper_fractions = vec![dec!(0.75), dec!(0.60), dec!(0.85), dec!(0.95)];
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.power.window_sizes = vec![0];
        config.power.extended_window_sizes = vec![];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_file_is_configuration_error() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        let mut config = AppConfig::default();
        config.ekg.window_size = 0;
        config.save_to_file(&config_path).unwrap();

        let err = AppConfig::load_from_file(&config_path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EffortError>(),
            Some(EffortError::Configuration(_))
        ));
    }
}
