// Library interface for effortrs modules
// The binary and the integration tests both go through this crate root

pub mod config;
pub mod ekg;
pub mod error;
pub mod import;
pub mod logging;
pub mod models;
pub mod power;
pub mod session;
pub mod stats;
pub mod zones;

// Re-export commonly used types for convenience
pub use models::*;
pub use config::{AppConfig, EkgSettings, PowerCurveSettings, ZoneSettings};
pub use ekg::{estimate_heart_rate_average, estimate_heart_rate_series, find_peaks, EkgAnalyzer};
pub use power::{
    accumulate_power_curve, best_effort, build_power_curve, format_time, MergeStrategy,
    PowerCurveBuilder,
};
pub use session::{ActivitySource, DirectorySource, InMemorySource, SessionAnalyzer, SessionSummary};
pub use zones::{HeartRateZone, HeartRateZoneCalculator, ZoneDistribution};
pub use error::{AnalysisError, EffortError, ImportError, Result};
pub use logging::{LogConfig, LogFormat, LogLevel};
