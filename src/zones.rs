use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::ZoneSettings;
use crate::error::{AnalysisError, AnalysisResult};
use crate::stats;

/// Heart rate zone, 1 (easiest) to 5 (hardest)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HeartRateZone {
    Zone1,
    Zone2,
    Zone3,
    Zone4,
    Zone5,
}

impl HeartRateZone {
    pub const ALL: [HeartRateZone; 5] = [
        HeartRateZone::Zone1,
        HeartRateZone::Zone2,
        HeartRateZone::Zone3,
        HeartRateZone::Zone4,
        HeartRateZone::Zone5,
    ];

    /// 1-based zone number
    pub fn number(&self) -> u8 {
        match self {
            HeartRateZone::Zone1 => 1,
            HeartRateZone::Zone2 => 2,
            HeartRateZone::Zone3 => 3,
            HeartRateZone::Zone4 => 4,
            HeartRateZone::Zone5 => 5,
        }
    }

    fn index(&self) -> usize {
        self.number() as usize - 1
    }
}

impl std::fmt::Display for HeartRateZone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Zone {}", self.number())
    }
}

/// Samples per heart rate zone
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneDistribution {
    pub counts: [usize; 5],
    /// Samples that carried a heart rate
    pub total: usize,
}

impl ZoneDistribution {
    pub fn count(&self, zone: HeartRateZone) -> usize {
        self.counts[zone.index()]
    }

    /// Share of samples in `zone`, in percent
    pub fn percentage(&self, zone: HeartRateZone) -> Decimal {
        if self.total == 0 {
            return Decimal::ZERO;
        }
        Decimal::from(self.count(zone) as u64 * 100) / Decimal::from(self.total as u64)
    }
}

/// Age-predicted maximum heart rate, `base - age`
pub fn estimate_max_heart_rate(birth_year: i32, current_year: i32, base: u16) -> AnalysisResult<u16> {
    let age = current_year - birth_year;
    if age < 0 {
        return Err(AnalysisError::invalid_parameter(
            "max heart rate",
            "birth_year",
            birth_year,
        ));
    }
    if age >= base as i32 {
        return Err(AnalysisError::invalid_parameter("max heart rate", "age", age));
    }
    Ok(base - age as u16)
}

/// Classifies heart rates into five zones relative to a maximum heart rate
///
/// With the default boundaries:
/// - Z1: < 60% MaxHR
/// - Z2: 60-75% MaxHR
/// - Z3: 75-85% MaxHR
/// - Z4: 85-95% MaxHR
/// - Z5: >= 95% MaxHR
#[derive(Debug, Clone)]
pub struct HeartRateZoneCalculator {
    max_hr: u16,
    /// Exclusive upper bound of zones 1-4 in BPM
    upper_bounds: [f64; 4],
}

impl HeartRateZoneCalculator {
    /// Calculator with the default zone boundaries
    pub fn new(max_hr: u16) -> AnalysisResult<Self> {
        Self::with_settings(max_hr, &ZoneSettings::default())
    }

    pub fn with_settings(max_hr: u16, settings: &ZoneSettings) -> AnalysisResult<Self> {
        if max_hr == 0 {
            return Err(AnalysisError::invalid_parameter("heart rate zones", "max_hr", max_hr));
        }

        let fractions = &settings.zone_upper_fractions;
        if fractions.len() != 4 || fractions.windows(2).any(|w| w[0] >= w[1]) {
            return Err(AnalysisError::invalid_parameter(
                "heart rate zones",
                "zone_upper_fractions",
                format!("{:?}", fractions),
            ));
        }

        let max_hr_decimal = Decimal::from(max_hr);
        let mut upper_bounds = [0.0; 4];
        for (bound, fraction) in upper_bounds.iter_mut().zip(fractions) {
            *bound = (max_hr_decimal * fraction).to_f64().ok_or_else(|| {
                AnalysisError::invalid_parameter("heart rate zones", "fraction", fraction)
            })?;
        }

        Ok(Self { max_hr, upper_bounds })
    }

    pub fn max_hr(&self) -> u16 {
        self.max_hr
    }

    /// Exclusive upper bounds of zones 1-4 in BPM
    pub fn upper_bounds(&self) -> [f64; 4] {
        self.upper_bounds
    }

    /// Zone a heart rate falls into
    pub fn zone_for(&self, heart_rate: f64) -> HeartRateZone {
        let [z1, z2, z3, z4] = self.upper_bounds;
        if heart_rate < z1 {
            HeartRateZone::Zone1
        } else if heart_rate < z2 {
            HeartRateZone::Zone2
        } else if heart_rate < z3 {
            HeartRateZone::Zone3
        } else if heart_rate < z4 {
            HeartRateZone::Zone4
        } else {
            HeartRateZone::Zone5
        }
    }

    /// Count samples per zone, skipping missing heart rates
    pub fn distribution(&self, heart_rates: &[Option<f64>]) -> ZoneDistribution {
        let mut distribution = ZoneDistribution::default();
        for hr in heart_rates.iter().filter_map(|hr| stats::present(*hr)) {
            distribution.counts[self.zone_for(hr).index()] += 1;
            distribution.total += 1;
        }
        distribution
    }
}
