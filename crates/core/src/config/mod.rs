use serde::{Deserialize, Serialize};

use crate::{ChoreoError, DmxResolution, IntensityTable, Result};

/// Top-level render configuration. Every field has a default, so an empty
/// JSON object is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Output time grid; every start and end lands on a multiple of this.
    pub snap_grid_ms: u64,
    /// Samples per curve. `None` lets each curve definition decide.
    pub sample_count: Option<usize>,
    /// Fraction of clamped samples above which a curve is flagged.
    pub clamp_warning_threshold: f64,
    pub dmx_resolution: DmxResolution,
    /// Where a span lands inside its duration category when the placement
    /// does not say.
    pub default_duration_bias: f64,
    pub intensity_table: IntensityTable,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            snap_grid_ms: crate::timeline::DEFAULT_SNAP_GRID_MS,
            sample_count: None,
            clamp_warning_threshold: 0.10,
            dmx_resolution: DmxResolution::Eight,
            default_duration_bias: 0.5,
            intensity_table: IntensityTable::default(),
        }
    }
}

impl RenderConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.snap_grid_ms == 0 {
            return Err(ChoreoError::InvalidConfig("snap_grid_ms must be positive".into()));
        }
        if matches!(self.sample_count, Some(n) if n < 2) {
            return Err(ChoreoError::InvalidConfig(format!(
                "sample_count {:?} is below 2",
                self.sample_count
            )));
        }
        if !(0.0..=1.0).contains(&self.clamp_warning_threshold) {
            return Err(ChoreoError::InvalidConfig(format!(
                "clamp_warning_threshold {} outside [0, 1]",
                self.clamp_warning_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.default_duration_bias) {
            return Err(ChoreoError::InvalidConfig(format!(
                "default_duration_bias {} outside [0, 1]",
                self.default_duration_bias
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let config = RenderConfig::from_json_str("{}").unwrap();
        assert_eq!(config, RenderConfig::default());
        assert_eq!(config.snap_grid_ms, 20);
        assert_eq!(config.clamp_warning_threshold, 0.10);
    }

    #[test]
    fn rejects_out_of_range_values() {
        for json in [
            r#"{"snap_grid_ms": 0}"#,
            r#"{"sample_count": 1}"#,
            r#"{"clamp_warning_threshold": 1.5}"#,
            r#"{"default_duration_bias": -0.1}"#,
        ] {
            assert!(
                matches!(RenderConfig::from_json_str(json), Err(ChoreoError::InvalidConfig(_))),
                "{json} should be rejected"
            );
        }
    }

    #[test]
    fn intensity_table_is_validated_on_load() {
        let json = r#"{"intensity_table": {
            "smooth": [0.3, 0.2, 0.1],
            "medium": [0.18, 0.26, 0.36],
            "dramatic": [0.28, 0.38, 0.52],
            "intense": [0.38, 0.50, 0.68],
            "extreme": [0.48, 0.62, 0.85]
        }}"#;
        assert!(RenderConfig::from_json_str(json).is_err());
    }

    #[test]
    fn reads_sixteen_bit_output() {
        let config = RenderConfig::from_json_str(r#"{"dmx_resolution": "sixteen"}"#).unwrap();
        assert_eq!(config.dmx_resolution, DmxResolution::Sixteen);
    }
}
