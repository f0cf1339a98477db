//! Classification of curves by family and by which scaling parameters their
//! generator honors.
//!
//! The parameterization level is metadata, but it is enforced: anything that
//! rescales a curve by intensity goes through [`check_overrides`] (strict) or
//! [`partition_overrides`] (drop and report).

use std::fmt;

use serde::{Deserialize, Serialize};

use super::ParamOverrides;
use crate::{ChoreoError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveFamily {
    Wave,
    Easing,
    Dynamic,
    Musical,
    Noise,
    Parametric,
}

/// Which of amplitude, frequency and center a generator actually responds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterizationLevel {
    /// Amplitude, frequency and center.
    Full,
    /// Amplitude and center; the cycle structure is baked in.
    Partial,
    /// Cycle count only; the value range is fixed.
    TimingOnly,
    /// Nothing; the shape is fixed.
    Fixed,
}

impl ParameterizationLevel {
    pub fn honors(self, param: ScalingParam) -> bool {
        match self {
            ParameterizationLevel::Full => true,
            ParameterizationLevel::Partial => {
                matches!(param, ScalingParam::Amplitude | ScalingParam::Center)
            }
            ParameterizationLevel::TimingOnly => matches!(param, ScalingParam::Frequency),
            ParameterizationLevel::Fixed => false,
        }
    }
}

impl fmt::Display for ParameterizationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParameterizationLevel::Full => "FULL",
            ParameterizationLevel::Partial => "PARTIAL",
            ParameterizationLevel::TimingOnly => "TIMING_ONLY",
            ParameterizationLevel::Fixed => "FIXED",
        };
        f.write_str(name)
    }
}

/// The guarded parameters. Shape parameters (phase, duty, decay, seed, ...)
/// are free for every curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalingParam {
    Amplitude,
    Frequency,
    Center,
}

impl ScalingParam {
    pub const ALL: [ScalingParam; 3] = [
        ScalingParam::Amplitude,
        ScalingParam::Frequency,
        ScalingParam::Center,
    ];

    fn is_set(self, overrides: &ParamOverrides) -> bool {
        match self {
            ScalingParam::Amplitude => overrides.amplitude.is_some(),
            ScalingParam::Frequency => overrides.frequency.is_some(),
            ScalingParam::Center => overrides.center.is_some(),
        }
    }

    fn clear(self, overrides: &mut ParamOverrides) {
        match self {
            ScalingParam::Amplitude => overrides.amplitude = None,
            ScalingParam::Frequency => overrides.frequency = None,
            ScalingParam::Center => overrides.center = None,
        }
    }
}

impl fmt::Display for ScalingParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalingParam::Amplitude => "amplitude",
            ScalingParam::Frequency => "frequency",
            ScalingParam::Center => "center",
        };
        f.write_str(name)
    }
}

/// Fails on the first scaling override the level does not honor.
pub fn check_overrides(
    curve_id: &str,
    level: ParameterizationLevel,
    overrides: &ParamOverrides,
) -> Result<()> {
    match ScalingParam::ALL
        .into_iter()
        .find(|param| param.is_set(overrides) && !level.honors(*param))
    {
        Some(param) => Err(ChoreoError::ParameterRejected {
            curve: curve_id.to_string(),
            param,
            level,
        }),
        None => Ok(()),
    }
}

/// Splits overrides into the subset the level honors and the names of the
/// scaling parameters that had to be dropped.
pub fn partition_overrides(
    level: ParameterizationLevel,
    overrides: &ParamOverrides,
) -> (ParamOverrides, Vec<ScalingParam>) {
    let mut accepted = overrides.clone();
    let mut dropped = Vec::new();
    for param in ScalingParam::ALL {
        if param.is_set(overrides) && !level.honors(param) {
            param.clear(&mut accepted);
            dropped.push(param);
        }
    }
    (accepted, dropped)
}
