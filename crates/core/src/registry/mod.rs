//! Named curve definitions and their resolution into sampled curves.
//!
//! A [`CurveRegistry`] is built once (usually via [`CurveRegistry::standard`])
//! and then shared read-only by every render pass.

pub mod generators;
pub mod taxonomy;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use generators::Generator;
pub use taxonomy::{CurveFamily, ParameterizationLevel, ScalingParam};

use crate::{ChoreoError, Result, SampledCurve};

/// Sample count used when neither the caller nor the definition picks one.
pub const DEFAULT_SAMPLE_COUNT: usize = 64;

/// Complete parameter set handed to a generator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurveParams {
    /// Peak-to-peak swing as a fraction of the normalized range.
    pub amplitude: f64,
    /// Cycles across the whole curve.
    pub frequency: f64,
    /// Resting value the swing is centered on.
    pub center: f64,
    /// Phase offset in cycles.
    pub phase: f64,
    /// High fraction of a square cycle.
    pub duty: f64,
    /// Exponential decay rate for pulse-like shapes.
    pub decay: f64,
    pub seed: u64,
    /// Secondary frequency multiplier for lissajous figures.
    pub ratio: f64,
    /// Bezier control points `[x1, y1, x2, y2]`.
    pub control: [f64; 4],
}

impl Default for CurveParams {
    fn default() -> Self {
        Self {
            amplitude: 1.0,
            frequency: 1.0,
            center: 0.5,
            phase: 0.0,
            duty: 0.5,
            decay: 4.0,
            seed: 0,
            ratio: 2.0,
            control: [0.42, 0.0, 0.58, 1.0],
        }
    }
}

impl CurveParams {
    /// Returns a copy with every `Some` override applied.
    pub fn merged(&self, overrides: &ParamOverrides) -> Self {
        Self {
            amplitude: overrides.amplitude.unwrap_or(self.amplitude),
            frequency: overrides.frequency.unwrap_or(self.frequency),
            center: overrides.center.unwrap_or(self.center),
            phase: overrides.phase.unwrap_or(self.phase),
            duty: overrides.duty.unwrap_or(self.duty),
            decay: overrides.decay.unwrap_or(self.decay),
            seed: overrides.seed.unwrap_or(self.seed),
            ratio: overrides.ratio.unwrap_or(self.ratio),
            control: overrides.control.unwrap_or(self.control),
        }
    }
}

/// Caller-supplied overrides; `None` keeps the definition's default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamOverrides {
    pub amplitude: Option<f64>,
    pub frequency: Option<f64>,
    pub center: Option<f64>,
    pub phase: Option<f64>,
    pub duty: Option<f64>,
    pub decay: Option<f64>,
    pub seed: Option<u64>,
    pub ratio: Option<f64>,
    pub control: Option<[f64; 4]>,
}

impl ParamOverrides {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A named curve: which generator draws it and with what defaults.
///
/// Family and parameterization level come from the generator so they can never
/// disagree with what the generator actually does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveDefinition {
    pub id: String,
    pub generator: Generator,
    #[serde(default)]
    pub default_params: CurveParams,
    #[serde(default = "default_sample_count")]
    pub default_sample_count: usize,
}

fn default_sample_count() -> usize {
    DEFAULT_SAMPLE_COUNT
}

impl CurveDefinition {
    pub fn new(id: impl Into<String>, generator: Generator) -> Self {
        Self {
            id: id.into(),
            generator,
            default_params: generator.default_params(),
            default_sample_count: DEFAULT_SAMPLE_COUNT,
        }
    }

    pub fn with_params(mut self, params: CurveParams) -> Self {
        self.default_params = params;
        self
    }

    pub fn with_sample_count(mut self, n_samples: usize) -> Self {
        self.default_sample_count = n_samples;
        self
    }

    pub fn family(&self) -> CurveFamily {
        self.generator.family()
    }

    pub fn level(&self) -> ParameterizationLevel {
        self.generator.level()
    }

    /// Samples the curve with `overrides` merged over the defaults.
    ///
    /// Overrides of scaling parameters the curve's level does not honor are
    /// rejected with [`ChoreoError::ParameterRejected`].
    pub fn resolve(
        &self,
        n_samples: Option<usize>,
        overrides: &ParamOverrides,
    ) -> Result<SampledCurve> {
        taxonomy::check_overrides(&self.id, self.level(), overrides)?;
        let params = self.default_params.merged(overrides);
        self.generator
            .generate(n_samples.unwrap_or(self.default_sample_count), &params)
    }
}

/// Lookup table of curve definitions keyed by id.
#[derive(Debug, Clone, Default)]
pub struct CurveRegistry {
    definitions: BTreeMap<String, CurveDefinition>,
}

impl CurveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with one definition per generator, keyed by the generator's
    /// own id.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        for generator in Generator::ALL {
            registry.register(CurveDefinition::new(generator.as_str(), generator));
        }
        registry
    }

    /// Adds or replaces a definition, returning the one it displaced.
    pub fn register(&mut self, definition: CurveDefinition) -> Option<CurveDefinition> {
        self.definitions.insert(definition.id.clone(), definition)
    }

    pub fn get(&self, curve_id: &str) -> Result<&CurveDefinition> {
        self.definitions
            .get(curve_id)
            .ok_or_else(|| ChoreoError::UnknownCurve(curve_id.to_string()))
    }

    pub fn contains(&self, curve_id: &str) -> bool {
        self.definitions.contains_key(curve_id)
    }

    pub fn definitions(&self) -> impl Iterator<Item = &CurveDefinition> {
        self.definitions.values()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Looks up `curve_id` and resolves it. See [`CurveDefinition::resolve`].
    pub fn resolve(
        &self,
        curve_id: &str,
        n_samples: Option<usize>,
        overrides: &ParamOverrides,
    ) -> Result<SampledCurve> {
        self.get(curve_id)?.resolve(n_samples, overrides)
    }
}
