//! Final, purely mechanical step: channel inversion, DMX quantization and the
//! choice between a compact native curve and an explicit point list.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::{Axis, CurveParams, EnforcedCurve, FixtureEnvelope, Generator};

/// Whether the output format may receive a parametric curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepresentationHint {
    /// Native when the curve has an output-format equivalent, points otherwise.
    #[default]
    Auto,
    /// Always emit points.
    Points,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DmxResolution {
    /// One channel, 0..=255.
    #[default]
    Eight,
    /// Coarse + fine channels, 0..=65535.
    Sixteen,
}

impl DmxResolution {
    pub fn max_value(self) -> u16 {
        match self {
            DmxResolution::Eight => u8::MAX as u16,
            DmxResolution::Sixteen => u16::MAX,
        }
    }

    /// Quantizes a channel fraction in `[0, 1]`.
    pub fn quantize(self, x: f64) -> u16 {
        let x = if x.is_nan() { 0.0 } else { x.clamp(0.0, 1.0) };
        (x * f64::from(self.max_value())).round() as u16
    }

    /// Splits a value into its coarse and (for 16-bit) fine channel bytes.
    pub fn coarse_fine(self, value: u16) -> (u8, Option<u8>) {
        match self {
            DmxResolution::Eight => (value.min(u16::from(u8::MAX)) as u8, None),
            DmxResolution::Sixteen => {
                let [coarse, fine] = value.to_be_bytes();
                (coarse, Some(fine))
            }
        }
    }
}

/// Shapes the output format can draw itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NativeShape {
    Sine,
    Cosine,
    Triangle,
    Sawtooth,
    Square,
    Linear,
}

impl NativeShape {
    pub fn for_generator(generator: Generator) -> Option<Self> {
        match generator {
            Generator::Sine => Some(NativeShape::Sine),
            Generator::Cosine => Some(NativeShape::Cosine),
            Generator::Triangle => Some(NativeShape::Triangle),
            Generator::Sawtooth => Some(NativeShape::Sawtooth),
            Generator::Square => Some(NativeShape::Square),
            Generator::Linear => Some(NativeShape::Linear),
            _ => None,
        }
    }

    /// Unit shape in `[0, 1]` at time `t`, so that a native curve evaluates to
    /// `low + (high - low) * unit(t)`.
    pub fn unit(self, t: f64, cycles: f64, phase: f64, duty: f64) -> f64 {
        let x = cycles * t + phase;
        let frac = x - x.floor();
        match self {
            NativeShape::Sine => 0.5 + 0.5 * (TAU * x).sin(),
            NativeShape::Cosine => 0.5 + 0.5 * (TAU * x).cos(),
            NativeShape::Triangle => {
                let shifted = x - 0.25;
                2.0 * (shifted - shifted.floor() - 0.5).abs()
            }
            NativeShape::Sawtooth => frac,
            NativeShape::Square => {
                if frac < duty {
                    1.0
                } else {
                    0.0
                }
            }
            NativeShape::Linear => t,
        }
    }
}

/// Where a curve came from, when it came straight out of the registry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NativeSource {
    pub generator: Generator,
    pub params: CurveParams,
    pub mirrored: bool,
}

impl NativeSource {
    /// Normalized values at the unit shape's 0 and 1, or `None` when the
    /// generator would have saturated.
    fn normalized_bounds(&self) -> Option<(f64, f64)> {
        let p = &self.params;
        let (lo, hi) = match self.generator.level() {
            crate::ParameterizationLevel::Full => {
                (p.center - p.amplitude / 2.0, p.center + p.amplitude / 2.0)
            }
            _ => (0.0, 1.0),
        };
        if lo < 0.0 || hi > 1.0 {
            return None;
        }
        if self.mirrored {
            Some((1.0 - lo, 1.0 - hi))
        } else {
            Some((lo, hi))
        }
    }
}

/// Time fraction with a quantized channel value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputPoint {
    pub t: OrderedFraction,
    pub value: u16,
}

/// `f64` time fraction stored as parts-per-million so points stay `Eq`.
pub type OrderedFraction = u32;

const FRACTION_SCALE: f64 = 1_000_000.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutputCurve {
    Native {
        shape: NativeShape,
        cycles: f64,
        phase: f64,
        duty: f64,
        /// Channel value at the bottom of the unit shape.
        low: u16,
        /// Channel value at the top of the unit shape (may be below `low`
        /// for inverted or mirrored curves).
        high: u16,
    },
    Points {
        points: Vec<OutputPoint>,
    },
}

impl OutputCurve {
    pub fn is_native(&self) -> bool {
        matches!(self, OutputCurve::Native { .. })
    }

    /// Channel value at time fraction `t`.
    pub fn value_at(&self, t: f64) -> f64 {
        match self {
            OutputCurve::Native {
                shape,
                cycles,
                phase,
                duty,
                low,
                high,
            } => {
                let unit = shape.unit(t, *cycles, *phase, *duty);
                f64::from(*low) + (f64::from(*high) - f64::from(*low)) * unit
            }
            OutputCurve::Points { points } => {
                let target = (t * FRACTION_SCALE).round();
                let idx = points.partition_point(|p| f64::from(p.t) <= target);
                match (idx.checked_sub(1).and_then(|i| points.get(i)), points.get(idx)) {
                    (Some(a), Some(b)) => {
                        let span = f64::from(b.t) - f64::from(a.t);
                        let frac = (target - f64::from(a.t)) / span;
                        f64::from(a.value) + (f64::from(b.value) - f64::from(a.value)) * frac
                    }
                    (Some(a), None) => f64::from(a.value),
                    (None, Some(b)) => f64::from(b.value),
                    (None, None) => 0.0,
                }
            }
        }
    }
}

/// Converts enforced channel curves into output curves.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputMapper {
    resolution: DmxResolution,
}

impl OutputMapper {
    pub fn new(resolution: DmxResolution) -> Self {
        Self { resolution }
    }

    pub fn resolution(&self) -> DmxResolution {
        self.resolution
    }

    /// Applies channel inversion and quantization.
    ///
    /// A native curve is emitted only when the hint allows it, the curve came
    /// unmodified from a generator with a native equivalent, enforcement
    /// clamped nothing, and the shape's analytic extremes lie inside the
    /// envelope. Everything else becomes a point list.
    pub fn to_output(
        &self,
        curve: &EnforcedCurve,
        source: Option<&NativeSource>,
        envelope: &FixtureEnvelope,
        hint: RepresentationHint,
    ) -> OutputCurve {
        let axis = curve.axis();
        let channel = |x: f64| self.resolution.quantize(self.invert(envelope, axis, x));

        if hint == RepresentationHint::Auto && curve.clamped_count() == 0 {
            if let Some(native) = source.and_then(|s| self.native(s, envelope, axis)) {
                return native;
            }
        }

        let points = curve
            .curve()
            .points()
            .iter()
            .map(|p| OutputPoint {
                t: (p.t() * FRACTION_SCALE).round() as OrderedFraction,
                value: channel(p.v()),
            })
            .collect();
        OutputCurve::Points { points }
    }

    fn native(
        &self,
        source: &NativeSource,
        envelope: &FixtureEnvelope,
        axis: Axis,
    ) -> Option<OutputCurve> {
        let shape = NativeShape::for_generator(source.generator)?;
        let (lo, hi) = source.normalized_bounds()?;

        // The drawn shape reaches its analytic extremes even where no sample
        // landed on them, so those extremes must sit inside the envelope too.
        let (min, max) = envelope.effective_range(axis).ok()?;
        let (lo, hi) = (
            envelope.calibration.translate(axis, lo),
            envelope.calibration.translate(axis, hi),
        );
        if [lo, hi].iter().any(|x| !(min..=max).contains(x)) {
            return None;
        }
        let channel = |x: f64| self.resolution.quantize(self.invert(envelope, axis, x));

        let p = &source.params;
        let (cycles, phase) = match shape {
            NativeShape::Linear => (1.0, 0.0),
            _ => (p.frequency, p.phase),
        };
        Some(OutputCurve::Native {
            shape,
            cycles,
            phase,
            duty: p.duty,
            low: channel(lo),
            high: channel(hi),
        })
    }

    fn invert(&self, envelope: &FixtureEnvelope, axis: Axis, x: f64) -> f64 {
        if envelope.calibration.is_inverted(axis) {
            1.0 - x
        } else {
            x
        }
    }
}
