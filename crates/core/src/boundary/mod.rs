//! Keeps generated motion inside each fixture's physically safe range.
//!
//! Enforcement never fails on curve content: out-of-range samples are clamped
//! and flagged. Only a malformed envelope is an error.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{ChoreoError, CurvePoint, Result, SampledCurve};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Pan,
    Tilt,
    Dimmer,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::Pan => "pan",
            Axis::Tilt => "tilt",
            Axis::Dimmer => "dimmer",
        };
        f.write_str(name)
    }
}

/// Allowed channel range for one axis, in normalized channel units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisLimits {
    pub min: f64,
    pub max: f64,
}

impl Default for AxisLimits {
    fn default() -> Self {
        Self { min: 0.0, max: 1.0 }
    }
}

impl AxisLimits {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Converts limits given in degrees on an axis spanning `range_degrees`.
    pub fn from_degrees(min_degrees: f64, max_degrees: f64, range_degrees: f64) -> Self {
        Self {
            min: min_degrees / range_degrees,
            max: max_degrees / range_degrees,
        }
    }

    fn validate(&self, axis: Axis) -> Result<()> {
        if !(self.min.is_finite() && self.max.is_finite()) {
            return Err(ChoreoError::InvalidInput(format!(
                "{axis} limits must be finite"
            )));
        }
        if self.min > self.max {
            return Err(ChoreoError::InvertedEnvelope {
                axis,
                min: self.min,
                max: self.max,
            });
        }
        if self.min < 0.0 || self.max > 1.0 {
            return Err(ChoreoError::InvalidInput(format!(
                "{axis} limits [{}, {}] leave the channel range [0, 1]",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

/// Mechanical orientation of a fixture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Calibration {
    /// Pan channel value that faces the audience; curve value 0.5 lands here.
    pub pan_front: f64,
    /// Tilt channel value curve value 0.5 lands on.
    pub tilt_zero: f64,
    /// Tilt channel value pointing straight up.
    pub tilt_up: f64,
    /// Share of the pan channel a full 0..1 curve swing covers.
    pub pan_span: f64,
    pub tilt_span: f64,
    pub pan_degrees: f64,
    pub tilt_degrees: f64,
    pub invert_pan: bool,
    pub invert_tilt: bool,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            pan_front: 0.5,
            tilt_zero: 0.5,
            tilt_up: 0.5 + 90.0 / 270.0,
            pan_span: 1.0,
            tilt_span: 1.0,
            pan_degrees: 540.0,
            tilt_degrees: 270.0,
            invert_pan: false,
            invert_tilt: false,
        }
    }
}

impl Calibration {
    pub fn is_inverted(&self, axis: Axis) -> bool {
        match axis {
            Axis::Pan => self.invert_pan,
            Axis::Tilt => self.invert_tilt,
            Axis::Dimmer => false,
        }
    }

    /// Moves a normalized curve value onto the channel using the fixture's
    /// reference positions. Dimmer values pass through.
    pub fn translate(&self, axis: Axis, v: f64) -> f64 {
        match axis {
            Axis::Pan => self.pan_front + (v - 0.5) * self.pan_span,
            Axis::Tilt => self.tilt_zero + (v - 0.5) * self.tilt_span,
            Axis::Dimmer => v,
        }
    }
}

/// Safe-movement envelope of one fixture.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureEnvelope {
    pub pan: AxisLimits,
    pub tilt: AxisLimits,
    pub dimmer: AxisLimits,
    /// Keep pan within a quarter turn of front and tilt on the front side of
    /// straight up.
    pub avoid_backward: bool,
    pub calibration: Calibration,
}

impl FixtureEnvelope {
    pub fn limits(&self, axis: Axis) -> AxisLimits {
        match axis {
            Axis::Pan => self.pan,
            Axis::Tilt => self.tilt,
            Axis::Dimmer => self.dimmer,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for axis in [Axis::Pan, Axis::Tilt, Axis::Dimmer] {
            self.limits(axis).validate(axis)?;
        }
        Ok(())
    }

    /// Forward-facing window for `axis`, or `None` when the axis has no
    /// backward half (or `avoid_backward` is off).
    fn forward_window(&self, axis: Axis) -> Option<(f64, f64)> {
        if !self.avoid_backward {
            return None;
        }
        let cal = &self.calibration;
        match axis {
            Axis::Pan => {
                let quarter = 90.0 / cal.pan_degrees;
                Some((cal.pan_front - quarter, cal.pan_front + quarter))
            }
            Axis::Tilt if cal.tilt_zero <= cal.tilt_up => Some((f64::NEG_INFINITY, cal.tilt_up)),
            Axis::Tilt => Some((cal.tilt_up, f64::INFINITY)),
            Axis::Dimmer => None,
        }
    }

    /// Range every enforced sample ends up in: the axis limits, narrowed by
    /// the forward window when `avoid_backward` is set.
    pub fn effective_range(&self, axis: Axis) -> Result<(f64, f64)> {
        let limits = self.limits(axis);
        limits.validate(axis)?;

        match self.forward_window(axis) {
            None => Ok((limits.min, limits.max)),
            Some((lo, hi)) => {
                let (lo, hi) = (limits.min.max(lo), limits.max.min(hi));
                if lo > hi {
                    Err(ChoreoError::NoForwardRange { axis })
                } else {
                    Ok((lo, hi))
                }
            }
        }
    }
}

/// Why a sample was moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClampReason {
    BelowMin,
    AboveMax,
    Backward,
}

/// Curve in channel space after enforcement, with one flag per sample.
#[derive(Debug, Clone, PartialEq)]
pub struct EnforcedCurve {
    axis: Axis,
    curve: SampledCurve,
    clamps: Vec<Option<ClampReason>>,
}

impl EnforcedCurve {
    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn curve(&self) -> &SampledCurve {
        &self.curve
    }

    pub fn into_curve(self) -> SampledCurve {
        self.curve
    }

    pub fn clamps(&self) -> &[Option<ClampReason>] {
        &self.clamps
    }

    pub fn clamped_count(&self) -> usize {
        self.clamps.iter().filter(|c| c.is_some()).count()
    }

    pub fn count_reason(&self, reason: ClampReason) -> usize {
        self.clamps.iter().filter(|c| **c == Some(reason)).count()
    }

    /// Share of samples that were altered, in `[0, 1]`.
    pub fn clamp_fraction(&self) -> f64 {
        if self.clamps.is_empty() {
            0.0
        } else {
            self.clamped_count() as f64 / self.clamps.len() as f64
        }
    }

    /// `true` when more than `threshold` of the samples were clamped.
    pub fn exceeds(&self, threshold: f64) -> bool {
        self.clamp_fraction() > threshold
    }
}

/// Anything that can be placed into channel space for enforcement.
///
/// A normalized [`SampledCurve`] is translated through the fixture's
/// calibration; an [`EnforcedCurve`] is already in channel space, which makes
/// [`enforce`] idempotent.
pub trait ChannelSource {
    fn channel_points(&self, envelope: &FixtureEnvelope, axis: Axis) -> Vec<(f64, f64)>;
}

impl ChannelSource for SampledCurve {
    fn channel_points(&self, envelope: &FixtureEnvelope, axis: Axis) -> Vec<(f64, f64)> {
        self.points()
            .iter()
            .map(|p| (p.t(), envelope.calibration.translate(axis, p.v())))
            .collect()
    }
}

impl ChannelSource for EnforcedCurve {
    fn channel_points(&self, _envelope: &FixtureEnvelope, _axis: Axis) -> Vec<(f64, f64)> {
        self.curve.points().iter().map(|p| (p.t(), p.v())).collect()
    }
}

/// Translates, clamps to the axis limits, then clamps out of the backward
/// half. Returns a new curve; the input is untouched.
pub fn enforce<C>(curve: &C, envelope: &FixtureEnvelope, axis: Axis) -> Result<EnforcedCurve>
where
    C: ChannelSource + ?Sized,
{
    let limits = envelope.limits(axis);
    let (lo, hi) = envelope.effective_range(axis)?;

    let raw = curve.channel_points(envelope, axis);
    let mut points = Vec::with_capacity(raw.len());
    let mut clamps = Vec::with_capacity(raw.len());

    for (t, v) in raw {
        let reason = if v.is_nan() || v < limits.min {
            Some(ClampReason::BelowMin)
        } else if v > limits.max {
            Some(ClampReason::AboveMax)
        } else if v < lo || v > hi {
            Some(ClampReason::Backward)
        } else {
            None
        };
        let value = if v.is_nan() { lo } else { v.clamp(lo, hi) };

        points.push(CurvePoint::new(t, value)?);
        clamps.push(reason);
    }

    Ok(EnforcedCurve {
        axis,
        curve: SampledCurve::new(points)?,
        clamps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CurveRegistry, ParamOverrides};

    fn sine(amplitude: f64, center: f64) -> SampledCurve {
        CurveRegistry::standard()
            .resolve(
                "sine",
                Some(64),
                &ParamOverrides {
                    amplitude: Some(amplitude),
                    center: Some(center),
                    ..Default::default()
                },
            )
            .unwrap()
    }

    fn narrow_pan() -> FixtureEnvelope {
        FixtureEnvelope {
            pan: AxisLimits::new(0.3, 0.7),
            ..Default::default()
        }
    }

    #[test]
    fn in_range_curves_pass_through_untouched() {
        let curve = sine(0.3, 0.5);
        let enforced = enforce(&curve, &narrow_pan(), Axis::Pan).unwrap();

        assert_eq!(enforced.clamped_count(), 0);
        for (got, want) in enforced.curve().values().zip(curve.values()) {
            assert!((got - want).abs() < 1e-12);
        }
    }

    #[test]
    fn clamps_and_flags_out_of_range_samples() {
        let curve = sine(1.0, 0.5);
        let enforced = enforce(&curve, &narrow_pan(), Axis::Pan).unwrap();

        assert!(enforced.clamped_count() > 0);
        assert!(enforced.count_reason(ClampReason::AboveMax) > 0);
        assert!(enforced.count_reason(ClampReason::BelowMin) > 0);
        assert!(enforced
            .curve()
            .values()
            .all(|v| (0.3..=0.7).contains(&v)));
        assert!(enforced.exceeds(0.1));
        // The input curve is not modified.
        assert!(curve.max_value() > 0.99);
    }

    #[test]
    fn enforcement_is_idempotent() {
        let envelope = FixtureEnvelope {
            pan: AxisLimits::new(0.2, 0.9),
            avoid_backward: true,
            calibration: Calibration {
                pan_front: 0.6,
                pan_span: 0.8,
                ..Default::default()
            },
            ..Default::default()
        };

        for curve in [sine(1.0, 0.5), sine(0.2, 0.8), sine(0.6, 0.1)] {
            let once = enforce(&curve, &envelope, Axis::Pan).unwrap();
            let twice = enforce(&once, &envelope, Axis::Pan).unwrap();
            assert_eq!(twice.curve(), once.curve());
            assert_eq!(twice.clamped_count(), 0);
        }
    }

    #[test]
    fn avoid_backward_keeps_pan_near_front() {
        let envelope = FixtureEnvelope {
            avoid_backward: true,
            ..Default::default()
        };
        let enforced = enforce(&sine(1.0, 0.5), &envelope, Axis::Pan).unwrap();
        let quarter = 90.0 / 540.0;

        assert!(enforced.count_reason(ClampReason::Backward) > 0);
        assert!(enforced
            .curve()
            .values()
            .all(|v| v >= 0.5 - quarter - 1e-12 && v <= 0.5 + quarter + 1e-12));
    }

    #[test]
    fn avoid_backward_caps_tilt_at_straight_up() {
        let envelope = FixtureEnvelope {
            avoid_backward: true,
            ..Default::default()
        };
        let enforced = enforce(&sine(1.0, 0.5), &envelope, Axis::Tilt).unwrap();
        let up = envelope.calibration.tilt_up;

        assert!(enforced.curve().max_value() <= up);
        assert!(enforced.curve().min_value() < 0.01);
    }

    #[test]
    fn inverted_limits_are_fatal() {
        let envelope = FixtureEnvelope {
            tilt: AxisLimits::new(0.8, 0.2),
            ..Default::default()
        };
        let err = enforce(&sine(0.5, 0.5), &envelope, Axis::Tilt).unwrap_err();
        assert!(matches!(err, ChoreoError::InvertedEnvelope { axis: Axis::Tilt, .. }));
        assert!(envelope.validate().is_err());
    }

    #[test]
    fn disjoint_forward_window_is_fatal() {
        let envelope = FixtureEnvelope {
            pan: AxisLimits::new(0.0, 0.1),
            avoid_backward: true,
            ..Default::default()
        };
        assert!(matches!(
            enforce(&sine(0.5, 0.5), &envelope, Axis::Pan),
            Err(ChoreoError::NoForwardRange { axis: Axis::Pan })
        ));
    }

    #[test]
    fn calibration_offsets_the_center() {
        let envelope = FixtureEnvelope {
            calibration: Calibration {
                pan_front: 0.25,
                ..Default::default()
            },
            ..Default::default()
        };
        let flat = SampledCurve::constant(0.5, 4).unwrap();
        let enforced = enforce(&flat, &envelope, Axis::Pan).unwrap();
        assert!(enforced.curve().values().all(|v| v == 0.25));
    }

    #[test]
    fn degree_limits_normalize() {
        let limits = AxisLimits::from_degrees(90.0, 450.0, 540.0);
        assert!((limits.min - 1.0 / 6.0).abs() < 1e-12);
        assert!((limits.max - 5.0 / 6.0).abs() < 1e-12);
    }
}
