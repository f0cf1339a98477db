//! Spatial patterns across a fixture group and whether they can share one
//! curve.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{ChoreoError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryPattern {
    /// Every fixture moves identically.
    Unison,
    /// Left half mirrors the right half.
    Fan,
    /// Every other fixture is mirrored.
    MirrorSweep,
    /// Right half mirrors the left half.
    Converge,
    /// Phase travels left to right.
    Wave,
    /// Phase travels right to left.
    Chase,
    /// Half-cycle stagger across the group.
    Cascade,
    /// Resting positions fanned out across the range.
    Spread,
    /// Irregular, deterministic phase per fixture.
    Scatter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Symmetry {
    Symmetric,
    Asymmetric,
}

pub const SYMMETRIC_PATTERNS: &[GeometryPattern] = &[
    GeometryPattern::Unison,
    GeometryPattern::Fan,
    GeometryPattern::MirrorSweep,
    GeometryPattern::Converge,
];

pub const ASYMMETRIC_PATTERNS: &[GeometryPattern] = &[
    GeometryPattern::Wave,
    GeometryPattern::Chase,
    GeometryPattern::Cascade,
    GeometryPattern::Spread,
    GeometryPattern::Scatter,
];

const GOLDEN_RATIO_CONJUGATE: f64 = 0.618_033_988_749_894_9;

impl GeometryPattern {
    pub const ALL: [GeometryPattern; 9] = [
        GeometryPattern::Unison,
        GeometryPattern::Fan,
        GeometryPattern::MirrorSweep,
        GeometryPattern::Converge,
        GeometryPattern::Wave,
        GeometryPattern::Chase,
        GeometryPattern::Cascade,
        GeometryPattern::Spread,
        GeometryPattern::Scatter,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            GeometryPattern::Unison => "unison",
            GeometryPattern::Fan => "fan",
            GeometryPattern::MirrorSweep => "mirror_sweep",
            GeometryPattern::Converge => "converge",
            GeometryPattern::Wave => "wave",
            GeometryPattern::Chase => "chase",
            GeometryPattern::Cascade => "cascade",
            GeometryPattern::Spread => "spread",
            GeometryPattern::Scatter => "scatter",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|pattern| pattern.as_str() == id)
    }

    /// How fixture `index` of `count` departs from the group's base curve.
    ///
    /// Phase offsets only show on curves whose generator responds to phase;
    /// the renderer reports the rest.
    pub fn variation(self, index: usize, count: usize) -> FixtureVariation {
        let count = count.max(1);
        let position = index as f64 / count as f64;
        let identity = FixtureVariation::default();

        match self {
            GeometryPattern::Unison => identity,
            GeometryPattern::Fan => FixtureVariation {
                mirrored: index < count / 2,
                ..identity
            },
            GeometryPattern::MirrorSweep => FixtureVariation {
                mirrored: index % 2 == 1,
                ..identity
            },
            GeometryPattern::Converge => FixtureVariation {
                mirrored: index >= count - count / 2 && count > 1,
                ..identity
            },
            GeometryPattern::Wave => FixtureVariation {
                phase_offset: position,
                ..identity
            },
            GeometryPattern::Chase => FixtureVariation {
                phase_offset: -position,
                ..identity
            },
            GeometryPattern::Cascade => FixtureVariation {
                phase_offset: position / 2.0,
                ..identity
            },
            GeometryPattern::Spread => FixtureVariation {
                spread: if count > 1 {
                    2.0 * index as f64 / (count - 1) as f64 - 1.0
                } else {
                    0.0
                },
                ..identity
            },
            GeometryPattern::Scatter => {
                let scattered = index as f64 * GOLDEN_RATIO_CONJUGATE;
                FixtureVariation {
                    phase_offset: scattered - scattered.floor(),
                    ..identity
                }
            }
        }
    }
}

impl fmt::Display for GeometryPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-fixture departure from the shared curve of a group.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FixtureVariation {
    /// Flip around the normalized center (`v → 1 − v`).
    pub mirrored: bool,
    /// Added to the curve phase, in cycles.
    pub phase_offset: f64,
    /// Where the resting position sits inside the available headroom, `[-1, 1]`.
    pub spread: f64,
}

/// Looks `pattern_id` up in the symmetric and asymmetric sets.
pub fn classify(pattern_id: &str) -> Result<Symmetry> {
    let unclassified = || ChoreoError::UnclassifiedGeometry(pattern_id.to_string());
    let pattern = GeometryPattern::from_id(pattern_id).ok_or_else(unclassified)?;

    if SYMMETRIC_PATTERNS.contains(&pattern) {
        Ok(Symmetry::Symmetric)
    } else if ASYMMETRIC_PATTERNS.contains(&pattern) {
        Ok(Symmetry::Asymmetric)
    } else {
        Err(unclassified())
    }
}

/// `true` only for an asymmetric pattern spread over more than one fixture.
///
/// An unclassifiable pattern falls back to a shared curve.
pub fn should_use_per_fixture_curves(pattern_id: &str, fixture_count: usize) -> bool {
    if fixture_count <= 1 {
        return false;
    }
    match classify(pattern_id) {
        Ok(Symmetry::Asymmetric) => true,
        Ok(Symmetry::Symmetric) => false,
        Err(_) => false,
    }
}

/// Resting position for a fixture spread by `spread ∈ [-1, 1]`.
///
/// The offset is scaled by the headroom left once the swing `center ±
/// amplitude/2` is accounted for, so the spread curve never leaves `[0, 1]`.
pub fn spread_center(center: f64, amplitude: f64, spread: f64) -> f64 {
    let headroom = (0.5 - amplitude / 2.0 - (center - 0.5).abs()).max(0.0);
    center + spread.clamp(-1.0, 1.0) * headroom
}
