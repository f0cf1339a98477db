//! The closed set of curve generators.
//!
//! Every generator is a pure function of `(n_samples, params)`. Adding a
//! variant to [`Generator`] forces every match below to be updated.

use std::f64::consts::{PI, TAU};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::taxonomy::{CurveFamily, ParameterizationLevel};
use super::CurveParams;
use crate::{ChoreoError, Result, SampledCurve};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Generator {
    Sine,
    Cosine,
    Triangle,
    Sawtooth,
    Square,
    Linear,
    EaseInQuad,
    EaseOutQuad,
    EaseInOutSine,
    EaseInOutCubic,
    EaseOutBounce,
    Pulse,
    Elastic,
    BounceDecay,
    BeatPulse,
    Swell,
    AccentHit,
    SmoothNoise,
    Lissajous,
    Bezier,
}

impl Generator {
    pub const ALL: [Generator; 20] = [
        Generator::Sine,
        Generator::Cosine,
        Generator::Triangle,
        Generator::Sawtooth,
        Generator::Square,
        Generator::Linear,
        Generator::EaseInQuad,
        Generator::EaseOutQuad,
        Generator::EaseInOutSine,
        Generator::EaseInOutCubic,
        Generator::EaseOutBounce,
        Generator::Pulse,
        Generator::Elastic,
        Generator::BounceDecay,
        Generator::BeatPulse,
        Generator::Swell,
        Generator::AccentHit,
        Generator::SmoothNoise,
        Generator::Lissajous,
        Generator::Bezier,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Generator::Sine => "sine",
            Generator::Cosine => "cosine",
            Generator::Triangle => "triangle",
            Generator::Sawtooth => "sawtooth",
            Generator::Square => "square",
            Generator::Linear => "linear",
            Generator::EaseInQuad => "ease_in_quad",
            Generator::EaseOutQuad => "ease_out_quad",
            Generator::EaseInOutSine => "ease_in_out_sine",
            Generator::EaseInOutCubic => "ease_in_out_cubic",
            Generator::EaseOutBounce => "ease_out_bounce",
            Generator::Pulse => "pulse",
            Generator::Elastic => "elastic",
            Generator::BounceDecay => "bounce_decay",
            Generator::BeatPulse => "beat_pulse",
            Generator::Swell => "swell",
            Generator::AccentHit => "accent_hit",
            Generator::SmoothNoise => "smooth_noise",
            Generator::Lissajous => "lissajous",
            Generator::Bezier => "bezier",
        }
    }

    pub fn from_id(id: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|g| g.as_str() == id)
            .ok_or_else(|| ChoreoError::UnknownCurve(id.to_string()))
    }

    pub fn family(self) -> CurveFamily {
        match self {
            Generator::Sine
            | Generator::Cosine
            | Generator::Triangle
            | Generator::Sawtooth
            | Generator::Square => CurveFamily::Wave,
            Generator::Linear
            | Generator::EaseInQuad
            | Generator::EaseOutQuad
            | Generator::EaseInOutSine
            | Generator::EaseInOutCubic
            | Generator::EaseOutBounce => CurveFamily::Easing,
            Generator::Pulse | Generator::Elastic | Generator::BounceDecay => CurveFamily::Dynamic,
            Generator::BeatPulse | Generator::Swell | Generator::AccentHit => CurveFamily::Musical,
            Generator::SmoothNoise => CurveFamily::Noise,
            Generator::Lissajous | Generator::Bezier => CurveFamily::Parametric,
        }
    }

    pub fn level(self) -> ParameterizationLevel {
        match self {
            Generator::Sine
            | Generator::Cosine
            | Generator::Triangle
            | Generator::Sawtooth
            | Generator::SmoothNoise
            | Generator::Lissajous => ParameterizationLevel::Full,
            Generator::Elastic | Generator::BounceDecay | Generator::Swell => {
                ParameterizationLevel::Partial
            }
            Generator::Square | Generator::Pulse | Generator::BeatPulse => {
                ParameterizationLevel::TimingOnly
            }
            Generator::Linear
            | Generator::EaseInQuad
            | Generator::EaseOutQuad
            | Generator::EaseInOutSine
            | Generator::EaseInOutCubic
            | Generator::EaseOutBounce
            | Generator::AccentHit
            | Generator::Bezier => ParameterizationLevel::Fixed,
        }
    }

    /// Whether `phase` shifts the drawn curve. Phase-staggered geometry has no
    /// visible effect on the rest.
    pub fn responds_to_phase(self) -> bool {
        match self {
            Generator::Sine
            | Generator::Cosine
            | Generator::Triangle
            | Generator::Sawtooth
            | Generator::Square
            | Generator::Pulse
            | Generator::Elastic
            | Generator::BeatPulse
            | Generator::SmoothNoise
            | Generator::Lissajous => true,
            Generator::Linear
            | Generator::EaseInQuad
            | Generator::EaseOutQuad
            | Generator::EaseInOutSine
            | Generator::EaseInOutCubic
            | Generator::EaseOutBounce
            | Generator::BounceDecay
            | Generator::Swell
            | Generator::AccentHit
            | Generator::Bezier => false,
        }
    }

    /// Parameters a freshly registered definition of this generator starts from.
    pub fn default_params(self) -> CurveParams {
        let base = CurveParams::default();
        match self {
            Generator::Pulse | Generator::BeatPulse => CurveParams {
                frequency: 4.0,
                ..base
            },
            Generator::SmoothNoise => CurveParams {
                frequency: 4.0,
                ..base
            },
            Generator::AccentHit => CurveParams { decay: 6.0, ..base },
            _ => base,
        }
    }

    /// Samples the generator. Values are saturated into `[0, 1]`.
    pub fn generate(self, n_samples: usize, params: &CurveParams) -> Result<SampledCurve> {
        let p = *params;
        match self {
            Generator::Sine => wave(n_samples, &p, |x| (TAU * x).sin()),
            Generator::Cosine => wave(n_samples, &p, |x| (TAU * x).cos()),
            Generator::Triangle => wave(n_samples, &p, |x| 4.0 * (frac(x - 0.25) - 0.5).abs() - 1.0),
            Generator::Sawtooth => wave(n_samples, &p, |x| 2.0 * frac(x) - 1.0),
            Generator::Square => SampledCurve::sample(n_samples, |t| {
                if frac(p.frequency * t + p.phase) < p.duty {
                    1.0
                } else {
                    0.0
                }
            }),
            Generator::Linear => SampledCurve::sample(n_samples, |t| t),
            Generator::EaseInQuad => SampledCurve::sample(n_samples, |t| t * t),
            Generator::EaseOutQuad => SampledCurve::sample(n_samples, |t| 1.0 - (1.0 - t).powi(2)),
            Generator::EaseInOutSine => {
                SampledCurve::sample(n_samples, |t| 0.5 * (1.0 - (PI * t).cos()))
            }
            Generator::EaseInOutCubic => SampledCurve::sample(n_samples, |t| {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }),
            Generator::EaseOutBounce => SampledCurve::sample(n_samples, ease_out_bounce),
            Generator::Pulse => SampledCurve::sample(n_samples, |t| {
                (-p.decay * frac(p.frequency * t + p.phase)).exp()
            }),
            Generator::Elastic => SampledCurve::sample(n_samples, |t| {
                let w = (-p.decay * t).exp() * (TAU * 3.0 * t + TAU * p.phase).cos();
                p.center + p.amplitude / 2.0 * w
            }),
            Generator::BounceDecay => SampledCurve::sample(n_samples, |t| {
                let hop = (3.0 * PI * t).cos().abs() * (-p.decay * t).exp();
                p.center - p.amplitude / 2.0 + p.amplitude * hop
            }),
            Generator::BeatPulse => SampledCurve::sample(n_samples, |t| {
                let x = frac(p.frequency * t + p.phase);
                if x < BEAT_ATTACK {
                    x / BEAT_ATTACK
                } else {
                    (-p.decay * (x - BEAT_ATTACK) / (1.0 - BEAT_ATTACK)).exp()
                }
            }),
            Generator::Swell => SampledCurve::sample(n_samples, |t| {
                p.center - p.amplitude / 2.0 + p.amplitude * (PI * t).sin().powi(2)
            }),
            Generator::AccentHit => SampledCurve::sample(n_samples, |t| {
                if t < HIT_ATTACK {
                    t / HIT_ATTACK
                } else {
                    (-p.decay * (t - HIT_ATTACK)).exp()
                }
            }),
            Generator::SmoothNoise => {
                wave(n_samples, &p, |x| value_noise(p.seed, x))
            }
            Generator::Lissajous => wave(n_samples, &p, |x| (TAU * p.ratio * x).sin()),
            Generator::Bezier => {
                let [x1, y1, x2, y2] = p.control;
                SampledCurve::sample(n_samples, |t| cubic_bezier_ease(t, x1, y1, x2, y2))
            }
        }
    }
}

impl fmt::Display for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const BEAT_ATTACK: f64 = 0.1;
const HIT_ATTACK: f64 = 0.05;
const BEZIER_ITERATIONS: usize = 48;

/// `center ± amplitude/2` swing of a unit waveform evaluated at
/// `frequency * t + phase`.
fn wave(n: usize, p: &CurveParams, shape: impl Fn(f64) -> f64) -> Result<SampledCurve> {
    SampledCurve::sample(n, |t| {
        p.center + p.amplitude / 2.0 * shape(p.frequency * t + p.phase)
    })
}

fn frac(x: f64) -> f64 {
    x - x.floor()
}

fn ease_out_bounce(t: f64) -> f64 {
    const N1: f64 = 7.5625;
    const D1: f64 = 2.75;

    if t < 1.0 / D1 {
        N1 * t * t
    } else if t < 2.0 / D1 {
        let t = t - 1.5 / D1;
        N1 * t * t + 0.75
    } else if t < 2.5 / D1 {
        let t = t - 2.25 / D1;
        N1 * t * t + 0.9375
    } else {
        let t = t - 2.625 / D1;
        N1 * t * t + 0.984375
    }
}

/// CSS-style cubic bezier easing through (0,0), (x1,y1), (x2,y2), (1,1).
/// Solves x(s) = t by bisection with a fixed iteration count.
fn cubic_bezier_ease(t: f64, x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    let bezier = |s: f64, a: f64, b: f64| {
        let inv = 1.0 - s;
        3.0 * inv * inv * s * a + 3.0 * inv * s * s * b + s * s * s
    };

    let (mut lo, mut hi) = (0.0_f64, 1.0_f64);
    for _ in 0..BEZIER_ITERATIONS {
        let mid = 0.5 * (lo + hi);
        if bezier(mid, x1, x2) < t {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    bezier(0.5 * (lo + hi), y1, y2)
}

/// Smooth 1-D value noise in `[-1, 1]`: seeded random lattice values joined by
/// cosine interpolation.
fn value_noise(seed: u64, x: f64) -> f64 {
    let cell = x.floor();
    let local = x - cell;
    let k = cell as i64;
    let a = lattice(seed, k);
    let b = lattice(seed, k + 1);
    let blend = 0.5 * (1.0 - (PI * local).cos());
    a + (b - a) * blend
}

fn lattice(seed: u64, k: i64) -> f64 {
    let mut state = seed ^ (k as u64).wrapping_mul(0xD1B5_4A32_D192_ED03);
    let bits = splitmix64(&mut state);
    (bits >> 11) as f64 / (1u64 << 53) as f64 * 2.0 - 1.0
}

fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
