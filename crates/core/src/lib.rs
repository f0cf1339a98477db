//! Core library for beat-quantized movement curves on motorized fixtures.
//!
//! A render pass takes a choreography plan written in musical vocabulary
//! (bars, beats, intensity levels, duration categories), resolves it against
//! a beat grid, draws each placement's curve from the [`CurveRegistry`],
//! spreads it across a fixture group according to its geometry, clamps it
//! into every fixture's safe envelope and quantizes it for DMX output. Each
//! module owns one of those stages.

pub mod boundary;
pub mod categorical;
pub mod compose;
pub mod config;
pub mod curve;
pub mod error;
pub mod geometry;
pub mod mapping;
pub mod plan;
pub mod registry;
pub mod render;
pub mod timeline;

pub use boundary::{
    enforce, Axis, AxisLimits, Calibration, ChannelSource, ClampReason, EnforcedCurve,
    FixtureEnvelope,
};
pub use categorical::{
    CategoricalResolver, DurationCategory, IntensityLevel, IntensityTable, Lane,
    ResolvedPlacement,
};
pub use compose::{apply_envelope, multiply, multiply_points};
pub use config::RenderConfig;
pub use curve::{CurvePoint, SampledCurve};
pub use error::{ChoreoError, Result};
pub use geometry::{
    classify, should_use_per_fixture_curves, FixtureVariation, GeometryPattern, Symmetry,
};
pub use mapping::{
    DmxResolution, NativeShape, NativeSource, OutputCurve, OutputMapper, OutputPoint,
    RepresentationHint,
};
pub use plan::{ChoreographyPlan, FixtureConfig, FixtureRig, Placement};
pub use registry::{
    CurveDefinition, CurveFamily, CurveParams, CurveRegistry, Generator, ParamOverrides,
    ParameterizationLevel, ScalingParam,
};
pub use render::{
    render, CurveDiagnostic, Diagnostics, RenderOutput, RenderWarning, RenderedSegment, Renderer,
};
pub use timeline::{
    BeatGrid, Millis, PlanningTimeReference, Section, TimeReference, TimingHint, TimingResolver,
};
