//! The render pipeline: resolve each placement, draw its curve once (or once
//! per fixture for asymmetric geometry), enforce every fixture's envelope and
//! map the result to output channels.

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::boundary::{self, ClampReason};
use crate::categorical::{CategoricalResolver, ResolvedPlacement};
use crate::compose;
use crate::geometry::{self, FixtureVariation, GeometryPattern};
use crate::mapping::{NativeSource, OutputCurve, OutputMapper};
use crate::{
    Axis, BeatGrid, ChoreoError, ChoreographyPlan, CurveRegistry, FixtureConfig, FixtureRig,
    Millis, ParameterizationLevel, Placement, RenderConfig, Result, SampledCurve, ScalingParam,
    TimingResolver,
};

/// One placement's output on one fixture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedSegment {
    /// Index of the placement in the plan.
    pub placement: usize,
    pub curve_id: String,
    pub axis: Axis,
    pub start_ms: Millis,
    pub end_ms: Millis,
    pub curve: OutputCurve,
}

/// Clamp statistics for one enforced curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveDiagnostic {
    pub fixture: String,
    pub placement: usize,
    pub axis: Axis,
    pub clamped_samples: usize,
    pub total_samples: usize,
    pub clamp_fraction: f64,
    pub backward_clamps: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderWarning {
    /// More of the curve was clamped than the configured threshold allows.
    ExcessiveClamping {
        fixture: String,
        placement: usize,
        axis: Axis,
        clamp_fraction: f64,
    },
    /// A scaling parameter was dropped because the curve does not honor it.
    ParameterIgnored {
        placement: usize,
        curve: String,
        param: ScalingParam,
        level: ParameterizationLevel,
    },
    /// An asymmetric pattern staggers phase, but the curve ignores phase, so
    /// every fixture draws the same thing.
    PhaseIgnored {
        placement: usize,
        curve: String,
        geometry: String,
    },
    /// The span collapsed to nothing after snapping and clamping.
    EmptySpan {
        placement: usize,
        start_ms: Millis,
        end_ms: Millis,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub curves: Vec<CurveDiagnostic>,
    pub warnings: Vec<RenderWarning>,
}

impl Diagnostics {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderOutput {
    /// Segments per fixture id, ordered by start time.
    pub fixtures: BTreeMap<String, Vec<RenderedSegment>>,
    pub diagnostics: Diagnostics,
}

/// A curve ready for enforcement, plus its generator when it can still be
/// expressed natively.
struct DrawnCurve {
    curve: SampledCurve,
    source: Option<NativeSource>,
    ignored: Vec<ScalingParam>,
}

struct FixtureRender {
    fixture: String,
    segment: RenderedSegment,
    diagnostic: CurveDiagnostic,
}

#[derive(Debug, Clone, Copy)]
pub struct Renderer<'a> {
    registry: &'a CurveRegistry,
    config: &'a RenderConfig,
}

impl<'a> Renderer<'a> {
    pub fn new(registry: &'a CurveRegistry, config: &'a RenderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { registry, config })
    }

    pub fn render(
        &self,
        plan: &ChoreographyPlan,
        grid: &BeatGrid,
        rig: &FixtureRig,
    ) -> Result<RenderOutput> {
        tracing::info!(
            placements = plan.placements.len(),
            fixtures = rig.fixtures.len(),
            bars = grid.bar_count(),
            "rendering plan"
        );

        let timing = TimingResolver::with_snap_grid(grid, self.config.snap_grid_ms);
        let resolver = CategoricalResolver::new(timing, &self.config.intensity_table, self.registry)
            .with_default_bias(self.config.default_duration_bias);

        let mut output = RenderOutput::default();
        for (index, placement) in plan.placements.iter().enumerate() {
            self.render_placement(index, placement, plan, rig, &resolver, &mut output)?;
        }
        for segments in output.fixtures.values_mut() {
            segments.sort_by_key(|segment| segment.start_ms);
        }

        tracing::info!(
            fixtures = output.fixtures.len(),
            warnings = output.diagnostics.warnings.len(),
            "render complete"
        );
        Ok(output)
    }

    fn render_placement(
        &self,
        index: usize,
        placement: &Placement,
        plan: &ChoreographyPlan,
        rig: &FixtureRig,
        resolver: &CategoricalResolver<'_>,
        output: &mut RenderOutput,
    ) -> Result<()> {
        let section = plan.section(&placement.section)?;
        let fixtures = rig.resolve_target(&placement.target)?;
        geometry::classify(&placement.geometry)?;
        let pattern = GeometryPattern::from_id(&placement.geometry)
            .ok_or_else(|| ChoreoError::UnclassifiedGeometry(placement.geometry.clone()))?;

        let resolved = resolver.resolve_placement(placement, section)?;
        for &param in &resolved.ignored_params {
            self.ignore(index, &resolved, param, output);
        }

        if resolved.end_ms <= resolved.start_ms {
            tracing::warn!(
                placement = index,
                start_ms = resolved.start_ms,
                end_ms = resolved.end_ms,
                "placement collapsed to an empty span"
            );
            output.diagnostics.warnings.push(RenderWarning::EmptySpan {
                placement: index,
                start_ms: resolved.start_ms,
                end_ms: resolved.end_ms,
            });
            return Ok(());
        }

        let count = fixtures.len();
        let per_fixture = geometry::should_use_per_fixture_curves(&placement.geometry, count);
        let staggered = (0..count).any(|i| pattern.variation(i, count).phase_offset != 0.0);
        if per_fixture && staggered && !resolved.curve.generator.responds_to_phase() {
            tracing::warn!(
                placement = index,
                curve = %resolved.curve.id,
                geometry = %pattern,
                "curve ignores phase; staggered fixtures will move identically"
            );
            output.diagnostics.warnings.push(RenderWarning::PhaseIgnored {
                placement: index,
                curve: resolved.curve.id.clone(),
                geometry: placement.geometry.clone(),
            });
        }

        let shared = if per_fixture {
            None
        } else {
            Some(self.draw(&resolved, FixtureVariation::default())?)
        };

        let rendered = fixtures
            .par_iter()
            .enumerate()
            .map(|(position, fixture)| {
                let variation = pattern.variation(position, count);
                let drawn = match &shared {
                    Some(shared) => mirror_if(shared, variation.mirrored),
                    None => self.draw(&resolved, variation)?,
                };
                self.render_fixture(index, placement, &resolved, fixture, drawn)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut spread_ignored = false;
        for (render, drawn_ignored) in rendered {
            spread_ignored |= drawn_ignored.contains(&ScalingParam::Center);
            if render.diagnostic.clamp_fraction > self.config.clamp_warning_threshold {
                tracing::warn!(
                    fixture = %render.fixture,
                    placement = index,
                    axis = %placement.axis,
                    clamp_fraction = render.diagnostic.clamp_fraction,
                    "curve heavily clamped by fixture envelope"
                );
                output.diagnostics.warnings.push(RenderWarning::ExcessiveClamping {
                    fixture: render.fixture.clone(),
                    placement: index,
                    axis: placement.axis,
                    clamp_fraction: render.diagnostic.clamp_fraction,
                });
            }
            output.diagnostics.curves.push(render.diagnostic);
            output
                .fixtures
                .entry(render.fixture)
                .or_default()
                .push(render.segment);
        }
        if spread_ignored && !resolved.ignored_params.contains(&ScalingParam::Center) {
            self.ignore(index, &resolved, ScalingParam::Center, output);
        }
        Ok(())
    }

    fn render_fixture(
        &self,
        index: usize,
        placement: &Placement,
        resolved: &ResolvedPlacement,
        fixture: &FixtureConfig,
        drawn: DrawnCurve,
    ) -> Result<(FixtureRender, Vec<ScalingParam>)> {
        let enforced = boundary::enforce(&drawn.curve, &fixture.envelope, placement.axis)?;
        let mapper = OutputMapper::new(self.config.dmx_resolution);
        let curve = mapper.to_output(
            &enforced,
            drawn.source.as_ref(),
            &fixture.envelope,
            placement.representation,
        );

        let diagnostic = CurveDiagnostic {
            fixture: fixture.id.clone(),
            placement: index,
            axis: placement.axis,
            clamped_samples: enforced.clamped_count(),
            total_samples: enforced.curve().len(),
            clamp_fraction: enforced.clamp_fraction(),
            backward_clamps: enforced.count_reason(ClampReason::Backward),
        };
        let segment = RenderedSegment {
            placement: index,
            curve_id: resolved.curve.id.clone(),
            axis: placement.axis,
            start_ms: resolved.start_ms,
            end_ms: resolved.end_ms,
            curve,
        };
        Ok((
            FixtureRender {
                fixture: fixture.id.clone(),
                segment,
                diagnostic,
            },
            drawn.ignored,
        ))
    }

    /// Samples the placement's curve with `variation` applied.
    fn draw(&self, resolved: &ResolvedPlacement, variation: FixtureVariation) -> Result<DrawnCurve> {
        let definition = &resolved.curve;
        let n_samples = self.config.sample_count;
        let mut overrides = resolved.param_overrides.clone();
        let mut ignored = Vec::new();

        let base = definition.default_params.merged(&overrides);
        if variation.phase_offset != 0.0 {
            overrides.phase = Some(base.phase + variation.phase_offset);
        }
        if variation.spread != 0.0 {
            if definition.level().honors(ScalingParam::Center) {
                overrides.center = Some(geometry::spread_center(
                    base.center,
                    base.amplitude,
                    variation.spread,
                ));
            } else {
                ignored.push(ScalingParam::Center);
            }
        }

        let mut curve = definition.resolve(n_samples, &overrides)?;
        let mut source = Some(NativeSource {
            generator: definition.generator,
            params: definition.default_params.merged(&overrides),
            mirrored: false,
        });

        if let Some(envelope) = &resolved.envelope {
            let shape = envelope.resolve(n_samples, &Default::default())?;
            curve = compose::apply_envelope(&curve, &shape, n_samples)?;
            source = None;
        }

        let drawn = DrawnCurve {
            curve,
            source,
            ignored,
        };
        Ok(mirror_if(&drawn, variation.mirrored))
    }

    fn ignore(
        &self,
        index: usize,
        resolved: &ResolvedPlacement,
        param: ScalingParam,
        output: &mut RenderOutput,
    ) {
        tracing::warn!(
            placement = index,
            curve = %resolved.curve.id,
            %param,
            level = %resolved.curve.level(),
            "curve does not honor parameter; ignored"
        );
        output.diagnostics.warnings.push(RenderWarning::ParameterIgnored {
            placement: index,
            curve: resolved.curve.id.clone(),
            param,
            level: resolved.curve.level(),
        });
    }
}

fn mirror_if(drawn: &DrawnCurve, mirrored: bool) -> DrawnCurve {
    if !mirrored {
        return DrawnCurve {
            curve: drawn.curve.clone(),
            source: drawn.source,
            ignored: drawn.ignored.clone(),
        };
    }
    DrawnCurve {
        curve: drawn.curve.mirrored(),
        source: drawn.source.map(|source| NativeSource {
            mirrored: !source.mirrored,
            ..source
        }),
        ignored: drawn.ignored.clone(),
    }
}

/// Renders `plan` with a fresh [`Renderer`].
pub fn render(
    plan: &ChoreographyPlan,
    grid: &BeatGrid,
    rig: &FixtureRig,
    registry: &CurveRegistry,
    config: &RenderConfig,
) -> Result<RenderOutput> {
    Renderer::new(registry, config)?.render(plan, grid, rig)
}
