use std::collections::BTreeMap;

use choreo_core::{
    multiply_points, render, Axis, AxisLimits, BeatGrid, ChoreoError, ChoreographyPlan,
    CurvePoint, CurveRegistry, DurationCategory, FixtureConfig, FixtureEnvelope, FixtureRig,
    IntensityLevel, Lane, OutputCurve, ParamOverrides, Placement, PlanningTimeReference,
    RenderConfig, RenderWarning, Section, TimeReference, TimingHint, TimingResolver,
};

fn grid() -> BeatGrid {
    BeatGrid::uniform(120.0, 4, 16).unwrap()
}

fn rig() -> FixtureRig {
    FixtureRig {
        fixtures: (1..=4)
            .map(|i| FixtureConfig::new(format!("mh{i}")))
            .collect(),
        groups: BTreeMap::from([(
            "movers".to_string(),
            (1..=4).map(|i| format!("mh{i}")).collect(),
        )]),
    }
}

fn placement(curve: &str, geometry: &str, duration: DurationCategory) -> Placement {
    Placement {
        target: "movers".into(),
        section: "chorus".into(),
        curve: curve.into(),
        envelope: None,
        geometry: geometry.into(),
        axis: Axis::Pan,
        intensity: IntensityLevel::Medium,
        lane: Lane::Rhythm,
        start: PlanningTimeReference::new(1, 1),
        duration,
        duration_bias: None,
        cycles: Some(2.0),
        center: None,
        params: ParamOverrides::default(),
        representation: Default::default(),
    }
}

fn plan(placements: Vec<Placement>) -> ChoreographyPlan {
    ChoreographyPlan {
        sections: vec![Section::new("intro", 0, 4), Section::new("chorus", 4, 8)],
        placements,
    }
}

#[test]
fn planning_times_resolve_against_the_grid() {
    let grid = grid();
    let timing = TimingResolver::new(&grid);
    let downbeat = PlanningTimeReference::new(1, 1);

    assert_eq!(timing.resolve_time(&downbeat.into(), 0).unwrap(), 0.0);
    let off_beat = downbeat.with_hint(TimingHint::And);
    assert_eq!(timing.resolve_time(&off_beat.into(), 0).unwrap(), 250.0);

    let intro = Section::new("intro", 0, 4);
    let end = timing
        .resolve_beat_span_end(0.0, DurationCategory::Long.beat_range().unwrap(), 0.5, 8000.0)
        .unwrap();
    assert_eq!(end, 3000);
    assert_eq!(timing.resolve_section_end(&intro).unwrap(), 8000);
    assert!(matches!(
        timing.resolve_time(&TimeReference::Planning(PlanningTimeReference::new(17, 1)), 0),
        Err(ChoreoError::BarNotInGrid { bar: 17, .. })
    ));
}

#[test]
fn multiplying_flat_curves() {
    let half = [CurvePoint::new(0.0, 0.5).unwrap(), CurvePoint::new(1.0, 0.5).unwrap()];
    let full = [CurvePoint::new(0.0, 1.0).unwrap(), CurvePoint::new(1.0, 1.0).unwrap()];

    let product = multiply_points(&half, &full, Some(4)).unwrap();
    assert_eq!(product.len(), 4);
    assert!(product.values().all(|v| v == 0.5));
}

#[test]
fn renders_a_section_across_a_group() {
    let out = render(
        &plan(vec![
            placement("sine", "wave", DurationCategory::Long),
            placement("swell", "unison", DurationCategory::Section),
        ]),
        &grid(),
        &rig(),
        &CurveRegistry::standard(),
        &RenderConfig::default(),
    )
    .unwrap();

    assert_eq!(out.fixtures.len(), 4);
    for segments in out.fixtures.values() {
        assert_eq!(segments.len(), 2);
        // Chorus starts at bar 5 = 8000 ms; Long at bias 0.5 is 6 beats.
        let wave = segments.iter().find(|s| s.curve_id == "sine").unwrap();
        assert_eq!((wave.start_ms, wave.end_ms), (8000, 11_000));
        let swell = segments.iter().find(|s| s.curve_id == "swell").unwrap();
        assert_eq!((swell.start_ms, swell.end_ms), (8000, 24_000));
        assert!(!swell.curve.is_native());
    }

    // Swell is PARTIAL: the cycle count is dropped and reported.
    assert!(out.diagnostics.warnings.iter().any(|w| matches!(
        w,
        RenderWarning::ParameterIgnored { curve, .. } if curve == "swell"
    )));
    assert_eq!(out.diagnostics.curves.len(), 8);
    assert!(out.diagnostics.curves.iter().all(|c| c.clamped_samples == 0));
}

#[test]
fn envelope_layering_drops_the_native_form() {
    let mut layered = placement("sine", "unison", DurationCategory::Medium);
    layered.envelope = Some("ease_out_quad".into());

    let out = render(
        &plan(vec![layered]),
        &grid(),
        &rig(),
        &CurveRegistry::standard(),
        &RenderConfig::default(),
    )
    .unwrap();

    let segment = &out.fixtures["mh1"][0];
    match &segment.curve {
        OutputCurve::Points { points } => {
            // ease_out_quad starts at 0, so the product does too.
            assert_eq!(points[0].value, 0);
        }
        OutputCurve::Native { .. } => panic!("layered curves are sampled"),
    }
}

#[test]
fn clamping_is_reported_not_hidden() {
    let mut rig = rig();
    let tight = FixtureEnvelope {
        pan: AxisLimits::new(0.0, 0.5),
        ..Default::default()
    };
    rig.fixtures[2] = FixtureConfig::new("mh3").with_envelope(tight);

    let mut loud = placement("sine", "unison", DurationCategory::Medium);
    loud.intensity = IntensityLevel::Extreme;
    let out = render(
        &plan(vec![loud]),
        &grid(),
        &rig,
        &CurveRegistry::standard(),
        &RenderConfig::default(),
    )
    .unwrap();

    let flagged: Vec<&str> = out
        .diagnostics
        .warnings
        .iter()
        .filter_map(|w| match w {
            RenderWarning::ExcessiveClamping { fixture, .. } => Some(fixture.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(flagged, vec!["mh3"]);

    let mh3 = out
        .diagnostics
        .curves
        .iter()
        .find(|c| c.fixture == "mh3")
        .unwrap();
    assert!(mh3.clamp_fraction > 0.4);
    assert!(out.fixtures["mh1"][0].curve.is_native());
    assert!(!out.fixtures["mh3"][0].curve.is_native());
}

#[test]
fn plan_errors_abort_the_render() {
    let registry = CurveRegistry::standard();
    let config = RenderConfig::default();

    let mut orphan = placement("sine", "unison", DurationCategory::Hit);
    orphan.section = "bridge".into();
    assert!(matches!(
        render(&plan(vec![orphan]), &grid(), &rig(), &registry, &config),
        Err(ChoreoError::UnknownSection(_))
    ));

    let mut late = placement("sine", "unison", DurationCategory::Hit);
    late.start = PlanningTimeReference::new(13, 1);
    assert!(matches!(
        render(&plan(vec![late]), &grid(), &rig(), &registry, &config),
        Err(ChoreoError::BarNotInGrid { .. })
    ));

    let bad_config = RenderConfig {
        snap_grid_ms: 0,
        ..RenderConfig::default()
    };
    assert!(matches!(
        render(&plan(vec![]), &grid(), &rig(), &registry, &bad_config),
        Err(ChoreoError::InvalidConfig(_))
    ));
}

#[test]
fn output_serializes_to_json() {
    let out = render(
        &plan(vec![placement("square", "chase", DurationCategory::Short)]),
        &grid(),
        &rig(),
        &CurveRegistry::standard(),
        &RenderConfig::default(),
    )
    .unwrap();

    let json = serde_json::to_value(&out).unwrap();
    assert_eq!(json["fixtures"]["mh2"][0]["curve"]["kind"], "native");
    assert_eq!(json["fixtures"]["mh2"][0]["curve"]["shape"], "square");
}
