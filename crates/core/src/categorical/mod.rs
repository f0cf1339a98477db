//! Turns planning vocabulary (intensity levels, lanes, duration categories,
//! bar/beat positions) into numbers. Nothing categorical leaves this module.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::registry::taxonomy;
use crate::{
    ChoreoError, CurveDefinition, CurveRegistry, Millis, ParamOverrides, Placement, Result,
    ScalingParam, Section, TimeReference, TimingResolver,
};

/// Ordered intensity vocabulary used by the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntensityLevel {
    Smooth,
    Medium,
    Dramatic,
    Intense,
    Extreme,
}

impl IntensityLevel {
    pub const ALL: [IntensityLevel; 5] = [
        IntensityLevel::Smooth,
        IntensityLevel::Medium,
        IntensityLevel::Dramatic,
        IntensityLevel::Intense,
        IntensityLevel::Extreme,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for IntensityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IntensityLevel::Smooth => "SMOOTH",
            IntensityLevel::Medium => "MEDIUM",
            IntensityLevel::Dramatic => "DRAMATIC",
            IntensityLevel::Intense => "INTENSE",
            IntensityLevel::Extreme => "EXTREME",
        };
        f.write_str(name)
    }
}

/// Layering tier. The same level weighs more on higher lanes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lane {
    Base,
    Rhythm,
    Accent,
}

impl Lane {
    pub const ALL: [Lane; 3] = [Lane::Base, Lane::Rhythm, Lane::Accent];

    fn index(self) -> usize {
        self as usize
    }
}

/// Amplitude per `(level, lane)`.
///
/// Construction guarantees `BASE < RHYTHM < ACCENT` at every level, values in
/// `(0, 1]`, and no lane getting weaker as the level rises.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "IntensityRows", into = "IntensityRows")]
pub struct IntensityTable {
    rows: [[f64; 3]; 5],
}

/// Serialized form of [`IntensityTable`]: `[base, rhythm, accent]` per level.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct IntensityRows {
    smooth: [f64; 3],
    medium: [f64; 3],
    dramatic: [f64; 3],
    intense: [f64; 3],
    extreme: [f64; 3],
}

impl TryFrom<IntensityRows> for IntensityTable {
    type Error = ChoreoError;

    fn try_from(rows: IntensityRows) -> Result<Self> {
        Self::new([
            rows.smooth,
            rows.medium,
            rows.dramatic,
            rows.intense,
            rows.extreme,
        ])
    }
}

impl From<IntensityTable> for IntensityRows {
    fn from(table: IntensityTable) -> Self {
        let [smooth, medium, dramatic, intense, extreme] = table.rows;
        Self {
            smooth,
            medium,
            dramatic,
            intense,
            extreme,
        }
    }
}

impl IntensityTable {
    pub fn new(rows: [[f64; 3]; 5]) -> Result<Self> {
        for (level, row) in IntensityLevel::ALL.into_iter().zip(rows.iter()) {
            if let Some(value) = row.iter().find(|v| !(**v > 0.0 && **v <= 1.0)) {
                return Err(ChoreoError::InvalidIntensityTable(format!(
                    "{level} amplitude {value} outside (0, 1]"
                )));
            }
            if !(row[0] < row[1] && row[1] < row[2]) {
                return Err(ChoreoError::InvalidIntensityTable(format!(
                    "{level} must satisfy base < rhythm < accent, got {row:?}"
                )));
            }
        }

        for lane in Lane::ALL {
            let column = lane.index();
            if let Some(pair) = rows.windows(2).position(|w| w[1][column] < w[0][column]) {
                return Err(ChoreoError::InvalidIntensityTable(format!(
                    "{lane:?} lane weakens from {} to {}",
                    IntensityLevel::ALL[pair],
                    IntensityLevel::ALL[pair + 1]
                )));
            }
        }

        Ok(Self { rows })
    }

    pub fn amplitude(&self, level: IntensityLevel, lane: Lane) -> f64 {
        self.rows[level.index()][lane.index()]
    }
}

impl Default for IntensityTable {
    fn default() -> Self {
        Self {
            rows: [
                [0.10, 0.15, 0.22],
                [0.18, 0.26, 0.36],
                [0.28, 0.38, 0.52],
                [0.38, 0.50, 0.68],
                [0.48, 0.62, 0.85],
            ],
        }
    }
}

/// How long a placement lasts, in musical terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationCategory {
    Hit,
    Short,
    Medium,
    Long,
    Extended,
    /// Runs until the end of the section.
    Section,
}

impl DurationCategory {
    /// `(min_beats, max_beats)`, or `None` for [`DurationCategory::Section`].
    pub fn beat_range(self) -> Option<(f64, f64)> {
        match self {
            DurationCategory::Hit => Some((0.5, 1.0)),
            DurationCategory::Short => Some((1.0, 2.0)),
            DurationCategory::Medium => Some((2.0, 4.0)),
            DurationCategory::Long => Some((4.0, 8.0)),
            DurationCategory::Extended => Some((8.0, 16.0)),
            DurationCategory::Section => None,
        }
    }
}

/// A placement with every categorical value replaced by a number.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPlacement {
    pub start_ms: Millis,
    pub end_ms: Millis,
    /// Amplitude picked from the intensity table.
    pub intensity: f64,
    /// Overrides the curve's taxonomy accepts.
    pub param_overrides: ParamOverrides,
    /// Scaling parameters the curve could not honor and that were dropped.
    pub ignored_params: Vec<ScalingParam>,
    pub curve: CurveDefinition,
    pub envelope: Option<CurveDefinition>,
}

impl ResolvedPlacement {
    pub fn duration_ms(&self) -> Millis {
        self.end_ms.saturating_sub(self.start_ms)
    }
}

/// Resolves categorical values using a beat grid, an intensity table and the
/// curve registry.
#[derive(Debug, Clone, Copy)]
pub struct CategoricalResolver<'a> {
    timing: TimingResolver<'a>,
    intensities: &'a IntensityTable,
    registry: &'a CurveRegistry,
    default_bias: f64,
}

impl<'a> CategoricalResolver<'a> {
    pub fn new(
        timing: TimingResolver<'a>,
        intensities: &'a IntensityTable,
        registry: &'a CurveRegistry,
    ) -> Self {
        Self {
            timing,
            intensities,
            registry,
            default_bias: 0.5,
        }
    }

    pub fn with_default_bias(mut self, bias: f64) -> Self {
        self.default_bias = bias;
        self
    }

    pub fn timing(&self) -> &TimingResolver<'a> {
        &self.timing
    }

    pub fn resolve_intensity(&self, level: IntensityLevel, lane: Lane) -> f64 {
        self.intensities.amplitude(level, lane)
    }

    /// End time of a span starting at `start` and lasting `category`.
    ///
    /// `Section` ends exactly at the section end; other categories go through
    /// the beat-count path and are clamped to the section and song end.
    pub fn resolve_duration(
        &self,
        start: &TimeReference,
        category: DurationCategory,
        section: &Section,
        bias: Option<f64>,
    ) -> Result<Millis> {
        match category.beat_range() {
            None => self.timing.resolve_section_end(section),
            Some(range) => {
                let start_ms = self.timing.resolve_time(start, section.start_bar)?;
                let section_end = self.timing.section_end_ms(section)?;
                self.timing.resolve_beat_span_end(
                    start_ms,
                    range,
                    bias.unwrap_or(self.default_bias),
                    section_end,
                )
            }
        }
    }

    pub fn resolve_placement(
        &self,
        placement: &Placement,
        section: &Section,
    ) -> Result<ResolvedPlacement> {
        let curve = self.registry.get(&placement.curve)?.clone();
        let envelope = placement
            .envelope
            .as_deref()
            .map(|id| self.registry.get(id).cloned())
            .transpose()?;

        let start = TimeReference::from(placement.start);
        let start_ms = self.timing.resolve_start(&start, section)?;
        let end_ms = self.resolve_duration(
            &start,
            placement.duration,
            section,
            placement.duration_bias,
        )?;

        // Intensity only scales curves that honor amplitude; an explicit
        // amplitude in the plan's params is still checked against the level.
        let intensity = self.resolve_intensity(placement.intensity, placement.lane);
        let amplitude = if curve.level().honors(ScalingParam::Amplitude) {
            Some(intensity)
        } else {
            placement.params.amplitude
        };
        let requested = ParamOverrides {
            amplitude,
            frequency: placement.cycles.or(placement.params.frequency),
            center: placement.center.or(placement.params.center),
            ..placement.params.clone()
        };
        let (param_overrides, ignored_params) =
            taxonomy::partition_overrides(curve.level(), &requested);

        tracing::debug!(
            fixture = %placement.target,
            curve = %curve.id,
            start_ms,
            end_ms,
            intensity,
            "resolved placement"
        );

        Ok(ResolvedPlacement {
            start_ms,
            end_ms,
            intensity,
            param_overrides,
            ignored_params,
            curve,
            envelope,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Axis, BeatGrid, PlanningTimeReference, TimingHint};

    fn placement(curve: &str, duration: DurationCategory) -> Placement {
        Placement {
            target: "front".into(),
            section: "verse".into(),
            curve: curve.into(),
            envelope: None,
            geometry: "unison".into(),
            axis: Axis::Pan,
            intensity: IntensityLevel::Dramatic,
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

    #[test]
    fn lanes_are_strictly_ordered_at_every_level() {
        let table = IntensityTable::default();
        let grid = BeatGrid::uniform(120.0, 4, 8).unwrap();
        let registry = CurveRegistry::standard();
        let resolver = CategoricalResolver::new(TimingResolver::new(&grid), &table, &registry);

        for level in IntensityLevel::ALL {
            let base = resolver.resolve_intensity(level, Lane::Base);
            let rhythm = resolver.resolve_intensity(level, Lane::Rhythm);
            let accent = resolver.resolve_intensity(level, Lane::Accent);
            assert!(base < rhythm && rhythm < accent, "{level}: {base} {rhythm} {accent}");
        }
        assert!(IntensityTable::new(table.rows).is_ok());
    }

    #[test]
    fn table_construction_rejects_lane_inversions() {
        let mut rows = IntensityTable::default().rows;
        rows[2] = [0.5, 0.4, 0.6];
        let err = IntensityTable::new(rows).unwrap_err();
        assert!(format!("{err}").contains("DRAMATIC"));

        let mut rows = IntensityTable::default().rows;
        rows[4][0] = 0.05;
        assert!(IntensityTable::new(rows).is_err());

        let mut rows = IntensityTable::default().rows;
        rows[0][2] = 1.5;
        assert!(IntensityTable::new(rows).is_err());
    }

    #[test]
    fn table_deserialization_is_validated() {
        let json = r#"{
            "smooth": [0.1, 0.2, 0.3],
            "medium": [0.2, 0.3, 0.4],
            "dramatic": [0.3, 0.4, 0.5],
            "intense": [0.4, 0.5, 0.6],
            "extreme": [0.5, 0.6, 0.7]
        }"#;
        let table: IntensityTable = serde_json::from_str(json).unwrap();
        assert_eq!(table.amplitude(IntensityLevel::Intense, Lane::Accent), 0.6);

        let broken = json.replace("[0.1, 0.2, 0.3]", "[0.3, 0.2, 0.1]");
        assert!(serde_json::from_str::<IntensityTable>(&broken).is_err());
    }

    #[test]
    fn long_duration_from_the_downbeat() {
        let table = IntensityTable::default();
        let grid = BeatGrid::uniform(120.0, 4, 8).unwrap();
        let registry = CurveRegistry::standard();
        let resolver = CategoricalResolver::new(TimingResolver::new(&grid), &table, &registry);
        let verse = Section::new("verse", 0, 4);

        let end = resolver
            .resolve_duration(
                &PlanningTimeReference::new(1, 1).into(),
                DurationCategory::Long,
                &verse,
                None,
            )
            .unwrap();
        assert_eq!(end, 3000);

        let off_beat = PlanningTimeReference::new(1, 1).with_hint(TimingHint::And);
        let end = resolver
            .resolve_duration(&off_beat.into(), DurationCategory::Long, &verse, Some(0.0))
            .unwrap();
        assert_eq!(end, 2260);
    }

    #[test]
    fn section_duration_stops_at_the_section_end() {
        let table = IntensityTable::default();
        let grid = BeatGrid::uniform(120.0, 4, 8).unwrap();
        let registry = CurveRegistry::standard();
        let resolver = CategoricalResolver::new(TimingResolver::new(&grid), &table, &registry);
        let chorus = Section::new("chorus", 2, 2);

        let end = resolver
            .resolve_duration(
                &PlanningTimeReference::new(2, 3).into(),
                DurationCategory::Section,
                &chorus,
                None,
            )
            .unwrap();
        assert_eq!(end, 8000);

        let extended = resolver
            .resolve_duration(
                &PlanningTimeReference::new(2, 3).into(),
                DurationCategory::Extended,
                &chorus,
                Some(1.0),
            )
            .unwrap();
        assert!(extended <= 8000);
    }

    #[test]
    fn placement_resolution_applies_taxonomy() {
        let table = IntensityTable::default();
        let grid = BeatGrid::uniform(120.0, 4, 8).unwrap();
        let registry = CurveRegistry::standard();
        let resolver = CategoricalResolver::new(TimingResolver::new(&grid), &table, &registry);
        let verse = Section::new("verse", 0, 4);

        let sine = resolver
            .resolve_placement(&placement("sine", DurationCategory::Long), &verse)
            .unwrap();
        assert_eq!((sine.start_ms, sine.end_ms), (0, 3000));
        assert_eq!(sine.intensity, 0.38);
        assert_eq!(sine.param_overrides.amplitude, Some(0.38));
        assert_eq!(sine.param_overrides.frequency, Some(2.0));
        assert!(sine.ignored_params.is_empty());

        let square = resolver
            .resolve_placement(&placement("square", DurationCategory::Short), &verse)
            .unwrap();
        assert_eq!(square.param_overrides.amplitude, None);
        assert_eq!(square.param_overrides.frequency, Some(2.0));
        assert!(square.ignored_params.is_empty());

        let mut explicit = placement("ease_in_quad", DurationCategory::Short);
        explicit.cycles = None;
        let eased = resolver.resolve_placement(&explicit, &verse).unwrap();
        assert!(eased.ignored_params.is_empty());
        assert!(eased.param_overrides.is_empty());

        explicit.params.amplitude = Some(0.5);
        let eased = resolver.resolve_placement(&explicit, &verse).unwrap();
        assert_eq!(eased.ignored_params, vec![ScalingParam::Amplitude]);

        let err = resolver
            .resolve_placement(&placement("zigzag", DurationCategory::Short), &verse)
            .unwrap_err();
        assert!(matches!(err, ChoreoError::UnknownCurve(id) if id == "zigzag"));
    }
}
