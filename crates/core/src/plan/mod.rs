//! Input documents: the choreography plan produced upstream and the fixture
//! rig it targets.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    Axis, ChoreoError, DurationCategory, FixtureEnvelope, IntensityLevel, Lane, ParamOverrides,
    PlanningTimeReference, RepresentationHint, Result, Section,
};

/// One movement instruction, still in planning vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    /// Fixture id or group name.
    pub target: String,
    pub section: String,
    pub curve: String,
    /// Optional curve multiplied over the main curve.
    #[serde(default)]
    pub envelope: Option<String>,
    pub geometry: String,
    pub axis: Axis,
    pub intensity: IntensityLevel,
    #[serde(default = "default_lane")]
    pub lane: Lane,
    pub start: PlanningTimeReference,
    pub duration: DurationCategory,
    #[serde(default)]
    pub duration_bias: Option<f64>,
    /// Cycles across the span.
    #[serde(default)]
    pub cycles: Option<f64>,
    #[serde(default)]
    pub center: Option<f64>,
    #[serde(default)]
    pub params: ParamOverrides,
    #[serde(default)]
    pub representation: RepresentationHint,
}

fn default_lane() -> Lane {
    Lane::Base
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChoreographyPlan {
    pub sections: Vec<Section>,
    pub placements: Vec<Placement>,
}

impl ChoreographyPlan {
    pub fn section(&self, name: &str) -> Result<&Section> {
        self.sections
            .iter()
            .find(|section| section.name == name)
            .ok_or_else(|| ChoreoError::UnknownSection(name.to_string()))
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureConfig {
    pub id: String,
    #[serde(default)]
    pub envelope: FixtureEnvelope,
}

impl FixtureConfig {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            envelope: FixtureEnvelope::default(),
        }
    }

    pub fn with_envelope(mut self, envelope: FixtureEnvelope) -> Self {
        self.envelope = envelope;
        self
    }
}

/// Fixtures plus named, ordered groups of fixture ids.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FixtureRig {
    pub fixtures: Vec<FixtureConfig>,
    #[serde(default)]
    pub groups: BTreeMap<String, Vec<String>>,
}

impl FixtureRig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let rig: Self = serde_json::from_str(json)?;
        rig.validate()?;
        Ok(rig)
    }

    pub fn fixture(&self, id: &str) -> Result<&FixtureConfig> {
        self.fixtures
            .iter()
            .find(|fixture| fixture.id == id)
            .ok_or_else(|| ChoreoError::UnknownFixture(id.to_string()))
    }

    /// Checks every envelope and that groups only name known fixtures.
    pub fn validate(&self) -> Result<()> {
        for fixture in &self.fixtures {
            fixture.envelope.validate()?;
        }
        for members in self.groups.values() {
            for id in members {
                self.fixture(id)?;
            }
        }
        Ok(())
    }

    /// Fixtures addressed by `target`, in group order. Group names win over
    /// fixture ids.
    pub fn resolve_target(&self, target: &str) -> Result<Vec<&FixtureConfig>> {
        match self.groups.get(target) {
            Some(members) => members.iter().map(|id| self.fixture(id)).collect(),
            None => self
                .fixture(target)
                .map(|fixture| vec![fixture])
                .map_err(|_| ChoreoError::UnknownFixture(target.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rig() -> FixtureRig {
        FixtureRig {
            fixtures: ["mh1", "mh2", "mh3"].into_iter().map(FixtureConfig::new).collect(),
            groups: BTreeMap::from([(
                "back".to_string(),
                vec!["mh3".to_string(), "mh1".to_string()],
            )]),
        }
    }

    #[test]
    fn resolves_groups_in_order_and_single_fixtures() {
        let rig = rig();
        let ids: Vec<&str> = rig
            .resolve_target("back")
            .unwrap()
            .iter()
            .map(|f| f.id.as_str())
            .collect();
        assert_eq!(ids, vec!["mh3", "mh1"]);
        assert_eq!(rig.resolve_target("mh2").unwrap()[0].id, "mh2");
        assert!(matches!(
            rig.resolve_target("front"),
            Err(ChoreoError::UnknownFixture(ref id)) if id == "front"
        ));
    }

    #[test]
    fn groups_must_name_known_fixtures() {
        let mut rig = rig();
        rig.groups.insert("all".into(), vec!["mh1".into(), "mh9".into()]);
        assert!(matches!(rig.validate(), Err(ChoreoError::UnknownFixture(ref id)) if id == "mh9"));
    }

    #[test]
    fn parses_a_plan_with_defaults() {
        let plan = ChoreographyPlan::from_json_str(
            r#"{
                "sections": [{ "name": "verse", "start_bar": 0, "bar_count": 8 }],
                "placements": [{
                    "target": "back",
                    "section": "verse",
                    "curve": "sine",
                    "geometry": "wave",
                    "axis": "pan",
                    "intensity": "dramatic",
                    "start": { "bar": 1, "beat": 1, "timing_hint": "and" },
                    "duration": "medium"
                }]
            }"#,
        )
        .unwrap();

        let placement = &plan.placements[0];
        assert_eq!(placement.lane, Lane::Base);
        assert!(placement.params.is_empty());
        assert_eq!(placement.representation, RepresentationHint::Auto);
        assert_eq!(plan.section("verse").unwrap().bar_count, 8);
        assert!(matches!(plan.section("chorus"), Err(ChoreoError::UnknownSection(_))));
    }
}
