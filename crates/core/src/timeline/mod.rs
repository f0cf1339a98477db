//! Beat grid and the conversion from musical positions to milliseconds.

use serde::{Deserialize, Serialize};

use crate::{ChoreoError, Result};

/// Snapped output time in milliseconds.
pub type Millis = u64;

/// Output time grid every emitted start/end lands on.
pub const DEFAULT_SNAP_GRID_MS: u64 = 20;

/// Bar and beat boundaries for one song, produced by audio analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBeatGrid")]
pub struct BeatGrid {
    bar_boundaries_ms: Vec<f64>,
    beat_boundaries_ms: Vec<f64>,
    beats_per_bar: u32,
    tempo_bpm: f64,
    duration_ms: f64,
}

#[derive(Deserialize)]
struct RawBeatGrid {
    bar_boundaries_ms: Vec<f64>,
    beat_boundaries_ms: Vec<f64>,
    beats_per_bar: u32,
    tempo_bpm: f64,
    duration_ms: f64,
}

impl TryFrom<RawBeatGrid> for BeatGrid {
    type Error = ChoreoError;

    fn try_from(raw: RawBeatGrid) -> Result<Self> {
        Self::new(
            raw.bar_boundaries_ms,
            raw.beat_boundaries_ms,
            raw.beats_per_bar,
            raw.tempo_bpm,
            raw.duration_ms,
        )
    }
}

impl BeatGrid {
    pub fn new(
        bar_boundaries_ms: Vec<f64>,
        beat_boundaries_ms: Vec<f64>,
        beats_per_bar: u32,
        tempo_bpm: f64,
        duration_ms: f64,
    ) -> Result<Self> {
        if bar_boundaries_ms.is_empty() || beat_boundaries_ms.is_empty() {
            return Err(ChoreoError::InvalidGrid(
                "bar and beat boundaries must not be empty".into(),
            ));
        }
        if beats_per_bar == 0 {
            return Err(ChoreoError::InvalidGrid("beats_per_bar must be at least 1".into()));
        }
        if !(tempo_bpm.is_finite() && tempo_bpm > 0.0) {
            return Err(ChoreoError::InvalidGrid(format!("tempo {tempo_bpm} bpm is not positive")));
        }
        if !(duration_ms.is_finite() && duration_ms > 0.0) {
            return Err(ChoreoError::InvalidGrid(format!(
                "duration {duration_ms} ms is not positive"
            )));
        }
        for (name, boundaries) in [("bar", &bar_boundaries_ms), ("beat", &beat_boundaries_ms)] {
            if boundaries.iter().any(|ms| !ms.is_finite() || *ms < 0.0) {
                return Err(ChoreoError::InvalidGrid(format!(
                    "{name} boundaries must be finite and non-negative"
                )));
            }
            if boundaries.windows(2).any(|pair| pair[1] <= pair[0]) {
                return Err(ChoreoError::InvalidGrid(format!(
                    "{name} boundaries must be strictly increasing"
                )));
            }
        }

        Ok(Self {
            bar_boundaries_ms,
            beat_boundaries_ms,
            beats_per_bar,
            tempo_bpm,
            duration_ms,
        })
    }

    /// Evenly spaced grid starting at `0 ms`, handy for fixed-tempo material.
    pub fn uniform(tempo_bpm: f64, beats_per_bar: u32, bars: u32) -> Result<Self> {
        let beat_ms = 60_000.0 / tempo_bpm;
        let beats = bars.checked_mul(beats_per_bar).ok_or_else(|| {
            ChoreoError::InvalidGrid(format!("{bars} bars of {beats_per_bar} beats overflow"))
        })?;
        Self::new(
            (0..bars)
                .map(|bar| f64::from(bar * beats_per_bar) * beat_ms)
                .collect(),
            (0..beats).map(|beat| f64::from(beat) * beat_ms).collect(),
            beats_per_bar,
            tempo_bpm,
            f64::from(beats) * beat_ms,
        )
    }

    pub fn bar_boundaries_ms(&self) -> &[f64] {
        &self.bar_boundaries_ms
    }

    pub fn beat_boundaries_ms(&self) -> &[f64] {
        &self.beat_boundaries_ms
    }

    pub fn beats_per_bar(&self) -> u32 {
        self.beats_per_bar
    }

    pub fn tempo_bpm(&self) -> f64 {
        self.tempo_bpm
    }

    pub fn duration_ms(&self) -> f64 {
        self.duration_ms
    }

    pub fn bar_count(&self) -> usize {
        self.bar_boundaries_ms.len()
    }

    /// Nominal beat length derived from the tempo.
    pub fn beat_ms(&self) -> f64 {
        60_000.0 / self.tempo_bpm
    }

    /// Length of the beat starting at `index`, read from the grid when the
    /// following boundary exists.
    fn beat_length_at(&self, index: usize) -> f64 {
        match (
            self.beat_boundaries_ms.get(index),
            self.beat_boundaries_ms.get(index + 1),
        ) {
            (Some(start), Some(next)) => next - start,
            _ => self.beat_ms(),
        }
    }

    /// Start time of a 0-based song bar.
    pub fn bar_start_ms(&self, bar_index: u32) -> Result<f64> {
        self.bar_boundaries_ms
            .get(bar_index as usize)
            .copied()
            .ok_or(ChoreoError::BarNotInGrid {
                bar: bar_index + 1,
                available: self.bar_count(),
            })
    }

    /// Time at which the bar after `last_bar_index` starts, or the song end.
    pub fn bar_end_ms(&self, last_bar_index: u32) -> Result<f64> {
        self.bar_start_ms(last_bar_index)?;
        Ok(self
            .bar_boundaries_ms
            .get(last_bar_index as usize + 1)
            .copied()
            .unwrap_or(self.duration_ms)
            .min(self.duration_ms))
    }
}

/// Sub-beat nudge attached to a planning-time position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingHint {
    #[default]
    None,
    /// Off-beat: half a beat late.
    And,
    /// An eighth of a beat early.
    Anticipate,
}

impl TimingHint {
    /// Offset in beats.
    pub fn beat_offset(self) -> f64 {
        match self {
            TimingHint::None => 0.0,
            TimingHint::And => 0.5,
            TimingHint::Anticipate => -0.125,
        }
    }
}

/// Section-relative, 1-indexed musical position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanningTimeReference {
    pub bar: u32,
    pub beat: u32,
    #[serde(default)]
    pub timing_hint: TimingHint,
}

impl PlanningTimeReference {
    pub fn new(bar: u32, beat: u32) -> Self {
        Self {
            bar,
            beat,
            timing_hint: TimingHint::None,
        }
    }

    pub fn with_hint(mut self, timing_hint: TimingHint) -> Self {
        self.timing_hint = timing_hint;
        self
    }
}

/// Either a musical position or an already absolute time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeReference {
    Absolute(f64),
    Planning(PlanningTimeReference),
}

impl From<PlanningTimeReference> for TimeReference {
    fn from(reference: PlanningTimeReference) -> Self {
        TimeReference::Planning(reference)
    }
}

/// A named stretch of the song, `bar_count` bars starting at the 0-based song
/// bar `start_bar`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    pub start_bar: u32,
    pub bar_count: u32,
}

impl Section {
    pub fn new(name: impl Into<String>, start_bar: u32, bar_count: u32) -> Self {
        Self {
            name: name.into(),
            start_bar,
            bar_count,
        }
    }
}

/// Resolves musical positions against a [`BeatGrid`] and snaps results onto
/// the output grid.
#[derive(Debug, Clone, Copy)]
pub struct TimingResolver<'a> {
    grid: &'a BeatGrid,
    snap_grid_ms: u64,
}

impl<'a> TimingResolver<'a> {
    pub fn new(grid: &'a BeatGrid) -> Self {
        Self::with_snap_grid(grid, DEFAULT_SNAP_GRID_MS)
    }

    pub fn with_snap_grid(grid: &'a BeatGrid, snap_grid_ms: u64) -> Self {
        Self {
            grid,
            snap_grid_ms: snap_grid_ms.max(1),
        }
    }

    pub fn grid(&self) -> &'a BeatGrid {
        self.grid
    }

    /// Exact (unsnapped) time of `reference` in ms, never below zero.
    ///
    /// `section_start_bar` is the 0-based song bar the section starts on.
    pub fn resolve_time(&self, reference: &TimeReference, section_start_bar: u32) -> Result<f64> {
        let ms = match reference {
            TimeReference::Absolute(ms) => {
                if !ms.is_finite() {
                    return Err(ChoreoError::InvalidInput(format!("absolute time {ms} ms")));
                }
                *ms
            }
            TimeReference::Planning(reference) => {
                self.resolve_planning(reference, section_start_bar)?
            }
        };
        Ok(ms.max(0.0))
    }

    fn resolve_planning(&self, reference: &PlanningTimeReference, section_start_bar: u32) -> Result<f64> {
        if reference.bar == 0 || reference.beat == 0 {
            return Err(ChoreoError::InvalidInput(format!(
                "bar {} beat {} (bars and beats are 1-indexed)",
                reference.bar, reference.beat
            )));
        }

        let song_bar = u64::from(section_start_bar) + u64::from(reference.bar) - 1;
        if song_bar >= self.grid.bar_count() as u64 {
            return Err(ChoreoError::BarNotInGrid {
                bar: u32::try_from(song_bar + 1).unwrap_or(u32::MAX),
                available: self.grid.bar_count(),
            });
        }

        let absolute_beat = song_bar * u64::from(self.grid.beats_per_bar)
            + u64::from(reference.beat - 1);
        let last_beat = self.grid.beat_boundaries_ms.len() - 1;
        let index = (absolute_beat as usize).min(last_beat);

        let beat_start = self.grid.beat_boundaries_ms[index];
        let offset = reference.timing_hint.beat_offset() * self.grid.beat_length_at(index);
        Ok(beat_start + offset)
    }

    /// Snaps `ms` onto the output grid.
    ///
    /// Values past `limit_ms` are clamped to it and floor-snapped so they
    /// never overshoot; everything else is round-snapped (and floor-snapped
    /// instead if rounding would cross the limit).
    pub fn snap(&self, ms: f64, limit_ms: Option<f64>) -> Millis {
        let grid = self.snap_grid_ms as f64;
        let floor = |x: f64| ((x / grid).floor() * grid).max(0.0) as Millis;

        match limit_ms {
            Some(limit) if ms > limit => floor(limit),
            Some(limit) => {
                let rounded = (ms / grid).round() * grid;
                if rounded > limit {
                    floor(limit)
                } else {
                    rounded.max(0.0) as Millis
                }
            }
            None => ((ms / grid).round() * grid).max(0.0) as Millis,
        }
    }

    /// Snapped start of `reference` inside `section`.
    pub fn resolve_start(&self, reference: &TimeReference, section: &Section) -> Result<Millis> {
        let ms = self.resolve_time(reference, section.start_bar)?;
        Ok(self.snap(ms, Some(self.section_end_ms(section)?)))
    }

    /// End of `section`, capped at the song duration.
    pub fn section_end_ms(&self, section: &Section) -> Result<f64> {
        if section.bar_count == 0 {
            return Err(ChoreoError::InvalidInput(format!(
                "section `{}` has no bars",
                section.name
            )));
        }
        let last_bar = section
            .start_bar
            .checked_add(section.bar_count - 1)
            .ok_or(ChoreoError::BarNotInGrid {
                bar: u32::MAX,
                available: self.grid.bar_count(),
            })?;
        self.grid.bar_end_ms(last_bar)
    }

    /// End time for a span of between `min_beats` and `max_beats` beats
    /// starting at `start_ms`, picked by `bias` (0 = min, 1 = max).
    ///
    /// The result is clamped to both `section_end_ms` and the song end.
    pub fn resolve_beat_span_end(
        &self,
        start_ms: f64,
        (min_beats, max_beats): (f64, f64),
        bias: f64,
        section_end_ms: f64,
    ) -> Result<Millis> {
        if !(0.0..=1.0).contains(&bias) {
            return Err(ChoreoError::InvalidInput(format!("duration bias {bias} outside [0, 1]")));
        }
        if !(min_beats >= 0.0 && max_beats >= min_beats) {
            return Err(ChoreoError::InvalidInput(format!(
                "beat range ({min_beats}, {max_beats})"
            )));
        }

        let beats = min_beats + (max_beats - min_beats) * bias;
        let end = start_ms + beats * self.grid.beat_ms();
        let limit = section_end_ms.min(self.grid.duration_ms);
        Ok(self.snap(end, Some(limit)))
    }

    /// Snapped section end, used for spans that last until the section ends.
    pub fn resolve_section_end(&self, section: &Section) -> Result<Millis> {
        let end = self.section_end_ms(section)?;
        Ok(self.snap(end, Some(end.min(self.grid.duration_ms))))
    }
}
