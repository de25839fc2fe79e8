use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use derive_more::Deref;
use uuid::Uuid;

use crate::{
    ActivationMap, ExerciseID, FatigueConfig, MuscleID, MuscleState, Name, ReadError, UpdateError,
};

#[allow(async_fn_in_trait)]
pub trait TemplateRepository {
    async fn read_templates(&self, category: &Name) -> Result<Vec<WorkoutTemplate>, ReadError>;
    async fn write_template(
        &self,
        template: WorkoutTemplate,
    ) -> Result<WorkoutTemplate, UpdateError>;
}

#[derive(Deref, Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TemplateID(Uuid);

impl TemplateID {
    #[must_use]
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }

    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl From<Uuid> for TemplateID {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<u128> for TemplateID {
    fn from(value: u128) -> Self {
        Self(Uuid::from_bytes(value.to_be_bytes()))
    }
}

/// A named grouping of exercises within a workout category, rotated to
/// balance muscle recovery (e.g. "Legs A" vs "Legs B").
#[derive(Debug, Clone, PartialEq)]
pub struct WorkoutTemplate {
    pub id: TemplateID,
    pub name: Name,
    pub category: Name,
    pub variation: Name,
    pub exercise_ids: Vec<ExerciseID>,
    pub times_used: u32,
    pub favorite: bool,
    pub created_at: DateTime<Utc>,
    pub last_used: Option<DateTime<Utc>>,
}

impl WorkoutTemplate {
    /// The template after a workout has been logged against it.
    #[must_use]
    pub fn used(&self, at: DateTime<Utc>) -> Self {
        Self {
            times_used: self.times_used + 1,
            last_used: Some(at),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_favorite(&self, favorite: bool) -> Self {
        Self {
            favorite,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn primary_muscles(&self, activations: &ActivationMap) -> BTreeSet<MuscleID> {
        activations.primary_muscles(&self.exercise_ids)
    }
}

/// Readiness snapshot of one variation within a category.
#[derive(Debug, Clone, PartialEq)]
pub struct VariationStatus {
    pub variation: Name,
    /// `None` when the variation has never been used.
    pub days_since_last_use: Option<i64>,
    /// Mean readiness across the variation's primary muscles, 0.0 to 1.0.
    pub mean_readiness: f32,
    /// All primary muscles below the readiness threshold.
    pub ready: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateAnalysis {
    pub category: Name,
    pub variations: Vec<VariationStatus>,
    pub recommendation: Option<Name>,
}

/// Groups a category's templates by variation and scores each against the
/// current muscle states.
#[must_use]
pub fn analyze(
    category: &Name,
    history: &[WorkoutTemplate],
    muscle_states: &BTreeMap<MuscleID, MuscleState>,
    activations: &ActivationMap,
    config: &FatigueConfig,
    now: DateTime<Utc>,
) -> TemplateAnalysis {
    let mut by_variation: BTreeMap<&Name, Vec<&WorkoutTemplate>> = BTreeMap::new();
    for template in history.iter().filter(|t| t.category == *category) {
        by_variation.entry(&template.variation).or_default().push(template);
    }

    let variations = by_variation
        .into_iter()
        .map(|(variation, templates)| {
            let last_used = templates.iter().filter_map(|t| t.last_used).max();
            let days_since_last_use =
                last_used.map(|used| now.signed_duration_since(used).num_days());

            let primary: BTreeSet<MuscleID> = templates
                .iter()
                .flat_map(|t| t.primary_muscles(activations))
                .collect();

            let (mean_readiness, ready) = readiness_of(&primary, muscle_states, config, now);

            VariationStatus {
                variation: variation.clone(),
                days_since_last_use,
                mean_readiness,
                ready,
            }
        })
        .collect::<Vec<_>>();

    let recommendation = pick(&variations);

    TemplateAnalysis {
        category: category.clone(),
        variations,
        recommendation,
    }
}

/// The variation that is due next.
#[must_use]
pub fn recommend_next(
    category: &Name,
    history: &[WorkoutTemplate],
    muscle_states: &BTreeMap<MuscleID, MuscleState>,
    activations: &ActivationMap,
    config: &FatigueConfig,
    now: DateTime<Utc>,
) -> Option<Name> {
    analyze(category, history, muscle_states, activations, config, now).recommendation
}

fn readiness_of(
    muscles: &BTreeSet<MuscleID>,
    muscle_states: &BTreeMap<MuscleID, MuscleState>,
    config: &FatigueConfig,
    now: DateTime<Utc>,
) -> (f32, bool) {
    if muscles.is_empty() {
        // Nothing mapped, nothing holding the variation back.
        return (1.0, true);
    }

    let mut sum = 0.0;
    let mut all_ready = true;
    for muscle_id in muscles {
        // An untrained muscle is fully recovered.
        let state = muscle_states
            .get(muscle_id)
            .map_or_else(|| MuscleState::cold(*muscle_id, now), |s| s.decayed(now, config));
        sum += state.readiness();
        all_ready &= state.is_ready(config);
    }

    #[allow(clippy::cast_precision_loss)]
    (sum / muscles.len() as f32, all_ready)
}

/// Longest-unused among ready variations; if none are ready, the one with
/// the highest mean readiness. Never-used variations count as most overdue.
fn pick(variations: &[VariationStatus]) -> Option<Name> {
    let ready: Vec<&VariationStatus> = variations.iter().filter(|v| v.ready).collect();

    if ready.is_empty() {
        variations
            .iter()
            .max_by(|a, b| a.mean_readiness.total_cmp(&b.mean_readiness))
            .map(|v| v.variation.clone())
    } else {
        ready
            .into_iter()
            .max_by_key(|v| v.days_since_last_use.unwrap_or(i64::MAX))
            .map(|v| v.variation.clone())
    }
}

/// Trend deltas between two variations (`a` minus `b`), derived from logged
/// workout aggregates. Informational only; the recommendation does not use
/// this.
#[derive(Debug, Clone, PartialEq)]
pub struct VariationComparison {
    pub avg_volume_delta: f32,
    pub avg_set_count_delta: f32,
    /// Difference in mean days between consecutive uses.
    pub avg_recovery_days_delta: f32,
}

/// Aggregates of one workout logged against a variation.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkoutRecord {
    pub variation: Name,
    pub performed_at: DateTime<Utc>,
    pub total_volume: f32,
    pub set_count: u32,
}

#[must_use]
pub fn compare_variations(a: &Name, b: &Name, records: &[WorkoutRecord]) -> VariationComparison {
    let (volume_a, sets_a, recovery_a) = variation_stats(a, records);
    let (volume_b, sets_b, recovery_b) = variation_stats(b, records);

    VariationComparison {
        avg_volume_delta: volume_a - volume_b,
        avg_set_count_delta: sets_a - sets_b,
        avg_recovery_days_delta: recovery_a - recovery_b,
    }
}

fn variation_stats(variation: &Name, records: &[WorkoutRecord]) -> (f32, f32, f32) {
    let mut times: Vec<DateTime<Utc>> = Vec::new();
    let mut volume = 0.0;
    let mut sets = 0;

    for record in records.iter().filter(|r| r.variation == *variation) {
        times.push(record.performed_at);
        volume += record.total_volume;
        sets += record.set_count;
    }

    if times.is_empty() {
        return (0.0, 0.0, 0.0);
    }

    times.sort_unstable();
    #[allow(clippy::cast_precision_loss)]
    let avg_recovery_days = if times.len() < 2 {
        0.0
    } else {
        times
            .windows(2)
            .map(|w| w[1].signed_duration_since(w[0]).num_seconds() as f32 / 86_400.0)
            .sum::<f32>()
            / (times.len() - 1) as f32
    };

    #[allow(clippy::cast_precision_loss)]
    (
        volume / times.len() as f32,
        sets as f32 / times.len() as f32,
        avg_recovery_days,
    )
}
