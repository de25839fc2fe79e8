use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::{ActivationMap, FatiguePercent, MuscleID, MuscleState, Workout};

/// Fatigue and recovery curve parameters.
///
/// The curve shape is policy, not hard-coded behavior: callers may tune the
/// stimulus scaling, the to-failure multiplier, the recovery half-life, and
/// the readiness threshold without touching the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct FatigueConfig {
    /// Activation-weighted working volume that adds one fatigue point.
    pub volume_per_point: f32,
    /// Extra stimulus multiplier for sets taken to failure.
    pub to_failure_multiplier: f32,
    /// Hours for accumulated fatigue to halve with no intervening training.
    pub recovery_half_life_hours: f32,
    /// A muscle is considered ready below this fatigue level.
    pub readiness_threshold: FatiguePercent,
}

impl Default for FatigueConfig {
    fn default() -> Self {
        Self {
            volume_per_point: 150.0,
            to_failure_multiplier: 1.5,
            recovery_half_life_hours: 36.0,
            readiness_threshold: FatiguePercent::clamped(35.0),
        }
    }
}

/// Fatigue delta per muscle for a whole workout.
///
/// Deltas are accumulated across all sets before any state is touched, so a
/// session updates each affected muscle exactly once per invocation. Sets
/// without working volume and exercises without mapped muscles contribute
/// nothing.
#[must_use]
pub fn fatigue_deltas(
    workout: &Workout,
    activations: &ActivationMap,
    config: &FatigueConfig,
) -> BTreeMap<MuscleID, f32> {
    let mut deltas = BTreeMap::new();

    for log in &workout.exercises {
        let muscles = activations.muscles_for(log.exercise_id);
        for set in &log.sets {
            let Some(volume) = set.volume() else {
                continue;
            };
            let multiplier = if set.to_failure {
                config.to_failure_multiplier
            } else {
                1.0
            };
            for muscle in muscles {
                *deltas.entry(muscle.muscle_id).or_insert(0.0) +=
                    volume * f32::from(muscle.activation) * multiplier / config.volume_per_point;
            }
        }
    }

    deltas
}

/// Activation-weighted working volume per muscle, without the fatigue
/// scaling. Used to observe baselines.
#[must_use]
pub fn muscle_volumes(workout: &Workout, activations: &ActivationMap) -> BTreeMap<MuscleID, f32> {
    let mut volumes = BTreeMap::new();

    for log in &workout.exercises {
        let total = log.total_volume();
        if total <= 0.0 {
            continue;
        }
        for muscle in activations.muscles_for(log.exercise_id) {
            *volumes.entry(muscle.muscle_id).or_insert(0.0) +=
                total * f32::from(muscle.activation);
        }
    }

    volumes
}

/// Rebuilds muscle states from scratch by folding the full workout history
/// in chronological order, then decaying to `now`.
///
/// Used after bulk set deletion, when incremental updates no longer reflect
/// the stored sets.
#[must_use]
pub fn replay(
    history: &[Workout],
    activations: &ActivationMap,
    config: &FatigueConfig,
    now: DateTime<Utc>,
) -> BTreeMap<MuscleID, MuscleState> {
    let mut workouts: Vec<&Workout> = history.iter().collect();
    workouts.sort_by_key(|w| w.performed_at);

    let mut states: BTreeMap<MuscleID, MuscleState> = BTreeMap::new();
    for workout in workouts {
        for (muscle_id, delta) in fatigue_deltas(workout, activations, config) {
            let state = states
                .entry(muscle_id)
                .or_insert_with(|| MuscleState::cold(muscle_id, workout.performed_at));
            let (trained, _) = state
                .decayed(workout.performed_at, config)
                .trained(delta, workout.performed_at);
            *state = trained;
        }
    }

    states
        .into_iter()
        .map(|(muscle_id, state)| (muscle_id, state.decayed(now, config)))
        .collect()
}
