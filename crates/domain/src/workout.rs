use chrono::{DateTime, Utc};

use crate::ExerciseID;

/// One performed set, as stored by the persistence layer.
///
/// Weight and reps are kept raw on purpose: malformed rows (non-positive
/// weight or reps) are a skip condition for all derived computations, not a
/// constructor error that would abort a whole session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetEntry {
    pub weight: f32,
    pub reps: u32,
    pub completed: bool,
    pub to_failure: bool,
    pub set_number: u32,
}

impl SetEntry {
    /// Working volume (weight × reps) of a completed, well-formed set.
    ///
    /// Sets that were not marked complete, or carry non-positive weight or
    /// reps, have no working volume.
    #[must_use]
    pub fn volume(&self) -> Option<f32> {
        if !self.completed || self.weight <= 0.0 || self.reps == 0 {
            return None;
        }

        #[allow(clippy::cast_precision_loss)]
        Some(self.weight * self.reps as f32)
    }
}

/// All sets of one exercise within a workout.
#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseLog {
    pub exercise_id: ExerciseID,
    pub sets: Vec<SetEntry>,
}

impl ExerciseLog {
    #[must_use]
    pub fn total_volume(&self) -> f32 {
        self.sets.iter().filter_map(SetEntry::volume).sum()
    }

    #[must_use]
    pub fn completed_sets(&self) -> u32 {
        #[allow(clippy::cast_possible_truncation)]
        let count = self.sets.iter().filter(|s| s.volume().is_some()).count() as u32;
        count
    }

    #[must_use]
    pub fn best_single_set(&self) -> Option<f32> {
        self.sets
            .iter()
            .filter_map(SetEntry::volume)
            .max_by(f32::total_cmp)
    }
}

/// Inbound payload for "apply a completed workout".
#[derive(Debug, Clone, PartialEq)]
pub struct Workout {
    pub performed_at: DateTime<Utc>,
    pub exercises: Vec<ExerciseLog>,
}

impl Workout {
    #[must_use]
    pub fn total_volume(&self) -> f32 {
        self.exercises.iter().map(ExerciseLog::total_volume).sum()
    }

    #[must_use]
    pub fn set_count(&self) -> u32 {
        self.exercises.iter().map(ExerciseLog::completed_sets).sum()
    }
}
