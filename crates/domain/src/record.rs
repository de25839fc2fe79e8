use chrono::{DateTime, Utc};

use crate::{DeleteError, ExerciseID, ExerciseLog, ReadError, UpdateError, Workout};

#[allow(async_fn_in_trait)]
pub trait PersonalBestRepository {
    async fn read_personal_bests(&self) -> Result<Vec<PersonalBest>, ReadError>;
    async fn read_personal_best(
        &self,
        exercise_id: ExerciseID,
    ) -> Result<Option<PersonalBest>, ReadError>;
    async fn write_personal_best(&self, best: PersonalBest) -> Result<PersonalBest, UpdateError>;
    async fn delete_personal_best(
        &self,
        exercise_id: ExerciseID,
    ) -> Result<ExerciseID, DeleteError>;
}

/// Highest recorded total volume for an exercise across all completed
/// sessions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PersonalBest {
    pub exercise_id: ExerciseID,
    pub best_volume: f32,
    pub best_single_set: Option<f32>,
    pub achieved_at: DateTime<Utc>,
}

impl PersonalBest {
    /// The stored best after a detected record, carrying over the better
    /// single-set volume.
    #[must_use]
    pub fn updated(
        previous: Option<&PersonalBest>,
        result: &PrResult,
        single_set: Option<f32>,
        at: DateTime<Utc>,
    ) -> Self {
        let best_single_set = match (previous.and_then(|p| p.best_single_set), single_set) {
            (Some(stored), Some(new)) => Some(stored.max(new)),
            (stored, new) => stored.or(new),
        };

        Self {
            exercise_id: result.exercise_id,
            best_volume: result.new_volume,
            best_single_set,
            achieved_at: at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrResult {
    pub exercise_id: ExerciseID,
    pub is_first_time: bool,
    pub new_volume: f32,
    /// Rounded percentage over the previous best. Absent on first-time
    /// records.
    pub percent_increase: Option<u32>,
}

/// Compares a completed exercise against the stored best.
///
/// Only completed sets count. Ties never trigger a record; the stored best
/// stays untouched unless the new volume is strictly greater. Detection is a
/// pure comparison, persistence is up to the caller.
#[must_use]
pub fn detect(log: &ExerciseLog, previous: Option<&PersonalBest>) -> Option<PrResult> {
    let total = log.total_volume();
    if total <= 0.0 {
        return None;
    }

    match previous {
        None => Some(PrResult {
            exercise_id: log.exercise_id,
            is_first_time: true,
            new_volume: total,
            percent_increase: None,
        }),
        Some(best) if total > best.best_volume => {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let percent = ((total - best.best_volume) / best.best_volume * 100.0).round() as u32;
            Some(PrResult {
                exercise_id: log.exercise_id,
                is_first_time: false,
                new_volume: total,
                percent_increase: Some(percent),
            })
        }
        Some(_) => None,
    }
}

/// Recomputes the best for an exercise from the full workout history.
///
/// Used after bulk set deletion, when the stored best may refer to deleted
/// sets.
#[must_use]
pub fn best_of_history(exercise_id: ExerciseID, history: &[Workout]) -> Option<PersonalBest> {
    let mut best: Option<PersonalBest> = None;

    for workout in history {
        for log in workout
            .exercises
            .iter()
            .filter(|l| l.exercise_id == exercise_id)
        {
            let total = log.total_volume();
            if total <= 0.0 {
                continue;
            }
            let single = log.best_single_set();
            best = Some(match best {
                Some(b) if total <= b.best_volume => PersonalBest {
                    best_single_set: match (b.best_single_set, single) {
                        (Some(stored), Some(new)) => Some(stored.max(new)),
                        (stored, new) => stored.or(new),
                    },
                    ..b
                },
                Some(b) => PersonalBest {
                    exercise_id,
                    best_volume: total,
                    best_single_set: match (b.best_single_set, single) {
                        (Some(stored), Some(new)) => Some(stored.max(new)),
                        (stored, new) => stored.or(new),
                    },
                    achieved_at: workout.performed_at,
                },
                None => PersonalBest {
                    exercise_id,
                    best_volume: total,
                    best_single_set: single,
                    achieved_at: workout.performed_at,
                },
            });
        }
    }

    best
}
