use chrono::{DateTime, Utc};

use crate::{MuscleID, ReadError, UpdateError};

#[allow(async_fn_in_trait)]
pub trait BaselineRepository {
    async fn read_baseline(&self, id: MuscleID) -> Result<Option<MuscleBaseline>, ReadError>;
    async fn write_baseline(&self, baseline: MuscleBaseline) -> Result<MuscleBaseline, UpdateError>;
}

/// Reference maximum volume for a muscle, used to normalize progression.
///
/// The learned maximum only ever grows as workouts are observed; it shrinks
/// only through an explicit recompute. A user override, when present, wins
/// unconditionally.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MuscleBaseline {
    pub muscle_id: MuscleID,
    pub learned_max: f32,
    pub user_override: Option<f32>,
    pub updated_at: DateTime<Utc>,
}

impl MuscleBaseline {
    #[must_use]
    pub fn cold(muscle_id: MuscleID, at: DateTime<Utc>) -> Self {
        Self {
            muscle_id,
            learned_max: 0.0,
            user_override: None,
            updated_at: at,
        }
    }

    #[must_use]
    pub fn effective(&self) -> f32 {
        self.user_override.unwrap_or(self.learned_max)
    }

    /// Raises the learned maximum if the observed volume exceeds it.
    ///
    /// Returns `None` when nothing changed, so callers can skip the write.
    #[must_use]
    pub fn observed(&self, volume: f32, at: DateTime<Utc>) -> Option<Self> {
        if volume <= self.learned_max {
            return None;
        }

        Some(Self {
            learned_max: volume,
            updated_at: at,
            ..*self
        })
    }

    /// Explicit recompute from historical per-workout volumes. The only way
    /// the learned maximum may decrease.
    #[must_use]
    pub fn recomputed(&self, volumes: impl IntoIterator<Item = f32>, at: DateTime<Utc>) -> Self {
        Self {
            learned_max: volumes.into_iter().fold(0.0, f32::max),
            updated_at: at,
            ..*self
        }
    }

    #[must_use]
    pub fn with_override(&self, user_override: Option<f32>, at: DateTime<Utc>) -> Self {
        Self {
            user_override,
            updated_at: at,
            ..*self
        }
    }
}
