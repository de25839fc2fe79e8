use std::{fmt, slice::Iter};

use chrono::{DateTime, Utc};

use crate::{FatigueConfig, ReadError, UpdateError};

#[allow(async_fn_in_trait)]
pub trait MuscleStateRepository {
    async fn read_muscle_states(&self) -> Result<Vec<MuscleState>, ReadError>;
    async fn read_muscle_state(&self, id: MuscleID) -> Result<Option<MuscleState>, ReadError>;
    async fn write_muscle_state(&self, state: MuscleState) -> Result<MuscleState, UpdateError>;
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub enum MuscleID {
    // Chest
    Pecs = 11,
    // Back
    Traps = 21,
    Lats = 22,
    // Shoulders
    FrontDelts = 31,
    SideDelts = 32,
    RearDelts = 33,
    // Upper arms
    Biceps = 41,
    Triceps = 42,
    // Forearms
    Forearms = 51,
    // Waist
    Abs = 61,
    Obliques = 62,
    ErectorSpinae = 63,
    // Hips
    Glutes = 71,
    // Thighs
    Quads = 81,
    Hamstrings = 82,
    // Calves
    Calves = 91,
}

impl MuscleID {
    pub fn iter() -> Iter<'static, MuscleID> {
        static MUSCLES: [MuscleID; 16] = [
            MuscleID::Pecs,
            MuscleID::Traps,
            MuscleID::Lats,
            MuscleID::FrontDelts,
            MuscleID::SideDelts,
            MuscleID::RearDelts,
            MuscleID::Biceps,
            MuscleID::Triceps,
            MuscleID::Forearms,
            MuscleID::Abs,
            MuscleID::Obliques,
            MuscleID::ErectorSpinae,
            MuscleID::Glutes,
            MuscleID::Quads,
            MuscleID::Hamstrings,
            MuscleID::Calves,
        ];
        MUSCLES.iter()
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            MuscleID::Pecs => "Pecs",
            MuscleID::Traps => "Traps",
            MuscleID::Lats => "Lats",
            MuscleID::FrontDelts => "Front Delts",
            MuscleID::SideDelts => "Side Delts",
            MuscleID::RearDelts => "Rear Delts",
            MuscleID::Biceps => "Biceps",
            MuscleID::Triceps => "Triceps",
            MuscleID::Forearms => "Forearms",
            MuscleID::Abs => "Abs",
            MuscleID::Obliques => "Obliques",
            MuscleID::ErectorSpinae => "Erector Spinae",
            MuscleID::Glutes => "Glutes",
            MuscleID::Quads => "Quads",
            MuscleID::Hamstrings => "Hamstrings",
            MuscleID::Calves => "Calves",
        }
    }
}

impl fmt::Display for MuscleID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl TryFrom<u8> for MuscleID {
    type Error = MuscleIDError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            x if x == MuscleID::Pecs as u8 => Ok(MuscleID::Pecs),
            x if x == MuscleID::Traps as u8 => Ok(MuscleID::Traps),
            x if x == MuscleID::Lats as u8 => Ok(MuscleID::Lats),
            x if x == MuscleID::FrontDelts as u8 => Ok(MuscleID::FrontDelts),
            x if x == MuscleID::SideDelts as u8 => Ok(MuscleID::SideDelts),
            x if x == MuscleID::RearDelts as u8 => Ok(MuscleID::RearDelts),
            x if x == MuscleID::Biceps as u8 => Ok(MuscleID::Biceps),
            x if x == MuscleID::Triceps as u8 => Ok(MuscleID::Triceps),
            x if x == MuscleID::Forearms as u8 => Ok(MuscleID::Forearms),
            x if x == MuscleID::Abs as u8 => Ok(MuscleID::Abs),
            x if x == MuscleID::Obliques as u8 => Ok(MuscleID::Obliques),
            x if x == MuscleID::ErectorSpinae as u8 => Ok(MuscleID::ErectorSpinae),
            x if x == MuscleID::Glutes as u8 => Ok(MuscleID::Glutes),
            x if x == MuscleID::Quads as u8 => Ok(MuscleID::Quads),
            x if x == MuscleID::Hamstrings as u8 => Ok(MuscleID::Hamstrings),
            x if x == MuscleID::Calves as u8 => Ok(MuscleID::Calves),
            _ => Err(MuscleIDError::Invalid),
        }
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum MuscleIDError {
    #[error("Invalid muscle ID")]
    Invalid,
}

/// Accumulated training stress on a muscle, 0 (fully recovered) to 100.
#[derive(Debug, Default, Clone, Copy, PartialEq, PartialOrd)]
pub struct FatiguePercent(f32);

impl FatiguePercent {
    pub const ZERO: FatiguePercent = FatiguePercent(0.0);
    pub const MAX: FatiguePercent = FatiguePercent(100.0);

    pub fn new(value: f32) -> Result<Self, FatiguePercentError> {
        if !(0.0..=100.0).contains(&value) {
            return Err(FatiguePercentError::OutOfRange(value));
        }

        Ok(Self(value))
    }

    /// Forces an arbitrary value into the valid range. NaN collapses to zero.
    #[must_use]
    pub fn clamped(value: f32) -> Self {
        if value.is_nan() {
            return Self::ZERO;
        }
        Self(value.clamp(0.0, 100.0))
    }
}

impl From<FatiguePercent> for f32 {
    fn from(value: FatiguePercent) -> Self {
        value.0
    }
}

impl fmt::Display for FatiguePercent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.0}%", self.0)
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum FatiguePercentError {
    #[error("Fatigue must be in the range 0 to 100 ({0} is not)")]
    OutOfRange(f32),
}

/// Raised when fatigue arithmetic left the valid range and had to be clamped.
///
/// The clamped value is persisted; this signal exists for observability only.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
#[error("fatigue for {muscle_id} out of range ({value})")]
pub struct ComputationInvariantViolation {
    pub muscle_id: MuscleID,
    pub value: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MuscleState {
    pub muscle_id: MuscleID,
    pub fatigue: FatiguePercent,
    pub last_trained: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl MuscleState {
    /// Zero state for a muscle that has never been trained.
    #[must_use]
    pub fn cold(muscle_id: MuscleID, at: DateTime<Utc>) -> Self {
        Self {
            muscle_id,
            fatigue: FatiguePercent::ZERO,
            last_trained: None,
            updated_at: at,
        }
    }

    /// Fatigue as of `now`, decayed along the recovery curve since the last
    /// update. Computed lazily at read time, never by a background timer.
    #[must_use]
    pub fn decayed(&self, now: DateTime<Utc>, config: &FatigueConfig) -> Self {
        let elapsed = now.signed_duration_since(self.updated_at);
        if elapsed <= chrono::Duration::zero() {
            return *self;
        }

        #[allow(clippy::cast_precision_loss)]
        let hours = elapsed.num_seconds() as f32 / 3600.0;
        let factor = 0.5_f32.powf(hours / config.recovery_half_life_hours);

        Self {
            fatigue: FatiguePercent::clamped(f32::from(self.fatigue) * factor),
            updated_at: now,
            ..*self
        }
    }

    /// Adds a fatigue delta, clamping the result into the valid range.
    ///
    /// A result outside [0, 100] before clamping is reported alongside the
    /// corrected state.
    #[must_use]
    pub fn trained(
        &self,
        delta: f32,
        at: DateTime<Utc>,
    ) -> (Self, Option<ComputationInvariantViolation>) {
        let raw = f32::from(self.fatigue) + delta;
        let violation = if (0.0..=100.0).contains(&raw) {
            None
        } else {
            Some(ComputationInvariantViolation {
                muscle_id: self.muscle_id,
                value: raw,
            })
        };

        (
            Self {
                fatigue: FatiguePercent::clamped(raw),
                last_trained: Some(at),
                updated_at: at,
                ..*self
            },
            violation,
        )
    }

    /// Complement of fatigue, 0.0 (exhausted) to 1.0 (fully recovered).
    #[must_use]
    pub fn readiness(&self) -> f32 {
        1.0 - f32::from(self.fatigue) / 100.0
    }

    #[must_use]
    pub fn is_ready(&self, config: &FatigueConfig) -> bool {
        self.fatigue < config.readiness_threshold
    }
}
