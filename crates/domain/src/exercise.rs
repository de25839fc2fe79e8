use std::collections::{BTreeMap, BTreeSet};

use derive_more::Deref;
use uuid::Uuid;

use crate::MuscleID;

#[derive(Deref, Debug, Default, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ExerciseID(Uuid);

impl ExerciseID {
    #[must_use]
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }

    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl From<Uuid> for ExerciseID {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<u128> for ExerciseID {
    fn from(value: u128) -> Self {
        Self(Uuid::from_bytes(value.to_be_bytes()))
    }
}

/// Relative activation of a muscle by an exercise, in (0, 1].
///
/// Weights need not sum to 1 across an exercise: a compound movement can
/// fully activate several muscles at once.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Activation(f32);

impl Activation {
    pub const PRIMARY: Activation = Activation(1.0);
    pub const SECONDARY: Activation = Activation(0.5);
    pub const TERTIARY: Activation = Activation(0.25);

    pub fn new(value: f32) -> Result<Self, ActivationError> {
        if !(value > 0.0 && value <= 1.0) {
            return Err(ActivationError::OutOfRange(value));
        }

        Ok(Self(value))
    }

    #[must_use]
    pub fn is_primary(self) -> bool {
        self >= Self::PRIMARY
    }
}

impl From<Activation> for f32 {
    fn from(value: Activation) -> Self {
        value.0
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ActivationError {
    #[error("Activation must be greater than 0 and at most 1 ({0} is not)")]
    OutOfRange(f32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExerciseMuscle {
    pub muscle_id: MuscleID,
    pub activation: Activation,
}

/// Static lookup from exercise to the muscles it trains.
///
/// Read-only at runtime. Unknown exercises map to no muscles and contribute
/// no fatigue; they must never fail the pipeline.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ActivationMap(BTreeMap<ExerciseID, Vec<ExerciseMuscle>>);

impl ActivationMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, exercise_id: ExerciseID, muscles: Vec<ExerciseMuscle>) {
        self.0.insert(exercise_id, muscles);
    }

    #[must_use]
    pub fn muscles_for(&self, exercise_id: ExerciseID) -> &[ExerciseMuscle] {
        self.0.get(&exercise_id).map_or(&[], Vec::as_slice)
    }

    /// Muscles mapped with full activation by any of the given exercises.
    #[must_use]
    pub fn primary_muscles(&self, exercise_ids: &[ExerciseID]) -> BTreeSet<MuscleID> {
        exercise_ids
            .iter()
            .flat_map(|id| self.muscles_for(*id))
            .filter(|m| m.activation.is_primary())
            .map(|m| m.muscle_id)
            .collect()
    }
}

impl FromIterator<(ExerciseID, Vec<ExerciseMuscle>)> for ActivationMap {
    fn from_iter<T: IntoIterator<Item = (ExerciseID, Vec<ExerciseMuscle>)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
