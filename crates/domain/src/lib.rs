#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

pub mod catalog;

mod baseline;
mod error;
mod exercise;
mod fatigue;
mod muscle;
mod name;
mod record;
mod service;
mod template;
mod workout;

pub use baseline::{BaselineRepository, MuscleBaseline};
pub use error::{DeleteError, ReadError, StorageError, UpdateError};
pub use exercise::{Activation, ActivationError, ActivationMap, ExerciseID, ExerciseMuscle};
pub use fatigue::{FatigueConfig, fatigue_deltas, muscle_volumes, replay};
pub use muscle::{
    ComputationInvariantViolation, FatiguePercent, FatiguePercentError, MuscleID, MuscleIDError,
    MuscleState, MuscleStateRepository,
};
pub use name::{Name, NameError};
pub use record::{PersonalBest, PersonalBestRepository, PrResult, best_of_history, detect};
pub use service::{Service, WorkoutSummary};
pub use template::{
    TemplateAnalysis, TemplateID, TemplateRepository, VariationComparison, VariationStatus,
    WorkoutRecord, WorkoutTemplate, analyze, compare_variations, recommend_next,
};
pub use workout::{ExerciseLog, SetEntry, Workout};
