use std::collections::BTreeMap;

use crate::{Activation, ActivationMap, ExerciseID, ExerciseMuscle, MuscleID};

/// Muscle activations for a common exercise, keyed by name.
#[derive(Clone)]
pub struct CatalogExercise {
    pub name: &'static str,
    pub muscles: &'static [(MuscleID, Activation)],
}

pub static EXERCISES: &[CatalogExercise] = &[
    CatalogExercise {
        name: "Bench Press",
        muscles: &[
            (MuscleID::Pecs, Activation::PRIMARY),
            (MuscleID::FrontDelts, Activation::SECONDARY),
            (MuscleID::Triceps, Activation::SECONDARY),
        ],
    },
    CatalogExercise {
        name: "Bicep Curl",
        muscles: &[
            (MuscleID::Biceps, Activation::PRIMARY),
            (MuscleID::Forearms, Activation::TERTIARY),
        ],
    },
    CatalogExercise {
        name: "Calf Raise",
        muscles: &[(MuscleID::Calves, Activation::PRIMARY)],
    },
    CatalogExercise {
        name: "Deadlift",
        muscles: &[
            (MuscleID::ErectorSpinae, Activation::PRIMARY),
            (MuscleID::Glutes, Activation::PRIMARY),
            (MuscleID::Hamstrings, Activation::SECONDARY),
            (MuscleID::Traps, Activation::SECONDARY),
            (MuscleID::Forearms, Activation::TERTIARY),
        ],
    },
    CatalogExercise {
        name: "Lat Pulldown",
        muscles: &[
            (MuscleID::Lats, Activation::PRIMARY),
            (MuscleID::Biceps, Activation::SECONDARY),
        ],
    },
    CatalogExercise {
        name: "Leg Press",
        muscles: &[
            (MuscleID::Quads, Activation::PRIMARY),
            (MuscleID::Glutes, Activation::SECONDARY),
        ],
    },
    CatalogExercise {
        name: "Lunge",
        muscles: &[
            (MuscleID::Quads, Activation::PRIMARY),
            (MuscleID::Glutes, Activation::PRIMARY),
            (MuscleID::Hamstrings, Activation::SECONDARY),
        ],
    },
    CatalogExercise {
        name: "Overhead Press",
        muscles: &[
            (MuscleID::FrontDelts, Activation::PRIMARY),
            (MuscleID::SideDelts, Activation::SECONDARY),
            (MuscleID::Triceps, Activation::SECONDARY),
        ],
    },
    CatalogExercise {
        name: "Plank",
        muscles: &[
            (MuscleID::Abs, Activation::PRIMARY),
            (MuscleID::Obliques, Activation::SECONDARY),
        ],
    },
    CatalogExercise {
        name: "Pull Up",
        muscles: &[
            (MuscleID::Lats, Activation::PRIMARY),
            (MuscleID::Biceps, Activation::SECONDARY),
            (MuscleID::Forearms, Activation::TERTIARY),
        ],
    },
    CatalogExercise {
        name: "Romanian Deadlift",
        muscles: &[
            (MuscleID::Hamstrings, Activation::PRIMARY),
            (MuscleID::Glutes, Activation::SECONDARY),
            (MuscleID::ErectorSpinae, Activation::SECONDARY),
        ],
    },
    CatalogExercise {
        name: "Barbell Row",
        muscles: &[
            (MuscleID::Lats, Activation::PRIMARY),
            (MuscleID::Traps, Activation::SECONDARY),
            (MuscleID::RearDelts, Activation::SECONDARY),
            (MuscleID::Biceps, Activation::SECONDARY),
        ],
    },
    CatalogExercise {
        name: "Squat",
        muscles: &[
            (MuscleID::Quads, Activation::PRIMARY),
            (MuscleID::Glutes, Activation::PRIMARY),
            (MuscleID::Hamstrings, Activation::SECONDARY),
            (MuscleID::ErectorSpinae, Activation::SECONDARY),
        ],
    },
    CatalogExercise {
        name: "Tricep Extension",
        muscles: &[(MuscleID::Triceps, Activation::PRIMARY)],
    },
];

#[must_use]
pub fn catalog_exercise(name: &str) -> Option<&'static CatalogExercise> {
    EXERCISES.iter().find(|e| e.name == name)
}

/// Builds an activation map for stored exercises from the catalog.
///
/// Exercises whose names are not in the catalog get no entry and therefore
/// contribute no fatigue.
#[must_use]
pub fn activation_map(exercises: &BTreeMap<ExerciseID, String>) -> ActivationMap {
    exercises
        .iter()
        .filter_map(|(id, name)| {
            catalog_exercise(name).map(|e| {
                (
                    *id,
                    e.muscles
                        .iter()
                        .map(|(muscle_id, activation)| ExerciseMuscle {
                            muscle_id: *muscle_id,
                            activation: *activation,
                        })
                        .collect(),
                )
            })
        })
        .collect()
}
