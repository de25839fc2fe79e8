use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use log::{debug, error, warn};

use crate::{
    ActivationMap, BaselineRepository, ComputationInvariantViolation, DeleteError, ExerciseID,
    FatigueConfig, MuscleBaseline, MuscleID, MuscleState, MuscleStateRepository, Name,
    PersonalBest, PersonalBestRepository, PrResult, ReadError, TemplateAnalysis,
    TemplateRepository, UpdateError, Workout, WorkoutTemplate, best_of_history, detect,
    fatigue_deltas, muscle_volumes, replay, template,
};

/// Outcome of applying a completed workout: the muscle states written back,
/// the detected records, and any clamped-fatigue signals.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkoutSummary {
    pub muscle_states: Vec<MuscleState>,
    pub prs: Vec<PrResult>,
    pub violations: Vec<ComputationInvariantViolation>,
}

/// Orchestrates the engine over a storage collaborator.
///
/// All mutation goes through the repository; the service itself holds no
/// state besides the curve configuration and is safe to invoke repeatedly
/// from a request-scoped context.
pub struct Service<R> {
    repository: R,
    config: FatigueConfig,
}

macro_rules! log_on_error {
    ($func: expr, $error: ident, $action: literal, $entity: literal) => {{
        let result = $func.await;
        match result {
            Ok(_) => {}
            Err(ref err) => match err {
                $error::Storage(crate::StorageError::NoConnection) => {
                    debug!("failed to {} {}: {err}", $action, $entity);
                }
                _ => {
                    error!("failed to {} {}: {err}", $action, $entity);
                }
            },
        }
        result
    }};
}

impl<R> Service<R>
where
    R: MuscleStateRepository + BaselineRepository + PersonalBestRepository + TemplateRepository,
{
    pub fn new(repository: R, config: FatigueConfig) -> Self {
        Self { repository, config }
    }

    /// Applies a completed workout: detects records per exercise, batches
    /// fatigue deltas, and writes updated muscle states and baselines back.
    pub async fn log_workout(
        &self,
        workout: &Workout,
        activations: &ActivationMap,
    ) -> Result<WorkoutSummary, UpdateError> {
        let at = workout.performed_at;
        let mut prs = Vec::new();

        for log in &workout.exercises {
            if activations.muscles_for(log.exercise_id).is_empty() {
                warn!("exercise {} has no mapped muscles", *log.exercise_id);
            }

            let previous = log_on_error!(
                self.repository.read_personal_best(log.exercise_id),
                ReadError,
                "read",
                "personal best"
            )?;
            if let Some(result) = detect(log, previous.as_ref()) {
                let best =
                    PersonalBest::updated(previous.as_ref(), &result, log.best_single_set(), at);
                log_on_error!(
                    self.repository.write_personal_best(best),
                    UpdateError,
                    "write",
                    "personal best"
                )?;
                prs.push(result);
            }
        }

        let deltas = fatigue_deltas(workout, activations, &self.config);
        let volumes = muscle_volumes(workout, activations);

        let mut muscle_states = Vec::new();
        let mut violations = Vec::new();
        for (muscle_id, delta) in deltas {
            let current = log_on_error!(
                self.repository.read_muscle_state(muscle_id),
                ReadError,
                "read",
                "muscle state"
            )?
            .unwrap_or_else(|| MuscleState::cold(muscle_id, at));

            let (trained, violation) = current.decayed(at, &self.config).trained(delta, at);
            if let Some(violation) = violation {
                error!("{violation}");
                violations.push(violation);
            }

            let written = log_on_error!(
                self.repository.write_muscle_state(trained),
                UpdateError,
                "write",
                "muscle state"
            )?;
            muscle_states.push(written);

            if let Some(volume) = volumes.get(&muscle_id) {
                self.observe_baseline(muscle_id, *volume, at).await?;
            }
        }

        Ok(WorkoutSummary {
            muscle_states,
            prs,
            violations,
        })
    }

    /// All stored muscle states, decayed to `now` at read time.
    pub async fn current_muscle_states(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<MuscleState>, ReadError> {
        let states = log_on_error!(
            self.repository.read_muscle_states(),
            ReadError,
            "read",
            "muscle states"
        )?;
        Ok(states
            .into_iter()
            .map(|s| s.decayed(now, &self.config))
            .collect())
    }

    /// Recomputes muscle states, personal bests, and baselines from the full
    /// remaining workout history. Called after bulk set deletion.
    ///
    /// Stored rows whose backing sets are gone from the history are reset:
    /// muscles return to a cold state, orphaned bests are deleted, and
    /// baselines are recomputed down.
    pub async fn rebuild_from_history(
        &self,
        history: &[Workout],
        activations: &ActivationMap,
        now: DateTime<Utc>,
    ) -> Result<Vec<MuscleState>, UpdateError> {
        let stored_muscles: BTreeSet<MuscleID> = log_on_error!(
            self.repository.read_muscle_states(),
            ReadError,
            "read",
            "muscle states"
        )?
        .into_iter()
        .map(|s| s.muscle_id)
        .collect();

        let replayed = replay(history, activations, &self.config, now);
        let mut muscle_states = Vec::new();
        for state in replayed.values() {
            let written = log_on_error!(
                self.repository.write_muscle_state(*state),
                UpdateError,
                "write",
                "muscle state"
            )?;
            muscle_states.push(written);
        }
        for muscle_id in stored_muscles.iter().filter(|m| !replayed.contains_key(*m)) {
            let written = log_on_error!(
                self.repository
                    .write_muscle_state(MuscleState::cold(*muscle_id, now)),
                UpdateError,
                "write",
                "muscle state"
            )?;
            muscle_states.push(written);
        }

        let stored_bests: BTreeSet<ExerciseID> = log_on_error!(
            self.repository.read_personal_bests(),
            ReadError,
            "read",
            "personal bests"
        )?
        .into_iter()
        .map(|b| b.exercise_id)
        .collect();
        let mut exercise_ids: BTreeSet<ExerciseID> = history
            .iter()
            .flat_map(|w| w.exercises.iter().map(|l| l.exercise_id))
            .collect();
        exercise_ids.extend(&stored_bests);
        for exercise_id in exercise_ids {
            if let Some(best) = best_of_history(exercise_id, history) {
                log_on_error!(
                    self.repository.write_personal_best(best),
                    UpdateError,
                    "write",
                    "personal best"
                )?;
            } else if stored_bests.contains(&exercise_id) {
                log_on_error!(
                    self.repository.delete_personal_best(exercise_id),
                    DeleteError,
                    "delete",
                    "personal best"
                )?;
            }
        }

        let mut max_volumes: BTreeMap<MuscleID, Vec<f32>> = BTreeMap::new();
        for workout in history {
            for (muscle_id, volume) in muscle_volumes(workout, activations) {
                max_volumes.entry(muscle_id).or_default().push(volume);
            }
        }
        let muscles: BTreeSet<MuscleID> = stored_muscles
            .iter()
            .chain(max_volumes.keys())
            .copied()
            .collect();
        for muscle_id in muscles {
            let volumes = max_volumes.remove(&muscle_id).unwrap_or_default();
            let existing = log_on_error!(
                self.repository.read_baseline(muscle_id),
                ReadError,
                "read",
                "baseline"
            )?;
            if existing.is_none() && volumes.is_empty() {
                continue;
            }
            let baseline = existing.unwrap_or_else(|| MuscleBaseline::cold(muscle_id, now));
            log_on_error!(
                self.repository.write_baseline(baseline.recomputed(volumes, now)),
                UpdateError,
                "write",
                "baseline"
            )?;
        }

        Ok(muscle_states)
    }

    /// Readiness analysis of a category's variations.
    pub async fn analyze_templates(
        &self,
        category: &Name,
        activations: &ActivationMap,
        now: DateTime<Utc>,
    ) -> Result<TemplateAnalysis, ReadError> {
        let history = log_on_error!(
            self.repository.read_templates(category),
            ReadError,
            "read",
            "templates"
        )?;
        let muscle_states: BTreeMap<MuscleID, MuscleState> = log_on_error!(
            self.repository.read_muscle_states(),
            ReadError,
            "read",
            "muscle states"
        )?
        .into_iter()
        .map(|s| (s.muscle_id, s))
        .collect();

        Ok(template::analyze(
            category,
            &history,
            &muscle_states,
            activations,
            &self.config,
            now,
        ))
    }

    /// The variation that is due next within a category.
    pub async fn recommend_next(
        &self,
        category: &Name,
        activations: &ActivationMap,
        now: DateTime<Utc>,
    ) -> Result<Option<Name>, ReadError> {
        Ok(self
            .analyze_templates(category, activations, now)
            .await?
            .recommendation)
    }

    /// Persists the times-used increment after a workout was logged against
    /// a template.
    pub async fn use_template(
        &self,
        template: &WorkoutTemplate,
        at: DateTime<Utc>,
    ) -> Result<WorkoutTemplate, UpdateError> {
        log_on_error!(
            self.repository.write_template(template.used(at)),
            UpdateError,
            "write",
            "template"
        )
    }

    async fn observe_baseline(
        &self,
        muscle_id: MuscleID,
        volume: f32,
        at: DateTime<Utc>,
    ) -> Result<(), UpdateError> {
        let baseline = log_on_error!(
            self.repository.read_baseline(muscle_id),
            ReadError,
            "read",
            "baseline"
        )?
        .unwrap_or_else(|| MuscleBaseline::cold(muscle_id, at));

        if let Some(raised) = baseline.observed(volume, at) {
            log_on_error!(
                self.repository.write_baseline(raised),
                UpdateError,
                "write",
                "baseline"
            )?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use assert_approx_eq::assert_approx_eq;
    use pretty_assertions::assert_eq;

    use crate::{Activation, ExerciseLog, ExerciseMuscle, FatiguePercent, SetEntry, TemplateID};

    use super::*;

    const HOUR: i64 = 3600;
    const DAY: i64 = 24 * HOUR;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[derive(Default)]
    struct FakeRepository {
        muscle_states: RefCell<BTreeMap<MuscleID, MuscleState>>,
        baselines: RefCell<BTreeMap<MuscleID, MuscleBaseline>>,
        personal_bests: RefCell<BTreeMap<ExerciseID, PersonalBest>>,
        templates: RefCell<Vec<WorkoutTemplate>>,
    }

    impl MuscleStateRepository for FakeRepository {
        async fn read_muscle_states(&self) -> Result<Vec<MuscleState>, ReadError> {
            Ok(self.muscle_states.borrow().values().copied().collect())
        }

        async fn read_muscle_state(&self, id: MuscleID) -> Result<Option<MuscleState>, ReadError> {
            Ok(self.muscle_states.borrow().get(&id).copied())
        }

        async fn write_muscle_state(&self, state: MuscleState) -> Result<MuscleState, UpdateError> {
            self.muscle_states
                .borrow_mut()
                .insert(state.muscle_id, state);
            Ok(state)
        }
    }

    impl BaselineRepository for FakeRepository {
        async fn read_baseline(&self, id: MuscleID) -> Result<Option<MuscleBaseline>, ReadError> {
            Ok(self.baselines.borrow().get(&id).copied())
        }

        async fn write_baseline(
            &self,
            baseline: MuscleBaseline,
        ) -> Result<MuscleBaseline, UpdateError> {
            self.baselines
                .borrow_mut()
                .insert(baseline.muscle_id, baseline);
            Ok(baseline)
        }
    }

    impl PersonalBestRepository for FakeRepository {
        async fn read_personal_bests(&self) -> Result<Vec<PersonalBest>, ReadError> {
            Ok(self.personal_bests.borrow().values().copied().collect())
        }

        async fn read_personal_best(
            &self,
            exercise_id: ExerciseID,
        ) -> Result<Option<PersonalBest>, ReadError> {
            Ok(self.personal_bests.borrow().get(&exercise_id).copied())
        }

        async fn write_personal_best(
            &self,
            best: PersonalBest,
        ) -> Result<PersonalBest, UpdateError> {
            self.personal_bests
                .borrow_mut()
                .insert(best.exercise_id, best);
            Ok(best)
        }

        async fn delete_personal_best(
            &self,
            exercise_id: ExerciseID,
        ) -> Result<ExerciseID, DeleteError> {
            self.personal_bests.borrow_mut().remove(&exercise_id);
            Ok(exercise_id)
        }
    }

    impl TemplateRepository for FakeRepository {
        async fn read_templates(&self, category: &Name) -> Result<Vec<WorkoutTemplate>, ReadError> {
            Ok(self
                .templates
                .borrow()
                .iter()
                .filter(|t| t.category == *category)
                .cloned()
                .collect())
        }

        async fn write_template(
            &self,
            template: WorkoutTemplate,
        ) -> Result<WorkoutTemplate, UpdateError> {
            let mut templates = self.templates.borrow_mut();
            if let Some(stored) = templates.iter_mut().find(|t| t.id == template.id) {
                *stored = template.clone();
            } else {
                templates.push(template.clone());
            }
            Ok(template)
        }
    }

    fn service() -> Service<FakeRepository> {
        Service::new(FakeRepository::default(), FatigueConfig::default())
    }

    fn activations() -> ActivationMap {
        [(
            1.into(),
            vec![
                ExerciseMuscle {
                    muscle_id: MuscleID::Pecs,
                    activation: Activation::PRIMARY,
                },
                ExerciseMuscle {
                    muscle_id: MuscleID::Triceps,
                    activation: Activation::SECONDARY,
                },
            ],
        )]
        .into_iter()
        .collect()
    }

    fn workout(at: DateTime<Utc>, weight: f32, reps: u32) -> Workout {
        Workout {
            performed_at: at,
            exercises: vec![ExerciseLog {
                exercise_id: 1.into(),
                sets: vec![SetEntry {
                    weight,
                    reps,
                    completed: true,
                    to_failure: false,
                    set_number: 1,
                }],
            }],
        }
    }

    fn template(
        id: u128,
        variation: &str,
        exercise_ids: Vec<ExerciseID>,
        last_used: Option<DateTime<Utc>>,
    ) -> WorkoutTemplate {
        WorkoutTemplate {
            id: TemplateID::from(id),
            name: Name::new(&format!("Legs {variation}")).unwrap(),
            category: Name::new("Legs").unwrap(),
            variation: Name::new(variation).unwrap(),
            exercise_ids,
            times_used: u32::from(last_used.is_some()),
            favorite: false,
            created_at: ts(0),
            last_used,
        }
    }

    #[tokio::test]
    async fn test_log_workout_from_cold_start() {
        let service = service();

        let summary = service
            .log_workout(&workout(ts(0), 150.0, 10), &activations())
            .await
            .unwrap();

        assert_eq!(
            summary.prs,
            vec![PrResult {
                exercise_id: 1.into(),
                is_first_time: true,
                new_volume: 1500.0,
                percent_increase: None,
            }]
        );
        assert_eq!(summary.violations, vec![]);
        assert_eq!(summary.muscle_states.len(), 2);

        let pecs = summary
            .muscle_states
            .iter()
            .find(|s| s.muscle_id == MuscleID::Pecs)
            .unwrap();
        assert_approx_eq!(f32::from(pecs.fatigue), 10.0);
        assert_eq!(pecs.last_trained, Some(ts(0)));

        let triceps = summary
            .muscle_states
            .iter()
            .find(|s| s.muscle_id == MuscleID::Triceps)
            .unwrap();
        assert_approx_eq!(f32::from(triceps.fatigue), 5.0);

        let repository = &service.repository;
        assert!(
            repository
                .personal_bests
                .borrow()
                .contains_key(&ExerciseID::from(1))
        );
        assert_approx_eq!(
            repository.baselines.borrow()[&MuscleID::Pecs].learned_max,
            1500.0
        );
        assert_approx_eq!(
            repository.baselines.borrow()[&MuscleID::Triceps].learned_max,
            750.0
        );
    }

    #[tokio::test]
    async fn test_log_workout_decays_stored_state_before_training() {
        let service = service();
        service
            .repository
            .write_muscle_state(MuscleState {
                muscle_id: MuscleID::Pecs,
                fatigue: FatiguePercent::clamped(40.0),
                last_trained: Some(ts(0)),
                updated_at: ts(0),
            })
            .await
            .unwrap();

        let summary = service
            .log_workout(&workout(ts(36 * HOUR), 150.0, 10), &activations())
            .await
            .unwrap();

        // One half-life halves 40 to 20 before the new 10 points land.
        let pecs = summary
            .muscle_states
            .iter()
            .find(|s| s.muscle_id == MuscleID::Pecs)
            .unwrap();
        assert_approx_eq!(f32::from(pecs.fatigue), 30.0, 1.0e-3);
    }

    #[tokio::test]
    async fn test_log_workout_reports_clamped_fatigue() {
        let service = service();

        let summary = service
            .log_workout(&workout(ts(0), 1.0e6, 1000), &activations())
            .await
            .unwrap();

        assert_eq!(summary.violations.len(), 2);
        assert!(
            summary
                .violations
                .iter()
                .any(|v| v.muscle_id == MuscleID::Pecs && v.value > 100.0)
        );
        for state in &summary.muscle_states {
            assert_eq!(state.fatigue, FatiguePercent::MAX);
        }
    }

    #[tokio::test]
    async fn test_log_workout_detects_improvement() {
        let service = service();
        service
            .log_workout(&workout(ts(0), 100.0, 10), &activations())
            .await
            .unwrap();

        let summary = service
            .log_workout(&workout(ts(72 * HOUR), 110.0, 10), &activations())
            .await
            .unwrap();

        assert_eq!(
            summary.prs,
            vec![PrResult {
                exercise_id: 1.into(),
                is_first_time: false,
                new_volume: 1100.0,
                percent_increase: Some(10),
            }]
        );
    }

    #[tokio::test]
    async fn test_rebuild_resets_rows_without_remaining_sets() {
        let service = service();
        service
            .log_workout(&workout(ts(0), 150.0, 10), &activations())
            .await
            .unwrap();

        let states = service
            .rebuild_from_history(&[], &activations(), ts(HOUR))
            .await
            .unwrap();

        assert_eq!(states.len(), 2);
        let pecs = states
            .iter()
            .find(|s| s.muscle_id == MuscleID::Pecs)
            .unwrap();
        assert_eq!(pecs.fatigue, FatiguePercent::ZERO);
        assert_eq!(pecs.last_trained, None);

        let repository = &service.repository;
        assert!(repository.personal_bests.borrow().is_empty());
        assert_approx_eq!(
            repository.baselines.borrow()[&MuscleID::Pecs].learned_max,
            0.0
        );
    }

    #[tokio::test]
    async fn test_rebuild_from_remaining_history() {
        let service = service();
        let first = workout(ts(0), 150.0, 10);
        let second = workout(ts(36 * HOUR), 150.0, 12);
        service.log_workout(&first, &activations()).await.unwrap();
        service.log_workout(&second, &activations()).await.unwrap();

        service
            .rebuild_from_history(&[first], &activations(), ts(36 * HOUR))
            .await
            .unwrap();

        let repository = &service.repository;
        let best = repository.personal_bests.borrow()[&ExerciseID::from(1)];
        assert_approx_eq!(best.best_volume, 1500.0);
        assert_eq!(best.achieved_at, ts(0));

        let pecs = repository.muscle_states.borrow()[&MuscleID::Pecs];
        assert_approx_eq!(f32::from(pecs.fatigue), 5.0, 1.0e-3);

        assert_approx_eq!(
            repository.baselines.borrow()[&MuscleID::Pecs].learned_max,
            1500.0
        );
    }

    #[tokio::test]
    async fn test_current_muscle_states_decay_at_read_time() {
        let service = service();
        service
            .log_workout(&workout(ts(0), 150.0, 10), &activations())
            .await
            .unwrap();

        let states = service.current_muscle_states(ts(36 * HOUR)).await.unwrap();

        let pecs = states
            .iter()
            .find(|s| s.muscle_id == MuscleID::Pecs)
            .unwrap();
        assert_approx_eq!(f32::from(pecs.fatigue), 5.0, 1.0e-3);
        // Reads leave the stored rows untouched.
        assert_approx_eq!(
            f32::from(service.repository.muscle_states.borrow()[&MuscleID::Pecs].fatigue),
            10.0
        );
    }

    #[tokio::test]
    async fn test_use_template_persists_increment() {
        let service = service();
        let template = template(1, "A", vec![1.into()], None);
        service
            .repository
            .write_template(template.clone())
            .await
            .unwrap();

        let used = service.use_template(&template, ts(HOUR)).await.unwrap();

        assert_eq!(used.times_used, 1);
        assert_eq!(
            service.repository.templates.borrow()[0].last_used,
            Some(ts(HOUR))
        );
    }

    #[tokio::test]
    async fn test_recommend_next_reads_stored_state() {
        let service = service();
        let now = ts(10 * DAY);
        service
            .repository
            .write_template(template(1, "A", vec![1.into()], Some(ts(8 * DAY))))
            .await
            .unwrap();
        service
            .repository
            .write_template(template(2, "B", vec![2.into()], Some(ts(4 * DAY))))
            .await
            .unwrap();
        service
            .repository
            .write_muscle_state(MuscleState {
                muscle_id: MuscleID::Pecs,
                fatigue: FatiguePercent::clamped(90.0),
                last_trained: Some(now),
                updated_at: now,
            })
            .await
            .unwrap();

        let recommendation = service
            .recommend_next(&Name::new("Legs").unwrap(), &activations(), now)
            .await
            .unwrap();

        assert_eq!(recommendation, Some(Name::new("B").unwrap()));
    }
}
