use std::sync::Arc;

use tracing::debug;

use crate::wizard::catalog::STEP_COUNT;
use crate::wizard::error::{WizardError, MANDATORY_FIELDS_MESSAGE};
use crate::wizard::project::{ImageDataUri, ProjectData};
use crate::wizard::steps::{StepDefinition, StepsData};

pub const INTAKE_STEP: usize = 0;
pub const FINAL_REVIEW_STEP: usize = STEP_COUNT;
pub const RESULT_STEP: usize = STEP_COUNT + 1;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationState {
    pub is_loading: bool,
    pub image: Option<ImageDataUri>,
    pub error: Option<String>,
}

/// Handed out by [`WizardState::generate`]. The epoch must come back with the
/// result so a late answer can be recognised after a reset.
#[derive(Debug, Clone)]
pub struct GenerationTicket {
    pub epoch: u64,
    pub project: Arc<ProjectData>,
}

#[derive(Debug, Clone, Default)]
pub struct WizardState {
    current_step: usize,
    project_data: Option<Arc<ProjectData>>,
    steps_data: StepsData,
    generation: GenerationState,
    generation_epoch: u64,
}

impl WizardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn project_data(&self) -> Option<&ProjectData> {
        self.project_data.as_deref()
    }

    pub fn steps_data(&self) -> &StepsData {
        &self.steps_data
    }

    pub fn generation(&self) -> &GenerationState {
        &self.generation
    }

    pub fn generation_epoch(&self) -> u64 {
        self.generation_epoch
    }

    pub fn is_reviewing(&self) -> bool {
        (1..=FINAL_REVIEW_STEP).contains(&self.current_step)
    }

    pub fn is_result(&self) -> bool {
        self.current_step == RESULT_STEP
    }

    /// The step on screen, if a review step is showing.
    pub fn current_step_definition(&self) -> Option<&StepDefinition> {
        if self.is_reviewing() {
            self.steps_data.step(self.current_step)
        } else {
            None
        }
    }

    pub fn submit(&mut self, data: ProjectData) -> Result<(), WizardError> {
        if self.current_step != INTAKE_STEP {
            return Err(WizardError::invalid("submit", self.current_step));
        }
        if data.location.trim().is_empty() || data.requirements.trim().is_empty() {
            return Err(WizardError::Validation(
                MANDATORY_FIELDS_MESSAGE.to_string(),
            ));
        }

        self.project_data = Some(Arc::new(data));
        self.steps_data = StepsData::from_catalog();
        self.generation.image = None;
        self.generation.error = None;
        self.current_step = 1;
        Ok(())
    }

    /// Advances one review step. Stepping past the last review step only
    /// happens through [`WizardState::generate`], so `next` there is a no-op.
    pub fn next(&mut self) -> Result<(), WizardError> {
        match self.current_step {
            INTAKE_STEP if self.project_data.is_some() => self.current_step = 1,
            step if step < FINAL_REVIEW_STEP && step > INTAKE_STEP => self.current_step += 1,
            FINAL_REVIEW_STEP => {}
            step => return Err(WizardError::invalid("next", step)),
        }
        Ok(())
    }

    /// Steps back; from step 1 this returns to intake without dropping the
    /// project or the edits.
    pub fn back(&mut self) -> Result<(), WizardError> {
        if !self.is_reviewing() {
            return Err(WizardError::invalid("back", self.current_step));
        }
        self.current_step -= 1;
        Ok(())
    }

    /// Flips to the loading view and returns the ticket for the generation
    /// task. The state change happens before anything is awaited.
    pub fn generate(&mut self) -> Result<GenerationTicket, WizardError> {
        if self.current_step != FINAL_REVIEW_STEP {
            return Err(WizardError::invalid("generate", self.current_step));
        }
        let project = self
            .project_data
            .clone()
            .ok_or(WizardError::MissingProjectData)?;

        self.generation_epoch += 1;
        self.generation = GenerationState {
            is_loading: true,
            image: None,
            error: None,
        };
        self.current_step = RESULT_STEP;
        Ok(GenerationTicket {
            epoch: self.generation_epoch,
            project,
        })
    }

    /// Applies a finished generation. Returns `false` and changes nothing when
    /// the outcome belongs to an earlier epoch or the loading view is gone.
    pub fn complete_generation(
        &mut self,
        epoch: u64,
        result: Result<ImageDataUri, String>,
    ) -> bool {
        if epoch != self.generation_epoch || !self.is_result() || !self.generation.is_loading {
            debug!(
                epoch,
                current_epoch = self.generation_epoch,
                step = self.current_step,
                "discarding stale generation outcome"
            );
            return false;
        }

        self.generation.is_loading = false;
        match result {
            Ok(image) => self.generation.image = Some(image),
            Err(message) => self.generation.error = Some(message),
        }
        true
    }

    pub fn reset(&mut self) {
        self.current_step = INTAKE_STEP;
        self.project_data = None;
        self.steps_data = StepsData::from_catalog();
        self.generation = GenerationState::default();
        self.generation_epoch += 1;
    }

    /// Edits an item of the step currently on screen.
    pub fn set_item_value(
        &mut self,
        section_index: usize,
        detail_index: usize,
        item_index: usize,
        value: impl Into<String>,
    ) -> Result<(), WizardError> {
        if !self.is_reviewing() {
            return Err(WizardError::invalid("edit", self.current_step));
        }
        self.steps_data = self.steps_data.with_item_value(
            self.current_step,
            section_index,
            detail_index,
            item_index,
            value,
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(location: &str, requirements: &str) -> ProjectData {
        ProjectData::new(location, requirements, None, None)
    }

    fn at_step(step: usize) -> WizardState {
        let mut wizard = WizardState::new();
        wizard.submit(project("123 Main St", "modern glass tower")).unwrap();
        while wizard.current_step() < step {
            wizard.next().unwrap();
        }
        wizard
    }

    #[test]
    fn submit_rejects_blank_fields() {
        for (location, requirements) in [
            ("", "glass"),
            ("Seoul", ""),
            ("  ", "glass"),
            ("Seoul", " \n\t"),
            ("", ""),
        ] {
            let mut wizard = WizardState::new();
            let err = wizard.submit(project(location, requirements)).unwrap_err();
            assert_eq!(
                err,
                WizardError::Validation(MANDATORY_FIELDS_MESSAGE.to_string())
            );
            assert_eq!(wizard.current_step(), INTAKE_STEP);
            assert!(wizard.project_data().is_none());
        }
    }

    #[test]
    fn submit_is_only_valid_on_intake() {
        let mut wizard = at_step(2);
        let err = wizard.submit(project("a", "b")).unwrap_err();
        assert_eq!(err, WizardError::invalid("submit", 2));
        assert_eq!(wizard.project_data().unwrap().location, "123 Main St");
    }

    #[test]
    fn back_then_next_round_trips_every_review_step() {
        for step in 1..=FINAL_REVIEW_STEP {
            let mut wizard = at_step(step);
            wizard.set_item_value(0, 0, 0, format!("edited on {step}")).unwrap();
            let before = wizard.steps_data().clone();

            wizard.back().unwrap();
            assert_eq!(wizard.current_step(), step - 1);
            wizard.next().unwrap();

            assert_eq!(wizard.current_step(), step);
            assert_eq!(wizard.steps_data(), &before);
        }
    }

    #[test]
    fn next_on_final_review_step_is_a_no_op() {
        let mut wizard = at_step(FINAL_REVIEW_STEP);
        wizard.next().unwrap();
        assert_eq!(wizard.current_step(), FINAL_REVIEW_STEP);
    }

    #[test]
    fn next_from_fresh_intake_is_rejected() {
        let mut wizard = WizardState::new();
        assert_eq!(
            wizard.next().unwrap_err(),
            WizardError::invalid("next", INTAKE_STEP)
        );
        assert_eq!(
            wizard.back().unwrap_err(),
            WizardError::invalid("back", INTAKE_STEP)
        );
    }

    #[test]
    fn edits_never_leak_into_other_steps() {
        let mut wizard = at_step(4);
        let untouched: Vec<StepDefinition> = wizard
            .steps_data()
            .iter()
            .filter(|step| step.id != 4)
            .cloned()
            .collect();

        wizard.set_item_value(1, 1, 2, "Heavily lived-in").unwrap();

        let after: Vec<StepDefinition> = wizard
            .steps_data()
            .iter()
            .filter(|step| step.id != 4)
            .cloned()
            .collect();
        assert_eq!(untouched, after);
        assert_eq!(
            wizard.steps_data().item(4, 1, 1, 2).unwrap().value,
            "Heavily lived-in"
        );
        assert_eq!(
            wizard.current_step_definition().unwrap().sections[1].details[1].items[2].value,
            "Heavily lived-in"
        );
    }

    #[test]
    fn edits_outside_review_steps_or_range_fail() {
        let mut wizard = WizardState::new();
        assert_eq!(
            wizard.set_item_value(0, 0, 0, "x").unwrap_err(),
            WizardError::invalid("edit", INTAKE_STEP)
        );

        let mut wizard = at_step(1);
        let before = wizard.steps_data().clone();
        let err = wizard.set_item_value(0, 9, 0, "x").unwrap_err();
        assert!(matches!(err, WizardError::Index { level: "detail", .. }));
        assert_eq!(wizard.steps_data(), &before);
    }

    #[test]
    fn generate_flips_to_loading_before_the_call() {
        let mut wizard = at_step(FINAL_REVIEW_STEP);
        let ticket = wizard.generate().unwrap();

        assert_eq!(wizard.current_step(), RESULT_STEP);
        assert!(wizard.generation().is_loading);
        assert_eq!(ticket.epoch, wizard.generation_epoch());
        assert_eq!(ticket.project.requirements, "modern glass tower");
        assert_eq!(
            wizard.generate().unwrap_err(),
            WizardError::invalid("generate", RESULT_STEP)
        );
    }

    #[test]
    fn generate_is_only_reachable_from_the_final_review_step() {
        let mut wizard = at_step(5);
        assert_eq!(
            wizard.generate().unwrap_err(),
            WizardError::invalid("generate", 5)
        );
        assert!(!wizard.generation().is_loading);
    }

    #[test]
    fn completion_sets_image_or_error() {
        let mut wizard = at_step(FINAL_REVIEW_STEP);
        let ticket = wizard.generate().unwrap();
        let image = ImageDataUri::new("image/png", "AAAA");
        assert!(wizard.complete_generation(ticket.epoch, Ok(image.clone())));
        assert_eq!(wizard.generation().image, Some(image));
        assert!(!wizard.generation().is_loading);

        let mut wizard = at_step(FINAL_REVIEW_STEP);
        let ticket = wizard.generate().unwrap();
        assert!(wizard.complete_generation(ticket.epoch, Err("quota exceeded".to_string())));
        assert_eq!(wizard.generation().error.as_deref(), Some("quota exceeded"));
        assert!(wizard.generation().image.is_none());
    }

    #[test]
    fn stale_outcome_after_reset_is_discarded() {
        let mut wizard = at_step(FINAL_REVIEW_STEP);
        let stale = wizard.generate().unwrap();
        wizard.reset();

        assert!(!wizard.complete_generation(stale.epoch, Ok(ImageDataUri::new("image/png", "AAAA"))));
        assert_eq!(wizard.current_step(), INTAKE_STEP);
        assert_eq!(wizard.generation(), &GenerationState::default());

        // A second run must not accept the first run's answer either.
        wizard.submit(project("a", "b")).unwrap();
        for _ in 1..FINAL_REVIEW_STEP {
            wizard.next().unwrap();
        }
        let fresh = wizard.generate().unwrap();
        assert!(!wizard.complete_generation(stale.epoch, Err("late".to_string())));
        assert!(wizard.generation().is_loading);
        assert!(wizard.complete_generation(fresh.epoch, Err("current".to_string())));
        assert_eq!(wizard.generation().error.as_deref(), Some("current"));
    }

    #[test]
    fn reset_from_every_result_sub_state_tears_everything_down() {
        let outcomes: [Option<Result<ImageDataUri, String>>; 3] = [
            None,
            Some(Ok(ImageDataUri::new("image/png", "AAAA"))),
            Some(Err("refused".to_string())),
        ];
        for outcome in outcomes {
            let mut wizard = at_step(FINAL_REVIEW_STEP);
            wizard.set_item_value(0, 0, 0, "edited").unwrap();
            let ticket = wizard.generate().unwrap();
            if let Some(result) = outcome {
                wizard.complete_generation(ticket.epoch, result);
            }

            wizard.reset();

            assert_eq!(wizard.current_step(), INTAKE_STEP);
            assert!(wizard.project_data().is_none());
            assert!(wizard.generation().image.is_none());
            assert!(wizard.generation().error.is_none());
            assert!(!wizard.generation().is_loading);
            assert_eq!(wizard.steps_data(), &StepsData::from_catalog());
        }
    }

    #[test]
    fn back_to_intake_keeps_project_and_edits_until_resubmit() {
        let mut wizard = at_step(1);
        wizard.set_item_value(0, 0, 0, "kept").unwrap();
        wizard.back().unwrap();

        assert_eq!(wizard.current_step(), INTAKE_STEP);
        assert!(wizard.project_data().is_some());
        assert_eq!(wizard.steps_data().item(1, 0, 0, 0).unwrap().value, "kept");

        wizard.submit(project("Elsewhere", "timber")).unwrap();
        assert_eq!(wizard.project_data().unwrap().location, "Elsewhere");
        assert_eq!(
            wizard.steps_data().item(1, 0, 0, 0).unwrap().value,
            "518x518 Complete"
        );
    }
}
