//! First-run setup wizard: four steps that must complete in order.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::models::{text_enum, UnknownVariant};

/// Setting key recording that setup has finished
pub const SETUP_COMPLETED_KEY: &str = "setup_completed";

text_enum!(
    SetupStep, "setup step" {
        TestDatabase => "test_database",
        SetupDatabase => "setup_database",
        CreateAdmin => "create_admin",
        CompleteSetup => "complete_setup",
    }
);

impl SetupStep {
    pub fn title(&self) -> &'static str {
        match self {
            SetupStep::TestDatabase => "Database Connection",
            SetupStep::SetupDatabase => "Database Setup",
            SetupStep::CreateAdmin => "Create Admin User",
            SetupStep::CompleteSetup => "Complete",
        }
    }
}

text_enum!(
    StepStatus, "step status" {
        Pending => "pending",
        InProgress => "in_progress",
        Completed => "completed",
        Error => "error",
    }
);

#[derive(Debug, Clone, Serialize)]
pub struct StepState {
    pub step: SetupStep,
    pub title: &'static str,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Error, PartialEq)]
pub enum SetupError {
    #[error("Setup has already been completed")]
    AlreadyCompleted,

    #[error("Step '{requested}' cannot run yet; next step is '{expected}'")]
    OutOfOrder {
        expected: SetupStep,
        requested: SetupStep,
    },

    #[error("Step '{0}' is already running")]
    Busy(SetupStep),
}

/// Snapshot returned by GET /api/admin/setup
#[derive(Debug, Clone, Serialize)]
pub struct SetupView {
    pub completed: bool,
    pub current_step: Option<SetupStep>,
    pub steps: Vec<StepState>,
}

#[derive(Debug, Clone)]
pub struct SetupWizard {
    steps: Vec<StepState>,
}

impl Default for SetupWizard {
    fn default() -> Self {
        Self::new()
    }
}

impl SetupWizard {
    pub fn new() -> Self {
        Self {
            steps: SetupStep::ALL
                .iter()
                .map(|step| StepState {
                    step: *step,
                    title: step.title(),
                    status: StepStatus::Pending,
                    message: None,
                })
                .collect(),
        }
    }

    /// A wizard whose steps are all done, used when the setting says so.
    pub fn finished() -> Self {
        let mut wizard = Self::new();
        for state in &mut wizard.steps {
            state.status = StepStatus::Completed;
        }
        wizard
    }

    pub fn is_completed(&self) -> bool {
        self.steps.iter().all(|s| s.status == StepStatus::Completed)
    }

    /// The first step that has not completed
    pub fn current(&self) -> Option<SetupStep> {
        self.steps
            .iter()
            .find(|s| s.status != StepStatus::Completed)
            .map(|s| s.step)
    }

    fn state_mut(&mut self, step: SetupStep) -> &mut StepState {
        &mut self.steps[step as usize]
    }

    /// Mark `step` as running if it is the next one due.
    pub fn begin(&mut self, step: SetupStep) -> Result<(), SetupError> {
        let Some(expected) = self.current() else {
            return Err(SetupError::AlreadyCompleted);
        };
        if expected != step {
            return Err(SetupError::OutOfOrder {
                expected,
                requested: step,
            });
        }
        let state = self.state_mut(step);
        if state.status == StepStatus::InProgress {
            return Err(SetupError::Busy(step));
        }
        state.status = StepStatus::InProgress;
        state.message = None;
        Ok(())
    }

    /// Record the outcome of a step started with [`SetupWizard::begin`].
    /// A failed step stays current and can be retried.
    pub fn finish(&mut self, step: SetupStep, outcome: Result<String, String>) {
        let state = self.state_mut(step);
        match outcome {
            Ok(message) => {
                state.status = StepStatus::Completed;
                state.message = Some(message);
            }
            Err(message) => {
                state.status = StepStatus::Error;
                state.message = Some(message);
            }
        }
    }

    pub fn view(&self) -> SetupView {
        SetupView {
            completed: self.is_completed(),
            current_step: self.current(),
            steps: self.steps.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(wizard: &mut SetupWizard, step: SetupStep) {
        wizard.begin(step).unwrap();
        wizard.finish(step, Ok("done".to_string()));
    }

    #[test]
    fn test_steps_run_in_order() {
        let mut wizard = SetupWizard::new();
        assert_eq!(wizard.current(), Some(SetupStep::TestDatabase));
        assert_eq!(
            wizard.begin(SetupStep::CreateAdmin),
            Err(SetupError::OutOfOrder {
                expected: SetupStep::TestDatabase,
                requested: SetupStep::CreateAdmin,
            })
        );
        for step in SetupStep::ALL {
            run(&mut wizard, *step);
        }
        assert!(wizard.is_completed());
        assert_eq!(
            wizard.begin(SetupStep::CompleteSetup),
            Err(SetupError::AlreadyCompleted)
        );
    }

    #[test]
    fn test_failed_step_is_retryable() {
        let mut wizard = SetupWizard::new();
        wizard.begin(SetupStep::TestDatabase).unwrap();
        wizard.finish(SetupStep::TestDatabase, Err("connection refused".to_string()));
        let view = wizard.view();
        assert_eq!(view.steps[0].status, StepStatus::Error);
        assert_eq!(view.current_step, Some(SetupStep::TestDatabase));
        run(&mut wizard, SetupStep::TestDatabase);
        assert_eq!(wizard.current(), Some(SetupStep::SetupDatabase));
    }

    #[test]
    fn test_running_step_is_busy() {
        let mut wizard = SetupWizard::new();
        wizard.begin(SetupStep::TestDatabase).unwrap();
        assert_eq!(
            wizard.begin(SetupStep::TestDatabase),
            Err(SetupError::Busy(SetupStep::TestDatabase))
        );
    }

    #[test]
    fn test_finished_wizard_has_no_current_step() {
        let view = SetupWizard::finished().view();
        assert!(view.completed);
        assert!(view.current_step.is_none());
    }
}
