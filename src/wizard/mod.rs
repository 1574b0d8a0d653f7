pub mod catalog;
pub mod error;
pub mod machine;
pub mod project;
pub mod steps;
pub mod template;

pub use catalog::STEP_COUNT;
pub use error::WizardError;
pub use machine::{WizardState, FINAL_REVIEW_STEP, INTAKE_STEP};
pub use project::{ImageDataUri, ImageInput, ProjectData};
pub use steps::StepDefinition;
pub use template::render_optional;
