mod engine;
mod states;

pub use engine::{RentalWorkflow, WorkflowConfig};
pub use states::CallerInput;
