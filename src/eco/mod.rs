pub mod prompts;
pub mod workflow;


pub use workflow::{EcoResult, EcoWorkflow, WorkflowError};
