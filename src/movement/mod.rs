pub mod mover;
pub mod resolver;

pub use mover::{Capabilities, MoverDescriptor, StepRules};
pub use resolver::{MovementResolver, PERSON_HEIGHT, STEP_HEIGHT};
