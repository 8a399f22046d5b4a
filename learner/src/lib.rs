pub mod checkpoint;
pub mod config;
pub mod datasets;
pub mod error;
mod learner;
pub mod meta_learner;
pub mod model;
pub mod plot;
pub mod sampler;
mod setup;

pub use error::{LearnerErr, Result};
pub use learner::NpLearner;
pub use setup::{SinusoidLearner, sinusoid_learner};
