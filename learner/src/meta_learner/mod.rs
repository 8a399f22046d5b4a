mod base;
mod clock;

pub use base::BaseLearner;
pub use clock::QClock;

use std::time::Duration;

use machine_learning::variables::VariableStore;

use crate::{Result, model::NpModel, sampler::TaskSet};

/// A learner that fits a conditional model over a family of functions.
///
/// It owns the session holding every parameter, the parallel model replicas evaluated against
/// it and the training and evaluation task sets.
pub trait MetaLearner {
    type Model: NpModel;
    type TaskSet: TaskSet;

    /// Runs a single optimization step over `meta_batch` training tasks.
    ///
    /// # Returns
    /// The mean training loss of the step.
    fn train(&mut self, meta_batch: usize, num_shots: usize, test_shots: usize) -> Result<f32>;

    /// Averages the inference loss over `eval_samples` evaluation tasks, ignoring NaNs.
    fn evaluate(
        &mut self,
        eval_samples: usize,
        num_shots: usize,
        test_shots: usize,
    ) -> Result<f32>;

    /// The time elapsed since the last call.
    fn qclock(&mut self) -> Duration;

    fn session(&self) -> &VariableStore;

    fn session_mut(&mut self) -> &mut VariableStore;

    /// The session together with the model replicas, so a replica can run against it.
    fn parallel_models(&mut self) -> (&VariableStore, &mut [Self::Model]);

    /// The names of the variables this learner optimizes and checkpoints.
    fn variables(&self) -> &[String];

    fn eval_set(&mut self) -> &mut Self::TaskSet;

    /// The directory name this run's artifacts are stored under.
    fn save_dir(&self) -> &str;
}
