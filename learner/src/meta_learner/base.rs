use std::time::Duration;

use log::debug;
use machine_learning::{MlErr, ops::nan_mean, optimization::Optimizer, variables::VariableStore};

use super::{MetaLearner, QClock};
use crate::{
    LearnerErr, Result,
    model::NpModel,
    sampler::{FewShotTask, TaskSet},
};

/// A single process `MetaLearner`, replicas take turns over the tasks of a meta-batch.
pub struct BaseLearner<M, T, O> {
    session: VariableStore,
    parallel_models: Vec<M>,
    optimizer: O,
    train_set: T,
    eval_set: T,
    variables: Vec<String>,
    save_dir: String,
    clock: QClock,
    grad: Vec<f32>,
    task_grad: Vec<f32>,
    mask: Vec<bool>,
    step: usize,
}

impl<M, T, O> BaseLearner<M, T, O>
where
    M: NpModel,
    T: TaskSet,
    O: Optimizer,
{
    /// Creates a new `BaseLearner`.
    ///
    /// # Arguments
    /// * `session` - Holds every parameter of the models.
    /// * `parallel_models` - The model replicas, at least one.
    /// * `optimizer` - Updates the parameters of `variables`.
    /// * `train_set` - Where training tasks are drawn from.
    /// * `eval_set` - Where evaluation tasks are drawn from.
    /// * `variables` - The names of the variables to optimize and checkpoint.
    /// * `tags` - Joined with `-` they name the run's directories.
    ///
    /// # Returns
    /// An error if there are no replicas or a variable isn't in the session.
    pub fn new<S: AsRef<str>>(
        session: VariableStore,
        parallel_models: Vec<M>,
        optimizer: O,
        train_set: T,
        eval_set: T,
        variables: Vec<String>,
        tags: &[S],
    ) -> Result<Self> {
        if parallel_models.is_empty() {
            return Err(LearnerErr::NoReplicas);
        }

        let mut mask = vec![false; session.num_params()];
        for name in &variables {
            let variable = session
                .variable(name)
                .ok_or_else(|| MlErr::UnknownVariable { name: name.clone() })?;
            mask[variable.range()].fill(true);
        }

        let save_dir = tags
            .iter()
            .map(|tag| tag.as_ref())
            .collect::<Vec<_>>()
            .join("-");

        Ok(Self {
            grad: vec![0.; session.num_params()],
            task_grad: vec![0.; session.num_params()],
            session,
            parallel_models,
            optimizer,
            train_set,
            eval_set,
            variables,
            save_dir,
            clock: QClock::new(),
            mask,
            step: 0,
        })
    }

    /// The amount of optimization steps taken so far.
    pub fn step(&self) -> usize {
        self.step
    }
}

impl<M, T, O> MetaLearner for BaseLearner<M, T, O>
where
    M: NpModel,
    T: TaskSet,
    O: Optimizer,
{
    type Model = M;
    type TaskSet = T;

    fn train(&mut self, meta_batch: usize, num_shots: usize, test_shots: usize) -> Result<f32> {
        if meta_batch == 0 {
            return Err(LearnerErr::InvalidConfig(
                "meta_batch must be at least one".into(),
            ));
        }

        let samplers = self.train_set.sample(meta_batch);
        if samplers.is_empty() {
            return Err(LearnerErr::EmptyTaskSet);
        }

        let n = samplers.len();
        let replicas = self.parallel_models.len();
        self.grad.fill(0.);
        let mut total = 0.;

        for (i, mut sampler) in samplers.into_iter().enumerate() {
            let task = FewShotTask::draw(&mut sampler, num_shots, test_shots);
            let (x_c, y_c) = task.context();
            let (x_all, y_all) = task.all();

            self.task_grad.fill(0.);
            let model = &mut self.parallel_models[i % replicas];
            total += model.compute_grad(
                &mut self.session,
                x_c,
                y_c,
                x_all,
                y_all,
                &mut self.task_grad,
            )?;

            for (acc, g) in self.grad.iter_mut().zip(&self.task_grad) {
                *acc += g;
            }
        }

        let scale = n as f32;
        for (g, &selected) in self.grad.iter_mut().zip(&self.mask) {
            *g = if selected { *g / scale } else { 0. };
        }

        self.optimizer
            .update_params(self.session.params_mut(), &self.grad)?;
        self.step += 1;

        let loss = total / scale;
        debug!(step = self.step, loss = loss; "meta step");
        Ok(loss)
    }

    fn evaluate(
        &mut self,
        eval_samples: usize,
        num_shots: usize,
        test_shots: usize,
    ) -> Result<f32> {
        let model = &mut self.parallel_models[0];
        let mut losses = Vec::with_capacity(eval_samples);

        for mut sampler in self.eval_set.sample(eval_samples) {
            let task = FewShotTask::draw(&mut sampler, num_shots, test_shots);
            let (x_c, y_c) = task.context();
            let (x_all, y_all) = task.all();

            losses.push(model.compute_loss(
                &self.session,
                x_c,
                y_c,
                x_all,
                y_all,
                false,
                self.step,
            )?);
        }

        Ok(nan_mean(&losses))
    }

    fn qclock(&mut self) -> Duration {
        self.clock.lap()
    }

    fn session(&self) -> &VariableStore {
        &self.session
    }

    fn session_mut(&mut self) -> &mut VariableStore {
        &mut self.session
    }

    fn parallel_models(&mut self) -> (&VariableStore, &mut [M]) {
        (&self.session, &mut self.parallel_models)
    }

    fn variables(&self) -> &[String] {
        &self.variables
    }

    fn eval_set(&mut self) -> &mut T {
        &mut self.eval_set
    }

    fn save_dir(&self) -> &str {
        &self.save_dir
    }
}

#[cfg(test)]
mod tests {
    use machine_learning::{
        naming::LayerCounters,
        optimization::GradientDescent,
        variables::{FilterType, get_trainable_variables},
    };
    use ndarray::{Array1, ArrayView1, ArrayView2};
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::{
        config::{ModelConfig, SinusoidConfig},
        datasets::SinusoidTaskSet,
        model::KernelNp,
    };

    /// Reports a gradient of ones and a loss of two, counting its calls.
    #[derive(Default)]
    struct Constant {
        grads: usize,
        losses: usize,
    }

    impl NpModel for Constant {
        fn predict(
            &mut self,
            _session: &VariableStore,
            _x_context: ArrayView2<f32>,
            _y_context: ArrayView1<f32>,
            x_query: ArrayView2<f32>,
        ) -> Result<Array1<f32>> {
            Ok(Array1::zeros(x_query.nrows()))
        }

        fn compute_loss(
            &mut self,
            _session: &VariableStore,
            _x_context: ArrayView2<f32>,
            _y_context: ArrayView1<f32>,
            _x_all: ArrayView2<f32>,
            _y_all: ArrayView1<f32>,
            _is_training: bool,
            _step: usize,
        ) -> Result<f32> {
            self.losses += 1;
            Ok(if self.losses % 2 == 0 { f32::NAN } else { 2. })
        }

        fn compute_grad(
            &mut self,
            _session: &mut VariableStore,
            _x_context: ArrayView2<f32>,
            _y_context: ArrayView1<f32>,
            _x_all: ArrayView2<f32>,
            _y_all: ArrayView1<f32>,
            grad: &mut [f32],
        ) -> Result<f32> {
            self.grads += 1;
            grad.fill(1.);
            Ok(2.)
        }
    }

    fn tasks(seed: u64) -> SinusoidTaskSet {
        SinusoidTaskSet::new(&SinusoidConfig::default(), StdRng::seed_from_u64(seed)).unwrap()
    }

    fn session() -> VariableStore {
        let mut session = VariableStore::new();
        session.add("a/w", &[2], [1., 1.], true).unwrap();
        session.add("b/w", &[1], [1.], true).unwrap();
        session
    }

    fn constant_learner(
        replicas: usize,
        variables: &[&str],
    ) -> Result<BaseLearner<Constant, SinusoidTaskSet, GradientDescent>> {
        let models = (0..replicas).map(|_| Constant::default()).collect();
        let variables = variables.iter().map(|v| v.to_string()).collect();

        BaseLearner::new(
            session(),
            models,
            GradientDescent::new(0.5),
            tasks(0),
            tasks(1),
            variables,
            &["sinusoid", "test"],
        )
    }

    #[test]
    fn save_dir_joins_tags() {
        let learner = constant_learner(1, &["a/w"]).unwrap();
        assert_eq!(learner.save_dir(), "sinusoid-test");
    }

    #[test]
    fn needs_a_replica() {
        assert!(matches!(
            constant_learner(0, &["a/w"]),
            Err(LearnerErr::NoReplicas)
        ));
    }

    #[test]
    fn unknown_variable() {
        assert!(matches!(
            constant_learner(1, &["c/w"]),
            Err(LearnerErr::Ml(MlErr::UnknownVariable { .. }))
        ));
    }

    #[test]
    fn train_updates_only_selected_variables() {
        let mut learner = constant_learner(2, &["a/w"]).unwrap();

        let loss = learner.train(4, 3, 2).unwrap();

        assert_eq!(loss, 2.);
        assert_eq!(learner.step(), 1);
        assert_eq!(learner.session().values("a/w").unwrap(), &[0.5, 0.5]);
        assert_eq!(learner.session().values("b/w").unwrap(), &[1.]);

        let (_, models) = learner.parallel_models();
        assert_eq!(models[0].grads, 2);
        assert_eq!(models[1].grads, 2);
    }

    #[test]
    fn empty_meta_batch() {
        let mut learner = constant_learner(1, &["a/w"]).unwrap();
        assert!(matches!(
            learner.train(0, 3, 2),
            Err(LearnerErr::InvalidConfig(_))
        ));
    }

    #[test]
    fn evaluate_skips_nans() {
        let mut learner = constant_learner(1, &["a/w"]).unwrap();

        let loss = learner.evaluate(5, 3, 2).unwrap();

        assert_eq!(loss, 2.);
        let (_, models) = learner.parallel_models();
        assert_eq!(models[0].losses, 5);
    }

    #[test]
    fn kernel_model_trains() {
        let mut session = VariableStore::new();
        let mut counters = LayerCounters::new();
        let model = KernelNp::new(
            &mut session,
            &mut counters,
            &ModelConfig::default(),
            StdRng::seed_from_u64(0),
        )
        .unwrap();

        let variables: Vec<String> =
            get_trainable_variables(&session, &["prior_mean"], FilterType::NotIn)
                .iter()
                .map(|v| v.name().to_string())
                .collect();
        let before = session.params().to_vec();

        let mut learner = BaseLearner::new(
            session,
            vec![model],
            GradientDescent::new(0.01),
            tasks(2),
            tasks(3),
            variables,
            &["kernel"],
        )
        .unwrap();

        let loss = learner.train(4, 5, 5).unwrap();
        let eval = learner.evaluate(3, 5, 5).unwrap();

        assert!(loss.is_finite());
        assert!(eval.is_finite());

        let session = learner.session();
        let prior_mean = session.variable("kernel_np_0/prior_mean").unwrap().range();
        let sigma = session.variable("kernel_np_0/log_sigma").unwrap().range();
        assert_eq!(session.params()[prior_mean.clone()], before[prior_mean]);
        assert_ne!(session.params()[sigma.clone()], before[sigma]);
    }
}
