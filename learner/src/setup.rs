use machine_learning::{
    naming::LayerCounters,
    optimization::{Adam, GradientDescent, Optimizer},
    variables::{FilterType, VariableStore, get_trainable_variables},
};
use rand::{SeedableRng, rngs::StdRng};

use crate::{
    NpLearner, Result,
    checkpoint::SafetensorsSaver,
    config::{OptimizerConfig, RunConfig},
    datasets::SinusoidTaskSet,
    meta_learner::BaseLearner,
    model::KernelNp,
};

/// The learner the `np-learner` binary runs.
pub type SinusoidLearner =
    NpLearner<BaseLearner<KernelNp, SinusoidTaskSet, Box<dyn Optimizer>>, SafetensorsSaver>;

fn generate_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

fn build_optimizer(config: OptimizerConfig, len: usize) -> Box<dyn Optimizer> {
    match config {
        OptimizerConfig::Adam { lr, b1, b2, eps } => Box::new(Adam::new(len, lr, b1, b2, eps)),
        OptimizerConfig::GradientDescent { lr } => Box::new(GradientDescent::new(lr)),
    }
}

/// Builds a kernel neural process learner over the sinusoid task family.
///
/// Every random stream is derived from the config's seed, so a seeded run is reproducible.
///
/// # Returns
/// An error if the dataset ranges are invalid or the run's directories can't be created.
pub fn sinusoid_learner(config: &RunConfig) -> Result<SinusoidLearner> {
    let mut rng = generate_rng(config.seed);

    let mut session = VariableStore::new();
    let mut counters = LayerCounters::new();
    let model = KernelNp::new(
        &mut session,
        &mut counters,
        &config.model,
        StdRng::from_rng(&mut rng),
    )?;

    let variables = get_trainable_variables(&session, &[model.scope()], FilterType::In)
        .iter()
        .map(|v| v.name().to_string())
        .collect();

    let mut parallel_models = Vec::with_capacity(config.model.replicas.get());
    for _ in 1..config.model.replicas.get() {
        parallel_models.push(model.replica(StdRng::from_rng(&mut rng)));
    }
    parallel_models.insert(0, model);

    let optimizer = build_optimizer(config.optimizer, session.num_params());
    let train_set = SinusoidTaskSet::new(&config.dataset, StdRng::from_rng(&mut rng))?;
    let eval_set = SinusoidTaskSet::new(&config.dataset, StdRng::from_rng(&mut rng))?;

    let base = BaseLearner::new(
        session,
        parallel_models,
        optimizer,
        train_set,
        eval_set,
        variables,
        &config.tags,
    )?;

    NpLearner::new(base, config.learner.clone(), SafetensorsSaver::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta_learner::MetaLearner;

    fn config(root: &std::path::Path) -> RunConfig {
        let mut config = RunConfig {
            seed: Some(3),
            ..RunConfig::default()
        };
        config.learner.checkpoint_root = root.join("checkpoints");
        config.learner.result_root = root.join("results");
        config
    }

    #[test]
    fn wires_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.model.replicas = std::num::NonZeroUsize::new(3).unwrap();

        let mut learner = sinusoid_learner(&config).unwrap();

        assert_eq!(learner.base().save_dir(), "sinusoid-kernel_np");
        assert_eq!(learner.base().variables().len(), 4);
        assert!(learner.checkpoint_dir().ends_with("checkpoints/sinusoid-kernel_np"));
        assert!(learner.result_dir().is_dir());
        assert_eq!(learner.base_mut().parallel_models().1.len(), 3);
    }

    #[test]
    fn same_seed_same_session() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());

        let mut a = sinusoid_learner(&config).unwrap();
        let mut b = sinusoid_learner(&config).unwrap();

        let la = a.base_mut().train(2, 5, 5).unwrap();
        let lb = b.base_mut().train(2, 5, 5).unwrap();

        assert_eq!(la, lb);
        assert_eq!(a.base().session().params(), b.base().session().params());
    }
}
