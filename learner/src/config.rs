use std::{f32::consts::PI, fs, num::NonZeroUsize, path::Path, path::PathBuf};

use machine_learning::arch::{activations::ActFn, loss::Loss};
use serde::Deserialize;

use crate::{LearnerErr, Result};

const DEFAULT_STEPS_PER_EPOCH: NonZeroUsize = NonZeroUsize::new(1000).unwrap();
const DEFAULT_COLUMNS: NonZeroUsize = NonZeroUsize::new(3).unwrap();
const DEFAULT_GRID_POINTS: NonZeroUsize = NonZeroUsize::new(100).unwrap();
const DEFAULT_SAVE_INTERVAL: NonZeroUsize = NonZeroUsize::new(10).unwrap();
const DEFAULT_GT_POINTS: NonZeroUsize = NonZeroUsize::new(100).unwrap();

/// Figure formats the plotting backends can write, `svg` or a bitmap encoding.
pub const FIGURE_EXTS: [&str; 5] = ["svg", "png", "jpg", "jpeg", "bmp"];

/// How the few-shot prediction figures are drawn.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VisualiseConfig {
    /// Amount of functions drawn, one per panel.
    pub panels: usize,
    pub columns: NonZeroUsize,
    /// Context sizes, panel `i` uses entry `i % len`.
    pub context_cycle: Vec<usize>,
    /// Predictive curves overlaid on each panel.
    pub repetitions: usize,
    /// Points of the dense evaluation grid.
    pub grid_points: NonZeroUsize,
    /// Figure size in pixels.
    pub figure_size: (u32, u32),
}

impl Default for VisualiseConfig {
    fn default() -> Self {
        Self {
            panels: 12,
            columns: DEFAULT_COLUMNS,
            context_cycle: vec![1, 5, 10, 20],
            repetitions: 20,
            grid_points: DEFAULT_GRID_POINTS,
            figure_size: (1000, 1000),
        }
    }
}

impl VisualiseConfig {
    pub fn validate(&self) -> Result<()> {
        if self.context_cycle.is_empty() {
            return Err(LearnerErr::InvalidConfig(
                "context_cycle must hold at least one context size".into(),
            ));
        }

        if self.figure_size.0 == 0 || self.figure_size.1 == 0 {
            return Err(LearnerErr::InvalidConfig(
                "figure_size must not be empty".into(),
            ));
        }

        Ok(())
    }
}

/// Where the learner writes and how long an epoch is.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LearnerConfig {
    pub checkpoint_root: PathBuf,
    pub result_root: PathBuf,
    /// Training steps run per epoch.
    pub steps_per_epoch: NonZeroUsize,
    /// Extension of the figures, one of `FIGURE_EXTS`.
    pub figure_ext: String,
    pub visualise: VisualiseConfig,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            checkpoint_root: PathBuf::from("checkpoints/neural_processes"),
            result_root: PathBuf::from("results/neural_processes"),
            steps_per_epoch: DEFAULT_STEPS_PER_EPOCH,
            figure_ext: "png".into(),
            visualise: VisualiseConfig::default(),
        }
    }
}

impl LearnerConfig {
    pub fn validate(&self) -> Result<()> {
        let ext = self.figure_ext.to_ascii_lowercase();
        if !FIGURE_EXTS.contains(&ext.as_str()) {
            return Err(LearnerErr::InvalidConfig(format!(
                "figure_ext '{}' isn't one of {}",
                self.figure_ext,
                FIGURE_EXTS.join(", ")
            )));
        }

        self.visualise.validate()
    }
}

/// Arguments of `NpLearner::run_train`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrainConfig {
    pub num_epoch: usize,
    /// Evaluate every `eval_interval` epochs.
    pub eval_interval: NonZeroUsize,
    /// Save a figure and a checkpoint every `save_interval` epochs.
    pub save_interval: NonZeroUsize,
    pub eval_samples: usize,
    pub meta_batch: usize,
    pub num_shots: usize,
    pub test_shots: usize,
    /// Restore the checkpoint before training.
    pub load_params: bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            num_epoch: 100,
            eval_interval: NonZeroUsize::MIN,
            save_interval: DEFAULT_SAVE_INTERVAL,
            eval_samples: 100,
            meta_batch: 8,
            num_shots: 10,
            test_shots: 10,
            load_params: false,
        }
    }
}

/// Arguments of `NpLearner::run_eval`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvalConfig {
    pub num_func: usize,
    pub num_shots: usize,
    pub test_shots: usize,
    pub step: usize,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            num_func: 100,
            num_shots: 10,
            test_shots: 10,
            step: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum OptimizerConfig {
    Adam { lr: f32, b1: f32, b2: f32, eps: f32 },
    GradientDescent { lr: f32 },
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self::Adam {
            lr: 0.001,
            b1: 0.9,
            b2: 0.999,
            eps: 1e-8,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    pub loss_fn: Loss,
    /// Nonlinearity applied to the predictive mean, by name.
    pub output_act: Option<ActFn>,
    /// Amount of model replicas sharing the variables.
    pub replicas: NonZeroUsize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            loss_fn: Loss::default(),
            output_act: None,
            replicas: NonZeroUsize::MIN,
        }
    }
}

/// The family of `a * sin(x + phase)` functions.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SinusoidConfig {
    pub amplitude: (f32, f32),
    pub phase: (f32, f32),
    pub input_range: (f32, f32),
    /// Points of the ground truth curve.
    pub num_gt_points: NonZeroUsize,
    /// Standard deviation of the observation noise, zero for noiseless samples.
    pub noise_std: f32,
}

impl Default for SinusoidConfig {
    fn default() -> Self {
        Self {
            amplitude: (0.1, 5.0),
            phase: (0., PI),
            input_range: (-5., 5.),
            num_gt_points: DEFAULT_GT_POINTS,
            noise_std: 0.,
        }
    }
}

/// Everything the `np-learner` binary needs to set up a run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub seed: Option<u64>,
    /// Joined with `-` they name the run's checkpoint and result directories.
    pub tags: Vec<String>,
    pub learner: LearnerConfig,
    pub model: ModelConfig,
    pub optimizer: OptimizerConfig,
    pub dataset: SinusoidConfig,
    pub train: TrainConfig,
    pub eval: EvalConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            seed: None,
            tags: vec!["sinusoid".into(), "kernel_np".into()],
            learner: LearnerConfig::default(),
            model: ModelConfig::default(),
            optimizer: OptimizerConfig::default(),
            dataset: SinusoidConfig::default(),
            train: TrainConfig::default(),
            eval: EvalConfig::default(),
        }
    }
}

impl RunConfig {
    /// Reads a JSON config, missing fields take their default.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tags.is_empty() {
            return Err(LearnerErr::InvalidConfig("tags must not be empty".into()));
        }

        self.learner.validate()
    }
}
