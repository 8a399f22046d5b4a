use std::{
    fmt::Display,
    fs,
    path::{Path, PathBuf},
};

use log::{debug, info};
use machine_learning::{MlErr, ops::nan_mean};
use ndarray::{Array1, ArrayView1, ArrayView2, Axis};

use crate::{
    LearnerErr, Result,
    checkpoint::{CHECKPOINT_FILE, SafetensorsSaver, Saver},
    config::{EvalConfig, LearnerConfig, TrainConfig},
    meta_learner::MetaLearner,
    model::NpModel,
    plot::{Panel, render_panels},
    sampler::{FewShotTask, Sampler, TaskSet, cosort_x},
};

/// Trains and evaluates a `MetaLearner` on one dimensional regression tasks, drawing few-shot
/// prediction figures and keeping a checkpoint of its variables along the way.
pub struct NpLearner<L, S = SafetensorsSaver> {
    base: L,
    saver: S,
    config: LearnerConfig,
    checkpoint_dir: PathBuf,
    result_dir: PathBuf,
}

/// The first input dimension, the one figures are drawn over.
fn first_column(x: ArrayView2<'_, f32>) -> Result<ArrayView1<'_, f32>> {
    if x.ncols() == 0 {
        return Err(MlErr::SizeMismatch {
            what: "input dimension",
            got: 0,
            expected: 1,
        }
        .into());
    }

    Ok(x.index_axis_move(Axis(1), 0))
}

fn draw_task<T: TaskSet>(
    tasks: &mut T,
    num_shots: usize,
    test_shots: usize,
) -> Result<(T::Sampler, FewShotTask)> {
    let mut sampler = tasks.sample(1).pop().ok_or(LearnerErr::EmptyTaskSet)?;
    let task = FewShotTask::draw(&mut sampler, num_shots, test_shots);
    Ok((sampler, task))
}

impl<L: MetaLearner, S: Saver> NpLearner<L, S> {
    /// Creates a new `NpLearner`, creating its checkpoint and result directories if missing.
    ///
    /// # Arguments
    /// * `base` - The learner doing the actual optimization.
    /// * `config` - Where to write and how to draw figures.
    /// * `saver` - Persists the base learner's variables.
    ///
    /// # Returns
    /// An error if the config is invalid or a directory can't be created.
    pub fn new(base: L, config: LearnerConfig, saver: S) -> Result<Self> {
        config.validate()?;

        let checkpoint_dir = config.checkpoint_root.join(base.save_dir());
        let result_dir = config.result_root.join(base.save_dir());
        fs::create_dir_all(&checkpoint_dir)?;
        fs::create_dir_all(&result_dir)?;

        Ok(Self {
            base,
            saver,
            config,
            checkpoint_dir,
            result_dir,
        })
    }

    pub fn base(&self) -> &L {
        &self.base
    }

    pub fn base_mut(&mut self) -> &mut L {
        &mut self.base
    }

    pub fn saver(&self) -> &S {
        &self.saver
    }

    pub fn checkpoint_dir(&self) -> &Path {
        &self.checkpoint_dir
    }

    pub fn result_dir(&self) -> &Path {
        &self.result_dir
    }

    /// The file the variables are saved to and restored from.
    pub fn checkpoint_path(&self) -> PathBuf {
        self.checkpoint_dir.join(CHECKPOINT_FILE)
    }

    /// The path of the figure labeled `label`, `<dataset>-<label>.<ext>` in the result directory.
    pub fn figure_path(&mut self, label: impl Display) -> PathBuf {
        let dataset = self.base.eval_set().dataset_name().to_string();
        let ext = &self.config.figure_ext;
        self.result_dir.join(format!("{dataset}-{label}.{ext}"))
    }

    fn restore(&mut self) -> Result<()> {
        let path = self.checkpoint_path();
        let var_list = self.base.variables().to_vec();

        info!("restoring parameters from {}", path.display());
        self.saver.restore(self.base.session_mut(), &var_list, &path)
    }

    fn save(&mut self) -> Result<()> {
        let path = self.checkpoint_path();
        self.saver
            .save(self.base.session(), self.base.variables(), &path)
    }

    /// Draws few-shot predictions for fresh evaluation functions and writes them to `path`.
    ///
    /// Each panel draws a new function, conditions the first replica on a context whose size
    /// cycles through `context_cycle` and overlays `repetitions` predictive curves over an even
    /// grid of the input range, on top of the true curve and the context points.
    ///
    /// # Returns
    /// The panels that were drawn.
    pub fn visualise_1d(&mut self, path: &Path) -> Result<Vec<Panel>> {
        let vis = &self.config.visualise;
        let mut panels = Vec::with_capacity(vis.panels);

        for i in 0..vis.panels {
            let num_shots = vis.context_cycle[i % vis.context_cycle.len()];

            let eval_set = self.base.eval_set();
            let (low, high) = eval_set.input_range();
            let (sampler, task) = draw_task(eval_set, num_shots, 0)?;
            let (x_c, y_c) = task.context();

            let (x_gt, y_gt) = sampler.get_all_samples();
            let (xs, ys) = cosort_x(first_column(x_gt.view())?, y_gt.view());

            let x_eval = Array1::linspace(low, high, vis.grid_points.get()).insert_axis(Axis(1));
            let grid = first_column(x_eval.view())?;

            let (session, models) = self.base.parallel_models();
            let model = models.first_mut().ok_or(LearnerErr::NoReplicas)?;

            let mut predictions = Vec::with_capacity(vis.repetitions);
            for _ in 0..vis.repetitions {
                let y_hat = model.predict(session, x_c, y_c, x_eval.view())?;
                predictions.push(grid.iter().copied().zip(y_hat.iter().copied()).collect());
            }

            panels.push(Panel {
                ground_truth: xs.into_iter().zip(ys).collect(),
                context: first_column(x_c)?
                    .iter()
                    .copied()
                    .zip(y_c.iter().copied())
                    .collect(),
                predictions,
            });
        }

        render_panels(path, &panels, vis.columns, vis.figure_size)?;
        Ok(panels)
    }

    /// Trains the base learner for `config.num_epoch` epochs.
    ///
    /// A figure is drawn before the first epoch. After each epoch the base learner is evaluated
    /// every `eval_interval` epochs, and every `save_interval` epochs a figure is drawn and the
    /// checkpoint is written.
    ///
    /// # Returns
    /// An error if restoring was requested and fails, or any step fails.
    pub fn run_train(&mut self, config: &TrainConfig) -> Result<()> {
        if config.load_params {
            self.restore()?;
        }

        let path = self.figure_path(0);
        self.visualise_1d(&path)?;

        let steps = self.config.steps_per_epoch.get();
        for epoch in 1..=config.num_epoch {
            self.base.qclock();
            for step in 0..steps {
                let loss = self
                    .base
                    .train(config.meta_batch, config.num_shots, config.test_shots)?;
                debug!(epoch = epoch, step = step, loss = loss; "training step");
            }
            let train_time = self.base.qclock();
            info!("Epoch {epoch}: {:0.3}s", train_time.as_secs_f32());

            if epoch % config.eval_interval == 0 {
                let v = self.base.evaluate(
                    config.eval_samples,
                    config.num_shots,
                    config.test_shots,
                )?;
                info!("    Eval Loss: {v}");
            }

            if epoch % config.save_interval == 0 {
                info!("    save figure");
                let path = self.figure_path(epoch);
                self.visualise_1d(&path)?;

                info!("    save checkpoint");
                self.save()?;
            }

            log::logger().flush();
        }

        Ok(())
    }

    /// Restores the checkpoint and averages the inference loss over `config.num_func` fresh
    /// evaluation functions, NaN losses are left out.
    ///
    /// # Returns
    /// The aggregated loss, once the evaluation figure is written.
    pub fn run_eval(&mut self, config: &EvalConfig) -> Result<f32> {
        self.restore()?;

        let mut evals = Vec::with_capacity(config.num_func);
        for _ in 0..config.num_func {
            let (_, task) = draw_task(self.base.eval_set(), config.num_shots, config.test_shots)?;
            let (x_c, y_c) = task.context();
            let (x_all, y_all) = task.all();

            let (session, models) = self.base.parallel_models();
            let model = models.first_mut().ok_or(LearnerErr::NoReplicas)?;
            evals.push(model.compute_loss(session, x_c, y_c, x_all, y_all, false, config.step)?);
        }

        let eval = nan_mean(&evals);
        info!(
            "EVAL: num_func {} num_shots {} test_shots {} step {}",
            config.num_func, config.num_shots, config.test_shots, config.step
        );
        info!("    {eval}");

        let path = self.figure_path("eval");
        self.visualise_1d(&path)?;

        Ok(eval)
    }
}
