use machine_learning::{
    MlErr,
    arch::{
        activations::ActFn,
        loss::{Loss, LossFn},
    },
    naming::{LayerCounters, get_name},
    variables::VariableStore,
};
use ndarray::{Array1, ArrayView1, ArrayView2, Axis, Zip};
use rand::{Rng, rngs::StdRng};
use rand_distr::StandardNormal;

use super::NpModel;
use crate::{Result, config::ModelConfig};

const LAYER_NAME: &str = "kernel_np";
const FD_EPSILON: f32 = 1e-3;

const LOG_BANDWIDTH: &str = "log_bandwidth";
const PRIOR_MEAN: &str = "prior_mean";
const LOG_SIGMA: &str = "log_sigma";
const LOG_NOISE: &str = "log_noise";

/// A kernel smoother acting as a conditional model over functions.
///
/// The predictive mean at a query point blends the context outputs, weighted by a gaussian
/// kernel of the distance to each context input, with a learned prior mean. The predictive
/// variance is an epistemic term that shrinks as the context around the query gets denser,
/// plus an observation noise floor.
pub struct KernelNp {
    scope: String,
    loss_fn: Loss,
    output_act: Option<ActFn>,
    rng: StdRng,
}

impl KernelNp {
    /// Creates a new `KernelNp` and registers its variables in `session`.
    ///
    /// # Arguments
    /// * `session` - The store the parameters are registered in.
    /// * `counters` - Names the model's variable scope.
    /// * `config` - The loss and output nonlinearity.
    /// * `rng` - Drives the latent draws of `predict`.
    ///
    /// # Returns
    /// An error if the variable names are already taken.
    pub fn new(
        session: &mut VariableStore,
        counters: &mut LayerCounters,
        config: &ModelConfig,
        rng: StdRng,
    ) -> Result<Self> {
        let scope = get_name(LAYER_NAME, counters);
        let model = Self {
            scope,
            loss_fn: config.loss_fn,
            output_act: config.output_act,
            rng,
        };

        let init = [
            (LOG_BANDWIDTH, 0.),
            (PRIOR_MEAN, 0.),
            (LOG_SIGMA, 0.),
            (LOG_NOISE, 0.1f32.ln()),
        ];
        for (name, value) in init {
            session.add(&model.var(name), &[1], [value], true)?;
        }

        Ok(model)
    }

    /// A model sharing this one's variables with its own random stream.
    pub fn replica(&self, rng: StdRng) -> Self {
        Self {
            scope: self.scope.clone(),
            loss_fn: self.loss_fn,
            output_act: self.output_act,
            rng,
        }
    }

    /// The scope every variable of this model lives under.
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// The full names of the model's variables.
    pub fn variable_names(&self) -> Vec<String> {
        [LOG_BANDWIDTH, PRIOR_MEAN, LOG_SIGMA, LOG_NOISE]
            .iter()
            .map(|name| self.var(name))
            .collect()
    }

    fn var(&self, name: &str) -> String {
        format!("{}/{name}", self.scope)
    }

    /// The predictive mean and standard deviation at every query point.
    fn posterior(
        &self,
        session: &VariableStore,
        x_context: ArrayView2<f32>,
        y_context: ArrayView1<f32>,
        x_query: ArrayView2<f32>,
    ) -> Result<(Array1<f32>, Array1<f32>)> {
        if x_context.nrows() != y_context.len() {
            return Err(MlErr::SizeMismatch {
                what: "context points",
                got: y_context.len(),
                expected: x_context.nrows(),
            }
            .into());
        }

        if x_context.ncols() != x_query.ncols() {
            return Err(MlErr::SizeMismatch {
                what: "input dimension",
                got: x_query.ncols(),
                expected: x_context.ncols(),
            }
            .into());
        }

        let bandwidth = session.scalar(&self.var(LOG_BANDWIDTH))?.exp();
        let prior_mean = session.scalar(&self.var(PRIOR_MEAN))?;
        let sigma2 = (2. * session.scalar(&self.var(LOG_SIGMA))?).exp();
        let noise2 = (2. * session.scalar(&self.var(LOG_NOISE))?).exp();
        let scale = 2. * bandwidth.powi(2);

        let mut mean = Array1::zeros(x_query.nrows());
        let mut std = Array1::zeros(x_query.nrows());

        Zip::from(x_query.rows())
            .and(&mut mean)
            .and(&mut std)
            .for_each(|q, mean, std| {
                let weights = (&x_context - &q)
                    .mapv(|d| d * d)
                    .sum_axis(Axis(1))
                    .mapv(|d2| (-d2 / scale).exp());
                let density = weights.sum();

                *mean = (weights.dot(&y_context) + prior_mean) / (density + 1.);
                *std = (sigma2 / (density + 1.) + noise2).sqrt();
            });

        if let Some(act) = self.output_act {
            mean = act.apply(mean.view());
        }

        Ok((mean, std))
    }
}

impl NpModel for KernelNp {
    fn predict(
        &mut self,
        session: &VariableStore,
        x_context: ArrayView2<f32>,
        y_context: ArrayView1<f32>,
        x_query: ArrayView2<f32>,
    ) -> Result<Array1<f32>> {
        let (mean, std) = self.posterior(session, x_context, y_context, x_query)?;

        // One latent draw per curve keeps each prediction smooth.
        let z: f32 = self.rng.sample(StandardNormal);
        Ok(mean + std * z)
    }

    fn compute_loss(
        &mut self,
        session: &VariableStore,
        x_context: ArrayView2<f32>,
        y_context: ArrayView1<f32>,
        x_all: ArrayView2<f32>,
        y_all: ArrayView1<f32>,
        _is_training: bool,
        _step: usize,
    ) -> Result<f32> {
        if x_all.nrows() != y_all.len() {
            return Err(MlErr::SizeMismatch {
                what: "target points",
                got: y_all.len(),
                expected: x_all.nrows(),
            }
            .into());
        }

        let (mean, std) = self.posterior(session, x_context, y_context, x_all)?;
        Ok(self.loss_fn.loss(mean.view(), std.view(), y_all))
    }

    fn compute_grad(
        &mut self,
        session: &mut VariableStore,
        x_context: ArrayView2<f32>,
        y_context: ArrayView1<f32>,
        x_all: ArrayView2<f32>,
        y_all: ArrayView1<f32>,
        grad: &mut [f32],
    ) -> Result<f32> {
        if grad.len() != session.num_params() {
            return Err(MlErr::SizeMismatch {
                what: "gradient buffer",
                got: grad.len(),
                expected: session.num_params(),
            }
            .into());
        }

        let loss = self.compute_loss(session, x_context, y_context, x_all, y_all, true, 0)?;

        for name in self.variable_names() {
            let Some(range) = session.variable(&name).map(|v| v.range()) else {
                continue;
            };

            for i in range {
                let original = session.params()[i];

                session.params_mut()[i] = original + FD_EPSILON;
                let plus = self.compute_loss(session, x_context, y_context, x_all, y_all, true, 0)?;

                session.params_mut()[i] = original - FD_EPSILON;
                let minus =
                    self.compute_loss(session, x_context, y_context, x_all, y_all, true, 0)?;

                session.params_mut()[i] = original;
                grad[i] = (plus - minus) / (2. * FD_EPSILON);
            }
        }

        Ok(loss)
    }
}
