mod kernel;

pub use kernel::KernelNp;

use machine_learning::variables::VariableStore;
use ndarray::{Array1, ArrayView1, ArrayView2};

use crate::Result;

/// A conditional model over functions, one replica of the learner's parallel models.
///
/// Inputs are shaped `(n, input_dim)` and outputs `(n,)`. The model's parameters live in the
/// learner's `VariableStore`, replicas of the same model share them.
pub trait NpModel {
    /// Draws one predictive curve at `x_query` given the context points.
    fn predict(
        &mut self,
        session: &VariableStore,
        x_context: ArrayView2<f32>,
        y_context: ArrayView1<f32>,
        x_query: ArrayView2<f32>,
    ) -> Result<Array1<f32>>;

    /// The loss of predicting `y_all` at `x_all` given the context points.
    ///
    /// # Arguments
    /// * `is_training` - Whether this loss drives an update or only gets reported.
    /// * `step` - The training step the loss is computed at.
    #[allow(clippy::too_many_arguments)]
    fn compute_loss(
        &mut self,
        session: &VariableStore,
        x_context: ArrayView2<f32>,
        y_context: ArrayView1<f32>,
        x_all: ArrayView2<f32>,
        y_all: ArrayView1<f32>,
        is_training: bool,
        step: usize,
    ) -> Result<f32>;

    /// Writes the gradient of the training loss with respect to every parameter of `session`
    /// into `grad`, parameters this model doesn't own are left untouched.
    ///
    /// # Returns
    /// The training loss at the current parameters.
    fn compute_grad(
        &mut self,
        session: &mut VariableStore,
        x_context: ArrayView2<f32>,
        y_context: ArrayView1<f32>,
        x_all: ArrayView2<f32>,
        y_all: ArrayView1<f32>,
        grad: &mut [f32],
    ) -> Result<f32>;
}
