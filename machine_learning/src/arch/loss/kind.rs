use ndarray::ArrayView1;
use serde::Deserialize;

use super::{GaussianNll, LossFn, Mse};

/// The loss functions a model can be configured with.
#[derive(Debug, Default, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Loss {
    Mse,
    #[default]
    GaussianNll,
}

impl LossFn for Loss {
    fn loss(&self, mean: ArrayView1<f32>, std: ArrayView1<f32>, y: ArrayView1<f32>) -> f32 {
        match self {
            Self::Mse => Mse.loss(mean, std, y),
            Self::GaussianNll => GaussianNll.loss(mean, std, y),
        }
    }
}
