use ndarray::ArrayView1;

use super::LossFn;

/// Mean squared error loss function, it only looks at the predictive mean.
#[derive(Debug, Default, Clone, Copy)]
pub struct Mse;

impl LossFn for Mse {
    fn loss(&self, mean: ArrayView1<f32>, _std: ArrayView1<f32>, y: ArrayView1<f32>) -> f32 {
        (&mean - &y)
            .mapv(|x| x.powi(2))
            .mean()
            .unwrap_or_default()
    }
}
