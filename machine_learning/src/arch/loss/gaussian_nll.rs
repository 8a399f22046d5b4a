use std::f32::consts::PI;

use ndarray::{ArrayView1, Zip};

use super::LossFn;

/// Average negative log-likelihood of the targets under independent normals.
#[derive(Debug, Default, Clone, Copy)]
pub struct GaussianNll;

impl LossFn for GaussianNll {
    fn loss(&self, mean: ArrayView1<f32>, std: ArrayView1<f32>, y: ArrayView1<f32>) -> f32 {
        if y.is_empty() {
            return 0.;
        }

        let half_log_2pi = 0.5 * (2. * PI).ln();
        let total = Zip::from(&mean)
            .and(&std)
            .and(&y)
            .fold(0., |acc, &mu, &sigma, &y| {
                acc + half_log_2pi + sigma.ln() + (y - mu).powi(2) / (2. * sigma.powi(2))
            });

        total / y.len() as f32
    }
}
