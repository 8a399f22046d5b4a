use super::Optimizer;
use crate::{MlErr, Result};

/// Adam with bias corrected first and second moment estimates.
#[derive(Debug, Clone)]
pub struct Adam {
    lr: f32,
    decay: (f32, f32),
    eps: f32,
    /// Amount of updates taken so far.
    t: i32,
    /// `(mean, uncentered variance)` of the gradient, per parameter.
    moments: Vec<(f32, f32)>,
}

impl Adam {
    /// # Arguments
    /// * `len` - Amount of parameters updated by this optimizer.
    /// * `lr` - Learning rate.
    /// * `b1`, `b2` - Decay rates of the moment estimates.
    /// * `eps` - Added to the denominator of each step.
    pub fn new(len: usize, lr: f32, b1: f32, b2: f32, eps: f32) -> Self {
        Self {
            lr,
            decay: (b1, b2),
            eps,
            t: 0,
            moments: vec![(0., 0.); len],
        }
    }

    pub fn with_learning_rate(len: usize, lr: f32) -> Self {
        Self::new(len, lr, 0.9, 0.999, 1e-8)
    }
}

impl Optimizer for Adam {
    fn update_params(&mut self, params: &mut [f32], grad: &[f32]) -> Result<()> {
        let expected = self.moments.len();
        if params.len() != expected || grad.len() != expected {
            return Err(MlErr::SizeMismatch {
                what: "adam parameters",
                got: params.len().max(grad.len()),
                expected,
            });
        }

        self.t = self.t.saturating_add(1);
        let (b1, b2) = self.decay;
        let alpha = self.lr * (1. - b2.powi(self.t)).sqrt() / (1. - b1.powi(self.t));

        for ((p, &g), (m, v)) in params.iter_mut().zip(grad).zip(&mut self.moments) {
            *m += (1. - b1) * (g - *m);
            *v += (1. - b2) * (g * g - *v);
            *p -= alpha * *m / (v.sqrt() + self.eps);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_step_has_learning_rate_length() {
        let mut adam = Adam::with_learning_rate(2, 0.1);
        let mut params = [0., 0.];

        adam.update_params(&mut params, &[3., -0.5]).unwrap();

        assert!((params[0] + 0.1).abs() < 1e-4);
        assert!((params[1] - 0.1).abs() < 1e-4);
    }

    #[test]
    fn zero_gradient_keeps_params() {
        let mut adam = Adam::with_learning_rate(1, 0.1);
        let mut params = [2.];

        for _ in 0..5 {
            adam.update_params(&mut params, &[0.]).unwrap();
        }

        assert_eq!(params, [2.]);
    }

    #[test]
    fn wrong_length() {
        let mut adam = Adam::with_learning_rate(3, 0.1);
        let mut params = [0., 0.];

        assert!(adam.update_params(&mut params, &[1., 1.]).is_err());
    }
}
