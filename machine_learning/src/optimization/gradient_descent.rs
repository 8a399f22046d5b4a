use super::Optimizer;
use crate::{MlErr, Result};

/// Plain steps against the gradient, scaled by a fixed learning rate.
#[derive(Debug, Clone)]
pub struct GradientDescent {
    lr: f32,
}

impl GradientDescent {
    pub fn new(lr: f32) -> Self {
        Self { lr }
    }
}

impl Optimizer for GradientDescent {
    fn update_params(&mut self, params: &mut [f32], grad: &[f32]) -> Result<()> {
        if grad.len() != params.len() {
            return Err(MlErr::SizeMismatch {
                what: "gradient",
                got: grad.len(),
                expected: params.len(),
            });
        }

        params.iter_mut().zip(grad).for_each(|(p, g)| *p -= self.lr * g);
        Ok(())
    }
}
