use crate::Result;

pub trait Optimizer {
    /// Makes a single step over `params` following `grad`.
    ///
    /// # Returns
    /// An error if both slices differ in length.
    fn update_params(&mut self, params: &mut [f32], grad: &[f32]) -> Result<()>;
}

impl<O: Optimizer + ?Sized> Optimizer for Box<O> {
    fn update_params(&mut self, params: &mut [f32], grad: &[f32]) -> Result<()> {
        (**self).update_params(params, grad)
    }
}
