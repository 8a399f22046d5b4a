use ndarray::ArrayView1;

/// A loss over a predictive distribution given by a per-point mean and standard deviation.
pub trait LossFn {
    fn loss(&self, mean: ArrayView1<f32>, std: ArrayView1<f32>, y: ArrayView1<f32>) -> f32;
}
