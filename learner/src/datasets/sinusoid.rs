use ndarray::{Array1, Array2, Axis};
use rand::{SeedableRng, rngs::StdRng};
use rand_distr::{Distribution, Normal, Uniform};

use crate::{
    Result,
    config::SinusoidConfig,
    sampler::{Sampler, TaskSet},
};

const DATASET_NAME: &str = "sinusoid";

/// The family of functions `a * sin(x + phase)` with random amplitude and phase.
pub struct SinusoidTaskSet {
    amplitude: Uniform<f32>,
    phase: Uniform<f32>,
    input: Uniform<f32>,
    input_range: (f32, f32),
    noise: Option<Normal<f32>>,
    num_gt_points: usize,
    rng: StdRng,
}

impl SinusoidTaskSet {
    /// Creates a new `SinusoidTaskSet`.
    ///
    /// # Arguments
    /// * `config` - The ranges the functions are drawn from.
    /// * `rng` - The generator every sampler derives its own generator from.
    ///
    /// # Returns
    /// An error if a range is inverted or not finite, or the noise is negative.
    pub fn new(config: &SinusoidConfig, rng: StdRng) -> Result<Self> {
        let (a_lo, a_hi) = config.amplitude;
        let (p_lo, p_hi) = config.phase;
        let (x_lo, x_hi) = config.input_range;

        let noise = if config.noise_std == 0. {
            None
        } else {
            Some(Normal::new(0., config.noise_std)?)
        };

        Ok(Self {
            amplitude: Uniform::new_inclusive(a_lo, a_hi)?,
            phase: Uniform::new_inclusive(p_lo, p_hi)?,
            input: Uniform::new_inclusive(x_lo, x_hi)?,
            input_range: config.input_range,
            noise,
            num_gt_points: config.num_gt_points.get(),
            rng,
        })
    }
}

impl TaskSet for SinusoidTaskSet {
    type Sampler = SinusoidSampler;

    fn sample(&mut self, n: usize) -> Vec<SinusoidSampler> {
        (0..n)
            .map(|_| SinusoidSampler {
                amplitude: self.amplitude.sample(&mut self.rng),
                phase: self.phase.sample(&mut self.rng),
                input: self.input,
                input_range: self.input_range,
                noise: self.noise,
                num_gt_points: self.num_gt_points,
                rng: StdRng::from_rng(&mut self.rng),
            })
            .collect()
    }

    fn dataset_name(&self) -> &str {
        DATASET_NAME
    }

    fn input_range(&self) -> (f32, f32) {
        self.input_range
    }
}

/// A single sinusoid drawn from a `SinusoidTaskSet`.
pub struct SinusoidSampler {
    amplitude: f32,
    phase: f32,
    input: Uniform<f32>,
    input_range: (f32, f32),
    noise: Option<Normal<f32>>,
    num_gt_points: usize,
    rng: StdRng,
}

impl SinusoidSampler {
    pub fn amplitude(&self) -> f32 {
        self.amplitude
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    fn eval(&self, x: f32) -> f32 {
        self.amplitude * (x + self.phase).sin()
    }
}

impl Sampler for SinusoidSampler {
    fn sample(&mut self, k: usize) -> (Array2<f32>, Array1<f32>) {
        let x: Array1<f32> = (0..k).map(|_| self.input.sample(&mut self.rng)).collect();
        let mut y = x.mapv(|x| self.eval(x));

        if let Some(noise) = self.noise {
            y.mapv_inplace(|y| y + noise.sample(&mut self.rng));
        }

        (x.insert_axis(Axis(1)), y)
    }

    fn get_all_samples(&self) -> (Array2<f32>, Array1<f32>) {
        let (low, high) = self.input_range;
        let x = Array1::linspace(low, high, self.num_gt_points);
        let y = x.mapv(|x| self.eval(x));
        (x.insert_axis(Axis(1)), y)
    }
}
