use ndarray::{Array1, Array2, ArrayView1, ArrayView2, s};

/// Draws points from a single underlying function.
pub trait Sampler {
    /// Samples `k` points, inputs shaped `(k, input_dim)` and outputs shaped `(k,)`.
    fn sample(&mut self, k: usize) -> (Array2<f32>, Array1<f32>);

    /// The dense "ground truth" curve of the function.
    fn get_all_samples(&self) -> (Array2<f32>, Array1<f32>);
}

/// A family of functions, each draw produces fresh samplers.
pub trait TaskSet {
    type Sampler: Sampler;

    /// Draws `n` independent functions.
    fn sample(&mut self, n: usize) -> Vec<Self::Sampler>;

    fn dataset_name(&self) -> &str;

    /// The `(low, high)` interval the functions are defined on.
    fn input_range(&self) -> (f32, f32);
}

/// Sorts the `(x, y)` pairs by `x` so they can be drawn as a line.
pub fn cosort_x(x: ArrayView1<f32>, y: ArrayView1<f32>) -> (Vec<f32>, Vec<f32>) {
    let mut pairs: Vec<_> = x.iter().copied().zip(y.iter().copied()).collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
    pairs.into_iter().unzip()
}

/// A batch of points of one function split into a context and a target set.
#[derive(Debug, Clone)]
pub struct FewShotTask {
    x: Array2<f32>,
    y: Array1<f32>,
    num_shots: usize,
}

impl FewShotTask {
    /// Samples `num_shots + test_shots` points, the first `num_shots` are the context.
    pub fn draw<S: Sampler>(sampler: &mut S, num_shots: usize, test_shots: usize) -> Self {
        let (x, y) = sampler.sample(num_shots + test_shots);
        let num_shots = num_shots.min(y.len());
        Self { x, y, num_shots }
    }

    pub fn context(&self) -> (ArrayView2<'_, f32>, ArrayView1<'_, f32>) {
        (
            self.x.slice(s![..self.num_shots, ..]),
            self.y.slice(s![..self.num_shots]),
        )
    }

    /// The points past the context. Kept for models that score only the held out targets,
    /// losses in this crate are computed over `all`.
    pub fn targets(&self) -> (ArrayView2<'_, f32>, ArrayView1<'_, f32>) {
        (
            self.x.slice(s![self.num_shots.., ..]),
            self.y.slice(s![self.num_shots..]),
        )
    }

    /// Every point, context included.
    pub fn all(&self) -> (ArrayView2<'_, f32>, ArrayView1<'_, f32>) {
        (self.x.view(), self.y.view())
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn cosort() {
        let x = array![3., -1., 2., 0.];
        let y = array![30., -10., 20., 0.];

        let (xs, ys) = cosort_x(x.view(), y.view());

        assert_eq!(xs, [-1., 0., 2., 3.]);
        assert_eq!(ys, [-10., 0., 20., 30.]);
    }

    /// Hands out the points `0, 1, 2, ...` with `y = 10 * x`.
    struct Counting(usize);

    impl Sampler for Counting {
        fn sample(&mut self, k: usize) -> (Array2<f32>, Array1<f32>) {
            let x: Array1<f32> = (self.0..self.0 + k).map(|i| i as f32).collect();
            self.0 += k;
            let y = &x * 10.;
            (x.insert_axis(ndarray::Axis(1)), y)
        }

        fn get_all_samples(&self) -> (Array2<f32>, Array1<f32>) {
            (Array2::zeros((0, 1)), Array1::zeros(0))
        }
    }

    #[test]
    fn task_split() {
        let task = FewShotTask::draw(&mut Counting(0), 2, 3);

        let (x_c, y_c) = task.context();
        let (x_t, y_t) = task.targets();
        let (x, y) = task.all();

        assert_eq!(x_c.column(0), array![0., 1.]);
        assert_eq!(y_c, array![0., 10.]);
        assert_eq!(x_t.column(0), array![2., 3., 4.]);
        assert_eq!(y_t.len(), 3);
        assert_eq!(x.nrows(), 5);
        assert_eq!(y.len(), 5);
    }

    #[test]
    fn task_without_targets() {
        let task = FewShotTask::draw(&mut Counting(0), 4, 0);

        assert_eq!(task.context().1.len(), 4);
        assert!(task.targets().1.is_empty());
    }

    #[test]
    fn cosort_uneven_lengths() {
        let x = array![2., 1., 0.];
        let y = array![1., 2.];

        let (xs, ys) = cosort_x(x.view(), y.view());

        assert_eq!(xs, [1., 2.]);
        assert_eq!(ys, [2., 1.]);
    }
}
