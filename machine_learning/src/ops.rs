use ndarray::{Array, Array2, ArrayView, Axis, RemoveAxis};

use crate::{MlErr, Result};

/// Encodes integer class labels as a matrix of indicator rows.
///
/// # Arguments
/// * `labels` - The class of each row.
/// * `num_classes` - The amount of columns of the result.
///
/// # Returns
/// A `(labels.len(), num_classes)` matrix with a single one per row, or an error if a label
/// doesn't fit in `num_classes`.
pub fn one_hot(labels: &[usize], num_classes: usize) -> Result<Array2<f32>> {
    let mut r = Array2::zeros((labels.len(), num_classes));

    for (index, &label) in labels.iter().enumerate() {
        if label >= num_classes {
            return Err(MlErr::LabelOutOfRange {
                index,
                label,
                num_classes,
            });
        }

        r[[index, label]] = 1.;
    }

    Ok(r)
}

/// Computes `ln(sum(exp(x)))` along `axis` without overflowing.
///
/// Lanes whose maximum is infinite reduce to that infinity, empty lanes reduce to `-inf`.
pub fn log_sum_exp<D: RemoveAxis>(x: ArrayView<f32, D>, axis: Axis) -> Array<f32, D::Smaller> {
    x.map_axis(axis, |lane| {
        let m = lane.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
        if m.is_infinite() {
            return m;
        }

        m + lane.iter().map(|&v| (v - m).exp()).sum::<f32>().ln()
    })
}

/// Numerically stable log-softmax over the last axis.
///
/// The per-lane maximum is subtracted before exponentiating so large logits don't overflow.
/// A zero dimensional input is a single logit and gets a log probability of zero.
pub fn log_prob_from_logits<D: RemoveAxis>(x: ArrayView<f32, D>) -> Array<f32, D> {
    let mut out = x.to_owned();
    let Some(last) = x.ndim().checked_sub(1) else {
        out.fill(0.);
        return out;
    };

    for mut lane in out.lanes_mut(Axis(last)) {
        let m = lane.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
        let lse = lane.iter().map(|&v| (v - m).exp()).sum::<f32>().ln();
        lane.mapv_inplace(|v| v - m - lse);
    }

    out
}

/// Averages the values that are not NaN.
///
/// # Returns
/// The mean of the defined values, NaN if there are none.
pub fn nan_mean(values: &[f32]) -> f32 {
    let (sum, n) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0., 0usize), |(sum, n), &v| (sum + v, n + 1));

    if n == 0 { f32::NAN } else { sum / n as f32 }
}

#[cfg(test)]
mod tests {
    use ndarray::{Array1, Axis, array};
    use ndarray_rand::{RandomExt, rand_distr::Uniform};

    use super::*;

    #[test]
    fn one_hot_rows() {
        let labels = [2, 0, 1, 2];
        let r = one_hot(&labels, 3).unwrap();

        assert_eq!(r.dim(), (4, 3));
        for (row, &label) in r.rows().into_iter().zip(&labels) {
            assert_eq!(row.sum(), 1.);
            assert_eq!(row[label], 1.);
        }
    }

    #[test]
    fn one_hot_empty() {
        let r = one_hot(&[], 5).unwrap();
        assert_eq!(r.dim(), (0, 5));
    }

    #[test]
    fn one_hot_out_of_range() {
        let err = one_hot(&[0, 3], 3).unwrap_err();
        assert!(matches!(
            err,
            MlErr::LabelOutOfRange {
                index: 1,
                label: 3,
                num_classes: 3
            }
        ));
    }

    #[test]
    fn log_sum_exp_matches_naive() {
        let x = array![[0.5, -1.0, 2.0], [3.0, 3.0, 3.0]];
        let got = log_sum_exp(x.view(), Axis(1));

        for (row, lse) in x.rows().into_iter().zip(got.iter()) {
            let naive = row.mapv(f32::exp).sum().ln();
            assert!((naive - lse).abs() < 1e-5);
        }
    }

    #[test]
    fn log_sum_exp_large_values() {
        let x = array![1000.0f32, 1000.0];
        let got = log_sum_exp(x.view(), Axis(0));
        let expected = 1000.0 + 2f32.ln();

        assert!((got.into_scalar() - expected).abs() < 1e-3);
    }

    #[test]
    fn log_prob_rows_normalize() {
        let x = Array2::random((6, 9), Uniform::new(-20., 20.).unwrap());
        let log_p = log_prob_from_logits(x.view());

        for row in log_p.rows() {
            let total: f32 = row.mapv(f32::exp).sum();
            assert!((total - 1.).abs() < 1e-5);
        }
    }

    #[test]
    fn log_prob_shift_invariant() {
        let x = Array2::random((3, 5), Uniform::new(-5., 5.).unwrap());
        let shifted = &x + 250.;

        let a = log_prob_from_logits(x.view());
        let b = log_prob_from_logits(shifted.view());

        for (a, b) in a.iter().zip(b.iter()) {
            assert!((a - b).abs() < 1e-3);
        }
    }

    #[test]
    fn log_prob_no_overflow() {
        let x = array![1e30f32, 0.];
        let log_p = log_prob_from_logits(x.view());

        assert!(log_p.iter().all(|v| !v.is_nan()));
        assert_eq!(log_p[0], 0.);
    }

    #[test]
    fn nan_mean_skips_nan() {
        assert_eq!(nan_mean(&[1., f32::NAN, 3.]), 2.);
        assert!(nan_mean(&[f32::NAN, f32::NAN]).is_nan());
        assert!(nan_mean(&[]).is_nan());
    }

    #[test]
    fn nan_mean_single() {
        let values = Array1::from_elem(1, 4.5f32);
        assert_eq!(nan_mean(values.as_slice().unwrap()), 4.5);
    }
}
