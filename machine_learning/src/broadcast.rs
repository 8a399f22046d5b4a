use std::{iter, marker::PhantomData};

use ndarray::{ArrayD, Axis};

use crate::Result;

/// Where the copies of a stacked tensor go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackAxis {
    /// A new axis after the existing ones.
    Last,
    /// A new axis before the existing ones.
    First,
}

/// The single operation a numeric backend has to provide for mask broadcasting.
pub trait MaskBackend {
    type Tensor;

    /// Stacks `n` copies of `tensor` along a new axis.
    fn stack_copies(tensor: &Self::Tensor, n: usize, axis: StackAxis) -> Result<Self::Tensor>;
}

/// The `ndarray` backend, tensors are dynamic dimensional arrays of `A`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NdArray<A>(PhantomData<A>);

impl<A: Clone> MaskBackend for NdArray<A> {
    type Tensor = ArrayD<A>;

    fn stack_copies(tensor: &ArrayD<A>, n: usize, axis: StackAxis) -> Result<ArrayD<A>> {
        let axis = match axis {
            StackAxis::Last => Axis(tensor.ndim()),
            StackAxis::First => Axis(0),
        };

        let copies: Vec<_> = iter::repeat_n(tensor.view(), n).collect();
        Ok(ndarray::stack(axis, &copies)?)
    }
}

/// Replicates a mask along a new channel axis and then along a new batch axis.
///
/// # Arguments
/// * `masks` - The mask to replicate.
/// * `num_channels` - The amount of copies stacked on a new last axis, if any.
/// * `batch_size` - The amount of copies stacked on a new leading axis, if any.
///
/// # Returns
/// The broadcast mask or the backend's error, for instance when asked for zero copies.
pub fn broadcast_masks<B: MaskBackend>(
    mut masks: B::Tensor,
    num_channels: Option<usize>,
    batch_size: Option<usize>,
) -> Result<B::Tensor> {
    if let Some(n) = num_channels {
        masks = B::stack_copies(&masks, n, StackAxis::Last)?;
    }

    if let Some(n) = batch_size {
        masks = B::stack_copies(&masks, n, StackAxis::First)?;
    }

    Ok(masks)
}

#[cfg(test)]
mod tests {
    use ndarray::{IxDyn, array};

    use super::*;

    fn mask() -> ArrayD<u8> {
        array![[1, 0, 1], [0, 1, 1]].into_dyn()
    }

    #[test]
    fn channels_then_batch() {
        let masks = broadcast_masks::<NdArray<u8>>(mask(), Some(3), Some(4)).unwrap();
        assert_eq!(masks.shape(), &[4, 2, 3, 3]);

        let base = mask();
        for b in 0..4 {
            for c in 0..3 {
                for i in 0..2 {
                    for j in 0..3 {
                        assert_eq!(masks[IxDyn(&[b, i, j, c])], base[IxDyn(&[i, j])]);
                    }
                }
            }
        }
    }

    #[test]
    fn only_channels() {
        let masks = broadcast_masks::<NdArray<u8>>(mask(), Some(2), None).unwrap();
        assert_eq!(masks.shape(), &[2, 3, 2]);
    }

    #[test]
    fn only_batch() {
        let masks = broadcast_masks::<NdArray<u8>>(mask(), None, Some(5)).unwrap();
        assert_eq!(masks.shape(), &[5, 2, 3]);
        assert_eq!(masks.index_axis(Axis(0), 4), mask());
    }

    #[test]
    fn nothing_to_do() {
        let masks = broadcast_masks::<NdArray<u8>>(mask(), None, None).unwrap();
        assert_eq!(masks, mask());
    }

    #[test]
    fn zero_copies() {
        assert!(broadcast_masks::<NdArray<u8>>(mask(), Some(0), None).is_err());
    }

    /// A backend over flat vectors with an explicit shape, to check the algorithm doesn't
    /// depend on ndarray.
    struct Flat;

    impl MaskBackend for Flat {
        type Tensor = (Vec<usize>, Vec<bool>);

        fn stack_copies(
            (shape, data): &Self::Tensor,
            n: usize,
            axis: StackAxis,
        ) -> Result<Self::Tensor> {
            let mut out_shape = shape.clone();
            let data: Vec<bool> = match axis {
                StackAxis::Last => {
                    out_shape.push(n);
                    data.iter().flat_map(|&v| iter::repeat_n(v, n)).collect()
                }
                StackAxis::First => {
                    out_shape.insert(0, n);
                    data.repeat(n)
                }
            };
            Ok((out_shape, data))
        }
    }

    #[test]
    fn generic_over_backend() {
        let masks = (vec![2], vec![true, false]);
        let (shape, data) = broadcast_masks::<Flat>(masks, Some(2), Some(2)).unwrap();

        assert_eq!(shape, [2, 2, 2]);
        assert_eq!(data, [true, true, false, false, true, true, false, false]);
    }
}
