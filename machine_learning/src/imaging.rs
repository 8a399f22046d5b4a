use std::path::Path;

use image::RgbImage;
use ndarray::{Array3, ArrayView4, Axis, s};

use crate::{MlErr, Result};

/// Places a batch of RGB images on a grid.
///
/// # Arguments
/// * `imgs` - Images shaped `(n, h, w, 3)`, only the first `rows * cols` are used.
/// * `size` - The `(rows, cols)` of the grid.
///
/// # Returns
/// A `(h * rows, w * cols, 3)` image where image `j * cols + i` sits at row `j` and column `i`,
/// or an error if there are not enough images or they aren't RGB.
pub fn tile_images(imgs: ArrayView4<u8>, size: (usize, usize)) -> Result<Array3<u8>> {
    let (rows, cols) = size;
    let (n, img_h, img_w, channels) = imgs.dim();

    if channels != 3 {
        return Err(MlErr::SizeMismatch {
            what: "image channels",
            got: channels,
            expected: 3,
        });
    }

    if n < rows * cols {
        return Err(MlErr::NotEnoughImages {
            got: n,
            expected: rows * cols,
        });
    }

    let mut all_images = Array3::zeros((img_h * rows, img_w * cols, 3));
    for j in 0..rows {
        for i in 0..cols {
            all_images
                .slice_mut(s![img_h * j..img_h * (j + 1), img_w * i..img_w * (i + 1), ..])
                .assign(&imgs.index_axis(Axis(0), j * cols + i));
        }
    }

    Ok(all_images)
}

/// Rescales a batch of images from `vrange` into 8 bit intensities and tiles them.
///
/// # Arguments
/// * `images` - Images shaped `(n, h, w, 3)` with values in `vrange`.
/// * `path` - Where to write the tiled image, the format follows the extension.
/// * `layout` - The `(rows, cols)` of the grid.
/// * `vrange` - The `(low, high)` values mapped to 0 and 255.
///
/// # Returns
/// The tiled image, whether it got written or not.
pub fn visualize_samples(
    images: ArrayView4<f32>,
    path: Option<&Path>,
    layout: (usize, usize),
    vrange: (f32, f32),
) -> Result<Array3<u8>> {
    let (low, high) = vrange;
    let width = high - low;
    if !width.is_finite() || width == 0. {
        return Err(MlErr::InvalidRange { low, high });
    }

    // Out of range values saturate instead of wrapping around.
    let images = images.mapv(|v| ((v - low) / width * 255.).round_ties_even().clamp(0., 255.) as u8);
    let view = tile_images(images.view(), layout)?;

    let Some(path) = path else {
        return Ok(view);
    };

    let (height, width, _) = view.dim();
    let raw = view.iter().copied().collect();
    let img = RgbImage::from_raw(width as u32, height as u32, raw).ok_or(MlErr::SizeMismatch {
        what: "image buffer",
        got: view.len(),
        expected: width * height * 3,
    })?;
    img.save(path)?;

    Ok(view)
}
