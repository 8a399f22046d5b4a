use std::{
    error::Error,
    fmt::{self, Display},
};

use ndarray::ShapeError;

/// The result type used in the entire machine learning module.
pub type Result<T> = std::result::Result<T, MlErr>;

/// The machine learning module's error type.
#[derive(Debug)]
pub enum MlErr {
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    LabelOutOfRange {
        index: usize,
        label: usize,
        num_classes: usize,
    },
    UnknownNonlinearity {
        name: String,
    },
    UnknownFilterType {
        name: String,
    },
    DuplicateVariable {
        name: String,
    },
    UnknownVariable {
        name: String,
    },
    NotEnoughImages {
        got: usize,
        expected: usize,
    },
    InvalidRange {
        low: f32,
        high: f32,
    },
    Shape(ShapeError),
    Image(image::ImageError),
}

impl Display for MlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MlErr::SizeMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "There's a size mismatch in {what}, got {got} and expected {expected}"
            ),
            MlErr::LabelOutOfRange {
                index,
                label,
                num_classes,
            } => write!(
                f,
                "Label {label} at position {index} is out of range for {num_classes} classes"
            ),
            MlErr::UnknownNonlinearity { name } => write!(f, "Unknown nonlinearity '{name}'"),
            MlErr::UnknownFilterType { name } => {
                write!(f, "Unknown filter type '{name}', expected 'in' or 'not in'")
            }
            MlErr::DuplicateVariable { name } => {
                write!(f, "A variable named '{name}' already exists")
            }
            MlErr::UnknownVariable { name } => write!(f, "There's no variable named '{name}'"),
            MlErr::NotEnoughImages { got, expected } => write!(
                f,
                "Not enough images to fill the grid, got {got} and expected at least {expected}"
            ),
            MlErr::InvalidRange { low, high } => {
                write!(f, "The value range [{low}, {high}] is empty or not finite")
            }
            MlErr::Shape(e) => write!(f, "shape error: {e}"),
            MlErr::Image(e) => write!(f, "image error: {e}"),
        }
    }
}

impl Error for MlErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MlErr::Shape(e) => Some(e),
            MlErr::Image(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ShapeError> for MlErr {
    fn from(value: ShapeError) -> Self {
        Self::Shape(value)
    }
}

impl From<image::ImageError> for MlErr {
    fn from(value: image::ImageError) -> Self {
        Self::Image(value)
    }
}
