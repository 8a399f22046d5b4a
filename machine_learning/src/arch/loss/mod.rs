mod gaussian_nll;
mod kind;
mod loss_fn;
mod mse;

pub use gaussian_nll::GaussianNll;
pub use kind::Loss;
pub use loss_fn::LossFn;
pub use mse::Mse;
