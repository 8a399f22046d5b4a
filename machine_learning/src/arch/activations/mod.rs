mod act_fn;
mod elu;
mod relu;
mod sigmoid;
mod tanh;

pub use act_fn::{ActFn, get_nonlinearity};
pub use elu::Elu;
pub use relu::Relu;
pub use sigmoid::Sigmoid;
pub use tanh::Tanh;
