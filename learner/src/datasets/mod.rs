mod sinusoid;

pub use sinusoid::{SinusoidSampler, SinusoidTaskSet};
