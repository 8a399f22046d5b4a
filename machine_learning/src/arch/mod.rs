pub mod activations;
pub mod loss;
