pub mod arch;
pub mod broadcast;
pub mod error;
pub mod imaging;
pub mod naming;
pub mod ops;
pub mod optimization;
pub mod variables;

pub use error::{MlErr, Result};
