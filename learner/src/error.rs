use std::{error::Error, fmt, io, path::PathBuf};

use machine_learning::MlErr;
use safetensors::SafeTensorError;

/// The learner's result type.
pub type Result<T> = std::result::Result<T, LearnerErr>;

/// Failures of the training and evaluation harness.
#[derive(Debug)]
pub enum LearnerErr {
    Io(io::Error),
    Ml(MlErr),
    Config(serde_json::Error),
    InvalidConfig(String),
    Distribution(String),
    MissingCheckpoint {
        path: PathBuf,
    },
    SafeTensors(SafeTensorError),
    CheckpointMismatch {
        name: String,
        reason: String,
    },
    Plot(String),
    NoReplicas,
    EmptyTaskSet,
}

impl fmt::Display for LearnerErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LearnerErr::Io(e) => write!(f, "io error: {e}"),
            LearnerErr::Ml(e) => write!(f, "{e}"),
            LearnerErr::Config(e) => write!(f, "invalid config file: {e}"),
            LearnerErr::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            LearnerErr::Distribution(msg) => write!(f, "invalid distribution: {msg}"),
            LearnerErr::MissingCheckpoint { path } => {
                write!(f, "there's no checkpoint at {}", path.display())
            }
            LearnerErr::SafeTensors(e) => write!(f, "checkpoint error: {e}"),
            LearnerErr::CheckpointMismatch { name, reason } => {
                write!(f, "checkpoint variable '{name}' doesn't match: {reason}")
            }
            LearnerErr::Plot(msg) => write!(f, "plotting error: {msg}"),
            LearnerErr::NoReplicas => write!(f, "the learner has no model replicas"),
            LearnerErr::EmptyTaskSet => write!(f, "the task set produced no samplers"),
        }
    }
}

impl Error for LearnerErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            LearnerErr::Io(e) => Some(e),
            LearnerErr::Ml(e) => Some(e),
            LearnerErr::Config(e) => Some(e),
            LearnerErr::SafeTensors(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for LearnerErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<MlErr> for LearnerErr {
    fn from(value: MlErr) -> Self {
        Self::Ml(value)
    }
}

impl From<serde_json::Error> for LearnerErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Config(value)
    }
}

impl From<SafeTensorError> for LearnerErr {
    fn from(value: SafeTensorError) -> Self {
        Self::SafeTensors(value)
    }
}

impl From<rand_distr::uniform::Error> for LearnerErr {
    fn from(value: rand_distr::uniform::Error) -> Self {
        Self::Distribution(value.to_string())
    }
}

impl From<rand_distr::NormalError> for LearnerErr {
    fn from(value: rand_distr::NormalError) -> Self {
        Self::Distribution(value.to_string())
    }
}
