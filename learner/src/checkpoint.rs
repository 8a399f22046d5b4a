use std::{
    fs,
    path::{Path, PathBuf},
};

use log::debug;
use machine_learning::{MlErr, variables::VariableStore};
use safetensors::{Dtype, SafeTensorError, SafeTensors, tensor::TensorView};

use crate::{LearnerErr, Result};

/// The name of the checkpoint file inside a run's checkpoint directory.
pub const CHECKPOINT_FILE: &str = "params.ckpt";

/// Persists and restores the values of a list of variables.
pub trait Saver {
    /// Writes the variables in `var_list` to `path`, replacing any previous checkpoint.
    fn save(&mut self, session: &VariableStore, var_list: &[String], path: &Path) -> Result<()>;

    /// Overwrites the variables in `var_list` with the values stored at `path`.
    ///
    /// # Returns
    /// An error if there's no checkpoint at `path` or it doesn't hold every variable with the
    /// right shape, in which case the session is left untouched.
    fn restore(
        &mut self,
        session: &mut VariableStore,
        var_list: &[String],
        path: &Path,
    ) -> Result<()>;
}

/// Stores each variable as an `F32` tensor of a safetensors file, keyed by its name.
#[derive(Debug, Default, Clone, Copy)]
pub struct SafetensorsSaver;

impl SafetensorsSaver {
    pub fn new() -> Self {
        Self
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

fn mismatch(name: &str, reason: impl Into<String>) -> LearnerErr {
    LearnerErr::CheckpointMismatch {
        name: name.to_string(),
        reason: reason.into(),
    }
}

impl Saver for SafetensorsSaver {
    fn save(&mut self, session: &VariableStore, var_list: &[String], path: &Path) -> Result<()> {
        let mut tensors = Vec::with_capacity(var_list.len());
        for name in var_list {
            let variable = session
                .variable(name)
                .ok_or_else(|| MlErr::UnknownVariable { name: name.clone() })?;

            let data = bytemuck::cast_slice(&session.params()[variable.range()]);
            let view = TensorView::new(Dtype::F32, variable.shape().to_vec(), data)?;
            tensors.push((name.as_str(), view));
        }

        let bytes = safetensors::serialize(tensors, &None)?;

        // A crash mid write leaves the previous checkpoint in place.
        let tmp = tmp_path(path);
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, path)?;

        debug!(variables = var_list.len(); "checkpoint written to {}", path.display());
        Ok(())
    }

    fn restore(
        &mut self,
        session: &mut VariableStore,
        var_list: &[String],
        path: &Path,
    ) -> Result<()> {
        if !path.is_file() {
            return Err(LearnerErr::MissingCheckpoint {
                path: path.to_path_buf(),
            });
        }

        let bytes = fs::read(path)?;
        let tensors = SafeTensors::deserialize(&bytes)?;

        let mut restored = Vec::with_capacity(var_list.len());
        for name in var_list {
            let variable = session
                .variable(name)
                .ok_or_else(|| MlErr::UnknownVariable { name: name.clone() })?;

            let view = match tensors.tensor(name) {
                Ok(view) => view,
                Err(SafeTensorError::TensorNotFound(_)) => {
                    return Err(mismatch(name, "not in the checkpoint"));
                }
                Err(e) => return Err(e.into()),
            };

            if view.dtype() != Dtype::F32 {
                return Err(mismatch(name, format!("stored as {:?}", view.dtype())));
            }

            if view.shape() != variable.shape() {
                return Err(mismatch(
                    name,
                    format!("shape {:?}, expected {:?}", view.shape(), variable.shape()),
                ));
            }

            let values: Vec<f32> = bytemuck::pod_collect_to_vec(view.data());
            restored.push((name, values));
        }

        for (name, values) in restored {
            session.values_mut(name)?.copy_from_slice(&values);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> VariableStore {
        let mut session = VariableStore::new();
        session.add("enc/w", &[2, 3], (0..6).map(|i| i as f32), true).unwrap();
        session.add("enc/b", &[3], [0.5, -0.5, 1.5], true).unwrap();
        session.add("dec/w", &[1], [9.], true).unwrap();
        session
    }

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn save_then_restore() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CHECKPOINT_FILE);
        let var_list = names(&["enc/w", "enc/b"]);
        let mut saver = SafetensorsSaver::new();

        let original = session();
        saver.save(&original, &var_list, &path).unwrap();
        assert!(path.is_file());
        assert!(!tmp_path(&path).exists());

        let mut session = session();
        session.params_mut().fill(0.);
        saver.restore(&mut session, &var_list, &path).unwrap();

        assert_eq!(session.values("enc/w").unwrap(), original.values("enc/w").unwrap());
        assert_eq!(session.values("enc/b").unwrap(), original.values("enc/b").unwrap());
        assert_eq!(session.values("dec/w").unwrap(), &[0.]);
    }

    #[test]
    fn save_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CHECKPOINT_FILE);
        let var_list = names(&["dec/w"]);
        let mut saver = SafetensorsSaver::new();

        let mut session = session();
        saver.save(&session, &var_list, &path).unwrap();
        session.values_mut("dec/w").unwrap()[0] = -3.;
        saver.save(&session, &var_list, &path).unwrap();

        session.values_mut("dec/w").unwrap()[0] = 0.;
        saver.restore(&mut session, &var_list, &path).unwrap();
        assert_eq!(session.scalar("dec/w").unwrap(), -3.);
    }

    #[test]
    fn missing_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CHECKPOINT_FILE);

        let err = SafetensorsSaver
            .restore(&mut session(), &names(&["enc/b"]), &path)
            .unwrap_err();

        assert!(matches!(err, LearnerErr::MissingCheckpoint { .. }));
    }

    #[test]
    fn missing_tensor_leaves_session_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CHECKPOINT_FILE);
        let mut saver = SafetensorsSaver::new();
        saver.save(&session(), &names(&["enc/b"]), &path).unwrap();

        let mut session = session();
        session.params_mut().fill(0.);
        let err = saver
            .restore(&mut session, &names(&["enc/b", "dec/w"]), &path)
            .unwrap_err();

        assert!(matches!(err, LearnerErr::CheckpointMismatch { ref name, .. } if name == "dec/w"));
        assert!(session.params().iter().all(|&v| v == 0.));
    }

    #[test]
    fn shape_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CHECKPOINT_FILE);
        let mut saver = SafetensorsSaver::new();
        saver.save(&session(), &names(&["enc/b"]), &path).unwrap();

        let mut other = VariableStore::new();
        other.add("enc/b", &[1, 3], [0.; 3], true).unwrap();
        let err = saver.restore(&mut other, &names(&["enc/b"]), &path).unwrap_err();

        assert!(matches!(err, LearnerErr::CheckpointMismatch { .. }));
    }

    #[test]
    fn unknown_variable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CHECKPOINT_FILE);

        let err = SafetensorsSaver
            .save(&session(), &names(&["nope"]), &path)
            .unwrap_err();

        assert!(matches!(err, LearnerErr::Ml(MlErr::UnknownVariable { .. })));
    }
}
