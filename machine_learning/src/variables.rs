use std::{ops::Range, str::FromStr};

use ndarray::{ArrayViewD, ArrayViewMutD, IxDyn};
use serde::Deserialize;

use crate::{MlErr, Result};

/// A named tensor living inside a `VariableStore`.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    name: String,
    shape: Vec<usize>,
    offset: usize,
    trainable: bool,
}

impl Variable {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// The amount of scalars this variable holds.
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn trainable(&self) -> bool {
        self.trainable
    }

    /// The positions of this variable inside the store's flat parameter buffer.
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.len()
    }
}

/// An ordered registry of named variables backed by a single flat buffer of parameters, each
/// variable owns a contiguous slice of it.
#[derive(Debug, Default, Clone)]
pub struct VariableStore {
    variables: Vec<Variable>,
    params: Vec<f32>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new variable.
    ///
    /// # Arguments
    /// * `name` - A name no other variable in the store has.
    /// * `shape` - The shape of the tensor.
    /// * `values` - The initial values in row major order, as many as the shape holds.
    /// * `trainable` - Whether optimizers and checkpoints should see this variable.
    ///
    /// # Returns
    /// An error if the name is taken or the amount of values doesn't match the shape.
    pub fn add<I>(&mut self, name: &str, shape: &[usize], values: I, trainable: bool) -> Result<()>
    where
        I: IntoIterator<Item = f32>,
    {
        if self.variable(name).is_some() {
            return Err(MlErr::DuplicateVariable {
                name: name.to_string(),
            });
        }

        let offset = self.params.len();
        self.params.extend(values);

        let variable = Variable {
            name: name.to_string(),
            shape: shape.to_vec(),
            offset,
            trainable,
        };

        let got = self.params.len() - offset;
        if got != variable.len() {
            self.params.truncate(offset);
            return Err(MlErr::SizeMismatch {
                what: "variable values",
                got,
                expected: variable.len(),
            });
        }

        self.variables.push(variable);
        Ok(())
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    fn lookup(&self, name: &str) -> Result<&Variable> {
        self.variable(name).ok_or_else(|| MlErr::UnknownVariable {
            name: name.to_string(),
        })
    }

    /// Views the values of a variable with its shape.
    pub fn get(&self, name: &str) -> Result<ArrayViewD<'_, f32>> {
        let variable = self.lookup(name)?;
        let view = ArrayViewD::from_shape(IxDyn(&variable.shape), &self.params[variable.range()])?;
        Ok(view)
    }

    /// Mutably views the values of a variable with its shape.
    pub fn get_mut(&mut self, name: &str) -> Result<ArrayViewMutD<'_, f32>> {
        let variable = self.lookup(name)?;
        let shape = IxDyn(&variable.shape);
        let range = variable.range();
        let view = ArrayViewMutD::from_shape(shape, &mut self.params[range])?;
        Ok(view)
    }

    /// The raw values of a variable.
    pub fn values(&self, name: &str) -> Result<&[f32]> {
        let range = self.lookup(name)?.range();
        Ok(&self.params[range])
    }

    /// The raw values of a variable, mutably.
    pub fn values_mut(&mut self, name: &str) -> Result<&mut [f32]> {
        let range = self.lookup(name)?.range();
        Ok(&mut self.params[range])
    }

    /// The first value of a variable, handy for scalars.
    pub fn scalar(&self, name: &str) -> Result<f32> {
        self.values(name)?
            .first()
            .copied()
            .ok_or_else(|| MlErr::SizeMismatch {
                what: "scalar variable",
                got: 0,
                expected: 1,
            })
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn trainable_variables(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter().filter(|v| v.trainable)
    }

    /// Every parameter of the store, in registration order.
    pub fn params(&self) -> &[f32] {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut [f32] {
        &mut self.params
    }

    /// The amount of variables.
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// The amount of scalars across all variables.
    pub fn num_params(&self) -> usize {
        self.params.len()
    }
}

/// How `get_trainable_variables` matches names against the filter list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum FilterType {
    #[serde(rename = "in")]
    In,
    #[serde(rename = "not in")]
    NotIn,
}

impl FromStr for FilterType {
    type Err = MlErr;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "in" => Ok(Self::In),
            "not in" => Ok(Self::NotIn),
            _ => Err(MlErr::UnknownFilterType {
                name: s.to_string(),
            }),
        }
    }
}

/// Filters the trainable variables of a store by substrings of their names.
///
/// With `FilterType::In` the result holds, for each entry of `flist` in order, the variables
/// whose name contains it; a variable matched by several entries shows up once, at its first
/// match. With `FilterType::NotIn` the result holds the variables whose name contains none of
/// the entries, in store order.
pub fn get_trainable_variables<'a, S>(
    store: &'a VariableStore,
    flist: &[S],
    filter_type: FilterType,
) -> Vec<&'a Variable>
where
    S: AsRef<str>,
{
    match filter_type {
        FilterType::In => {
            let mut vs: Vec<&Variable> = Vec::new();
            for s in flist {
                for v in store.trainable_variables() {
                    if v.name.contains(s.as_ref()) && !vs.iter().any(|u| u.name == v.name) {
                        vs.push(v);
                    }
                }
            }
            vs
        }
        FilterType::NotIn => store
            .trainable_variables()
            .filter(|v| flist.iter().all(|s| !v.name.contains(s.as_ref())))
            .collect(),
    }
}
