use std::str::FromStr;

use ndarray::{Array, ArrayView, Dimension};
use serde::Deserialize;

use super::{Elu, Relu, Sigmoid, Tanh};
use crate::{MlErr, Result};

/// The fixed set of nonlinearities a layer can be configured with.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(try_from = "String")]
pub enum ActFn {
    Relu(Relu),
    Elu(Elu),
    Tanh(Tanh),
    Sigmoid(Sigmoid),
}

impl ActFn {
    pub fn relu() -> Self {
        Self::Relu(Relu)
    }

    pub fn tanh() -> Self {
        Self::Tanh(Tanh)
    }

    /// The name this nonlinearity is looked up by.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Relu(_) => "relu",
            Self::Elu(_) => "elu",
            Self::Tanh(_) => "tanh",
            Self::Sigmoid(_) => "sigmoid",
        }
    }

    pub fn f(&self, x: f32) -> f32 {
        match self {
            Self::Relu(a) => a.f(x),
            Self::Elu(a) => a.f(x),
            Self::Tanh(a) => a.f(x),
            Self::Sigmoid(a) => a.f(x),
        }
    }

    pub fn df(&self, x: f32) -> f32 {
        match self {
            Self::Relu(a) => a.df(x),
            Self::Elu(a) => a.df(x),
            Self::Tanh(a) => a.df(x),
            Self::Sigmoid(a) => a.df(x),
        }
    }

    /// Applies the nonlinearity element-wise.
    pub fn apply<D: Dimension>(&self, x: ArrayView<f32, D>) -> Array<f32, D> {
        x.mapv(|v| self.f(v))
    }
}

/// Looks up a nonlinearity by name.
///
/// # Arguments
/// * `name` - One of `relu`, `elu`, `tanh` or `sigmoid`.
///
/// # Returns
/// The nonlinearity with its default hyperparameters or an error if the name is unknown.
pub fn get_nonlinearity(name: &str) -> Result<ActFn> {
    match name {
        "relu" => Ok(ActFn::relu()),
        "elu" => Ok(ActFn::Elu(Elu::default())),
        "tanh" => Ok(ActFn::tanh()),
        "sigmoid" => Ok(ActFn::Sigmoid(Sigmoid::default())),
        _ => Err(MlErr::UnknownNonlinearity {
            name: name.to_string(),
        }),
    }
}

impl FromStr for ActFn {
    type Err = MlErr;

    fn from_str(s: &str) -> Result<Self> {
        get_nonlinearity(s)
    }
}

impl TryFrom<String> for ActFn {
    type Error = MlErr;

    fn try_from(value: String) -> Result<Self> {
        get_nonlinearity(&value)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn relu() {
        let act_fn = get_nonlinearity("relu").unwrap();
        assert_eq!(act_fn.f(-2.), 0.);
        assert_eq!(act_fn.f(3.), 3.);
        assert_eq!(act_fn.df(3.), 1.);
    }

    #[test]
    fn elu() {
        let act_fn = get_nonlinearity("elu").unwrap();
        assert_eq!(act_fn.f(2.), 2.);
        assert!(close(act_fn.f(-1.), (-1f32).exp() - 1.));
        assert!(close(act_fn.df(-1.), (-1f32).exp()));
    }

    #[test]
    fn tanh() {
        let act_fn = get_nonlinearity("tanh").unwrap();
        assert!(close(act_fn.f(0.5), 0.5f32.tanh()));
        assert_eq!(act_fn.df(0.), 1.);
    }

    #[test]
    fn sigmoid() {
        let act_fn = get_nonlinearity("sigmoid").unwrap();
        assert_eq!(act_fn.f(0.), 0.5);
        assert_eq!(act_fn.df(0.), 0.25);
    }

    #[test]
    fn unknown_name_is_an_error() {
        let err = get_nonlinearity("swish").unwrap_err();
        assert!(matches!(err, MlErr::UnknownNonlinearity { name } if name == "swish"));
        assert!("RELU".parse::<ActFn>().is_err());
    }

    #[test]
    fn names_round_trip() {
        for name in ["relu", "elu", "tanh", "sigmoid"] {
            let act_fn: ActFn = name.parse().unwrap();
            assert_eq!(act_fn.name(), name);
        }
    }

    #[test]
    fn apply_elementwise() {
        let x = array![[-1., 2.], [0., -3.]];
        let y = ActFn::relu().apply(x.view());
        assert_eq!(y, array![[0., 2.], [0., 0.]]);
    }
}
