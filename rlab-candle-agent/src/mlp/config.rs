use candle_core::Tensor;
use serde::{Deserialize, Serialize};

/// Activation applied to the final layer of an [`Mlp`](super::Mlp).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub enum Activation {
    /// No output activation (e.g. action values).
    None,

    /// ReLU output activation.
    Relu,

    /// Tanh output activation (e.g. bounded continuous actions).
    Tanh,
}

impl Activation {
    pub(crate) fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        match self {
            Self::None => Ok(xs.clone()),
            Self::Relu => xs.relu(),
            Self::Tanh => xs.tanh(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`Mlp`](super::Mlp).
pub struct MlpConfig {
    pub(super) in_dim: i64,
    pub(super) units: Vec<i64>,
    pub(super) out_dim: i64,
    pub(super) activation_out: Activation,
}

impl MlpConfig {
    /// Creates configuration of MLP.
    ///
    /// * `activation_out` - activation applied to the final layer.
    pub fn new(in_dim: i64, units: Vec<i64>, out_dim: i64, activation_out: Activation) -> Self {
        Self {
            in_dim,
            units,
            out_dim,
            activation_out,
        }
    }

    /// Input dimensionality.
    pub fn in_dim(&self) -> i64 {
        self.in_dim
    }

    /// Output dimensionality.
    pub fn out_dim(&self) -> i64 {
        self.out_dim
    }
}
