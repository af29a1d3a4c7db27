use super::{mlp_forward, Activation, MlpConfig};
use anyhow::Result;
use candle_core::{Device, Tensor};
use candle_nn::{linear, Linear, VarBuilder};

/// Returns vector of linear modules from [`MlpConfig`].
fn create_linear_layers(prefix: &str, vs: VarBuilder, config: &MlpConfig) -> Result<Vec<Linear>> {
    let mut in_out_pairs: Vec<(i64, i64)> = (0..config.units.len().saturating_sub(1))
        .map(|i| (config.units[i], config.units[i + 1]))
        .collect();
    match config.units.first() {
        Some(first) => {
            in_out_pairs.insert(0, (config.in_dim, *first));
            in_out_pairs.push((*config.units.last().unwrap(), config.out_dim));
        }
        None => in_out_pairs.push((config.in_dim, config.out_dim)),
    }
    let vs = vs.pp(prefix);

    let mut layers = Vec::with_capacity(in_out_pairs.len());
    for (i, &(in_dim, out_dim)) in in_out_pairs.iter().enumerate() {
        layers.push(linear(
            in_dim as usize,
            out_dim as usize,
            vs.pp(format!("ln{}", i)),
        )?);
    }
    Ok(layers)
}

/// Multilayer perceptron with ReLU activations between layers.
pub struct Mlp {
    activation_out: Activation,
    device: Device,
    layers: Vec<Linear>,
}

impl Mlp {
    /// Builds the perceptron, registering its variables under the given
    /// [`VarBuilder`].
    pub fn build(vs: VarBuilder, config: MlpConfig) -> Result<Self> {
        let device = vs.device().clone();
        let layers = create_linear_layers("mlp", vs, &config)?;

        Ok(Self {
            activation_out: config.activation_out,
            device,
            layers,
        })
    }

    /// Forward pass.
    pub fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        let xs = xs.to_device(&self.device)?;
        mlp_forward(xs, &self.layers, self.activation_out)
    }
}
