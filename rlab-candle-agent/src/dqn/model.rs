//! Action-value network of DQN.
use crate::{
    mlp::{Mlp, MlpConfig},
    opt::{Optimizer, OptimizerConfig},
};
use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`QNet`].
pub struct QNetConfig {
    /// Network architecture.
    pub mlp_config: MlpConfig,

    /// Optimizer settings.
    pub opt_config: OptimizerConfig,
}

impl QNetConfig {
    /// Creates the configuration.
    pub fn new(mlp_config: MlpConfig, opt_config: OptimizerConfig) -> Self {
        Self {
            mlp_config,
            opt_config,
        }
    }

    /// Overrides the learning rate of the optimizer.
    pub fn learning_rate(mut self, lr: f64) -> Self {
        self.opt_config = self.opt_config.learning_rate(lr);
        self
    }
}

/// Action-value network owning its variables and optimizer.
///
/// Two instances of this struct back a DQN agent: the online network,
/// trained by gradient descent, and the target network, which is only ever
/// written by bulk copies from the online one.
pub struct QNet {
    varmap: VarMap,
    mlp: Mlp,
    opt: Optimizer,
}

impl QNet {
    /// Builds a freshly initialized network on the given device.
    pub fn build(config: &QNetConfig, device: &Device) -> Result<Self> {
        let varmap = VarMap::new();
        let mlp = {
            let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
            Mlp::build(vb, config.mlp_config.clone())?
        };
        let opt = config.opt_config.build(varmap.all_vars())?;

        Ok(Self { varmap, mlp, opt })
    }

    /// Action values for a batch of observations.
    pub fn forward(&self, obs: &Tensor) -> candle_core::Result<Tensor> {
        self.mlp.forward(obs)
    }

    /// Backpropagates the loss and applies one optimizer step.
    pub fn backward_step(&mut self, loss: &Tensor) -> Result<()> {
        self.opt.backward_step(loss)
    }

    /// The variables of this network.
    pub fn varmap(&self) -> &VarMap {
        &self.varmap
    }

    /// Saves the network parameters.
    pub fn save<T: AsRef<Path>>(&self, path: T) -> Result<()> {
        self.varmap.save(&path)?;
        info!("save Q-network parameters to {:?}", path.as_ref());
        Ok(())
    }

    /// Loads previously saved network parameters.
    ///
    /// Missing or malformed parameter files fail here; the network is never
    /// silently left with its random initialization.
    pub fn load<T: AsRef<Path>>(&mut self, path: T) -> Result<()> {
        self.varmap
            .load(&path)
            .with_context(|| format!("failed to load Q-network parameters from {:?}", path.as_ref()))?;
        info!("load Q-network parameters from {:?}", path.as_ref());
        Ok(())
    }
}
