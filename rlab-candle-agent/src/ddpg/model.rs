//! Actor and critic networks of DDPG.
use crate::{
    mlp::{Mlp, MlpConfig},
    opt::{Optimizer, OptimizerConfig},
};
use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor, D};
use candle_nn::{VarBuilder, VarMap};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`ActorNet`].
pub struct ActorNetConfig {
    /// Network architecture; the output activation bounds the actions.
    pub mlp_config: MlpConfig,

    /// Optimizer settings.
    pub opt_config: OptimizerConfig,
}

impl ActorNetConfig {
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

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`CriticNet`].
pub struct CriticNetConfig {
    /// Network architecture over concatenated observation and action.
    pub mlp_config: MlpConfig,

    /// Optimizer settings.
    pub opt_config: OptimizerConfig,
}

impl CriticNetConfig {
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

/// Deterministic policy network mapping observations to bounded actions.
pub struct ActorNet {
    varmap: VarMap,
    mlp: Mlp,
    opt: Optimizer,
}

impl ActorNet {
    /// Builds a freshly initialized network on the given device.
    pub fn build(config: &ActorNetConfig, device: &Device) -> Result<Self> {
        let varmap = VarMap::new();
        let mlp = {
            let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
            Mlp::build(vb, config.mlp_config.clone())?
        };
        let opt = config.opt_config.build(varmap.all_vars())?;

        Ok(Self { varmap, mlp, opt })
    }

    /// Actions for a batch of observations.
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
        info!("save actor parameters to {:?}", path.as_ref());
        Ok(())
    }

    /// Loads previously saved network parameters.
    pub fn load<T: AsRef<Path>>(&mut self, path: T) -> Result<()> {
        self.varmap
            .load(&path)
            .with_context(|| format!("failed to load actor parameters from {:?}", path.as_ref()))?;
        info!("load actor parameters from {:?}", path.as_ref());
        Ok(())
    }
}

/// Action-value network over concatenated observations and actions.
pub struct CriticNet {
    varmap: VarMap,
    mlp: Mlp,
    opt: Optimizer,
}

impl CriticNet {
    /// Builds a freshly initialized network on the given device.
    pub fn build(config: &CriticNetConfig, device: &Device) -> Result<Self> {
        let varmap = VarMap::new();
        let mlp = {
            let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
            Mlp::build(vb, config.mlp_config.clone())?
        };
        let opt = config.opt_config.build(varmap.all_vars())?;

        Ok(Self { varmap, mlp, opt })
    }

    /// Action values for a batch of observation-action pairs.
    pub fn forward(&self, obs: &Tensor, act: &Tensor) -> candle_core::Result<Tensor> {
        let input = Tensor::cat(&[obs, act], D::Minus1)?;
        self.mlp.forward(&input)
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
        info!("save critic parameters to {:?}", path.as_ref());
        Ok(())
    }

    /// Loads previously saved network parameters.
    pub fn load<T: AsRef<Path>>(&mut self, path: T) -> Result<()> {
        self.varmap
            .load(&path)
            .with_context(|| format!("failed to load critic parameters from {:?}", path.as_ref()))?;
        info!("load critic parameters from {:?}", path.as_ref());
        Ok(())
    }
}
