//! Configuration of the DDPG agent.
use super::{
    model::{ActorNetConfig, CriticNetConfig},
    noise::OuNoiseConfig,
};
use crate::{
    mlp::{Activation, MlpConfig},
    opt::OptimizerConfig,
    Device,
};
use anyhow::Result;
use rlab_core::replay_buffer::ReplayBufferConfig;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`Ddpg`](super::Ddpg).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct DdpgConfig {
    /// Configuration of the online and target actors.
    pub actor_config: ActorNetConfig,

    /// Configuration of the online and target critics.
    pub critic_config: CriticNetConfig,

    /// Configuration of the replay buffer.
    pub replay_buffer_config: ReplayBufferConfig,

    /// Parameters of the exploration noise process.
    pub ou_noise: OuNoiseConfig,

    /// Discount factor.
    pub gamma: f64,

    /// Polyak blending factor of the target updates.
    pub tau: f64,

    /// Number of transitions per gradient step.
    pub batch_size: usize,

    /// Device running the networks.
    pub device: Device,
}

impl DdpgConfig {
    /// Default configuration for the given observation and action
    /// dimensionalities.
    pub fn new(obs_dim: usize, act_dim: usize) -> Self {
        let actor_mlp = MlpConfig::new(
            obs_dim as i64,
            vec![128, 64],
            act_dim as i64,
            Activation::Tanh,
        );
        let critic_mlp = MlpConfig::new(
            (obs_dim + act_dim) as i64,
            vec![128, 64],
            1,
            Activation::None,
        );
        Self {
            actor_config: ActorNetConfig::new(
                actor_mlp,
                OptimizerConfig::default().learning_rate(1e-4),
            ),
            critic_config: CriticNetConfig::new(
                critic_mlp,
                OptimizerConfig::default().learning_rate(1e-3),
            ),
            replay_buffer_config: ReplayBufferConfig::default().capacity(1_000_000),
            ou_noise: OuNoiseConfig::default(),
            gamma: 0.99,
            tau: 0.001,
            batch_size: 32,
            device: Device::Cpu,
        }
    }

    /// Sets the discount factor.
    pub fn gamma(mut self, v: f64) -> Self {
        self.gamma = v;
        self
    }

    /// Sets the Polyak blending factor.
    pub fn tau(mut self, v: f64) -> Self {
        self.tau = v;
        self
    }

    /// Sets the batch size.
    pub fn batch_size(mut self, v: usize) -> Self {
        self.batch_size = v;
        self
    }

    /// Sets the exploration noise parameters.
    pub fn ou_noise(mut self, v: OuNoiseConfig) -> Self {
        self.ou_noise = v;
        self
    }

    /// Sets the replay buffer configuration.
    pub fn replay_buffer_config(mut self, v: ReplayBufferConfig) -> Self {
        self.replay_buffer_config = v;
        self
    }

    /// Constructs [`DdpgConfig`] from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`DdpgConfig`] as a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
