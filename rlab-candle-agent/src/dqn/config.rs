//! Configuration of the DQN agent.
use super::{explorer::EpsilonGreedy, model::QNetConfig};
use crate::{
    mlp::{Activation, MlpConfig},
    opt::OptimizerConfig,
    util::CriticLoss,
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

/// Configuration of [`Dqn`](super::Dqn).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct DqnConfig {
    /// Configuration of the online and target networks.
    pub qnet_config: QNetConfig,

    /// Configuration of the replay buffer.
    pub replay_buffer_config: ReplayBufferConfig,

    /// Exploration schedule.
    pub explorer: EpsilonGreedy,

    /// Discount factor.
    pub gamma: f64,

    /// Number of transitions per gradient step.
    pub batch_size: usize,

    /// Number of executed learning steps between target-network copies.
    pub sync_interval: usize,

    /// Regression loss of the TD targets.
    pub critic_loss: CriticLoss,

    /// Device running the networks.
    pub device: Device,

    /// Seed of the agent's RNG.
    pub seed: u64,
}

impl DqnConfig {
    /// Default configuration for the given observation and action
    /// dimensionalities.
    pub fn new(obs_dim: usize, n_actions: usize) -> Self {
        let mlp_config = MlpConfig::new(
            obs_dim as i64,
            vec![128],
            n_actions as i64,
            Activation::None,
        );
        Self {
            qnet_config: QNetConfig::new(mlp_config, OptimizerConfig::default()),
            replay_buffer_config: ReplayBufferConfig::default().capacity(1_000),
            explorer: EpsilonGreedy::default(),
            gamma: 0.99,
            batch_size: 8,
            sync_interval: 1_000,
            critic_loss: CriticLoss::Mse,
            device: Device::Cpu,
            seed: 42,
        }
    }

    /// Sets the discount factor.
    pub fn gamma(mut self, v: f64) -> Self {
        self.gamma = v;
        self
    }

    /// Sets the batch size.
    pub fn batch_size(mut self, v: usize) -> Self {
        self.batch_size = v;
        self
    }

    /// Sets the target-network synchronization interval.
    pub fn sync_interval(mut self, v: usize) -> Self {
        self.sync_interval = v;
        self
    }

    /// Sets the exploration schedule.
    pub fn explorer(mut self, v: EpsilonGreedy) -> Self {
        self.explorer = v;
        self
    }

    /// Sets the replay buffer configuration.
    pub fn replay_buffer_config(mut self, v: ReplayBufferConfig) -> Self {
        self.replay_buffer_config = v;
        self
    }

    /// Overrides the learning rate.
    pub fn learning_rate(mut self, lr: f64) -> Self {
        self.qnet_config = self.qnet_config.learning_rate(lr);
        self
    }

    /// Sets the regression loss.
    pub fn critic_loss(mut self, v: CriticLoss) -> Self {
        self.critic_loss = v;
        self
    }

    /// Sets the seed of the agent's RNG.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }

    /// Constructs [`DqnConfig`] from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`DqnConfig`] as a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
