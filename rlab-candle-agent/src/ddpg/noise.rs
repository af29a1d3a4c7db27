//! Ornstein-Uhlenbeck exploration noise.
use candle_core::{Device, Tensor};
use serde::{Deserialize, Serialize};

/// Parameters of the Ornstein-Uhlenbeck process.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OuNoiseConfig {
    /// Long-run mean the process reverts to.
    pub mu: f32,

    /// Mean-reversion rate.
    pub theta: f32,

    /// Scale of the Gaussian increments.
    pub sigma: f32,
}

impl Default for OuNoiseConfig {
    fn default() -> Self {
        Self {
            mu: 0.0,
            theta: 0.1,
            sigma: 0.2,
        }
    }
}

/// Temporally correlated exploration noise for continuous actions:
///
/// `state <- state + theta * (mu - state) + sigma * N(0, 1)`
///
/// The process state is reset to `mu` whenever the owning agent resets.
/// The decaying exploration scale applied on top of the noise is external
/// to the process and passed per step by the driving loop.
#[derive(Debug, Clone)]
pub struct OuNoise {
    config: OuNoiseConfig,
    state: Vec<f32>,
}

impl OuNoise {
    /// Constructs the process for the given action dimensionality.
    pub fn new(config: OuNoiseConfig, dim: usize) -> Self {
        let state = vec![config.mu; dim];
        Self { config, state }
    }

    /// Resets the process state to the mean.
    pub fn reset(&mut self) {
        for x in self.state.iter_mut() {
            *x = self.config.mu;
        }
    }

    /// Advances the process one step and returns its new state.
    pub fn sample(&mut self) -> candle_core::Result<&[f32]> {
        let z = Tensor::randn(0f32, 1f32, (self.state.len(),), &Device::Cpu)?.to_vec1::<f32>()?;
        for (x, z) in self.state.iter_mut().zip(z.into_iter()) {
            *x += self.config.theta * (self.config.mu - *x) + self.config.sigma * z;
        }
        Ok(&self.state)
    }
}
