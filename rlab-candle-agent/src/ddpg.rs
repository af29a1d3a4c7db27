//! DDPG agent.
mod base;
mod config;
mod model;
mod noise;
pub use base::Ddpg;
pub use config::DdpgConfig;
pub use model::{ActorNet, ActorNetConfig, CriticNet, CriticNetConfig};
pub use noise::{OuNoise, OuNoiseConfig};
