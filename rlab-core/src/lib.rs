#![warn(missing_docs)]
//! Core abstractions of the rlab reinforcement learning sandbox.
//!
//! This crate defines the contracts shared by every learning algorithm in the
//! workspace: the environment traits an agent drives, the [`Agent`] capability
//! set, the [`AgentKind`] registry, the generic experience [`replay_buffer`],
//! and the [`record`] container used to report diagnostics to an external
//! driver.
pub mod dummy;
pub mod error;
pub mod record;
pub mod replay_buffer;

mod base;
pub use base::{Agent, AgentKind, ContinuousEnv, Env, FeatureEnv, TabularEnv, VectorEnv};
