//! An educational reinforcement learning sandbox.
//!
//! rlab consists of the following crates:
//!
//! * [rlab-core](../rlab_core/index.html) provides the environment
//!   contracts, the agent capability trait, the algorithm registry, the
//!   generic replay buffer, and the diagnostics record.
//! * [rlab-tabular-agent](../rlab_tabular_agent/index.html) provides the
//!   dynamic-programming agents (Value Iteration, Policy Iteration over an
//!   empirical transition model) and the tabular model-free agents
//!   (Q-Learning, SARSA, First-Visit Monte Carlo).
//! * [rlab-linear-agent](../rlab_linear_agent/index.html) provides the
//!   linear policy-gradient agents (REINFORCE, Actor-Critic) over a
//!   feature-based softmax policy.
//! * [rlab-candle-agent](../rlab_candle_agent/index.html) provides the deep
//!   agents (DQN, DDPG) implemented with
//!   [candle](https://crates.io/crates/candle-core).
//!
//! This crate re-exports them under one roof; an external driver (GUI,
//! episode scheduler, plotting) is expected to sit on top.

pub use rlab_candle_agent as candle_agent;
pub use rlab_core as core;
pub use rlab_linear_agent as linear_agent;
pub use rlab_tabular_agent as tabular_agent;
